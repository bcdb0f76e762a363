//! Invariant audits for the orbit engine and the decomposition.
//!
//! Public APIs never panic. Instead, the orbit and the engine know how
//! to audit their own internal invariants (position consistency, edge
//! and multiplier correctness, rank agreement inside D-classes) into an
//! [`InvariantReport`], which collects every violation it sees rather
//! than stopping at the first. Audits run automatically in debug
//! builds, and in release builds when the `strict-invariants` or
//! `check-invariants` feature is enabled.

use crate::error::KoniecznyError;

/// Collects the violations found during one audit pass.
#[derive(Debug, Default)]
pub struct InvariantReport {
    violations: Vec<String>,
}

impl InvariantReport {
    /// An empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation.
    pub fn flag(&mut self, violation: impl Into<String>) {
        self.violations.push(violation.into());
    }

    /// Record the violation produced by `describe` unless `holds`.
    pub fn require(&mut self, holds: bool, describe: impl FnOnce() -> String) {
        if !holds {
            self.violations.push(describe());
        }
    }

    /// Whether the audit found nothing wrong.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Every violation recorded so far, in discovery order.
    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    /// The first violation as an error, or `Ok` for a clean audit.
    pub fn into_result(self) -> Result<(), KoniecznyError> {
        match self.violations.into_iter().next() {
            None => Ok(()),
            Some(v) => Err(KoniecznyError::Invariant(v)),
        }
    }
}

/// Structures that can audit their own invariants.
pub trait AuditInvariants {
    /// Record every violated invariant into `report`.
    fn audit_invariants(&self, report: &mut InvariantReport);

    /// Run a full audit and surface the first violation as an error.
    fn checked_invariants(&self) -> Result<(), KoniecznyError> {
        let mut report = InvariantReport::new();
        self.audit_invariants(&mut report);
        report.into_result()
    }
}

/// Audit `$subject` and panic with the given context when invariant
/// checking is enabled (debug builds, or the `strict-invariants` /
/// `check-invariants` features).
#[macro_export]
macro_rules! audit_invariants {
    ($subject:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants", feature = "check-invariants"))]
        {
            let mut report = $crate::invariants::InvariantReport::new();
            $crate::invariants::AuditInvariants::audit_invariants(&$subject, &mut report);
            if let Some(v) = report.violations().first() {
                panic!(concat!("[invariants] ", $($ctx)*, ": {}"), v);
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TwoFlaws;

    impl AuditInvariants for TwoFlaws {
        fn audit_invariants(&self, report: &mut InvariantReport) {
            report.require(1 + 1 == 2, || "arithmetic broke".into());
            report.flag("first flaw");
            report.require(false, || "second flaw".into());
        }
    }

    #[test]
    fn report_collects_every_violation() {
        let mut report = InvariantReport::new();
        TwoFlaws.audit_invariants(&mut report);
        assert!(!report.is_clean());
        assert_eq!(report.violations(), &["first flaw", "second flaw"]);
    }

    #[test]
    fn checked_invariants_surfaces_the_first() {
        assert_eq!(
            TwoFlaws.checked_invariants().unwrap_err(),
            KoniecznyError::Invariant("first flaw".into())
        );
    }

    #[test]
    fn clean_audit_is_ok() {
        struct Clean;
        impl AuditInvariants for Clean {
            fn audit_invariants(&self, _report: &mut InvariantReport) {}
        }
        assert!(Clean.checked_invariants().is_ok());
        assert!(InvariantReport::new().is_clean());
    }
}
