//! The graded orbit: closure restricted to a single grade.
//!
//! A *grader* assigns every point a non-negative integer grade. The
//! wrapper pins the orbit to the grade of its first accepted seed:
//! seeds of any other grade are recorded but not expanded, and points
//! of lower grade hit during expansion are shunted to a side set for
//! later exploration. Grades can only decrease along the action, so
//! one graded orbit explores one stratum at a time.

use std::collections::HashSet;

use crate::element::MonoidElement;
use crate::error::KoniecznyError;
use crate::orbit::action::Action;
use crate::orbit::closure::Orbit;

/// An orbit restricted to points of a single grade.
#[derive(Debug)]
pub struct GradedOrbit<E, A, G>
where
    E: MonoidElement,
    A: Action<E>,
    G: Fn(&A::Point) -> usize,
{
    orbit: Orbit<E, A>,
    grader: G,
    grade: Option<usize>,
    deferred_seeds: Vec<A::Point>,
    low_grade_points: HashSet<A::Point>,
}

impl<E, A, G> GradedOrbit<E, A, G>
where
    E: MonoidElement,
    A: Action<E>,
    G: Fn(&A::Point) -> usize,
{
    /// An empty graded orbit using `grader`.
    pub fn new(grader: G) -> Self {
        Self {
            orbit: Orbit::new(),
            grader,
            grade: None,
            deferred_seeds: Vec::new(),
            low_grade_points: HashSet::new(),
        }
    }

    /// The grade this orbit is pinned to, once a seed fixed it.
    pub fn grade(&self) -> Option<usize> {
        self.grade
    }

    /// Pin the orbit to `grade` before seeding.
    pub fn set_grade(&mut self, grade: usize) {
        self.grade = Some(grade);
    }

    /// Push a seed. The first accepted seed pins the grade; seeds of a
    /// different grade are recorded but not expanded, and `None` is
    /// returned for them.
    pub fn add_seed(&mut self, seed: A::Point) -> Option<usize> {
        let g = (self.grader)(&seed);
        match self.grade {
            None => {
                self.grade = Some(g);
                Some(self.orbit.add_seed(seed))
            }
            Some(current) if g == current => Some(self.orbit.add_seed(seed)),
            Some(_) => {
                self.deferred_seeds.push(seed);
                None
            }
        }
    }

    /// Insert a generator; fails with [`KoniecznyError::Frozen`] after
    /// the first run.
    pub fn add_generator(&mut self, g: E) -> Result<(), KoniecznyError> {
        self.orbit.add_generator(g)
    }

    /// Close the orbit within its grade. Lower-graded points reached
    /// during expansion land in the side set.
    pub fn run(&mut self) -> Result<(), KoniecznyError> {
        let Some(grade) = self.grade else {
            // Nothing was seeded; there is nothing to expand.
            return Ok(());
        };
        let grader = &self.grader;
        let lows = &mut self.low_grade_points;
        self.orbit.run_filtered(
            |pt| grader(pt) == grade,
            |pt| {
                debug_assert!(grader(pt) < grade);
                lows.insert(pt.clone());
            },
        )
    }

    /// The points whose grade fell below the orbit's grade during
    /// expansion.
    pub fn low_grade_points(&self) -> impl Iterator<Item = &A::Point> {
        self.low_grade_points.iter()
    }

    /// Seeds refused because their grade did not match.
    pub fn deferred_seeds(&self) -> &[A::Point] {
        &self.deferred_seeds
    }

    /// The underlying plain orbit.
    pub fn orbit(&self) -> &Orbit<E, A> {
        &self.orbit
    }

    /// Number of in-grade points enumerated.
    pub fn len(&self) -> usize {
        self.orbit.len()
    }

    /// Whether no in-grade point has been seeded.
    pub fn is_empty(&self) -> bool {
        self.orbit.is_empty()
    }

    /// The index of `pt` among the in-grade points.
    pub fn position(&self, pt: &A::Point) -> Option<usize> {
        self.orbit.position(pt)
    }

    /// The in-grade point at index `i`.
    pub fn at(&self, i: usize) -> &A::Point {
        self.orbit.at(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{MonoidElement, Transformation};
    use crate::orbit::action::OnImages;
    use crate::element::ImageSet;

    fn t(v: &[u8]) -> Transformation {
        Transformation::new(v.to_vec()).unwrap()
    }

    fn image_orbit_gens() -> Vec<Transformation> {
        vec![t(&[1, 2, 0]), t(&[0, 0, 2])]
    }

    #[test]
    fn expansion_stays_in_grade() {
        let mut o: GradedOrbit<Transformation, OnImages, _> =
            GradedOrbit::new(|pt: &ImageSet| pt.len());
        let id = Transformation::identity_of_degree(3).unwrap();
        o.add_seed(Transformation::lambda_of(&id).unwrap());
        for g in image_orbit_gens() {
            o.add_generator(g).unwrap();
        }
        o.run().unwrap();
        assert_eq!(o.grade(), Some(3));
        // Only {0,1,2} itself has grade 3.
        assert_eq!(o.len(), 1);
        // The grade-2 points found during expansion wait in the side set.
        let lows: Vec<_> = o.low_grade_points().collect();
        assert_eq!(lows, vec![&[0usize, 2].into_iter().collect::<ImageSet>()]);
    }

    #[test]
    fn mismatched_seeds_are_recorded_not_expanded() {
        let mut o: GradedOrbit<Transformation, OnImages, _> =
            GradedOrbit::new(|pt: &ImageSet| pt.len());
        o.set_grade(2);
        let rejected: ImageSet = [1usize].into_iter().collect();
        assert_eq!(o.add_seed(rejected), None);
        assert_eq!(o.deferred_seeds().len(), 1);

        let accepted: ImageSet = [0usize, 2].into_iter().collect();
        assert_eq!(o.add_seed(accepted), Some(0));
        for g in image_orbit_gens() {
            o.add_generator(g).unwrap();
        }
        o.run().unwrap();
        // Grade-2 images reachable from {0,2}: {0,2}, {0,1}, {1,2}.
        assert_eq!(o.len(), 3);
        assert!(o.low_grade_points().count() > 0);
    }

    #[test]
    fn running_an_unseeded_orbit_is_a_no_op() {
        let mut o: GradedOrbit<Transformation, OnImages, _> =
            GradedOrbit::new(|pt: &ImageSet| pt.len());
        o.add_generator(t(&[0, 1])).unwrap();
        o.run().unwrap();
        assert!(o.is_empty());
    }
}
