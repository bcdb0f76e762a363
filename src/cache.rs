//! Element-reuse cache: pooled scratch elements for in-place products.
//!
//! Products write into a caller-owned destination, so loops that chain
//! products need temporaries. [`ElementCache`] pools them: `push`
//! materialises deep copies of a prototype, [`acquire`] hands one out
//! wrapped in a ticketed [`CacheEntry`], and [`release`] returns it.
//! [`CacheGuard`] releases automatically on scope exit.
//!
//! Kinds that are cheap to construct can use [`TrivialCache`] instead:
//! `acquire` returns a fresh default value and `release` is a no-op.
//!
//! [`acquire`]: ElementCache::acquire
//! [`release`]: ElementCache::release

use std::cell::RefCell;
use std::collections::HashSet;
use std::ops::{Deref, DerefMut};

use crate::error::KoniecznyError;

/// A pool of reusable scratch elements.
///
/// At all times the elements held (acquirable plus outstanding) equal
/// the number pushed; [`held`](Self::held) exposes the count.
#[derive(Debug)]
pub struct ElementCache<T> {
    id: u64,
    acquirable: Vec<T>,
    outstanding: HashSet<u64>,
    next_ticket: u64,
}

impl<T> Default for ElementCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// An element on loan from an [`ElementCache`].
///
/// Dereferences to the element. Hand it back with
/// [`ElementCache::release`]; dropping it instead simply retires the
/// element from the pool.
#[derive(Debug)]
pub struct CacheEntry<T> {
    value: T,
    cache_id: u64,
    ticket: u64,
}

impl<T> Deref for CacheEntry<T> {
    type Target = T;
    #[inline]
    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for CacheEntry<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T> ElementCache<T> {
    /// An empty cache.
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static NEXT_CACHE_ID: AtomicU64 = AtomicU64::new(0);
        Self {
            id: NEXT_CACHE_ID.fetch_add(1, Ordering::Relaxed),
            acquirable: Vec::new(),
            outstanding: HashSet::new(),
            next_ticket: 0,
        }
    }

    /// Materialise `n` deep copies of `prototype` into the pool.
    pub fn push(&mut self, prototype: &T, n: usize)
    where
        T: Clone,
    {
        self.acquirable
            .extend(std::iter::repeat_with(|| prototype.clone()).take(n));
    }

    /// Move an element out of the pool.
    ///
    /// Fails with [`KoniecznyError::CacheEmpty`] when nothing is
    /// acquirable.
    pub fn acquire(&mut self) -> Result<CacheEntry<T>, KoniecznyError> {
        let value = self.acquirable.pop().ok_or(KoniecznyError::CacheEmpty)?;
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.outstanding.insert(ticket);
        Ok(CacheEntry {
            value,
            cache_id: self.id,
            ticket,
        })
    }

    /// Return an element to the pool.
    ///
    /// Fails with [`KoniecznyError::NotOwned`] if the entry was issued
    /// by a different cache; the foreign element is dropped.
    pub fn release(&mut self, entry: CacheEntry<T>) -> Result<(), KoniecznyError> {
        if entry.cache_id != self.id || !self.outstanding.remove(&entry.ticket) {
            return Err(KoniecznyError::NotOwned);
        }
        self.acquirable.push(entry.value);
        Ok(())
    }

    /// How many elements are currently acquirable.
    pub fn available(&self) -> usize {
        self.acquirable.len()
    }

    /// Total elements held: acquirable plus outstanding.
    pub fn held(&self) -> usize {
        self.acquirable.len() + self.outstanding.len()
    }
}

/// RAII wrapper: acquires on construction, releases on drop.
///
/// The cache lives in a [`RefCell`] so several guards can coexist in
/// one scope; each `borrow_mut` is transient.
#[derive(Debug)]
pub struct CacheGuard<'a, T> {
    cache: &'a RefCell<ElementCache<T>>,
    entry: Option<CacheEntry<T>>,
}

impl<'a, T> CacheGuard<'a, T> {
    /// Acquire an element from `cache` for the guard's lifetime.
    pub fn new(cache: &'a RefCell<ElementCache<T>>) -> Result<Self, KoniecznyError> {
        let entry = cache.borrow_mut().acquire()?;
        Ok(Self {
            cache,
            entry: Some(entry),
        })
    }
}

impl<T> Deref for CacheGuard<'_, T> {
    type Target = T;
    #[inline]
    fn deref(&self) -> &T {
        // Invariant: `entry` is Some until drop.
        self.entry.as_ref().unwrap()
    }
}

impl<T> DerefMut for CacheGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        self.entry.as_mut().unwrap()
    }
}

impl<T> Drop for CacheGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            // The entry came from this cache, so release cannot fail.
            let _ = self.cache.borrow_mut().release(entry);
        }
    }
}

/// Zero-overhead cache for kinds that are trivial to construct.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrivialCache<T>(std::marker::PhantomData<T>);

impl<T: Default> TrivialCache<T> {
    /// A fresh default value; nothing is tracked.
    #[inline]
    pub fn acquire(&self) -> T {
        T::default()
    }

    /// No-op.
    #[inline]
    pub fn release(&self, _value: T) {}
}
