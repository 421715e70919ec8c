use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Recyclable short identifiers for remote bindings.
///
/// Issues `_aa` through `_zz`, 676 names in total. A name is either free in the
/// pool or checked out by exactly one live [`Remote`](crate::Remote),
/// never both. Cloning yields a handle to the same underlying pool; share
/// one handle across sessions to keep names unique process-wide.
#[derive(Clone)]
pub struct NamePool {
    inner: Arc<Mutex<VecDeque<String>>>,
}

impl NamePool {
    /// Total number of candidate names.
    pub const CAPACITY: usize = 26 * 26;

    /// A pool with every name free.
    pub fn new() -> Self {
        let names = ('a'..='z')
            .flat_map(|x| ('a'..='z').map(move |y| format!("_{x}{y}")))
            .collect();
        Self {
            inner: Arc::new(Mutex::new(names)),
        }
    }

    /// Check out the next free name, or `None` if the pool is exhausted.
    pub fn checkout(&self) -> Option<String> {
        self.lock().pop_front()
    }

    /// Return a name to the pool.
    pub fn release(&self, name: String) {
        self.lock().push_back(name);
    }

    /// Number of names currently free.
    pub fn available(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<String>> {
        // The pool holds plain strings; a panic mid-operation cannot leave
        // them in an inconsistent state, so poisoning is recoverable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for NamePool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NamePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamePool")
            .field("available", &self.available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_full_with_expected_spelling() {
        let pool = NamePool::new();
        assert_eq!(pool.available(), NamePool::CAPACITY);
        assert_eq!(pool.checkout().as_deref(), Some("_aa"));
        assert_eq!(pool.checkout().as_deref(), Some("_ab"));
    }

    #[test]
    fn exhaustion_and_recycle() {
        let pool = NamePool::new();
        let mut names = Vec::new();
        while let Some(name) = pool.checkout() {
            names.push(name);
        }
        assert_eq!(names.len(), NamePool::CAPACITY);
        assert!(pool.checkout().is_none());

        pool.release(names.pop().expect("names should not be empty"));
        assert_eq!(pool.available(), 1);
        assert!(pool.checkout().is_some());
        assert!(pool.checkout().is_none());
    }

    #[test]
    fn clones_share_state() {
        let pool = NamePool::new();
        let other = pool.clone();
        let name = pool.checkout().expect("pool should have names");
        assert_eq!(other.available(), NamePool::CAPACITY - 1);
        other.release(name);
        assert_eq!(pool.available(), NamePool::CAPACITY);
    }
}
