//! Request-scoped cancellation for shard workers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Raises its flag when dropped.
///
/// Held by the search future; if the caller drops the future mid-search,
/// the blocking shard workers see the flag and stop scanning.
#[derive(Debug)]
pub struct InterruptOnDrop {
    flag: Arc<AtomicBool>,
}

impl InterruptOnDrop {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared handle to the flag.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

impl Default for InterruptOnDrop {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InterruptOnDrop {
    fn drop(&mut self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

/// True if any of `flags` is raised.
#[inline]
pub(crate) fn any_raised(flags: &[Arc<AtomicBool>]) -> bool {
    flags.iter().any(|f| f.load(Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_raises_flag() {
        let guard = InterruptOnDrop::new();
        let flag = guard.flag();
        assert!(!flag.load(Ordering::Relaxed));
        drop(guard);
        assert!(flag.load(Ordering::Relaxed));
    }

    #[test]
    fn test_any_raised() {
        let a = Arc::new(AtomicBool::new(false));
        let b = Arc::new(AtomicBool::new(false));
        assert!(!any_raised(&[a.clone(), b.clone()]));
        b.store(true, Ordering::Relaxed);
        assert!(any_raised(&[a, b]));
    }
}
