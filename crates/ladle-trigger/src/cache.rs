//! The CompletionCache: the trigger's at-most-once forwarding guard.
//!
//! A process-local map of `date -> set<event>` behind a mutex so the
//! check-and-insert is atomic per `(date, event)`. Deliberately not
//! durable: losing it on restart means at worst a duplicate forward,
//! which downstream stages already tolerate via their manifests. The
//! `/purge` control empties it so an operator can re-drive a date.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use ladle_core::EventKind;

/// In-memory set of `(date, event)` pairs already routed.
#[derive(Debug, Default)]
pub struct CompletionCache {
    inner: Mutex<HashMap<String, HashSet<EventKind>>>,
}

impl CompletionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically records `(date, event)`.
    ///
    /// Returns `true` when the pair is fresh (the caller should forward)
    /// and `false` when it was already present (duplicate; ignore).
    ///
    /// # Panics
    ///
    /// Panics if the interior lock is poisoned.
    pub fn insert(&self, date: &str, event: EventKind) -> bool {
        self.inner
            .lock()
            .expect("completion cache lock poisoned")
            .entry(date.to_string())
            .or_default()
            .insert(event)
    }

    /// Empties the cache.
    ///
    /// # Panics
    ///
    /// Panics if the interior lock is poisoned.
    pub fn purge(&self) {
        self.inner
            .lock()
            .expect("completion cache lock poisoned")
            .clear();
    }

    /// Returns the number of dates with at least one recorded event.
    ///
    /// # Panics
    ///
    /// Panics if the interior lock is poisoned.
    #[must_use]
    pub fn dates(&self) -> usize {
        self.inner
            .lock()
            .expect("completion cache lock poisoned")
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_insert_is_fresh_second_is_duplicate() {
        let cache = CompletionCache::new();

        assert!(cache.insert("2025-03-30", EventKind::CleanerCompleted));
        assert!(!cache.insert("2025-03-30", EventKind::CleanerCompleted));
    }

    #[test]
    fn dedup_is_per_date_and_per_event() {
        let cache = CompletionCache::new();

        assert!(cache.insert("2025-03-30", EventKind::CleanerCompleted));
        assert!(cache.insert("2025-03-30", EventKind::ExtractorCompleted));
        assert!(cache.insert("2025-03-31", EventKind::CleanerCompleted));
    }

    #[test]
    fn purge_forgets_everything() {
        let cache = CompletionCache::new();
        cache.insert("2025-03-30", EventKind::LoaderParquetCompleted);
        assert_eq!(cache.dates(), 1);

        cache.purge();
        assert_eq!(cache.dates(), 0);
        assert!(cache.insert("2025-03-30", EventKind::LoaderParquetCompleted));
    }

    #[test]
    fn check_and_insert_is_atomic_across_threads() {
        use std::sync::Arc;

        let cache = Arc::new(CompletionCache::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(std::thread::spawn(move || {
                usize::from(cache.insert("2025-03-30", EventKind::CleanerCompleted))
            }));
        }

        let fresh: usize = handles.into_iter().map(|h| h.join().expect("join")).sum();
        assert_eq!(fresh, 1, "exactly one thread may win the insert");
    }
}
