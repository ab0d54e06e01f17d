//! Per-chapter transition records for the presentation layer.
//!
//! Transitions live outside [`PipelineState`](crate::core::state::PipelineState):
//! they survive stage boundaries but not restarts, and are never checkpointed.

use crate::core::checkpoint::Record;
use log::debug;
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};

static GLOBAL: OnceLock<TransitionsCache> = OnceLock::new();

/// Thread-safe store of transition records.
///
/// Position `i` holds the transition from chapter `i` to chapter `i + 1`.
/// Every operation takes the one internal lock just long enough to swap or
/// clone an `Arc`; record copies happen outside it.
#[derive(Debug, Default)]
pub struct TransitionsCache {
    inner: Mutex<Arc<Vec<Record>>>,
}

impl TransitionsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache.
    pub fn global() -> &'static TransitionsCache {
        GLOBAL.get_or_init(TransitionsCache::new)
    }

    /// Replaces the whole contents. An empty input empties the cache.
    pub fn store(&self, transitions: impl Into<Vec<Record>>) {
        let next = Arc::new(transitions.into());
        debug!("Storing {} transitions", next.len());
        let previous = std::mem::replace(&mut *self.inner.lock(), next);
        drop(previous);
    }

    pub fn fetch_all(&self) -> Vec<Record> {
        let current = self.snapshot();
        current.as_ref().clone()
    }

    pub fn has_any(&self) -> bool {
        !self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        let previous = std::mem::take(&mut *self.inner.lock());
        drop(previous);
    }

    /// Transition leading into human-facing chapter number `chapter`
    /// (1-based): the record at `chapter - 1`. Out of range yields `None`.
    pub fn fetch_for_chapter(&self, chapter: i64) -> Option<Record> {
        let index = usize::try_from(chapter.checked_sub(1)?).ok()?;
        self.snapshot().get(index).cloned()
    }

    fn snapshot(&self) -> Arc<Vec<Record>> {
        self.inner.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::thread;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    fn batch(tag: i64, len: usize) -> Vec<Record> {
        (0..len)
            .map(|i| record(json!({"batch": tag, "pos": i})))
            .collect()
    }

    #[test]
    fn test_lifecycle() {
        let cache = TransitionsCache::new();
        assert!(!cache.has_any());

        cache.store(vec![
            record(json!({"a": 1})),
            record(json!({"a": 2})),
            record(json!({"a": 3})),
        ]);
        assert!(cache.has_any());
        assert_eq!(cache.fetch_for_chapter(2), Some(record(json!({"a": 2}))));
        assert_eq!(cache.fetch_for_chapter(0), None);

        cache.clear();
        assert!(!cache.has_any());
        assert!(cache.fetch_all().is_empty());
    }

    #[test]
    fn test_one_based_lookup_bounds() {
        let cache = TransitionsCache::new();
        let items = batch(1, 4);
        cache.store(items.as_slice());

        assert_eq!(cache.fetch_for_chapter(1).as_ref(), items.first());
        assert_eq!(cache.fetch_for_chapter(4).as_ref(), items.last());
        assert_eq!(cache.fetch_for_chapter(5), None);
        assert_eq!(cache.fetch_for_chapter(0), None);
        assert_eq!(cache.fetch_for_chapter(-3), None);
        assert_eq!(cache.fetch_for_chapter(i64::MIN), None);
    }

    #[test]
    fn test_store_replaces_and_copies_in() {
        let cache = TransitionsCache::new();
        cache.store(batch(1, 3));
        assert_eq!(cache.fetch_all().len(), 3);

        let mut input = batch(2, 2);
        cache.store(input.as_slice());
        input.push(record(json!({"late": true})));
        input[0].insert("mutated".into(), json!(true));

        assert_eq!(cache.fetch_all(), batch(2, 2));

        cache.store(Vec::new());
        assert!(!cache.has_any());
    }

    #[test]
    fn test_fetch_copies_out() {
        let cache = TransitionsCache::new();
        cache.store(batch(1, 2));

        let mut out = cache.fetch_all();
        out.clear();
        let mut one = cache.fetch_for_chapter(1).unwrap();
        one.insert("mutated".into(), json!(true));

        assert_eq!(cache.fetch_all(), batch(1, 2));

        let before = cache.fetch_all();
        cache.store(batch(3, 1));
        assert_eq!(before, batch(1, 2));
    }

    #[test]
    fn test_concurrent_reads_are_never_torn() {
        let cache = Arc::new(TransitionsCache::new());
        let batches: Vec<Vec<Record>> = (0..4).map(|t| batch(t, 3 + t as usize)).collect();

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let cache = Arc::clone(&cache);
                let batches = batches.clone();
                thread::spawn(move || {
                    for i in 0..500 {
                        match (worker + i) % 4 {
                            0 => cache.store(batches[(worker * 7 + i / 4) % batches.len()].as_slice()),
                            1 => cache.clear(),
                            _ => {
                                let seen = cache.fetch_all();
                                assert!(
                                    seen.is_empty() || batches.contains(&seen),
                                    "torn read: {:?}",
                                    seen
                                );
                                let _ = cache.fetch_for_chapter(2);
                                let _ = cache.has_any();
                            }
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_global_is_shared() {
        assert!(std::ptr::eq(TransitionsCache::global(), TransitionsCache::global()));
    }
}
