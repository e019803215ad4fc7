//! Lazy scans over a world-state snapshot.
//!
//! A scan owns an `Arc` of the snapshot it was opened on plus a
//! [`ScanGuard`] registered with the backend. The guard is released as soon
//! as the scan is exhausted, dropped, or closed, so `open_scans()` on the
//! backend always reflects the scans still in flight.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::types::{Revision, VersionedValue};

/// Registration of one open scan with its backend.
#[derive(Debug)]
pub struct ScanGuard {
    counter: Arc<AtomicUsize>,
}

impl ScanGuard {
    pub(crate) fn acquire(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self {
            counter: Arc::clone(counter),
        }
    }
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Range scan over live values, in lexicographic key order.
///
/// Finite and non-restartable: once `next()` returns `None` the scan stays
/// exhausted.
pub struct StateScan {
    snapshot: Arc<BTreeMap<String, VersionedValue>>,
    cursor: Bound<String>,
    end: Bound<String>,
    strip: usize,
    guard: Option<ScanGuard>,
}

impl StateScan {
    /// Scan `[start, end)`; an empty string leaves that side unbounded.
    pub(crate) fn new(
        snapshot: Arc<BTreeMap<String, VersionedValue>>,
        start: &str,
        end: &str,
        guard: ScanGuard,
    ) -> Self {
        let cursor = if start.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Included(start.to_string())
        };
        let end_bound = if end.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(end.to_string())
        };
        let empty = !start.is_empty() && !end.is_empty() && start >= end;

        Self {
            snapshot,
            cursor,
            end: end_bound,
            strip: 0,
            guard: (!empty).then_some(guard),
        }
    }

    /// Strip a fixed-length prefix from every yielded key.
    pub fn strip_prefix(mut self, len: usize) -> Self {
        self.strip = len;
        self
    }

    /// Whether the scan still holds its backend registration.
    pub fn is_open(&self) -> bool {
        self.guard.is_some()
    }

    /// Release the scan before exhaustion.
    pub fn close(self) {}
}

impl Iterator for StateScan {
    type Item = (String, VersionedValue);

    fn next(&mut self) -> Option<Self::Item> {
        self.guard.as_ref()?;

        let next = self
            .snapshot
            .range::<String, _>((self.cursor.clone(), self.end.clone()))
            .next()
            .map(|(k, v)| (k.clone(), v.clone()));

        match next {
            Some((key, value)) => {
                let visible = key.get(self.strip..).unwrap_or_default().to_string();
                self.cursor = Bound::Excluded(key);
                Some((visible, value))
            }
            None => {
                self.guard = None;
                None
            }
        }
    }
}

impl std::fmt::Debug for StateScan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateScan")
            .field("cursor", &self.cursor)
            .field("end", &self.end)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Revision log of one key, earliest first.
pub struct HistoryScan {
    revisions: Arc<Vec<Revision>>,
    position: usize,
    guard: Option<ScanGuard>,
}

impl HistoryScan {
    pub(crate) fn new(revisions: Arc<Vec<Revision>>, guard: ScanGuard) -> Self {
        Self {
            revisions,
            position: 0,
            guard: Some(guard),
        }
    }

    pub fn is_open(&self) -> bool {
        self.guard.is_some()
    }

    pub fn close(self) {}
}

impl Iterator for HistoryScan {
    type Item = Revision;

    fn next(&mut self) -> Option<Self::Item> {
        self.guard.as_ref()?;

        match self.revisions.get(self.position) {
            Some(revision) => {
                self.position += 1;
                Some(revision.clone())
            }
            None => {
                self.guard = None;
                None
            }
        }
    }
}

impl std::fmt::Debug for HistoryScan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryScan")
            .field("position", &self.position)
            .field("len", &self.revisions.len())
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsr_types::{TemporalAnchor, TxId};

    fn value(n: u64) -> VersionedValue {
        VersionedValue {
            value: n.to_string().into_bytes(),
            version: n,
            tx_id: TxId::new(),
        }
    }

    fn snapshot(keys: &[&str]) -> Arc<BTreeMap<String, VersionedValue>> {
        Arc::new(
            keys.iter()
                .enumerate()
                .map(|(i, k)| (k.to_string(), value(i as u64 + 1)))
                .collect(),
        )
    }

    #[test]
    fn yields_keys_in_order_and_releases_guard() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scan = StateScan::new(
            snapshot(&["c", "a", "b"]),
            "",
            "",
            ScanGuard::acquire(&counter),
        );
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let keys: Vec<String> = scan.by_ref().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert!(!scan.is_open());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(scan.next().is_none());
    }

    #[test]
    fn bounds_are_half_open() {
        let counter = Arc::new(AtomicUsize::new(0));
        let scan = StateScan::new(
            snapshot(&["a", "b", "c", "d"]),
            "b",
            "d",
            ScanGuard::acquire(&counter),
        );
        let keys: Vec<String> = scan.map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "c"]);
    }

    #[test]
    fn inverted_range_is_empty() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scan = StateScan::new(snapshot(&["a", "z"]), "z", "a", ScanGuard::acquire(&counter));
        assert!(scan.next().is_none());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn early_drop_releases_guard() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let mut scan = StateScan::new(
                snapshot(&["a", "b"]),
                "",
                "",
                ScanGuard::acquire(&counter),
            );
            assert!(scan.next().is_some());
            assert_eq!(counter.load(Ordering::SeqCst), 1);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn strip_prefix_hides_namespace() {
        let counter = Arc::new(AtomicUsize::new(0));
        let scan = StateScan::new(
            snapshot(&["ns\0k1", "ns\0k2"]),
            "",
            "",
            ScanGuard::acquire(&counter),
        )
        .strip_prefix(3);
        let keys: Vec<String> = scan.map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["k1", "k2"]);
    }

    #[test]
    fn history_scan_in_order() {
        let counter = Arc::new(AtomicUsize::new(0));
        let revisions = Arc::new(vec![
            Revision {
                tx_id: TxId::new(),
                block: 1,
                timestamp: TemporalAnchor::new(1, 0, 0),
                value: Some(b"1".to_vec()),
            },
            Revision {
                tx_id: TxId::new(),
                block: 2,
                timestamp: TemporalAnchor::new(2, 0, 0),
                value: None,
            },
        ]);
        let scan = HistoryScan::new(revisions, ScanGuard::acquire(&counter));
        let blocks: Vec<u64> = scan.map(|r| r.block).collect();
        assert_eq!(blocks, vec![1, 2]);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn close_releases_guard() {
        let counter = Arc::new(AtomicUsize::new(0));
        let scan = HistoryScan::new(Arc::new(vec![]), ScanGuard::acquire(&counter));
        scan.close();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
