//! Discovery event deduplication

use std::collections::HashSet;

/// Entries above which the whole set is dropped
const MAX_TRACKED_EVENTS: usize = 10_000;

/// Bounded-but-lossy membership set gating reprocessing of discovery events.
///
/// Once more than [`MAX_TRACKED_EVENTS`] identifiers are tracked the set is
/// cleared entirely rather than LRU-evicted, trading exactness for a fixed
/// memory ceiling. Very old identifiers can therefore be processed again
/// after a reset. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn mark_seen(&mut self, id: impl Into<String>) {
        self.seen.insert(id.into());
        if self.seen.len() > MAX_TRACKED_EVENTS {
            self.seen = HashSet::new();
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_then_seen() {
        let mut dedup = Deduplicator::new();
        assert!(!dedup.seen("sig-1"));
        dedup.mark_seen("sig-1");
        assert!(dedup.seen("sig-1"));
        assert!(!dedup.seen("sig-2"));
    }

    #[test]
    fn test_full_reset_past_threshold() {
        let mut dedup = Deduplicator::new();
        dedup.mark_seen("early");
        for i in 0..MAX_TRACKED_EVENTS {
            dedup.mark_seen(format!("sig-{}", i));
        }
        // The insert that crossed the threshold wiped everything
        assert!(dedup.is_empty());
        assert!(!dedup.seen("early"));
        assert!(!dedup.seen("sig-0"));

        // The set keeps working after the reset
        dedup.mark_seen("later");
        assert!(dedup.seen("later"));
    }
}
