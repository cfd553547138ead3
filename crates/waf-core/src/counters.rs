//! Process-wide atomic statistics (§3, §5).
//!
//! These are the only state shared across requests without going through a
//! `RuleEngine` reload. They never reset and require no read barrier —
//! `fetch_add` with `Relaxed` ordering is sufficient since nothing else
//! synchronizes on their value.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Counters {
    pub request_matched: AtomicU64,
    pub request_logged: AtomicU64,
    pub request_allowed: AtomicU64,
    pub request_blocked: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            request_matched: self.request_matched.load(Ordering::Relaxed),
            request_logged: self.request_logged.load(Ordering::Relaxed),
            request_allowed: self.request_allowed.load(Ordering::Relaxed),
            request_blocked: self.request_blocked.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn incr_matched(&self) {
        self.request_matched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_logged(&self) {
        self.request_logged.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_allowed(&self) {
        self.request_allowed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_blocked(&self) {
        self.request_blocked.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time read of the four counters, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CountersSnapshot {
    pub request_matched: u64,
    pub request_logged: u64,
    pub request_allowed: u64,
    pub request_blocked: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let c = Counters::new();
        assert_eq!(c.snapshot(), CountersSnapshot::default());
    }

    #[test]
    fn counters_accumulate() {
        let c = Counters::new();
        c.incr_matched();
        c.incr_matched();
        c.incr_blocked();
        let snap = c.snapshot();
        assert_eq!(snap.request_matched, 2);
        assert_eq!(snap.request_blocked, 1);
        assert_eq!(snap.request_allowed, 0);
    }
}
