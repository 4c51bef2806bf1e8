//! Lightweight global metrics for the history subsystem.
//!
//! Потокобезопасные атомарные счётчики:
//! - captures / highlights / capture failures
//! - restores / stale restores / host events suppressed during restore
//! - toggles / clears

use std::sync::atomic::{AtomicU64, Ordering};

// ----- Capture -----
static CAPTURES_TOTAL: AtomicU64 = AtomicU64::new(0);
static THUMBNAIL_BYTES: AtomicU64 = AtomicU64::new(0);
static HIGHLIGHTS_TOTAL: AtomicU64 = AtomicU64::new(0);
static CAPTURE_FAILURES: AtomicU64 = AtomicU64::new(0);

// ----- Restore -----
static RESTORES_TOTAL: AtomicU64 = AtomicU64::new(0);
static RESTORES_STALE: AtomicU64 = AtomicU64::new(0);
static EVENTS_SUPPRESSED: AtomicU64 = AtomicU64::new(0);

// ----- Panel / store -----
static TOGGLES_TOTAL: AtomicU64 = AtomicU64::new(0);
static CLEARS_TOTAL: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    pub captures_total: u64,
    pub thumbnail_bytes: u64,
    pub highlights_total: u64,
    pub capture_failures: u64,

    pub restores_total: u64,
    pub restores_stale: u64,
    pub events_suppressed: u64,

    pub toggles_total: u64,
    pub clears_total: u64,
}

impl MetricsSnapshot {
    /// Share of host events that hit an existing snapshot.
    pub fn dedup_ratio(&self) -> f64 {
        let total = self.captures_total + self.highlights_total;
        if total == 0 {
            0.0
        } else {
            self.highlights_total as f64 / total as f64
        }
    }

    /// Counters accumulated since `earlier` (saturating; counters are global).
    pub fn delta(&self, earlier: &MetricsSnapshot) -> MetricsSnapshot {
        MetricsSnapshot {
            captures_total: self.captures_total.saturating_sub(earlier.captures_total),
            thumbnail_bytes: self.thumbnail_bytes.saturating_sub(earlier.thumbnail_bytes),
            highlights_total: self.highlights_total.saturating_sub(earlier.highlights_total),
            capture_failures: self.capture_failures.saturating_sub(earlier.capture_failures),

            restores_total: self.restores_total.saturating_sub(earlier.restores_total),
            restores_stale: self.restores_stale.saturating_sub(earlier.restores_stale),
            events_suppressed: self.events_suppressed.saturating_sub(earlier.events_suppressed),

            toggles_total: self.toggles_total.saturating_sub(earlier.toggles_total),
            clears_total: self.clears_total.saturating_sub(earlier.clears_total),
        }
    }
}

// ----- Recorders (Capture) -----
pub fn record_capture(thumbnail_len: usize) {
    CAPTURES_TOTAL.fetch_add(1, Ordering::Relaxed);
    THUMBNAIL_BYTES.fetch_add(thumbnail_len as u64, Ordering::Relaxed);
}

pub fn record_highlight() {
    HIGHLIGHTS_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn record_capture_failure() {
    CAPTURE_FAILURES.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (Restore) -----
pub fn record_restore() {
    RESTORES_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn record_restore_stale() {
    RESTORES_STALE.fetch_add(1, Ordering::Relaxed);
}

pub fn record_event_suppressed() {
    EVENTS_SUPPRESSED.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (Panel / store) -----
pub fn record_toggle() {
    TOGGLES_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn record_clear() {
    CLEARS_TOTAL.fetch_add(1, Ordering::Relaxed);
}

// ----- Snapshot / Reset -----
pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        captures_total: CAPTURES_TOTAL.load(Ordering::Relaxed),
        thumbnail_bytes: THUMBNAIL_BYTES.load(Ordering::Relaxed),
        highlights_total: HIGHLIGHTS_TOTAL.load(Ordering::Relaxed),
        capture_failures: CAPTURE_FAILURES.load(Ordering::Relaxed),

        restores_total: RESTORES_TOTAL.load(Ordering::Relaxed),
        restores_stale: RESTORES_STALE.load(Ordering::Relaxed),
        events_suppressed: EVENTS_SUPPRESSED.load(Ordering::Relaxed),

        toggles_total: TOGGLES_TOTAL.load(Ordering::Relaxed),
        clears_total: CLEARS_TOTAL.load(Ordering::Relaxed),
    }
}

pub fn reset() {
    CAPTURES_TOTAL.store(0, Ordering::Relaxed);
    THUMBNAIL_BYTES.store(0, Ordering::Relaxed);
    HIGHLIGHTS_TOTAL.store(0, Ordering::Relaxed);
    CAPTURE_FAILURES.store(0, Ordering::Relaxed);

    RESTORES_TOTAL.store(0, Ordering::Relaxed);
    RESTORES_STALE.store(0, Ordering::Relaxed);
    EVENTS_SUPPRESSED.store(0, Ordering::Relaxed);

    TOGGLES_TOTAL.store(0, Ordering::Relaxed);
    CLEARS_TOTAL.store(0, Ordering::Relaxed);
}
