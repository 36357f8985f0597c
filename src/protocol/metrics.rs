use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide control-protocol counters, kept without external dependencies.
pub(crate) struct Metrics;

static COMMANDS_SENT: AtomicU64 = AtomicU64::new(0);
static ACKS_RECEIVED: AtomicU64 = AtomicU64::new(0);
static NAKS_RECEIVED: AtomicU64 = AtomicU64::new(0);
static FATAL_ERRORS: AtomicU64 = AtomicU64::new(0);
static SEGMENTS_SENT: AtomicU64 = AtomicU64::new(0);
static SEGMENTS_RECEIVED: AtomicU64 = AtomicU64::new(0);
static FRAMES_SENT: AtomicU64 = AtomicU64::new(0);
static FRAMES_RECEIVED: AtomicU64 = AtomicU64::new(0);
static DIAGNOSTICS: AtomicU64 = AtomicU64::new(0);

impl Metrics {
    #[inline]
    pub(crate) fn record_command() {
        COMMANDS_SENT.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_ack() {
        ACKS_RECEIVED.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_nak() {
        NAKS_RECEIVED.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_fatal() {
        FATAL_ERRORS.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_segments_sent(count: usize) {
        SEGMENTS_SENT.fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_segment_received() {
        SEGMENTS_RECEIVED.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_frame_sent() {
        FRAMES_SENT.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_frame_received() {
        FRAMES_RECEIVED.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_diagnostics(count: usize) {
        DIAGNOSTICS.fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn totals() -> MetricsSnapshot {
        MetricsSnapshot {
            commands_sent: COMMANDS_SENT.load(Ordering::Relaxed),
            acks_received: ACKS_RECEIVED.load(Ordering::Relaxed),
            naks_received: NAKS_RECEIVED.load(Ordering::Relaxed),
            fatal_errors: FATAL_ERRORS.load(Ordering::Relaxed),
            segments_sent: SEGMENTS_SENT.load(Ordering::Relaxed),
            segments_received: SEGMENTS_RECEIVED.load(Ordering::Relaxed),
            frames_sent: FRAMES_SENT.load(Ordering::Relaxed),
            frames_received: FRAMES_RECEIVED.load(Ordering::Relaxed),
            diagnostics: DIAGNOSTICS.load(Ordering::Relaxed),
        }
    }
}

/// Lightweight snapshot of the protocol counters.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct MetricsSnapshot {
    pub commands_sent: u64,
    pub acks_received: u64,
    pub naks_received: u64,
    pub fatal_errors: u64,
    pub segments_sent: u64,
    pub segments_received: u64,
    pub frames_sent: u64,
    pub frames_received: u64,
    pub diagnostics: u64,
}

impl MetricsSnapshot {
    /// Fraction of answered commands that were rejected.
    #[must_use]
    pub fn nak_ratio(&self) -> Option<f64> {
        let answered = self.acks_received + self.naks_received;
        if answered == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        Some(self.naks_received as f64 / answered as f64)
    }
}

/// Read the current process-wide counters.
#[must_use]
pub fn metrics_snapshot() -> MetricsSnapshot {
    Metrics::totals()
}
