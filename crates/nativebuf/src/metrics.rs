//! Atomic counters for buffer observability.
//!
//! All counters use relaxed ordering; they are advisory/diagnostic,
//! not synchronization primitives.

use std::sync::atomic::{AtomicU64, Ordering};

use nativebuf_core::MoveRoute;

/// Global buffer operation counters.
pub struct BufferMetrics {
    /// Successful `initialize` calls.
    pub initializations: AtomicU64,
    /// Single-value reads.
    pub typed_reads: AtomicU64,
    /// Single-value writes.
    pub typed_writes: AtomicU64,
    /// Array and span reads.
    pub array_reads: AtomicU64,
    /// Array and span writes.
    pub array_writes: AtomicU64,
    /// Accesses refused by the bounds check.
    pub bounds_rejections: AtomicU64,
    /// Pins taken (guards and explicit add-refs).
    pub pins_acquired: AtomicU64,
    /// Pins returned.
    pub pins_released: AtomicU64,
    /// Releases with no outstanding pin.
    pub release_underflows: AtomicU64,
    /// Handles closed by their owner.
    pub handles_closed: AtomicU64,
    /// Native regions returned to their provider.
    pub regions_freed: AtomicU64,
    /// Moves that took the blocked fast path.
    pub blocked_moves: AtomicU64,
    /// Moves that fell back to the platform memmove.
    pub fallback_moves: AtomicU64,
    /// Total bytes moved.
    pub bytes_moved: AtomicU64,
}

impl BufferMetrics {
    /// Create a new zeroed metrics instance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            initializations: AtomicU64::new(0),
            typed_reads: AtomicU64::new(0),
            typed_writes: AtomicU64::new(0),
            array_reads: AtomicU64::new(0),
            array_writes: AtomicU64::new(0),
            bounds_rejections: AtomicU64::new(0),
            pins_acquired: AtomicU64::new(0),
            pins_released: AtomicU64::new(0),
            release_underflows: AtomicU64::new(0),
            handles_closed: AtomicU64::new(0),
            regions_freed: AtomicU64::new(0),
            blocked_moves: AtomicU64::new(0),
            fallback_moves: AtomicU64::new(0),
            bytes_moved: AtomicU64::new(0),
        }
    }

    /// Increment a counter by 1.
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read a counter value.
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    /// Count one move of `len` bytes along `route`.
    pub fn record_move(&self, route: MoveRoute, len: usize) {
        match route {
            MoveRoute::Empty => return,
            MoveRoute::Blocked => Self::inc(&self.blocked_moves),
            MoveRoute::Fallback => Self::inc(&self.fallback_moves),
        }
        self.bytes_moved.fetch_add(len as u64, Ordering::Relaxed);
    }

    /// Snapshot all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            initializations: Self::get(&self.initializations),
            typed_reads: Self::get(&self.typed_reads),
            typed_writes: Self::get(&self.typed_writes),
            array_reads: Self::get(&self.array_reads),
            array_writes: Self::get(&self.array_writes),
            bounds_rejections: Self::get(&self.bounds_rejections),
            pins_acquired: Self::get(&self.pins_acquired),
            pins_released: Self::get(&self.pins_released),
            release_underflows: Self::get(&self.release_underflows),
            handles_closed: Self::get(&self.handles_closed),
            regions_freed: Self::get(&self.regions_freed),
            blocked_moves: Self::get(&self.blocked_moves),
            fallback_moves: Self::get(&self.fallback_moves),
            bytes_moved: Self::get(&self.bytes_moved),
        }
    }
}

impl Default for BufferMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time snapshot of all buffer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub initializations: u64,
    pub typed_reads: u64,
    pub typed_writes: u64,
    pub array_reads: u64,
    pub array_writes: u64,
    pub bounds_rejections: u64,
    pub pins_acquired: u64,
    pub pins_released: u64,
    pub release_underflows: u64,
    pub handles_closed: u64,
    pub regions_freed: u64,
    pub blocked_moves: u64,
    pub fallback_moves: u64,
    pub bytes_moved: u64,
}

/// Global metrics instance.
static GLOBAL_METRICS: BufferMetrics = BufferMetrics::new();

/// Access the global metrics singleton.
#[must_use]
pub fn global_metrics() -> &'static BufferMetrics {
    &GLOBAL_METRICS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let m = BufferMetrics::new();
        assert_eq!(m.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn increment_works() {
        let m = BufferMetrics::new();
        BufferMetrics::inc(&m.typed_reads);
        BufferMetrics::inc(&m.typed_reads);
        BufferMetrics::inc(&m.pins_acquired);
        let snap = m.snapshot();
        assert_eq!(snap.typed_reads, 2);
        assert_eq!(snap.pins_acquired, 1);
    }

    #[test]
    fn record_move_splits_by_route() {
        let m = BufferMetrics::new();
        m.record_move(MoveRoute::Blocked, 64);
        m.record_move(MoveRoute::Fallback, 10);
        m.record_move(MoveRoute::Empty, 0);
        let snap = m.snapshot();
        assert_eq!(snap.blocked_moves, 1);
        assert_eq!(snap.fallback_moves, 1);
        assert_eq!(snap.bytes_moved, 74);
    }
}
