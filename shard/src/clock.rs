//! Monotonic timing shared by the sequencer, the handler, and the latency
//! histograms. `spec.md` §9 requires a monotonic, high-resolution clock for
//! every latency measurement; wall-clock time is reserved for the
//! client-visible `timestamp` field only.

use quanta::Clock;

/// Nanosecond-precision monotonic clock, cheap to clone and share across
/// producer and consumer threads.
#[derive(Clone)]
pub struct MonotonicClock {
    inner: Clock,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { inner: Clock::new() }
    }

    /// Nanoseconds since an arbitrary, process-local epoch. Only valid for
    /// computing deltas between two calls on the same clock instance.
    #[inline]
    pub fn now_ns(&self) -> u64 {
        self.inner.raw() as u64
    }

    /// Duration in seconds between two `now_ns()` readings, for histogram
    /// observation (the `metrics` histograms are all in seconds).
    #[inline]
    pub fn delta_seconds(&self, start: u64, end: u64) -> f64 {
        self.inner.delta(start, end).as_secs_f64()
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Wall-clock milliseconds since the Unix epoch, used only for the
/// client-visible `timestamp` field in ingress responses.
pub fn wall_clock_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
