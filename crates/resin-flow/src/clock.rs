//! Phase clock.
//!
//! Elapsed time is always `now - origin` over absolute host timestamps, never
//! a running sum of frame deltas, so dropped or paused frames cannot make the
//! phase timing drift.

/// Tracks the time since the current phase began.
///
/// Timestamps are milliseconds from the host's monotonic source. Until the
/// first timestamp is observed the clock has no origin; a restart requested
/// before then takes effect at the first observation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseClock {
    origin: Option<f64>,
    now: Option<f64>,
}

impl PhaseClock {
    /// Creates a clock that starts at the first observed timestamp.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a host timestamp and returns the delta since the previous one.
    ///
    /// A timestamp earlier than the last one is treated as the last one;
    /// a non-finite timestamp is ignored.
    pub fn observe(&mut self, now_ms: f64) -> f64 {
        if !now_ms.is_finite() {
            return 0.0;
        }
        let now = match self.now {
            Some(prev) if now_ms < prev => prev,
            _ => now_ms,
        };
        let delta = self.now.map_or(0.0, |prev| now - prev);
        self.now = Some(now);
        if self.origin.is_none() {
            self.origin = Some(now);
        }
        delta
    }

    /// Restarts the phase at the last observed timestamp.
    pub fn restart(&mut self) {
        self.origin = self.now;
    }

    /// Restarts the phase at an explicit timestamp.
    pub fn set_origin(&mut self, origin_ms: f64) {
        self.origin = Some(origin_ms);
    }

    /// Timestamp the current phase started at, if known.
    pub fn origin(&self) -> Option<f64> {
        self.origin
    }

    /// Last observed timestamp, if any.
    pub fn now(&self) -> Option<f64> {
        self.now
    }

    /// Milliseconds since the phase started (0 before the first observation).
    pub fn elapsed_ms(&self) -> f64 {
        match (self.origin, self.now) {
            (Some(origin), Some(now)) => (now - origin).max(0.0),
            _ => 0.0,
        }
    }
}
