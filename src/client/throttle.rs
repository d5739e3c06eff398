//! Fixed-cadence send throttle driven by frame time

/// 20 updates per second
pub const SEND_INTERVAL_SECS: f32 = 0.05;

/// Elapsed-time accumulator; fires at most once per call and starts over
/// from zero afterwards.
#[derive(Debug, Clone)]
pub struct OutboundThrottle {
    interval: f32,
    elapsed: f32,
}

impl Default for OutboundThrottle {
    fn default() -> Self {
        Self::new(SEND_INTERVAL_SECS)
    }
}

impl OutboundThrottle {
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            elapsed: 0.0,
        }
    }

    /// Advance by `dt` seconds; true when an update is due
    pub fn tick(&mut self, dt: f32) -> bool {
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt;
        }
        if self.elapsed >= self.interval {
            self.elapsed = 0.0;
            true
        } else {
            false
        }
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }
}
