//! Clock synchronization between the authority and the other peers.
//!
//! The authority publishes a [`SyncPoint`] whenever playback jumps: on
//! start, loop, seek, pause or speed change. Followers extrapolate it with
//! the server clock and seek whenever their own backend drifts further than
//! the tolerance from the prediction.
//!
//! Sync points taken from a backend position are shifted back by the
//! standard delay. That constant accounts for the time a follower's
//! backend needs before it actually renders what it was told to show, and
//! is applied in exactly one place so every peer compensates the same way.

use std::time::Duration;

use crate::state::SyncPoint;

#[derive(Clone, Debug)]
pub struct ClockSync {
    frequency: Duration,
    tolerance: f64,
    standard_delay: f64,
    last_sync: Option<Duration>,
}

impl ClockSync {
    #[must_use]
    pub fn new(frequency: Duration, tolerance: f64, standard_delay: f64) -> Self {
        Self {
            frequency,
            tolerance,
            standard_delay,
            last_sync: None,
        }
    }

    #[must_use]
    pub fn standard_delay(&self) -> f64 {
        self.standard_delay
    }

    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    #[must_use]
    pub fn frequency(&self) -> Duration {
        self.frequency
    }

    /// Changes the cadence and thresholds; the last pass stays recorded.
    pub fn set_parameters(&mut self, frequency: Duration, tolerance: f64, standard_delay: f64) {
        self.frequency = frequency;
        self.tolerance = tolerance;
        self.standard_delay = standard_delay;
    }

    /// Whether the cadence allows another reconciliation pass at `now`.
    #[must_use]
    pub fn is_due(&self, now: Duration) -> bool {
        self.last_sync
            .is_none_or(|last| now.saturating_sub(last) >= self.frequency)
    }

    /// Records a reconciliation pass, forced or not, at `now`.
    pub fn mark(&mut self, now: Duration) {
        self.last_sync = Some(now);
    }

    /// A sync point for a backend that reports `position` at server time
    /// `server_now`.
    #[must_use]
    pub fn stamp(&self, position: f64, server_now: f64) -> SyncPoint {
        SyncPoint::new(position - self.standard_delay, server_now)
    }

    /// Where a follower should seek to, if it drifted too far.
    ///
    /// The target is clamped into `[0, duration]`; live sources (infinite
    /// duration) are never corrected.
    #[must_use]
    pub fn correction(
        &self,
        point: SyncPoint,
        server_now: f64,
        speed: f64,
        paused: bool,
        position: f64,
        duration: f64,
    ) -> Option<f64> {
        if duration.is_infinite() {
            return None;
        }

        let mut target = point.extrapolate(server_now, speed, paused).max(0.0);
        if duration.is_finite() && duration > 0.0 {
            target = target.min(duration);
        }

        if (position - target).abs() > self.tolerance {
            Some(target)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sync() -> ClockSync {
        ClockSync::new(Duration::from_secs(10), 1.0, 1.5)
    }

    #[test]
    fn cadence() {
        let mut sync = sync();
        assert!(sync.is_due(Duration::ZERO));
        sync.mark(Duration::from_secs(3));
        assert!(!sync.is_due(Duration::from_secs(12)));
        assert!(sync.is_due(Duration::from_secs(13)));
    }

    #[test]
    fn stamps_subtract_standard_delay() {
        let point = sync().stamp(30.0, 500.0);
        assert!((point.time - 28.5).abs() < 1e-9);
        assert!((point.stamp - 500.0).abs() < 1e-9);
    }

    #[test]
    fn corrects_only_beyond_tolerance() {
        let sync = sync();
        let point = SyncPoint::new(0.0, 100.0);

        assert_eq!(sync.correction(point, 110.0, 1.0, false, 9.5, 60.0), None);
        assert_eq!(
            sync.correction(point, 110.0, 1.0, false, 5.0, 60.0),
            Some(10.0)
        );
    }

    #[test]
    fn clamps_to_duration_and_skips_live() {
        let sync = sync();
        let point = SyncPoint::new(50.0, 0.0);
        assert_eq!(sync.correction(point, 20.0, 1.0, false, 0.0, 60.0), Some(60.0));
        assert_eq!(
            sync.correction(point, 20.0, 1.0, false, 0.0, f64::INFINITY),
            None
        );
    }
}
