//! Repeat windows: confining playback to a sub-interval of a track.
//!
//! A session either has no repeat window or exactly one
//! [`RepeatWindow`] with `start < end`. While one is set and playback is
//! active, every update checks whether the backend position has left the
//! window and, if so, seeks back to its start. [`RepeatGuard`] rate-limits
//! those seeks so that a position that lands on the boundary, or reports
//! with jitter, does not cause a seek on every tick.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A closed interval `[start, end]` of media time, in seconds.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Bounds")]
pub struct RepeatWindow {
    start: f64,
    end: f64,
}

#[derive(Deserialize)]
struct Bounds {
    start: f64,
    end: f64,
}

impl TryFrom<Bounds> for RepeatWindow {
    type Error = Error;

    fn try_from(bounds: Bounds) -> Result<Self> {
        Self::new(bounds.start, bounds.end)
    }
}

impl RepeatWindow {
    /// Creates a repeat window.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` unless both bounds are finite, `start` is
    /// not negative and `start < end`.
    pub fn new(start: f64, end: f64) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(Error::invalid_argument(format!(
                "repeat window bounds must be finite ({start}..{end})"
            )));
        }

        if start < 0.0 {
            return Err(Error::invalid_argument(format!(
                "repeat window cannot start before zero ({start})"
            )));
        }

        if start >= end {
            return Err(Error::invalid_argument(format!(
                "repeat window must start before it ends ({start}..{end})"
            )));
        }

        Ok(Self { start, end })
    }

    #[must_use]
    pub fn start(&self) -> f64 {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> f64 {
        self.end
    }

    #[must_use]
    pub fn contains(&self, position: f64) -> bool {
        position >= self.start && position <= self.end
    }
}

/// Whether `position` lies outside an enabled repeat window while playback
/// is active.
///
/// Always `false` when there is no window or playback is not active, so no
/// correction can be triggered in those states.
#[must_use]
pub fn is_outside(window: Option<RepeatWindow>, active: bool, position: f64) -> bool {
    match window {
        Some(window) if active => !window.contains(position),
        _ => false,
    }
}

/// Rate limiter for corrective seeks.
///
/// Every seek counts, whether it came from a correction or from a user, so
/// a manual seek also starts a cooldown.
#[derive(Clone, Debug)]
pub struct RepeatGuard {
    cooldown: Duration,
    last_seek: Option<Duration>,
}

impl RepeatGuard {
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_seek: None,
        }
    }

    #[must_use]
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn set_cooldown(&mut self, cooldown: Duration) {
        self.cooldown = cooldown;
    }

    /// Records that a seek was issued at `now`.
    pub fn record_seek(&mut self, now: Duration) {
        self.last_seek = Some(now);
    }

    /// Whether at least the cooldown has passed since the last seek.
    #[must_use]
    pub fn is_cooled_down(&self, now: Duration) -> bool {
        self.last_seek
            .is_none_or(|last| now.saturating_sub(last) > self.cooldown)
    }

    /// Returns where to seek to if a correction is due now.
    #[must_use]
    pub fn correction(
        &self,
        window: Option<RepeatWindow>,
        active: bool,
        position: f64,
        now: Duration,
    ) -> Option<f64> {
        let window = window?;
        if is_outside(Some(window), active, position) && self.is_cooled_down(now) {
            Some(window.start())
        } else {
            None
        }
    }
}
