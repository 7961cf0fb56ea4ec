//! Playback engine boundary.
//!
//! The controller never decodes anything itself. It drives one [`Backend`]
//! per supported [`PlayerKind`] and reacts to the [`BackendEvent`]s that
//! backends report back. Exactly one backend is active at a time: the one
//! matching the session's current player kind.
//!
//! Events are pulled rather than pushed: the controller drains
//! [`Backend::poll_event`] on every update, and right after it stops a
//! backend, so that a stop is observed before any following command.

use std::{fmt, time::Duration};

use serde_repr::{Deserialize_repr, Serialize_repr};
use thiserror::Error;

use crate::track::Track;

/// The kind of engine that renders a track.
///
/// Serialized by ordinal in state broadcasts, so the discriminants are part
/// of the wire format.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Hash,
    Serialize_repr,
    Deserialize_repr,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
)]
#[cfg_attr(feature = "binary", derive(clap::ValueEnum))]
#[repr(u8)]
pub enum PlayerKind {
    /// Progressive video files (default).
    #[default]
    Video = 0,

    /// Adaptive and live streams.
    ///
    /// Stream engines cannot change rate on the fly and must reload the
    /// source after a speed change.
    Stream = 1,
}

impl PlayerKind {
    /// Whether a playback rate change only takes effect after reloading.
    #[must_use]
    pub fn reloads_on_speed_change(self) -> bool {
        matches!(self, Self::Stream)
    }
}

impl fmt::Display for PlayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Stream => write!(f, "stream"),
        }
    }
}

/// Errors that a backend can report while loading or playing.
#[derive(Copy, Clone, Debug, Error, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum VideoError {
    #[error("unknown playback error")]
    Unknown,

    #[error("invalid url")]
    InvalidUrl,

    /// The source refused access. Retrying will not help.
    #[error("access denied")]
    AccessDenied,

    #[error("player error")]
    PlayerError,

    #[error("rate limited")]
    RateLimited,
}

impl VideoError {
    /// Permanent errors are never retried.
    #[must_use]
    pub fn is_permanent(self) -> bool {
        matches!(self, Self::AccessDenied)
    }
}

/// Lifecycle events reported by a backend.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BackendEvent {
    /// The source is loaded and can start.
    Ready,
    /// Playback of a freshly loaded source began.
    Started,
    /// Playback resumed.
    Play,
    /// Playback paused.
    Pause,
    /// Playback stopped and the source was unloaded.
    Stopped,
    /// A looping source wrapped around to the start.
    Looped,
    /// A non-looping source reached its end.
    Ended,
    /// Loading or playback failed.
    Error(VideoError),
}

/// A playback engine.
///
/// Positions and durations are in seconds of media time. A live source
/// reports an infinite duration.
pub trait Backend {
    /// The player kind this backend serves.
    fn kind(&self) -> PlayerKind;

    /// Starts loading `track`. Completion is reported through
    /// [`BackendEvent::Ready`] and [`BackendEvent::Started`], failure through
    /// [`BackendEvent::Error`].
    fn load(&mut self, track: &Track);

    fn play(&mut self);

    fn pause(&mut self);

    /// Stops playback and unloads the source.
    fn stop(&mut self);

    fn seek(&mut self, position: f64);

    fn set_looping(&mut self, looping: bool);

    /// Sets the playback rate; `1.0` is normal speed.
    fn set_speed(&mut self, speed: f64);

    fn position(&self) -> f64;

    fn duration(&self) -> f64;

    fn is_playing(&self) -> bool;

    /// Monotonic time of the last call to [`load`](Self::load), if any.
    fn last_loaded(&self) -> Option<Duration>;

    /// Takes the next pending lifecycle event, if any.
    fn poll_event(&mut self) -> Option<BackendEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_access_denied_is_permanent() {
        assert!(VideoError::AccessDenied.is_permanent());
        for error in [
            VideoError::Unknown,
            VideoError::InvalidUrl,
            VideoError::PlayerError,
            VideoError::RateLimited,
        ] {
            assert!(!error.is_permanent(), "{error} should be transient");
        }
    }

    #[test]
    fn player_kind_is_serialized_by_ordinal() {
        assert_eq!(serde_json::to_string(&PlayerKind::Stream).unwrap(), "1");
        assert_eq!(
            serde_json::from_str::<PlayerKind>("0").unwrap(),
            PlayerKind::Video
        );
    }
}
