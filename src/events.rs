//! Events emitted by the playback controller.
//!
//! Every observable state change is announced to the registered
//! [`Listener`](crate::listener::Listener)s as one of these events, after
//! the change itself has been applied. Events fall into three groups:
//!
//! Setting changes:
//! * [`TrackChanged`](Event::TrackChanged), [`PlayerChanged`](Event::PlayerChanged)
//! * [`LoopChanged`](Event::LoopChanged), [`SpeedChanged`](Event::SpeedChanged),
//!   [`RepeatChanged`](Event::RepeatChanged)
//! * [`PausedChanged`](Event::PausedChanged), [`StoppedChanged`](Event::StoppedChanged)
//! * [`SetTime`](Event::SetTime), [`LocalModeChanged`](Event::LocalModeChanged)
//!
//! Backend lifecycle, mirrored after the controller handled them:
//! * [`Ready`](Event::Ready), [`Start`](Event::Start), [`Play`](Event::Play),
//!   [`Pause`](Event::Pause), [`Stop`](Event::Stop), [`Loop`](Event::Loop),
//!   [`End`](Event::End), [`Error`](Event::Error)
//!
//! Session:
//! * [`Retry`](Event::Retry), [`TrackSynced`](Event::TrackSynced),
//!   [`Custom`](Event::Custom)
//!
//! # Example
//!
//! ```rust
//! use sharecast::events::Event;
//!
//! fn describe(event: &Event) -> String {
//!     match event {
//!         Event::Start => "playback started".to_owned(),
//!         Event::Error(error) => format!("playback failed: {error}"),
//!         Event::SpeedChanged(speed) => format!("now playing at {speed}x"),
//!         other => format!("{other:?}"),
//!     }
//! }
//! ```

use crate::{backend::PlayerKind, backend::VideoError, repeat::RepeatWindow, track::Track};

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// The current track was replaced.
    TrackChanged(Track),

    /// The active player kind changed.
    PlayerChanged(PlayerKind),

    LoopChanged(bool),

    SpeedChanged(f64),

    /// The repeat window was set or cleared.
    RepeatChanged(Option<RepeatWindow>),

    PausedChanged(bool),

    StoppedChanged(bool),

    /// A seek to this media time was issued.
    SetTime(f64),

    /// Local mode was switched on (`true`) or off.
    LocalModeChanged(bool),

    /// A failed load is being retried.
    Retry,

    /// The backend has loaded the source.
    Ready,

    /// Playback of a freshly loaded source began.
    Start,

    Play,

    Pause,

    /// Playback stopped.
    Stop,

    /// A looping source wrapped around.
    Loop,

    /// The source reached its end.
    End,

    /// The backend reported an error.
    ///
    /// Emitted whether or not a retry follows.
    Error(VideoError),

    /// A state broadcast was applied; carries the URL it referenced.
    TrackSynced(String),

    /// An application-defined event, relayed verbatim.
    Custom(String),
}
