//! Replicated playback state.
//!
//! A controller keeps two [`PlaybackState`] copies: one it shares with the
//! other peers of the session and one it uses privately while in local
//! mode. [`Scope`] selects which copy is live; [`Scoped`] holds both.
//!
//! The shared copy doubles as the wire form of a state broadcast. It is
//! serialized with `serde`; the player kind travels as its ordinal.

use serde::{Deserialize, Serialize};

use crate::{
    backend::PlayerKind,
    error::{Error, Result},
    repeat::RepeatWindow,
    track::Track,
};

/// Which copy of the playback state is live.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Private to this peer; never broadcast.
    Local,
    /// Replicated across the session; written only by the authority.
    #[default]
    Shared,
}

/// A pair of values, one per [`Scope`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scoped<T> {
    local: T,
    shared: T,
}

impl<T> Scoped<T> {
    pub fn new(local: T, shared: T) -> Self {
        Self { local, shared }
    }

    pub fn get(&self, scope: Scope) -> &T {
        match scope {
            Scope::Local => &self.local,
            Scope::Shared => &self.shared,
        }
    }

    pub fn get_mut(&mut self, scope: Scope) -> &mut T {
        match scope {
            Scope::Local => &mut self.local,
            Scope::Shared => &mut self.shared,
        }
    }
}

/// An authoritative position: media time `time` as of server time `stamp`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncPoint {
    pub time: f64,
    pub stamp: f64,
}

impl SyncPoint {
    #[must_use]
    pub fn new(time: f64, stamp: f64) -> Self {
        Self { time, stamp }
    }

    /// Media time this sync point predicts for server time `now`.
    ///
    /// Paused playback does not advance; otherwise media time advances at
    /// `speed` times the server clock.
    #[must_use]
    pub fn extrapolate(&self, now: f64, speed: f64, paused: bool) -> f64 {
        if paused {
            self.time
        } else {
            self.time + (now - self.stamp).max(0.0) * speed
        }
    }
}

/// One copy of the replicated playback state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub player: PlayerKind,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub paused: bool,
    pub stopped: bool,
    pub speed: f64,
    pub repeat: Option<RepeatWindow>,
    pub sync: SyncPoint,
    pub track: Track,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            player: PlayerKind::default(),
            looping: false,
            paused: false,
            stopped: true,
            speed: 1.0,
            repeat: None,
            sync: SyncPoint::default(),
            track: Track::default(),
        }
    }
}

impl PlaybackState {
    /// Initial state for a session on `player`.
    #[must_use]
    pub fn new(player: PlayerKind, looping: bool) -> Self {
        Self {
            player,
            looping,
            track: Track::empty(player),
            ..Self::default()
        }
    }

    /// Serializes this state for broadcasting.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Into::into)
    }

    /// Parses and validates a received state broadcast.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the payload is malformed or carries a
    /// speed that is not a positive finite number.
    pub fn from_json(json: &str) -> Result<Self> {
        let state: Self = serde_json::from_str(json)?;
        if !state.speed.is_finite() || state.speed <= 0.0 {
            return Err(Error::invalid_argument(format!(
                "received invalid speed {}",
                state.speed
            )));
        }

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let state = PlaybackState::new(PlayerKind::Stream, true);
        assert!(state.stopped);
        assert!(!state.paused);
        assert!(state.looping);
        assert!(state.repeat.is_none());
        assert!((state.speed - 1.0).abs() < f64::EPSILON);
        assert_eq!(state.track, Track::empty(PlayerKind::Stream));
    }

    #[test]
    fn extrapolation() {
        let point = SyncPoint::new(10.0, 100.0);
        assert!((point.extrapolate(104.0, 1.0, false) - 14.0).abs() < 1e-9);
        assert!((point.extrapolate(104.0, 2.0, false) - 18.0).abs() < 1e-9);
        assert!((point.extrapolate(104.0, 2.0, true) - 10.0).abs() < 1e-9);
        // A stamp from the future never moves the target backwards.
        assert!((point.extrapolate(99.0, 1.0, false) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn wire_format() {
        let mut state = PlaybackState::new(PlayerKind::Stream, false);
        state.repeat = Some(RepeatWindow::new(1.0, 2.0).unwrap());
        let json = state.to_json().unwrap();
        assert!(json.contains(r#""player":1"#));
        assert!(json.contains(r#""loop":false"#));
        assert_eq!(PlaybackState::from_json(&json).unwrap(), state);
    }

    #[test]
    fn rejects_invalid_speed() {
        let mut state = PlaybackState::default();
        state.speed = 0.0;
        let json = state.to_json().unwrap();
        assert!(PlaybackState::from_json(&json).is_err());
    }

    #[test]
    fn scoped_copies_are_independent() {
        let mut scoped = Scoped::new(1, 2);
        *scoped.get_mut(Scope::Local) += 10;
        assert_eq!(*scoped.get(Scope::Local), 11);
        assert_eq!(*scoped.get(Scope::Shared), 2);
    }
}
