//! An in-memory playback engine.
//!
//! [`SimulatedBackend`] plays nothing, but keeps time like a real engine:
//! loads complete after a configurable latency, the position advances with
//! the clock at the current speed, and sources end or loop at their
//! duration. Sources whose URL is not well-formed fail to load with
//! [`VideoError::InvalidUrl`].
//!
//! It backs the demo binary, where every peer runs one.

use std::{collections::VecDeque, time::Duration};

use crate::{
    backend::{Backend, BackendEvent, PlayerKind, VideoError},
    clock::Clock,
    track::Track,
};

#[derive(Copy, Clone, Debug, PartialEq)]
enum State {
    Idle,
    Loading { ready_at: Duration },
    Playing,
    Paused,
    Ended,
}

pub struct SimulatedBackend {
    kind: PlayerKind,
    clock: Box<dyn Clock>,
    load_latency: Duration,
    duration: f64,

    state: State,
    loaded: Option<Track>,
    looping: bool,
    speed: f64,
    anchor_position: f64,
    anchor_time: Duration,
    last_loaded: Option<Duration>,
    events: VecDeque<BackendEvent>,
}

impl SimulatedBackend {
    /// Default length of every source.
    pub const DEFAULT_DURATION: f64 = 180.0;

    #[must_use]
    pub fn new(kind: PlayerKind, clock: impl Clock + 'static) -> Self {
        Self {
            kind,
            clock: Box::new(clock),
            load_latency: Duration::from_millis(500),
            duration: Self::DEFAULT_DURATION,

            state: State::Idle,
            loaded: None,
            looping: false,
            speed: 1.0,
            anchor_position: 0.0,
            anchor_time: Duration::ZERO,
            last_loaded: None,
            events: VecDeque::new(),
        }
    }

    /// Sets how long loading a source takes.
    #[must_use]
    pub fn with_load_latency(mut self, latency: Duration) -> Self {
        self.load_latency = latency;
        self
    }

    /// Sets the length of every source; infinity simulates a live stream.
    #[must_use]
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    #[must_use]
    pub fn loaded(&self) -> Option<&Track> {
        self.loaded.as_ref()
    }

    fn now(&self) -> Duration {
        self.clock.now()
    }

    fn reanchor(&mut self) {
        self.anchor_position = self.position();
        self.anchor_time = self.now();
    }

    fn advance(&mut self) {
        let now = self.now();
        match self.state {
            State::Loading { ready_at } if now >= ready_at => {
                let valid = self.loaded.as_ref().is_some_and(Track::has_valid_url);
                if valid {
                    self.state = State::Playing;
                    self.anchor_position = 0.0;
                    self.anchor_time = now;
                    self.events.push_back(BackendEvent::Ready);
                    self.events.push_back(BackendEvent::Started);
                } else {
                    self.state = State::Idle;
                    self.events
                        .push_back(BackendEvent::Error(VideoError::InvalidUrl));
                }
            }
            State::Playing if self.duration.is_finite() && self.position() >= self.duration => {
                if self.looping {
                    self.anchor_position = 0.0;
                    self.anchor_time = now;
                    self.events.push_back(BackendEvent::Looped);
                } else {
                    self.anchor_position = self.duration;
                    self.state = State::Ended;
                    self.events.push_back(BackendEvent::Ended);
                }
            }
            _ => {}
        }
    }
}

impl Backend for SimulatedBackend {
    fn kind(&self) -> PlayerKind {
        self.kind
    }

    fn load(&mut self, track: &Track) {
        let now = self.now();
        trace!("{} backend loading {track}", self.kind);
        self.state = State::Loading {
            ready_at: now + self.load_latency,
        };
        self.loaded = Some(track.clone());
        self.anchor_position = 0.0;
        self.anchor_time = now;
        self.last_loaded = Some(now);
    }

    fn play(&mut self) {
        if matches!(self.state, State::Paused | State::Ended) {
            if self.state == State::Ended {
                self.anchor_position = 0.0;
            }
            self.anchor_time = self.now();
            self.state = State::Playing;
            self.events.push_back(BackendEvent::Play);
        }
    }

    fn pause(&mut self) {
        if self.state == State::Playing {
            self.reanchor();
            self.state = State::Paused;
            self.events.push_back(BackendEvent::Pause);
        }
    }

    fn stop(&mut self) {
        if self.state != State::Idle || self.loaded.is_some() {
            self.state = State::Idle;
            self.loaded = None;
            self.anchor_position = 0.0;
            self.events.push_back(BackendEvent::Stopped);
        }
    }

    fn seek(&mut self, position: f64) {
        let upper = if self.duration.is_finite() {
            self.duration
        } else {
            f64::MAX
        };
        self.anchor_position = position.clamp(0.0, upper);
        self.anchor_time = self.now();
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn set_speed(&mut self, speed: f64) {
        self.reanchor();
        self.speed = speed;
    }

    fn position(&self) -> f64 {
        match self.state {
            State::Playing => {
                let elapsed = self.now().saturating_sub(self.anchor_time).as_secs_f64();
                let position = self.anchor_position + elapsed * self.speed;
                if self.duration.is_finite() {
                    position.min(self.duration)
                } else {
                    position
                }
            }
            _ => self.anchor_position,
        }
    }

    fn duration(&self) -> f64 {
        if self.loaded.is_some() {
            self.duration
        } else {
            0.0
        }
    }

    fn is_playing(&self) -> bool {
        self.state == State::Playing
    }

    fn last_loaded(&self) -> Option<Duration> {
        self.last_loaded
    }

    fn poll_event(&mut self) -> Option<BackendEvent> {
        self.advance();
        self.events.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn drain(backend: &mut SimulatedBackend) -> Vec<BackendEvent> {
        std::iter::from_fn(|| backend.poll_event()).collect()
    }

    fn track() -> Track {
        Track::new(PlayerKind::Video, "clip", "https://example.com/clip.mp4")
    }

    #[test]
    fn loads_after_latency() {
        let clock = ManualClock::new();
        let mut backend = SimulatedBackend::new(PlayerKind::Video, clock.clone())
            .with_load_latency(Duration::from_secs(1));

        backend.load(&track());
        assert!(drain(&mut backend).is_empty());

        clock.advance(Duration::from_secs(1));
        assert_eq!(
            drain(&mut backend),
            [BackendEvent::Ready, BackendEvent::Started]
        );
        assert!(backend.is_playing());
    }

    #[test]
    fn position_follows_clock_and_speed() {
        let clock = ManualClock::new();
        let mut backend = SimulatedBackend::new(PlayerKind::Video, clock.clone())
            .with_load_latency(Duration::ZERO);
        backend.load(&track());
        drain(&mut backend);

        clock.advance(Duration::from_secs(4));
        assert!((backend.position() - 4.0).abs() < 1e-9);

        backend.set_speed(2.0);
        clock.advance(Duration::from_secs(1));
        assert!((backend.position() - 6.0).abs() < 1e-9);

        backend.pause();
        clock.advance(Duration::from_secs(10));
        assert!((backend.position() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_url_fails() {
        let clock = ManualClock::new();
        let mut backend =
            SimulatedBackend::new(PlayerKind::Video, clock).with_load_latency(Duration::ZERO);
        backend.load(&Track::new(PlayerKind::Video, "", "not a url"));
        assert_eq!(
            drain(&mut backend),
            [BackendEvent::Error(VideoError::InvalidUrl)]
        );
    }

    #[test]
    fn ends_or_loops() {
        let clock = ManualClock::new();
        let mut backend = SimulatedBackend::new(PlayerKind::Video, clock.clone())
            .with_load_latency(Duration::ZERO)
            .with_duration(10.0);
        backend.load(&track());
        drain(&mut backend);

        backend.set_looping(true);
        clock.advance(Duration::from_secs(10));
        assert_eq!(drain(&mut backend), [BackendEvent::Looped]);

        backend.set_looping(false);
        clock.advance(Duration::from_secs(10));
        assert_eq!(drain(&mut backend), [BackendEvent::Ended]);
        assert!(!backend.is_playing());
    }

    #[test]
    fn stop_unloads() {
        let clock = ManualClock::new();
        let mut backend =
            SimulatedBackend::new(PlayerKind::Video, clock).with_load_latency(Duration::ZERO);
        backend.load(&track());
        drain(&mut backend);

        backend.stop();
        assert_eq!(drain(&mut backend), [BackendEvent::Stopped]);
        assert!(backend.loaded().is_none());

        backend.stop();
        assert!(drain(&mut backend).is_empty());
    }
}
