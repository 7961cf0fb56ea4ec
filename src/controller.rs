//! The replicated playback controller.
//!
//! A [`Controller`] owns one peer's view of a shared playback session. It
//! drives the active [`Backend`], keeps the shared and local copies of the
//! [`PlaybackState`], and tells its listeners about every change.
//!
//! # Authority
//!
//! Only the session authority writes the shared state. Every mutation made
//! on the authority while networked stamps the shared copy and requests a
//! broadcast; every other peer applies what it receives through
//! [`Controller::apply_remote_state`] and never broadcasts itself.
//!
//! # Time
//!
//! Nothing happens in the background. The owner calls
//! [`Controller::update`] regularly (a frame or timer tick); each update
//! delivers pending backend events, runs due scheduled tasks, keeps
//! playback inside the repeat window and, on followers, reconciles the
//! playback position with the authority's clock.
//!
//! # Example
//!
//! ```no_run
//! use sharecast::{
//!     backend::{Backend, PlayerKind},
//!     clock::SystemClock,
//!     config::Config,
//!     controller::Controller,
//!     session::LoopbackHub,
//!     simulated::SimulatedBackend,
//!     track::Track,
//! };
//!
//! let clock = SystemClock::new();
//! let hub = LoopbackHub::new(clock);
//! let backends: Vec<Box<dyn Backend>> =
//!     vec![Box::new(SimulatedBackend::new(PlayerKind::Video, clock))];
//!
//! let mut controller = Controller::new(&Config::default(), backends, hub.join(0), clock)?;
//! controller.play(Track::new(PlayerKind::Video, "clip", "https://example.com/clip.mp4"), false);
//! loop {
//!     controller.update();
//! #   break;
//! }
//! # Ok::<(), sharecast::error::Error>(())
//! ```

use std::{collections::VecDeque, rc::Rc, time::Duration};

use crate::{
    backend::{Backend, BackendEvent, PlayerKind, VideoError},
    clock::Clock,
    config::Config,
    error::{Error, Result},
    events::Event,
    history::{History, RecentHistory},
    listener::{Listener, ListenerId, Listeners},
    permission::{Permission, PermissionLevel},
    repeat::{self, RepeatGuard, RepeatWindow},
    retry::{RetryDecision, RetryPolicy},
    scheduler::{Delay, Scheduler, TaskId},
    session::Session,
    state::{PlaybackState, Scope, Scoped, SyncPoint},
    sync::ClockSync,
    track::Track,
    util,
};

/// Work deferred to a later update.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Task {
    /// Retry loading the current track after an error.
    ErrorRetry,
    /// Reload the current track, e.g. after a speed change.
    Reload,
    /// Reconcile with the authority's clock regardless of cadence.
    ForceSync,
    /// Advance to the next queued track.
    Advance,
}

/// Where a state change originates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Origin {
    /// A command on this peer; published when authoritative.
    Local,
    /// A received state broadcast; never published again.
    Remote,
}

pub struct Controller {
    backends: Vec<Box<dyn Backend>>,
    active: usize,
    session: Box<dyn Session>,
    clock: Box<dyn Clock>,
    history: Box<dyn History>,
    permission: Option<Box<dyn Permission>>,
    listeners: Listeners,
    scheduler: Scheduler<Task>,

    states: Scoped<PlaybackState>,
    scope: Scope,
    track: Track,
    queue: VecDeque<Track>,

    loading: bool,
    is_reload: bool,
    retry: RetryPolicy,
    repeat_guard: RepeatGuard,
    clock_sync: ClockSync,
    resync_delay: Duration,
    forward_interval: Option<Duration>,
    pending_advance: Option<TaskId>,
    pending_retries: Vec<TaskId>,
}

impl Controller {
    /// Creates a controller that is ready to use.
    ///
    /// `backends` must contain exactly one backend per supported player
    /// kind, including the configured initial one. The session starts
    /// networked and stopped.
    ///
    /// # Errors
    ///
    /// * `InvalidArgument` if the configuration does not validate
    /// * `FailedPrecondition` if `backends` is empty
    /// * `AlreadyExists` if two backends serve the same player kind
    /// * `NotFound` if no backend serves the configured player kind
    pub fn new<S, C>(
        config: &Config,
        backends: Vec<Box<dyn Backend>>,
        session: S,
        clock: C,
    ) -> Result<Self>
    where
        S: Session + 'static,
        C: Clock + 'static,
    {
        config.validate()?;

        if backends.is_empty() {
            return Err(Error::failed_precondition("controller has no backends"));
        }

        for (i, backend) in backends.iter().enumerate() {
            let kind = backend.kind();
            if backends[..i].iter().any(|other| other.kind() == kind) {
                return Err(Error::already_exists(format!(
                    "more than one backend for {kind} players"
                )));
            }
        }

        let active = backends
            .iter()
            .position(|backend| backend.kind() == config.player)
            .ok_or_else(|| Error::not_found(format!("no backend for {} players", config.player)))?;

        let state = PlaybackState::new(config.player, config.looping);
        let mut controller = Self {
            backends,
            active,
            session: Box::new(session),
            clock: Box::new(clock),
            history: Box::new(RecentHistory::new(config.history_size)),
            permission: None,
            listeners: Listeners::new(),
            scheduler: Scheduler::new(),

            states: Scoped::new(state.clone(), state),
            scope: Scope::Shared,
            track: Track::empty(config.player),
            queue: VecDeque::new(),

            loading: false,
            is_reload: false,
            retry: RetryPolicy::new(config.max_error_retry, config.retry_after),
            repeat_guard: RepeatGuard::new(config.repeat_cooldown),
            clock_sync: ClockSync::new(
                config.sync_frequency,
                config.sync_tolerance,
                config.standard_delay,
            ),
            resync_delay: config.resync_delay,
            forward_interval: config.forward_interval,
            pending_advance: None,
            pending_retries: Vec::new(),
        };

        controller.push_settings();
        debug!(
            "controller ready with {} backend(s), starting on {} player",
            controller.backends.len(),
            config.player
        );

        Ok(controller)
    }

    /// Replaces the store that finished tracks are archived into.
    #[must_use]
    pub fn with_history<H>(mut self, history: H) -> Self
    where
        H: History + 'static,
    {
        self.history = Box::new(history);
        self
    }

    /// Attaches the source of the local player's permission level.
    #[must_use]
    pub fn with_permission<P>(mut self, permission: P) -> Self
    where
        P: Permission + 'static,
    {
        self.permission = Some(Box::new(permission));
        self
    }

    /// Applies new timing settings to a running controller.
    ///
    /// The initial player kind, loop flag and history size only take effect
    /// on construction and are ignored here.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the configuration does not validate; the
    /// running settings are left untouched.
    pub fn reconfigure(&mut self, config: &Config) -> Result<()> {
        config.validate()?;

        self.retry
            .set_limits(config.max_error_retry, config.retry_after);
        self.repeat_guard.set_cooldown(config.repeat_cooldown);
        self.clock_sync.set_parameters(
            config.sync_frequency,
            config.sync_tolerance,
            config.standard_delay,
        );
        self.resync_delay = config.resync_delay;
        self.forward_interval = config.forward_interval;

        debug!("reconfigured controller");
        Ok(())
    }

    /// Registers a listener; registering the same one again is a no-op.
    pub fn add_listener(&mut self, listener: Rc<dyn Listener>) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// The local player's permission level; `Editor` without a provider.
    #[must_use]
    pub fn permission_level(&self) -> PermissionLevel {
        self.permission
            .as_ref()
            .map_or(PermissionLevel::Editor, |permission| permission.level())
    }

    /// The live copy of the playback state.
    #[must_use]
    pub fn state(&self) -> &PlaybackState {
        self.states.get(self.scope)
    }

    /// The shared copy of the playback state, as it should be broadcast.
    #[must_use]
    pub fn shared_state(&self) -> &PlaybackState {
        self.states.get(Scope::Shared)
    }

    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    #[must_use]
    pub fn is_local(&self) -> bool {
        self.scope == Scope::Local
    }

    /// The track currently loaded, or the empty placeholder.
    #[must_use]
    pub fn track(&self) -> &Track {
        &self.track
    }

    #[must_use]
    pub fn player_kind(&self) -> PlayerKind {
        self.state().player
    }

    #[must_use]
    pub fn is_looping(&self) -> bool {
        self.state().looping
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state().paused
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.state().stopped
    }

    #[must_use]
    pub fn speed(&self) -> f64 {
        self.state().speed
    }

    #[must_use]
    pub fn repeat(&self) -> Option<RepeatWindow> {
        self.state().repeat
    }

    #[must_use]
    pub fn sync_point(&self) -> SyncPoint {
        self.state().sync
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn is_reload(&self) -> bool {
        self.is_reload
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.backend().is_playing()
    }

    /// Backend position in seconds.
    #[must_use]
    pub fn position(&self) -> f64 {
        self.backend().position()
    }

    #[must_use]
    pub fn duration(&self) -> f64 {
        self.backend().duration()
    }

    /// Whether the current source is a live stream.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.duration().is_infinite()
    }

    #[must_use]
    pub fn last_loaded(&self) -> Option<Duration> {
        self.backend().last_loaded()
    }

    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.retry.count()
    }

    /// Tracks waiting to be advanced to, next first.
    pub fn queue(&self) -> impl Iterator<Item = &Track> {
        self.queue.iter()
    }

    pub fn enqueue(&mut self, track: Track) {
        debug!("queued {track}");
        self.queue.push_back(track);
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    /// Pending scheduled tasks, in scheduling order.
    pub fn pending_tasks(&self) -> impl Iterator<Item = &Task> {
        self.scheduler.pending()
    }

    /// Relays an application-defined event to all listeners.
    pub fn send_custom_event(&self, name: impl Into<String>) {
        self.notify(Event::Custom(name.into()));
    }

    /// Replaces the current track without starting playback.
    pub fn set_track(&mut self, track: Track) {
        let changed = self.track != track;
        self.track = track.clone();
        self.state_mut().track = track.clone();
        self.publish();
        if changed {
            self.notify(Event::TrackChanged(track));
        }
    }

    /// Loads and starts `track`.
    ///
    /// Ignored while another load is in flight. A reload keeps the session's
    /// sync point and does not announce a new track to the other peers.
    pub fn play(&mut self, track: Track, is_reload: bool) {
        if self.loading {
            warn!("not loading {track}: another load is in flight");
            return;
        }

        if !track.has_source() {
            warn!("not loading track without a source");
            return;
        }

        if track.player() != self.player_kind() {
            if let Err(e) = self.apply_player_kind(track.player(), Origin::Local) {
                warn!("not loading {track}: {e}");
                return;
            }
        }

        self.loading = true;
        self.is_reload = is_reload;

        let changed = self.track != track;
        self.track = track.clone();
        self.state_mut().track = track.clone();

        if is_reload {
            debug!("reloading {track}");
        } else {
            info!("loading {track}");
        }
        self.backend_mut().load(&track);

        if !is_reload {
            self.publish();
        }
        if changed {
            self.notify(Event::TrackChanged(track));
        }
    }

    /// Loads the current track again, unless stopped or already loading.
    pub fn reload(&mut self) {
        if self.is_stopped() || self.loading {
            debug!(
                "not reloading: {}",
                if self.loading { "loading" } else { "stopped" }
            );
            return;
        }

        self.play(self.track.clone(), true);
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.apply_paused(paused, Origin::Local);
    }

    pub fn set_stopped(&mut self, stopped: bool) {
        self.apply_stopped(stopped, Origin::Local);
    }

    /// Stops playback.
    pub fn stop(&mut self) {
        self.set_stopped(true);
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.apply_looping(looping, Origin::Local);
    }

    /// Sets the playback rate.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` unless `speed` is a positive finite number.
    pub fn set_speed(&mut self, speed: f64) -> Result<()> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(Error::invalid_argument(format!(
                "speed must be a positive number ({speed})"
            )));
        }

        self.apply_speed(speed, Origin::Local);
        Ok(())
    }

    /// Sets or clears the repeat window.
    pub fn set_repeat(&mut self, repeat: Option<RepeatWindow>) {
        self.apply_repeat(repeat, Origin::Local);
    }

    /// Switches to the backend for `kind`, stopping the current one first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no backend serves `kind`.
    pub fn set_player_kind(&mut self, kind: PlayerKind) -> Result<()> {
        self.apply_player_kind(kind, Origin::Local)
    }

    /// Seeks to `time`.
    ///
    /// Ignored on live sources and for targets outside an active repeat
    /// window.
    pub fn set_time(&mut self, time: f64) {
        if self.is_live() {
            debug!("not seeking in live source");
            return;
        }

        if repeat::is_outside(self.repeat(), self.is_repeat_active(), time) {
            debug!("not seeking to {time:.2}s outside of repeat window");
            return;
        }

        let now = self.now();
        self.backend_mut().seek(time);
        self.repeat_guard.record_seek(now);

        if self.is_authoritative() {
            let point = self.clock_sync.stamp(time, self.session.server_time());
            self.states.get_mut(Scope::Shared).sync = point;
            self.session.request_broadcast();
        }

        self.notify(Event::SetTime(time));
    }

    /// Switches between local and networked mode.
    ///
    /// Entering local mode stops playback on this peer only and detaches it
    /// from the shared state. Leaving it stops local playback, then picks up
    /// the shared track again.
    pub fn set_local(&mut self, local: bool) {
        if self.is_local() == local {
            return;
        }

        if local {
            info!("entering local mode");
            let player = self.shared_state().player;
            self.states.get_mut(Scope::Local).player = player;
            self.scope = Scope::Local;
            self.push_settings();
            self.apply_stopped(true, Origin::Local);
        } else {
            info!("leaving local mode");
            self.apply_stopped(true, Origin::Local);
            self.scope = Scope::Shared;
            if let Some(active) = self.backend_index(self.player_kind()) {
                self.active = active;
            }
            self.push_settings();

            let track = self.shared_state().track.clone();
            if self.track != track {
                self.track = track.clone();
                self.notify(Event::TrackChanged(track));
            }
            self.reload();
        }

        self.notify(Event::LocalModeChanged(local));
    }

    /// Applies a state broadcast from the authority.
    ///
    /// In local mode the broadcast is only stored, to be picked up when
    /// leaving local mode. Otherwise every changed field takes effect on
    /// this peer's backend, a different track is loaded, and the position
    /// is reconciled right away.
    #[expect(clippy::float_cmp)]
    pub fn apply_remote_state(&mut self, remote: PlaybackState) {
        if self.is_local() {
            debug!("storing state broadcast while in local mode");
            *self.states.get_mut(Scope::Shared) = remote;
            return;
        }

        let track = remote.track.clone();
        self.notify(Event::TrackSynced(track.url().to_owned()));

        let track_changed = track.url() != self.track.url();
        if track_changed {
            debug!("synced track changed to {track}");
            self.apply_stopped(true, Origin::Remote);
        }

        if remote.player != self.player_kind() {
            if let Err(e) = self.apply_player_kind(remote.player, Origin::Remote) {
                warn!("ignoring synced player kind: {e}");
            }
        }

        if remote.looping != self.is_looping() {
            self.apply_looping(remote.looping, Origin::Remote);
        }

        if remote.paused != self.is_paused() {
            self.apply_paused(remote.paused, Origin::Remote);
        }

        if remote.stopped && !self.is_stopped() {
            self.apply_stopped(true, Origin::Remote);
        }

        if remote.speed.is_finite() && remote.speed > 0.0 {
            if remote.speed != self.speed() {
                self.apply_speed(remote.speed, Origin::Remote);
            }
        } else {
            warn!("ignoring synced speed {}", remote.speed);
        }

        if remote.repeat != self.repeat() {
            self.apply_repeat(remote.repeat, Origin::Remote);
        }

        let shared = self.states.get_mut(Scope::Shared);
        shared.sync = remote.sync;
        shared.track = track.clone();

        if track_changed && track.has_source() {
            self.play(track, false);
        }

        self.do_sync(true);
    }

    /// Runs one update tick.
    ///
    /// Delivers pending backend events, runs due tasks, corrects playback
    /// that left the repeat window and reconciles followers with the
    /// authority's clock when the sync cadence is due.
    pub fn update(&mut self) {
        self.dispatch_backend_events();

        let now = self.now();
        for (id, task) in self.scheduler.tick(now) {
            self.run_task(id, task);
        }

        let (window, active, position) = (self.repeat(), self.is_repeat_active(), self.position());
        if let Some(start) = self.repeat_guard.correction(window, active, position, now) {
            debug!("position {position:.2}s left the repeat window, seeking to {start:.2}s");
            self.set_time(start);
        }

        if !self.is_local() && self.is_playing() && self.clock_sync.is_due(now) {
            self.do_sync(false);
        }
    }

    /// Handles every event the active backend has pending.
    pub fn dispatch_backend_events(&mut self) {
        while let Some(event) = self.backend_mut().poll_event() {
            self.handle_backend_event(event);
        }
    }

    /// Handles one backend lifecycle event.
    pub fn handle_backend_event(&mut self, event: BackendEvent) {
        trace!("backend event: {event:?}");
        match event {
            BackendEvent::Ready => self.on_ready(),
            BackendEvent::Started => self.on_started(),
            BackendEvent::Play => self.on_play(),
            BackendEvent::Pause => self.on_pause(),
            BackendEvent::Stopped => self.on_stopped(),
            BackendEvent::Looped => self.on_loop(),
            BackendEvent::Ended => self.on_ended(),
            BackendEvent::Error(error) => self.on_error(error),
        }
    }

    fn on_ready(&mut self) {
        self.loading = false;
        self.notify(Event::Ready);
    }

    fn on_started(&mut self) {
        self.retry.reset();
        self.loading = false;
        self.state_mut().stopped = false;

        if self.is_paused() {
            self.backend_mut().pause();
        } else {
            self.backend_mut().play();
        }

        if !self.is_local() {
            if self.session.is_authority() {
                if !self.is_reload {
                    let point = SyncPoint::new(0.0, self.session.server_time());
                    self.states.get_mut(Scope::Shared).sync = point;
                    self.session.request_broadcast();
                }
            } else {
                self.do_sync(false);
            }

            let now = self.now();
            self.scheduler
                .schedule(Delay::Time(self.resync_delay), now, Task::ForceSync);
        }

        info!("started {}", self.track);
        self.notify(Event::Start);
        self.is_reload = false;
    }

    fn on_play(&mut self) {
        self.state_mut().paused = false;
        self.notify(Event::Play);
    }

    fn on_pause(&mut self) {
        self.state_mut().paused = true;
        self.notify(Event::Pause);
    }

    fn on_stopped(&mut self) {
        if !self.is_reload {
            let placeholder = Track::empty(self.player_kind());
            let writes_track = self.is_local() || self.session.is_authority();
            {
                let state = self.state_mut();
                state.paused = false;
                state.stopped = true;
                state.repeat = None;
                if writes_track {
                    state.track = placeholder.clone();
                }
            }
            self.loading = false;
            self.retry.reset();

            if let Some(id) = self.pending_advance.take() {
                self.scheduler.cancel(id);
            }

            if self.track.has_source() {
                self.history.archive(&self.track);
            }

            if self.track != placeholder {
                debug!("stopped {}", self.track);
                self.track = placeholder.clone();
                self.notify(Event::TrackChanged(placeholder));
            }

            if self.is_authoritative() {
                self.states.get_mut(Scope::Shared).sync = SyncPoint::default();
                self.session.request_broadcast();
            }
        }

        self.notify(Event::Stop);
    }

    fn on_loop(&mut self) {
        if self.is_authoritative() {
            let point = SyncPoint::new(0.0, self.session.server_time());
            self.states.get_mut(Scope::Shared).sync = point;
            self.session.request_broadcast();
        }

        self.notify(Event::Loop);
    }

    fn on_ended(&mut self) {
        if self.is_authoritative() {
            if let Some(interval) = self.forward_interval {
                if let Some(id) = self.pending_advance.take() {
                    self.scheduler.cancel(id);
                }

                let now = self.now();
                debug!("advancing in {:.1}s", interval.as_secs_f64());
                self.pending_advance =
                    Some(self.scheduler.schedule(Delay::Time(interval), now, Task::Advance));
            }
        }

        self.notify(Event::End);
    }

    fn on_error(&mut self, error: VideoError) {
        self.loading = false;

        match self.retry.register(error) {
            RetryDecision::Retry => {
                debug!(
                    "{error} playing {}, retry {}/{}",
                    self.track,
                    self.retry.count(),
                    self.retry.max_retries()
                );
                let now = self.now();
                let id = self
                    .scheduler
                    .schedule(Delay::Ticks(0), now, Task::ErrorRetry);
                self.pending_retries.push(id);
            }
            RetryDecision::GiveUp => {
                warn!("{error} playing {}, giving up", self.track);
                self.cancel_retries();
            }
            RetryDecision::Permanent => {
                warn!("{error} playing {}", self.track);
                self.cancel_retries();
            }
        }

        self.notify(Event::Error(error));
    }

    fn run_task(&mut self, id: TaskId, task: Task) {
        trace!("running {task:?}");
        match task {
            Task::ErrorRetry => {
                self.pending_retries.retain(|pending| *pending != id);
                self.error_retry();
            }
            Task::Reload => self.reload(),
            Task::ForceSync => self.do_sync(true),
            Task::Advance => {
                if self.pending_advance == Some(id) {
                    self.pending_advance = None;
                }
                self.advance();
            }
        }
    }

    fn error_retry(&mut self) {
        if self.is_playing() {
            trace!("not retrying: playing");
            return;
        }

        if !self.track.has_valid_url() {
            debug!("not retrying invalid source {}", self.track);
            return;
        }

        let now = self.now();
        if !self.retry.is_due(now, self.last_loaded()) {
            let id = self
                .scheduler
                .schedule(Delay::Ticks(0), now, Task::ErrorRetry);
            self.pending_retries.push(id);
            return;
        }

        info!("retrying {}", self.track);
        self.loading = true;
        let track = self.track.clone();
        self.backend_mut().load(&track);
        self.notify(Event::Retry);
    }

    fn cancel_retries(&mut self) {
        for id in self.pending_retries.drain(..) {
            self.scheduler.cancel(id);
        }
    }

    fn advance(&mut self) {
        if !self.is_authoritative() {
            debug!("not advancing: no longer authority");
            return;
        }

        if self.loading {
            debug!("not advancing: loading");
            return;
        }

        match self.queue.pop_front() {
            Some(next) => self.play(next, false),
            None => debug!("not advancing: queue is empty"),
        }
    }

    /// Reconciles this follower's backend with the authority's sync point.
    ///
    /// A regular pass only corrects a playing backend. A forced pass also
    /// corrects a paused one and restores the paused or playing state the
    /// authority published.
    fn do_sync(&mut self, force: bool) {
        let now = self.now();
        self.clock_sync.mark(now);

        if self.is_local() || self.session.is_authority() || self.loading || self.is_stopped() {
            return;
        }

        let playing = self.is_playing();
        if !force && !playing {
            return;
        }

        let shared = self.shared_state();
        let (paused, speed, point) = (shared.paused, shared.speed, shared.sync);

        if force {
            if paused && playing {
                self.backend_mut().pause();
            } else if !paused && !playing {
                self.backend_mut().play();
            }
        }

        let server_now = self.session.server_time();
        if let Some(target) = self.clock_sync.correction(
            point,
            server_now,
            speed,
            paused,
            self.position(),
            self.duration(),
        ) {
            debug!(
                "drifted to {} while the session is at {}, seeking",
                util::format_time(self.position()),
                util::format_time(target)
            );
            self.backend_mut().seek(target);
            self.repeat_guard.record_seek(now);
        }
    }

    fn apply_paused(&mut self, paused: bool, origin: Origin) {
        self.state_mut().paused = paused;
        if paused {
            self.backend_mut().pause();
        } else {
            self.backend_mut().play();
        }

        if origin == Origin::Local && self.is_authoritative() {
            self.stamp_position();
            self.session.request_broadcast();
        }

        debug!("{}", if paused { "paused" } else { "unpaused" });
        self.notify(Event::PausedChanged(paused));
    }

    fn apply_stopped(&mut self, stopped: bool, origin: Origin) {
        self.state_mut().stopped = stopped;
        self.is_reload = false;
        if stopped {
            self.stop_backend();
        }

        if origin == Origin::Local {
            self.publish();
        }

        self.notify(Event::StoppedChanged(stopped));
    }

    fn apply_looping(&mut self, looping: bool, origin: Origin) {
        self.state_mut().looping = looping;
        for backend in &mut self.backends {
            backend.set_looping(looping);
        }

        if origin == Origin::Local {
            self.publish();
        }

        self.notify(Event::LoopChanged(looping));
    }

    fn apply_speed(&mut self, speed: f64, origin: Origin) {
        self.state_mut().speed = speed;
        for backend in &mut self.backends {
            backend.set_speed(speed);
        }

        if !self.is_stopped() && !self.is_live() && self.player_kind().reloads_on_speed_change() {
            let now = self.now();
            self.scheduler.schedule(Delay::Ticks(1), now, Task::Reload);
        }

        if origin == Origin::Local && self.is_authoritative() {
            self.stamp_position();
            self.session.request_broadcast();
        }

        debug!("speed set to {speed}");
        self.notify(Event::SpeedChanged(speed));
    }

    fn apply_repeat(&mut self, repeat: Option<RepeatWindow>, origin: Origin) {
        self.state_mut().repeat = repeat;

        if origin == Origin::Local {
            self.publish();
        }

        self.notify(Event::RepeatChanged(repeat));
    }

    fn apply_player_kind(&mut self, kind: PlayerKind, origin: Origin) -> Result<()> {
        if kind == self.player_kind() {
            return Ok(());
        }

        let active = self
            .backend_index(kind)
            .ok_or_else(|| Error::not_found(format!("no backend for {kind} players")))?;

        self.stop_backend();
        self.state_mut().player = kind;
        self.active = active;
        if !self.track.has_source() {
            self.track = Track::empty(kind);
        }

        if origin == Origin::Local {
            self.publish();
        }

        debug!("switched to {kind} player");
        self.notify(Event::PlayerChanged(kind));
        Ok(())
    }

    fn now(&self) -> Duration {
        self.clock.now()
    }

    fn backend(&self) -> &dyn Backend {
        self.backends[self.active].as_ref()
    }

    fn backend_mut(&mut self) -> &mut dyn Backend {
        self.backends[self.active].as_mut()
    }

    fn backend_index(&self, kind: PlayerKind) -> Option<usize> {
        self.backends
            .iter()
            .position(|backend| backend.kind() == kind)
    }

    /// Stops the active backend and handles the resulting events before
    /// anything else happens.
    fn stop_backend(&mut self) {
        self.backend_mut().stop();
        self.dispatch_backend_events();
    }

    /// Pushes the live loop flag and speed into every backend.
    fn push_settings(&mut self) {
        let (looping, speed) = (self.is_looping(), self.speed());
        for backend in &mut self.backends {
            backend.set_looping(looping);
            backend.set_speed(speed);
        }
    }

    fn state_mut(&mut self) -> &mut PlaybackState {
        self.states.get_mut(self.scope)
    }

    fn is_authoritative(&self) -> bool {
        !self.is_local() && self.session.is_authority()
    }

    fn is_repeat_active(&self) -> bool {
        !self.is_stopped() && self.is_playing()
    }

    /// Requests a broadcast if this peer may publish.
    fn publish(&self) {
        if self.is_authoritative() {
            self.session.request_broadcast();
        }
    }

    /// Stamps the shared sync point from the backend's current position.
    fn stamp_position(&mut self) {
        let point = self
            .clock_sync
            .stamp(self.position(), self.session.server_time());
        self.states.get_mut(Scope::Shared).sync = point;
    }

    fn notify(&self, event: Event) {
        self.listeners.notify(&event);
    }
}
