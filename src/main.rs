use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    process,
    rc::Rc,
    time::Duration,
};

use clap::{command, Parser, ValueHint};
use log::{debug, error, info, warn, LevelFilter};
use tokio::time::MissedTickBehavior;

use sharecast::{
    backend::{Backend, PlayerKind},
    clock::{Clock, SystemClock},
    config::Config,
    controller::Controller,
    error::Result,
    events::Event,
    listener::Listener,
    session::{LoopbackHub, PeerId},
    signal::Handler,
    simulated::SimulatedBackend,
    state::PlaybackState,
    track::Track,
    util,
};

/// Profile to display when not built in release mode.
#[cfg(debug_assertions)]
const BUILD_PROFILE: &str = "debug";
/// Profile to display when not built release mode.
#[cfg(not(debug_assertions))]
const BUILD_PROFILE: &str = "release";

/// Group name for mutually exclusive logging options.
const ARGS_GROUP_LOGGING: &str = "logging";

/// Peers in the demo session. Peer 0 starts out as the authority.
const PEERS: usize = 2;

/// How often every peer's progress is logged.
const STATUS_INTERVAL: Duration = Duration::from_secs(5);

/// Command line arguments as parsed by `clap`.
#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    ///
    /// Re-read on SIGHUP. Without one, built-in defaults are used.
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Media URL the authority starts playing
    #[arg(short, long, value_hint = ValueHint::Url, default_value_t = String::from("https://example.com/media/opening.mp4"))]
    url: String,

    /// Title of the first track
    #[arg(short, long, default_value_t = String::from("Opening"))]
    title: String,

    /// Media URL to queue after the first one
    ///
    /// May be given multiple times. Queued tracks only start automatically
    /// when `forward_interval` is configured.
    #[arg(long = "next", value_name = "URL", value_hint = ValueHint::Url)]
    next: Vec<String>,

    /// Player kind to play the tracks on
    #[arg(short, long, value_enum, default_value_t = PlayerKind::Video)]
    player: PlayerKind,

    /// Length of every simulated source in seconds
    ///
    /// Pass `inf` to simulate a live stream.
    #[arg(long, default_value_t = 30.0)]
    length: f64,

    /// Update interval in milliseconds
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u64).range(1..))]
    tick_ms: u64,

    /// Maximum delivery delay of state broadcasts in milliseconds
    #[arg(long, default_value_t = 250)]
    jitter_ms: u64,

    /// Suppresses all output except warnings and errors.
    #[arg(short, long, default_value_t = false, group = ARGS_GROUP_LOGGING)]
    quiet: bool,

    /// Enable verbose logging
    ///
    /// Specify twice for trace logging.
    #[arg(short, long, action = clap::ArgAction::Count, group = ARGS_GROUP_LOGGING)]
    verbose: u8,
}

/// Initializes the logger facade.
///
/// The logging level is determined as follows, in order of precedence from
/// highest to lowest:
/// 1. Command line arguments
/// 2. `RUST_LOG` environment variable
/// 3. Hard coded default
///
/// # Panics
///
/// Panics when a logger facade is already initialized.
fn init_logger(config: &Args) {
    let mut logger = env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    if config.quiet || config.verbose > 0 {
        let level = match config.verbose {
            // Quiet and verbose are mutually exclusive.
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Filter log messages of external crates. The library shares the
        // binary's crate name, so this covers both.
        logger.filter_module(module_path!(), level);
    }

    logger.init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Ok(Config::default()),
    }
}

/// Logs the events of one peer.
fn event_logger(peer: PeerId) -> Rc<dyn Listener> {
    Rc::new(move |event: &Event| match event {
        Event::Error(e) => warn!("peer {peer}: {e}"),
        Event::Start => info!("peer {peer}: started"),
        Event::End => info!("peer {peer}: ended"),
        Event::TrackSynced(url) => debug!("peer {peer}: synced {url}"),
        Event::Custom(name) => info!("peer {peer}: {name}"),
        other => debug!("peer {peer}: {other:?}"),
    })
}

fn spawn_peer(
    peer: PeerId,
    config: &Config,
    args: &Args,
    hub: &Rc<LoopbackHub>,
    clock: SystemClock,
) -> Result<Controller> {
    let backends: Vec<Box<dyn Backend>> = [PlayerKind::Video, PlayerKind::Stream]
        .into_iter()
        .map(|kind| {
            Box::new(SimulatedBackend::new(kind, clock).with_duration(args.length))
                as Box<dyn Backend>
        })
        .collect();

    let mut controller = Controller::new(config, backends, hub.join(peer), clock)?;
    controller.add_listener(event_logger(peer));
    Ok(controller)
}

/// A state broadcast on its way to a peer.
struct Delivery {
    due: Duration,
    to: PeerId,
    payload: String,
}

/// Carries state broadcasts between the peers with a random delay.
///
/// Broadcasts to the same peer arrive in the order they were sent.
struct Relay {
    hub: Rc<LoopbackHub>,
    jitter_ms: u64,
    in_flight: Vec<Delivery>,
    last_due: BTreeMap<PeerId, Duration>,
}

impl Relay {
    fn new(hub: Rc<LoopbackHub>, jitter_ms: u64) -> Self {
        Self {
            hub,
            jitter_ms,
            in_flight: Vec::new(),
            last_due: BTreeMap::new(),
        }
    }

    /// Serializes the shared state of every peer that asked for a broadcast.
    fn collect(&mut self, peers: &[Controller], now: Duration) -> Result<()> {
        for from in self.hub.take_requests() {
            let Some(sender) = peers.get(from) else {
                continue;
            };

            let payload = sender.shared_state().to_json()?;
            for to in (0..peers.len()).filter(|&to| to != from) {
                let delay = Duration::from_millis(fastrand::u64(0..=self.jitter_ms));
                let previous = self.last_due.get(&to).copied().unwrap_or_default();
                let due = (now + delay).max(previous);
                self.last_due.insert(to, due);

                self.in_flight.push(Delivery {
                    due,
                    to,
                    payload: payload.clone(),
                });
            }
        }

        Ok(())
    }

    /// Applies every broadcast that is due.
    fn deliver(&mut self, peers: &mut [Controller], now: Duration) {
        let (due, pending) = std::mem::take(&mut self.in_flight)
            .into_iter()
            .partition::<Vec<_>, _>(|delivery| delivery.due <= now);
        self.in_flight = pending;

        for delivery in due {
            match PlaybackState::from_json(&delivery.payload) {
                Ok(state) => peers[delivery.to].apply_remote_state(state),
                Err(e) => error!("dropping broadcast to peer {}: {e}", delivery.to),
            }
        }
    }
}

fn log_status(peers: &[Controller], authority: PeerId) {
    for (peer, controller) in peers.iter().enumerate() {
        let role = if peer == authority {
            "authority"
        } else {
            "follower"
        };

        let activity = if controller.is_loading() {
            "loading"
        } else if controller.is_stopped() {
            "stopped"
        } else if controller.is_paused() {
            "paused"
        } else {
            "playing"
        };

        info!(
            "peer {peer} ({role}): {activity} {} {}",
            controller.track(),
            util::format_progress(controller.position(), controller.duration())
        );
    }
}

/// Main application loop.
///
/// Runs the peers until Ctrl-C or SIGTERM. SIGHUP re-reads the
/// configuration file and applies it to every peer.
async fn run(args: Args) -> Result<()> {
    let config = load_config(args.config.as_deref())?;

    let clock = SystemClock::new();
    let hub = LoopbackHub::new(clock);
    let mut peers = (0..PEERS)
        .map(|peer| spawn_peer(peer, &config, &args, &hub, clock))
        .collect::<Result<Vec<_>>>()?;

    let authority = hub.authority();
    for url in &args.next {
        peers[authority].enqueue(Track::new(args.player, "", url.clone()));
    }
    peers[authority].play(
        Track::new(args.player, args.title.clone(), args.url.clone()),
        false,
    );

    let mut relay = Relay::new(Rc::clone(&hub), args.jitter_ms);
    let mut signals = Handler::new()?;

    let mut ticker = tokio::time::interval(Duration::from_millis(args.tick_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_status = Duration::ZERO;

    loop {
        tokio::select! {
            // Prioritize signals.
            biased;

            signal = signals.recv() => {
                if signal.is_shutdown() {
                    info!("shutting down gracefully on {signal}");
                    for peer in &mut peers {
                        peer.stop();
                    }
                    break Ok(());
                }

                let Some(path) = args.config.as_deref() else {
                    info!("received {signal} but no configuration file was given");
                    continue;
                };

                match Config::from_file(path) {
                    Ok(config) => {
                        for peer in &mut peers {
                            peer.reconfigure(&config)?;
                        }
                        info!("reloaded configuration from {}", path.display());
                    }
                    Err(e) => error!("not reloading configuration: {e}"),
                }
            }

            _ = ticker.tick() => {
                let now = clock.now();
                for peer in &mut peers {
                    peer.update();
                }

                relay.collect(&peers, now)?;
                relay.deliver(&mut peers, now);

                if now.saturating_sub(last_status) >= STATUS_INTERVAL {
                    log_status(&peers, hub.authority());
                    last_status = now;
                }
            }
        }
    }
}

/// Main entry point of the application.
///
/// This function initializes the logger facade, parses the command line
/// arguments, and starts the main application loop.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // `clap` handles our command line arguments and help text.
    let args = Args::parse();
    init_logger(&args);

    // Dump command line arguments before we do anything more.
    // This aids in debugging of whatever comes next.
    debug!("Command {args:#?}");

    let cmd = command!();
    let name = cmd.get_name().to_string();
    let version = cmd.get_version().unwrap_or("UNKNOWN").to_string();

    info!("starting {name}/{version}; {BUILD_PROFILE}");

    if let Err(e) = run(args).await {
        error!("{e}");
        process::exit(1);
    }
}
