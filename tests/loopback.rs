use std::{rc::Rc, time::Duration};

use sharecast::{
    backend::{Backend, PlayerKind},
    clock::ManualClock,
    config::Config,
    controller::Controller,
    session::LoopbackHub,
    simulated::SimulatedBackend,
    state::PlaybackState,
    track::Track,
};

const URL: &str = "https://example.com/media/clip.mp4";

struct Room {
    clock: ManualClock,
    hub: Rc<LoopbackHub>,
    peers: Vec<Controller>,
}

impl Room {
    fn new(peers: usize) -> Self {
        let clock = ManualClock::new();
        let hub = LoopbackHub::new(clock.clone());
        let peers = (0..peers)
            .map(|peer| {
                let backends: Vec<Box<dyn Backend>> = vec![Box::new(SimulatedBackend::new(
                    PlayerKind::Video,
                    clock.clone(),
                ))];
                Controller::new(&Config::default(), backends, hub.join(peer), clock.clone())
                    .unwrap()
            })
            .collect();

        Self { clock, hub, peers }
    }

    /// Delivers every requested broadcast to all other peers, in order.
    fn relay(&mut self) {
        for from in self.hub.take_requests() {
            let json = self.peers[from].shared_state().to_json().unwrap();
            for (to, peer) in self.peers.iter_mut().enumerate() {
                if to != from {
                    peer.apply_remote_state(PlaybackState::from_json(&json).unwrap());
                }
            }
        }
    }

    fn run_for(&mut self, total: Duration) {
        let step = Duration::from_millis(100);
        for _ in 0..total.as_millis() / step.as_millis() {
            self.clock.advance(step);
            for peer in &mut self.peers {
                peer.update();
            }
            self.relay();
        }
    }
}

#[test]
fn follower_tracks_authority() {
    let mut room = Room::new(2);

    room.peers[0].play(Track::new(PlayerKind::Video, "Clip", URL), false);
    room.relay();
    assert_eq!(room.peers[1].track().url(), URL);
    assert!(room.peers[1].is_loading());

    room.run_for(Duration::from_secs(5));
    for peer in &room.peers {
        assert!(peer.is_playing());
        assert!(!peer.is_stopped());
        assert!((peer.position() - 4.5).abs() < 1e-6);
    }

    // Followers land on the delay-compensated position.
    room.peers[0].set_time(60.0);
    room.relay();
    assert!((room.peers[1].position() - 58.5).abs() < 1e-6);

    room.run_for(Duration::from_secs(2));
    room.peers[0].set_paused(true);
    room.relay();
    room.run_for(Duration::from_secs(1));

    let (authority, follower) = (&room.peers[0], &room.peers[1]);
    assert!(follower.is_paused() && !follower.is_playing());
    assert!((authority.position() - 62.0).abs() < 1e-6);
    assert!((follower.position() - 60.5).abs() < 1e-6);
}

#[test]
fn stopping_propagates() {
    let mut room = Room::new(3);
    room.peers[0].play(Track::new(PlayerKind::Video, "", URL), false);
    room.relay();
    room.run_for(Duration::from_secs(2));

    room.peers[0].stop();
    room.relay();

    for peer in &room.peers {
        assert!(peer.is_stopped());
        assert!(!peer.track().has_source());
        assert!(!peer.is_playing());
    }
}

#[test]
fn authority_transfer_moves_broadcast_rights() {
    let mut room = Room::new(2);
    room.peers[0].play(Track::new(PlayerKind::Video, "", URL), false);
    room.relay();
    room.run_for(Duration::from_secs(2));

    room.hub.transfer(1);
    room.peers[0].set_looping(true);
    room.relay();
    assert!(!room.peers[1].is_looping(), "former authority no longer publishes");

    room.peers[1].set_speed(1.25).unwrap();
    room.relay();
    assert!((room.peers[0].speed() - 1.25).abs() < f64::EPSILON);
    assert!(!room.peers[0].is_looping(), "the new authority's state wins");
}
