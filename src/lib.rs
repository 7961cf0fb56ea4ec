//! Replicated playback control for shared media sessions.
//!
//! Every peer of a session runs a [`Controller`](controller::Controller)
//! that drives a local playback [`Backend`](backend::Backend). One peer at a
//! time is the session authority: its commands update the shared
//! [`PlaybackState`](state::PlaybackState), which is broadcast to the other
//! peers and applied there. Followers keep their backend's position close
//! to the authority's by extrapolating its last [`SyncPoint`](state::SyncPoint).
//!
//! Peers can also leave the session temporarily ("local mode") and play
//! whatever they like without affecting anyone else.
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_panics_doc)]

#[macro_use]
extern crate log;

pub mod backend;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod history;
pub mod listener;
pub mod permission;
pub mod repeat;
pub mod retry;
pub mod scheduler;
pub mod session;
pub mod signal;
pub mod simulated;
pub mod state;
pub mod sync;
pub mod track;
pub mod util;
