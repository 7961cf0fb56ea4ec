//! Recently played tracks.

use std::collections::VecDeque;

use crate::track::Track;

/// Receives every track that finished playing.
pub trait History {
    fn archive(&mut self, track: &Track);
}

/// Keeps the most recent tracks, newest first, without duplicate URLs.
#[derive(Clone, Debug, Default)]
pub struct RecentHistory {
    capacity: usize,
    tracks: VecDeque<Track>,
}

impl RecentHistory {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            tracks: VecDeque::with_capacity(capacity),
        }
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl History for RecentHistory {
    fn archive(&mut self, track: &Track) {
        if self.capacity == 0 {
            return;
        }

        self.tracks.retain(|existing| existing.url() != track.url());
        self.tracks.push_front(track.clone());
        self.tracks.truncate(self.capacity);
    }
}
