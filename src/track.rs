//! Playable sources.
//!
//! A [`Track`] names what a backend should load: the player kind that can
//! render it, a display title, the resolved URL and the URL as originally
//! entered (before any resolver rewrote it). Tracks are plain values that
//! get replaced wholesale when the session moves on to something else.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::backend::PlayerKind;

/// A playable source.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Track {
    player: PlayerKind,
    title: String,
    url: String,
    original_url: String,
}

impl Track {
    /// Creates a track whose original URL is the resolved URL.
    #[must_use]
    pub fn new(player: PlayerKind, title: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            player,
            title: title.into(),
            original_url: url.clone(),
            url,
        }
    }

    /// Creates a track that was resolved from `original_url` to `url`.
    #[must_use]
    pub fn resolved(
        player: PlayerKind,
        title: impl Into<String>,
        url: impl Into<String>,
        original_url: impl Into<String>,
    ) -> Self {
        Self {
            player,
            title: title.into(),
            url: url.into(),
            original_url: original_url.into(),
        }
    }

    /// The placeholder that stands in for "nothing loaded" on a player.
    #[must_use]
    pub fn empty(player: PlayerKind) -> Self {
        Self {
            player,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn player(&self) -> PlayerKind {
        self.player
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn original_url(&self) -> &str {
        &self.original_url
    }

    /// Whether this track has a source at all.
    #[must_use]
    pub fn has_source(&self) -> bool {
        !self.url.is_empty()
    }

    /// Whether the resolved URL is well-formed enough to hand to a backend.
    ///
    /// Only absolute URLs with a host qualify; retrying anything else is
    /// pointless.
    #[must_use]
    pub fn has_valid_url(&self) -> bool {
        Url::parse(&self.url).is_ok_and(|url| url.has_host())
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.title.is_empty() {
            write!(f, "{} [{}]", self.url, self.player)
        } else {
            write!(f, "{} ({}) [{}]", self.title, self.url, self.player)
        }
    }
}
