//! Who may control playback.
//!
//! Permission checks happen at the command surface, before a command
//! reaches the controller. The controller only exposes the level so that
//! surfaces sharing it agree on one answer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Control levels, from least to most privileged.
#[derive(
    Copy, Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    /// May watch but not control.
    Viewer,
    /// May control playback.
    #[default]
    Editor,
    /// May control playback and manage editors.
    Admin,
    /// Owns the session.
    Owner,
}

impl PermissionLevel {
    /// Whether this level may issue playback commands.
    #[must_use]
    pub fn can_control(self) -> bool {
        self >= Self::Editor
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Viewer => write!(f, "viewer"),
            Self::Editor => write!(f, "editor"),
            Self::Admin => write!(f, "admin"),
            Self::Owner => write!(f, "owner"),
        }
    }
}

/// Source of the local player's permission level.
pub trait Permission {
    fn level(&self) -> PermissionLevel;
}

impl Permission for PermissionLevel {
    fn level(&self) -> PermissionLevel {
        *self
    }
}
