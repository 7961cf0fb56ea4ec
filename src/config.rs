//! Controller configuration.
//!
//! Every setting has a default, so an empty file is a valid configuration.
//! Durations are written as (fractional) seconds:
//!
//! ```toml
//! player = 0              # 0 = video, 1 = stream
//! loop = false
//! retry_after = 5.1
//! max_error_retry = 5
//! repeat_cooldown = 0.6
//! sync_frequency = 9.8
//! sync_tolerance = 1.0
//! standard_delay = 1.5
//! resync_delay = 1.0
//! forward_interval = 3.0  # omit to never advance automatically
//! history_size = 20
//! ```

use std::{fs, path::Path, str::FromStr, time::Duration};

use serde::Deserialize;
use serde_with::{serde_as, DurationSecondsWithFrac};

use crate::{
    backend::PlayerKind,
    error::{Error, Result},
};

#[serde_as]
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Player kind a new session starts on.
    pub player: PlayerKind,

    /// Whether a new session starts looping.
    #[serde(rename = "loop")]
    pub looping: bool,

    /// Minimum time between two load attempts when retrying after an error.
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub retry_after: Duration,

    /// Consecutive transient errors to retry before giving up.
    pub max_error_retry: u32,

    /// Minimum time between two corrective seeks into the repeat window.
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub repeat_cooldown: Duration,

    /// Cadence of follower clock reconciliation.
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub sync_frequency: Duration,

    /// Drift in seconds that a follower tolerates before seeking.
    pub sync_tolerance: f64,

    /// Backend and network latency in seconds compensated in sync points.
    pub standard_delay: f64,

    /// Delay of the forced reconciliation pass after playback starts.
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub resync_delay: Duration,

    /// Delay before advancing to the next queued track after the current
    /// one ended, or `None` to never advance automatically.
    #[serde_as(as = "Option<DurationSecondsWithFrac<f64>>")]
    pub forward_interval: Option<Duration>,

    /// Number of finished tracks kept in the recent history.
    pub history_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            player: PlayerKind::default(),
            looping: false,
            retry_after: Duration::from_millis(5100),
            max_error_retry: 5,
            repeat_cooldown: Duration::from_millis(600),
            sync_frequency: Duration::from_millis(9800),
            sync_tolerance: 1.0,
            standard_delay: 1.5,
            resync_delay: Duration::from_secs(1),
            forward_interval: None,
            history_size: 20,
        }
    }
}

impl Config {
    /// Configuration files are tiny; anything larger is not one.
    const MAX_FILE_SIZE: u64 = 64 * 1024;

    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is larger than 64 KiB,
    /// is not valid TOML or contains invalid values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let file_size = fs::metadata(path)?.len();
        if file_size > Self::MAX_FILE_SIZE {
            return Err(Error::invalid_argument(format!(
                "{} is too large ({file_size} bytes)",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path)?;
        let config = contents.parse()?;
        debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Checks values that the type system cannot.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a negative or non-finite tolerance or
    /// a non-finite standard delay.
    pub fn validate(&self) -> Result<()> {
        if !self.sync_tolerance.is_finite() || self.sync_tolerance < 0.0 {
            return Err(Error::invalid_argument(format!(
                "sync tolerance must be a non-negative number ({})",
                self.sync_tolerance
            )));
        }

        if !self.standard_delay.is_finite() {
            return Err(Error::invalid_argument(format!(
                "standard delay must be finite ({})",
                self.standard_delay
            )));
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn empty_file_is_default() {
        assert_eq!("".parse::<Config>().unwrap(), Config::default());
    }

    #[test]
    fn parses_fractional_seconds() {
        let config: Config = r"
            player = 1
            loop = true
            retry_after = 2.5
            forward_interval = 3.0
        "
        .parse()
        .unwrap();

        assert_eq!(config.player, PlayerKind::Stream);
        assert!(config.looping);
        assert_eq!(config.retry_after, Duration::from_millis(2500));
        assert_eq!(config.forward_interval, Some(Duration::from_secs(3)));
        assert_eq!(config.max_error_retry, 5);
    }

    #[test]
    fn rejects_invalid_values() {
        let err = "sync_tolerance = -1.0".parse::<Config>().unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);

        let err = "no_such_key = 1".parse::<Config>().unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = Config::from_file("/nonexistent/sharecast.toml").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
