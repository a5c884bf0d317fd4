#![forbid(unsafe_code)]

//! Choreography tuning as data.
//!
//! [`ChoreographyConfig`] gathers every timing the controller and scheduler
//! use: effect durations, pacing between remote movements, notice lifetime,
//! the initial-flip count, and the reconnect policy. With the `policy-config`
//! feature it loads from TOML or JSON; unspecified fields keep their
//! defaults.
//!
//! ```toml
//! initial_flip_count = 2
//! notice_ttl_ms = 2500
//!
//! [durations]
//! arc_move_ms = 320
//!
//! [pacing]
//! computer_pause_ms = 600
//!
//! [reconnect]
//! max_attempts = 4
//! backoff = { strategy = "linear", base_ms = 500, max_ms = 4000 }
//! ```

#[cfg(feature = "policy-config")]
use std::path::Path;

#[cfg(feature = "policy-config")]
use serde::{Deserialize, Serialize};

use fairway_core::snapshot::HAND_SIZE;
use web_time::Duration;

use crate::retry::ReconnectPolicy;

/// Glow loops longer than this would outlive a typical turn.
const MAX_GLOW_REPEATS: u32 = 16;

/// Top-level choreography configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "policy-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct ChoreographyConfig {
    pub durations: DurationConfig,
    pub pacing: PacingConfig,
    /// Lifetime of a transient notice.
    pub notice_ttl_ms: u64,
    /// Positions selected before `flip-initial` is sent.
    pub initial_flip_count: usize,
    pub reconnect: ReconnectPolicy,
}

impl Default for ChoreographyConfig {
    fn default() -> Self {
        Self {
            durations: DurationConfig::default(),
            pacing: PacingConfig::default(),
            notice_ttl_ms: 3_000,
            initial_flip_count: 2,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Length of each card effect.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "policy-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct DurationConfig {
    pub flip_ms: u64,
    pub arc_move_ms: u64,
    pub pulse_ms: u64,
    pub lift_settle_ms: u64,
    pub shake_ms: u64,
    /// One glow of the turn indicator.
    pub glow_period_ms: u64,
    /// Extra glows after the first.
    pub glow_repeats: u32,
}

impl Default for DurationConfig {
    fn default() -> Self {
        Self {
            flip_ms: 240,
            arc_move_ms: 360,
            pulse_ms: 400,
            lift_settle_ms: 300,
            shake_ms: 280,
            glow_period_ms: 700,
            glow_repeats: 2,
        }
    }
}

impl DurationConfig {
    pub fn flip(&self) -> Duration {
        Duration::from_millis(self.flip_ms)
    }

    pub fn arc_move(&self) -> Duration {
        Duration::from_millis(self.arc_move_ms)
    }

    pub fn pulse(&self) -> Duration {
        Duration::from_millis(self.pulse_ms)
    }

    pub fn lift_settle(&self) -> Duration {
        Duration::from_millis(self.lift_settle_ms)
    }

    pub fn shake(&self) -> Duration {
        Duration::from_millis(self.shake_ms)
    }

    pub fn glow_period(&self) -> Duration {
        Duration::from_millis(self.glow_period_ms)
    }
}

/// Pauses inserted before remote movements.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "policy-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct PacingConfig {
    /// Before each movement by a computer-controlled player.
    pub computer_pause_ms: u64,
    /// Before each movement by another human.
    pub human_pause_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            computer_pause_ms: 450,
            human_pause_ms: 0,
        }
    }
}

impl PacingConfig {
    /// Pause before a movement by a player of the given kind.
    pub fn pause(&self, computer_controlled: bool) -> Duration {
        Duration::from_millis(if computer_controlled {
            self.computer_pause_ms
        } else {
            self.human_pause_ms
        })
    }
}

impl ChoreographyConfig {
    /// Load from a TOML string.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "policy-config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "policy-config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Every out-of-range parameter. Empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let d = &self.durations;
        for (name, ms) in [
            ("durations.flip_ms", d.flip_ms),
            ("durations.arc_move_ms", d.arc_move_ms),
            ("durations.pulse_ms", d.pulse_ms),
            ("durations.lift_settle_ms", d.lift_settle_ms),
            ("durations.shake_ms", d.shake_ms),
            ("durations.glow_period_ms", d.glow_period_ms),
        ] {
            if ms == 0 {
                errors.push(format!("{name} must be > 0"));
            }
        }
        if d.glow_repeats > MAX_GLOW_REPEATS {
            errors.push(format!(
                "durations.glow_repeats must be <= {MAX_GLOW_REPEATS}, got {}",
                d.glow_repeats
            ));
        }
        if self.notice_ttl_ms == 0 {
            errors.push("notice_ttl_ms must be > 0".into());
        }
        if self.initial_flip_count == 0 || self.initial_flip_count > HAND_SIZE {
            errors.push(format!(
                "initial_flip_count must be in 1..={HAND_SIZE}, got {}",
                self.initial_flip_count
            ));
        }
        errors.extend(self.reconnect.problems());
        errors
    }

    /// `self` if valid, otherwise every problem at once.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.notice_ttl_ms)
    }

    /// Format as a JSONL line for structured logging.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        format!(
            r#"{{"schema":"choreography-config-v1","flip_ms":{},"arc_move_ms":{},"computer_pause_ms":{},"human_pause_ms":{},"notice_ttl_ms":{},"initial_flip_count":{},"reconnect_max_attempts":{}}}"#,
            self.durations.flip_ms,
            self.durations.arc_move_ms,
            self.pacing.computer_pause_ms,
            self.pacing.human_pause_ms,
            self.notice_ttl_ms,
            self.initial_flip_count,
            self.reconnect.max_attempts,
        )
    }
}

/// Errors from loading a configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    #[cfg(feature = "policy-config")]
    Toml(toml::de::Error),
    #[cfg(feature = "policy-config")]
    Json(serde_json::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "policy-config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "policy-config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => write!(f, "validation errors: {}", errors.join("; ")),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "policy-config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "policy-config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ChoreographyConfig::default();
        assert!(config.validate().is_empty(), "{:?}", config.validate());
        assert_eq!(config.initial_flip_count, 2);
        assert!(config.clone().validated().is_ok());
    }

    #[test]
    fn every_problem_is_reported() {
        let mut config = ChoreographyConfig::default();
        config.durations.flip_ms = 0;
        config.durations.glow_repeats = 100;
        config.initial_flip_count = 7;
        config.notice_ttl_ms = 0;
        let errors = config.validate();
        assert_eq!(errors.len(), 4, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("flip_ms")));
        match config.validated() {
            Err(ConfigError::Validation(list)) => assert_eq!(list.len(), 4),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn pacing_depends_on_controller() {
        let pacing = PacingConfig::default();
        assert_eq!(pacing.pause(true), Duration::from_millis(450));
        assert_eq!(pacing.pause(false), Duration::ZERO);
    }

    #[test]
    fn jsonl_is_one_line() {
        let line = ChoreographyConfig::default().to_jsonl();
        assert!(line.starts_with(r#"{"schema":"choreography-config-v1""#));
        assert!(!line.contains('\n'));
    }
}
