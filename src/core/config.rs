//! Player tuning: timing floors, blink period, audio levels and entry gate.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Runtime tuning for a `Presentation`. Every field has a default, so a
/// config file only needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Hard floor on the per-character delay.
    pub min_interval_ms: u64,
    /// Typing speed multiplier for sections that do not set their own.
    pub default_speed_factor: f64,
    /// Delay before a silent bridge step moves on by itself.
    pub bridge_delay_ms: u64,
    pub cursor_blink_ms: u64,
    /// Extra hold at a slide's `pause_at` marks when the slide sets no `pause_ms`.
    pub default_pause_ms: u64,
    pub keystroke_volume: f32,
    pub narration_volume: f32,
    pub playback_rate: f32,
    /// Period of the internal narration position check. `None` means the
    /// host pushes positions through `observe_audio_position`.
    pub audio_poll_ms: Option<u64>,
    /// Start in the pre-start state and wait for an explicit `begin`.
    pub entry_gate: bool,
    /// Keep narration paused regardless of slide windows.
    pub audio_paused: bool,
    /// Shuffle the fact deck with this seed; sequential order when absent.
    pub fact_seed: Option<u64>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 15,
            default_speed_factor: 0.5,
            bridge_delay_ms: 200,
            cursor_blink_ms: 500,
            default_pause_ms: 400,
            keystroke_volume: 0.2,
            narration_volume: 1.0,
            playback_rate: 1.0,
            audio_poll_ms: Some(250),
            entry_gate: false,
            audio_paused: false,
            fact_seed: None,
        }
    }
}

impl PlayerConfig {
    pub fn load_from_ron(path: &Path) -> Result<PlayerConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<PlayerConfig, ConfigError> {
        let config: PlayerConfig = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cursor_blink_ms == 0 {
            return Err(invalid("cursor_blink_ms", "must be positive"));
        }
        if self.bridge_delay_ms == 0 {
            return Err(invalid("bridge_delay_ms", "must be positive"));
        }
        if !self.default_speed_factor.is_finite() || self.default_speed_factor <= 0.0 {
            return Err(invalid(
                "default_speed_factor",
                format!("must be positive, got {}", self.default_speed_factor),
            ));
        }
        if !(0.0..=1.0).contains(&self.keystroke_volume) {
            return Err(invalid(
                "keystroke_volume",
                format!("must be within 0..=1, got {}", self.keystroke_volume),
            ));
        }
        if !(0.0..=1.0).contains(&self.narration_volume) {
            return Err(invalid(
                "narration_volume",
                format!("must be within 0..=1, got {}", self.narration_volume),
            ));
        }
        if !self.playback_rate.is_finite() || self.playback_rate <= 0.0 {
            return Err(invalid(
                "playback_rate",
                format!("must be positive, got {}", self.playback_rate),
            ));
        }
        if self.audio_poll_ms == Some(0) {
            return Err(invalid("audio_poll_ms", "must be positive when set"));
        }
        Ok(())
    }

    /// Delay between revealed characters for a slide interval and section factor.
    pub fn tick_interval_ms(&self, typing_interval_ms: u64, speed_factor: f64) -> u64 {
        let scaled = (typing_interval_ms as f64 * speed_factor).round() as u64;
        scaled.max(self.min_interval_ms)
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PlayerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_interval_ms, 15);
        assert_eq!(config.bridge_delay_ms, 200);
        assert_eq!(config.cursor_blink_ms, 500);
    }

    #[test]
    fn tick_interval_applies_factor_and_floor() {
        let config = PlayerConfig::default();
        assert_eq!(config.tick_interval_ms(140, 0.5), 70);
        assert_eq!(config.tick_interval_ms(80, 0.4), 32);
        assert_eq!(config.tick_interval_ms(20, 0.5), 15);
        assert_eq!(config.tick_interval_ms(1, 0.4), 15);
    }

    #[test]
    fn partial_ron_keeps_defaults() {
        let config = PlayerConfig::parse_ron("PlayerConfig(entry_gate: true, bridge_delay_ms: 750)")
            .unwrap();
        assert!(config.entry_gate);
        assert_eq!(config.bridge_delay_ms, 750);
        assert_eq!(config.cursor_blink_ms, 500);
        assert_eq!(config.audio_poll_ms, Some(250));
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(PlayerConfig::parse_ron("PlayerConfig(cursor_blink_ms: 0)").is_err());
        assert!(PlayerConfig::parse_ron("PlayerConfig(bridge_delay_ms: 0)").is_err());
        assert!(PlayerConfig::parse_ron("PlayerConfig(playback_rate: 0.0)").is_err());
        assert!(PlayerConfig::parse_ron("PlayerConfig(keystroke_volume: 1.5)").is_err());
        assert!(PlayerConfig::parse_ron("PlayerConfig(audio_poll_ms: Some(0))").is_err());
        assert!(PlayerConfig::parse_ron("PlayerConfig(default_speed_factor: -1.0)").is_err());
    }

    #[test]
    fn load_test_config_from_ron() {
        let path = std::path::PathBuf::from("tests/fixtures/test_config.ron");
        let config = PlayerConfig::load_from_ron(&path).unwrap();
        assert!(config.entry_gate);
        assert_eq!(config.keystroke_volume, 0.2);
    }
}
