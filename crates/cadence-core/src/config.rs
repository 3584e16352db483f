//! Runtime configuration
//!
//! Every field has a default, so an empty TOML document (or no file at all)
//! yields a usable configuration.

use crate::{CadenceError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Timer worker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Capacity of the bounded submission queue feeding the worker
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Name given to the worker thread
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            thread_name: default_thread_name(),
        }
    }
}

fn default_queue_capacity() -> usize {
    256
}
fn default_thread_name() -> String {
    "cadence-timer".to_string()
}

/// Frame clock settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Width of the frame-rate counting window in milliseconds
    #[serde(default = "default_frame_rate_window_ms")]
    pub frame_rate_window_ms: u64,
    /// Upper bound for a single frame's delta time. 0 disables clamping.
    #[serde(default)]
    pub max_delta_seconds: f32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            frame_rate_window_ms: default_frame_rate_window_ms(),
            max_delta_seconds: 0.0,
        }
    }
}

fn default_frame_rate_window_ms() -> u64 {
    1000
}

/// Top-level runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// The host frame counter runs 0..=frame_index_wrap and then starts over
    #[serde(default = "default_frame_index_wrap")]
    pub frame_index_wrap: u32,
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub clock: ClockConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            frame_index_wrap: default_frame_index_wrap(),
            timer: TimerConfig::default(),
            clock: ClockConfig::default(),
        }
    }
}

fn default_frame_index_wrap() -> u32 {
    60
}

impl RuntimeConfig {
    /// Parse and validate a config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RuntimeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Write the config as pretty TOML
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the runtime cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.timer.queue_capacity == 0 {
            return Err(invalid("timer.queue_capacity", "must be at least 1"));
        }
        if self.clock.frame_rate_window_ms == 0 {
            return Err(invalid("clock.frame_rate_window_ms", "must be at least 1"));
        }
        if self.clock.max_delta_seconds < 0.0 || !self.clock.max_delta_seconds.is_finite() {
            return Err(invalid(
                "clock.max_delta_seconds",
                "must be a finite value >= 0",
            ));
        }
        if self.frame_index_wrap == 0 {
            return Err(invalid("frame_index_wrap", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> CadenceError {
    CadenceError::InvalidConfig {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = RuntimeConfig::from_toml_str("").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.frame_index_wrap, 60);
        assert_eq!(config.timer.queue_capacity, 256);
        assert_eq!(config.clock.frame_rate_window_ms, 1000);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            [timer]
            queue_capacity = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.timer.queue_capacity, 4);
        assert_eq!(config.timer.thread_name, "cadence-timer");
        assert_eq!(config.clock, ClockConfig::default());
    }

    #[test]
    fn zero_capacity_rejected() {
        let err = RuntimeConfig::from_toml_str("[timer]\nqueue_capacity = 0").unwrap_err();
        match err {
            CadenceError::InvalidConfig { field, .. } => assert_eq!(field, "timer.queue_capacity"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn negative_delta_clamp_rejected() {
        let result = RuntimeConfig::from_toml_str("[clock]\nmax_delta_seconds = -1.0");
        assert!(matches!(result, Err(CadenceError::InvalidConfig { .. })));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let result = RuntimeConfig::from_toml_str("frame_index_wrap = \"sixty\"");
        assert!(matches!(result, Err(CadenceError::TomlParseError(_))));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runtime.toml");

        let mut config = RuntimeConfig::default();
        config.frame_index_wrap = 30;
        config.clock.max_delta_seconds = 0.25;
        config.save_to_file(&path).expect("save failed");

        let loaded = RuntimeConfig::load_from_file(&path).expect("load failed");
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = RuntimeConfig::load_from_file(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(CadenceError::IoError(_))));
    }
}
