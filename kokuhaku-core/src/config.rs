//! Configuration for the confession game.
//!
//! Maps directly to `kokuhaku.toml`. Every section is optional; missing keys
//! fall back to the tuning the game was balanced with.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, Result};

/// Top-level game configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameConfig {
    /// Logging settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Conversation ledger capacity.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Repetition detection.
    #[serde(default)]
    pub repetition: RepetitionConfig,
    /// Confession resolution.
    #[serde(default)]
    pub confession: ConfessionConfig,
    /// Session lifecycle.
    #[serde(default)]
    pub session: SessionConfig,
    /// Generation options passed to the model.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Special-event thresholds.
    #[serde(default)]
    pub events: EventsConfig,
}

impl GameConfig {
    /// Load configuration from a TOML string and validate it.
    ///
    /// # Errors
    /// Returns `CoreError::Config` if the TOML is invalid or a value is out
    /// of range.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| CoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        debug!(path = %path.display(), "Loaded game configuration");
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    ///
    /// # Errors
    /// Returns `CoreError::Config` naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(CoreError::Config(msg.to_string()));
        if self.ledger.max_entries == 0 {
            return fail("ledger.max_entries must be at least 1");
        }
        if self.repetition.window == 0 {
            return fail("repetition.window must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.repetition.threshold) {
            return fail("repetition.threshold must lie in [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.confession.trust_ratio) {
            return fail("confession.trust_ratio must lie in [0, 1]");
        }
        if !(0..=100).contains(&self.confession.tension_ceiling) {
            return fail("confession.tension_ceiling must lie in [0, 100]");
        }
        if self.confession.max_failures == 0 {
            return fail("confession.max_failures must be at least 1");
        }
        if self.llm.max_tokens == 0 {
            return fail("llm.max_tokens must be at least 1");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones.
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

/// Conversation ledger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Entries kept per session before the oldest is evicted.
    #[serde(default = "default_20_usize")]
    pub max_entries: usize,
    /// Entries quoted verbatim in the prompt's history section.
    #[serde(default = "default_3_usize")]
    pub prompt_history: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_entries: 20,
            prompt_history: 3,
        }
    }
}

/// Repetition detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepetitionConfig {
    /// How many previous user inputs are compared against.
    #[serde(default = "default_3_usize")]
    pub window: usize,
    /// Similarity at or above which an input counts as repetitive.
    #[serde(default = "default_0_8")]
    pub threshold: f64,
}

impl Default for RepetitionConfig {
    fn default() -> Self {
        Self {
            window: 3,
            threshold: 0.8,
        }
    }
}

/// Confession resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfessionConfig {
    /// Failed confessions that end the game.
    #[serde(default = "default_3_u32")]
    pub max_failures: u32,
    /// Tension above which a confession always fails.
    #[serde(default = "default_70")]
    pub tension_ceiling: i32,
    /// Fraction of the success threshold required in trust.
    #[serde(default = "default_0_6")]
    pub trust_ratio: f64,
}

impl Default for ConfessionConfig {
    fn default() -> Self {
        Self {
            max_failures: 3,
            tension_ceiling: 70,
            trust_ratio: 0.6,
        }
    }
}

/// Session lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds of inactivity after which a registry slot may be evicted.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    /// Fixed user-role message sent alongside the system prompt.
    #[serde(default = "default_placeholder")]
    pub placeholder_user_message: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout(),
            placeholder_user_message: default_placeholder(),
        }
    }
}

/// Generation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Sampling temperature.
    #[serde(default = "default_0_8_f32")]
    pub temperature: f32,
    /// Completion token cap.
    #[serde(default = "default_1000")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            max_tokens: 1000,
        }
    }
}

/// One-shot special-event thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Affection that fires `high_affection`.
    #[serde(default = "default_80")]
    pub high_affection: i32,
    /// Trust that fires `high_trust`.
    #[serde(default = "default_85")]
    pub high_trust: i32,
    /// Turn count that fires `long_conversation`.
    #[serde(default = "default_20_u32")]
    pub long_conversation_turns: u32,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            high_affection: 80,
            high_trust: 85,
            long_conversation_turns: 20,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde requires named functions)
// ---------------------------------------------------------------------------

fn default_log_level() -> String { "info".to_string() }
fn default_placeholder() -> String { "上記の設定に従って、キャラクターとして返答してください。".to_string() }
fn default_idle_timeout() -> u64 { 3600 }
fn default_0_6() -> f64 { 0.6 }
fn default_0_8() -> f64 { 0.8 }
fn default_0_8_f32() -> f32 { 0.8 }
fn default_3_u32() -> u32 { 3 }
fn default_3_usize() -> usize { 3 }
fn default_20_u32() -> u32 { 20 }
fn default_20_usize() -> usize { 20 }
fn default_70() -> i32 { 70 }
fn default_80() -> i32 { 80 }
fn default_85() -> i32 { 85 }
fn default_1000() -> u32 { 1000 }

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ledger.max_entries, 20);
        assert_eq!(config.confession.max_failures, 3);
        assert_eq!(config.events.high_trust, 85);
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config = GameConfig::from_toml("").expect("parse");
        assert_eq!(config.repetition.window, 3);
        assert!((config.repetition.threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.session.idle_timeout_secs, 3600);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = GameConfig::from_toml(
            r#"
            [ledger]
            max_entries = 15

            [general]
            json_logs = true
            "#,
        )
        .expect("parse");
        assert_eq!(config.ledger.max_entries, 15);
        assert_eq!(config.ledger.prompt_history, 3);
        assert!(config.general.json_logs);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = GameConfig::from_toml("[ledger]\nmax_entries = 0\n").expect_err("zero cap");
        assert!(err.to_string().contains("max_entries"));
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        assert!(GameConfig::from_toml("[repetition]\nthreshold = 1.5\n").is_err());
        assert!(GameConfig::from_toml("[confession]\ntrust_ratio = -0.1\n").is_err());
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = GameConfig::from_toml("[ledger\nmax_entries = ").expect_err("malformed");
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "[events]\nhigh_affection = 75").expect("write");
        let config = GameConfig::from_file(file.path()).expect("load");
        assert_eq!(config.events.high_affection, 75);
        assert_eq!(config.events.long_conversation_turns, 20);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = GameConfig::from_file(std::path::Path::new("/nonexistent/kokuhaku.toml"))
            .expect_err("missing file");
        assert!(matches!(err, CoreError::Io(_)));
    }
}
