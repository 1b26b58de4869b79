//! Engine configuration from the environment.

use std::time::Duration;

const DEFAULT_HISTORY_DB: &str = "roll_history.db";
const DEFAULT_WAVE_DELAY_MS: u64 = 450;
const DEFAULT_RULESET: &str = "saga";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// SQLite file holding roll history
    pub history_db: String,
    /// Pause between animation waves
    pub wave_delay: Duration,
    /// Ruleset used when a context names none
    pub default_ruleset: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_db: DEFAULT_HISTORY_DB.to_string(),
            wave_delay: Duration::from_millis(DEFAULT_WAVE_DELAY_MS),
            default_ruleset: DEFAULT_RULESET.to_string(),
        }
    }
}

impl EngineConfig {
    /// Read `ROLL_HISTORY_DB`, `PLAYBACK_WAVE_DELAY_MS` and `DEFAULT_RULESET`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Missing, blank or unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| {
            lookup(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let wave_delay_ms = match value("PLAYBACK_WAVE_DELAY_MS") {
            Some(raw) => raw.parse::<u64>().unwrap_or_else(|_| {
                tracing::warn!(
                    value = %raw,
                    default = DEFAULT_WAVE_DELAY_MS,
                    "Invalid PLAYBACK_WAVE_DELAY_MS, using default"
                );
                DEFAULT_WAVE_DELAY_MS
            }),
            None => DEFAULT_WAVE_DELAY_MS,
        };

        Self {
            history_db: value("ROLL_HISTORY_DB").unwrap_or_else(|| DEFAULT_HISTORY_DB.into()),
            wave_delay: Duration::from_millis(wave_delay_ms),
            default_ruleset: value("DEFAULT_RULESET")
                .map(|s| s.to_lowercase())
                .unwrap_or_else(|| DEFAULT_RULESET.into()),
        }
    }
}
