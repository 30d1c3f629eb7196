use std::env;
use std::str::FromStr;

use tracing::warn;

pub(crate) const USER_ENV_VAR: &str = "EMBER_USER";
pub(crate) const SLOT_ENV_VAR: &str = "EMBER_SLOT";
pub(crate) const START_LEVEL_ENV_VAR: &str = "EMBER_START_LEVEL";
pub(crate) const TICKS_ENV_VAR: &str = "EMBER_TICKS";
pub(crate) const TICK_HZ_ENV_VAR: &str = "EMBER_TICK_HZ";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GameConfig {
    pub(crate) user: String,
    pub(crate) slot: String,
    pub(crate) start_level: u32,
    pub(crate) ticks: u32,
    pub(crate) tick_hz: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            user: "local".to_string(),
            slot: "slot1".to_string(),
            start_level: 1,
            ticks: 600,
            tick_hz: 60.0,
        }
    }
}

impl GameConfig {
    pub(crate) fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Unparseable values are logged and the default kept.
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str, fallback: String| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
                .unwrap_or(fallback)
        };
        Self {
            user: text(USER_ENV_VAR, defaults.user),
            slot: text(SLOT_ENV_VAR, defaults.slot),
            start_level: parsed(&lookup, START_LEVEL_ENV_VAR, defaults.start_level).max(1),
            ticks: parsed(&lookup, TICKS_ENV_VAR, defaults.ticks),
            tick_hz: Some(parsed(&lookup, TICK_HZ_ENV_VAR, defaults.tick_hz))
                .filter(|hz| hz.is_finite() && *hz > 0.0)
                .unwrap_or(defaults.tick_hz),
        }
    }

    pub(crate) fn dt(&self) -> f32 {
        1.0 / self.tick_hz
    }
}

fn parsed<T: FromStr + Copy>(lookup: &impl Fn(&str) -> Option<String>, key: &str, fallback: T) -> T {
    let Some(raw) = lookup(key) else {
        return fallback;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(var = key, value = %raw, "config_value_ignored");
            fallback
        }
    }
}
