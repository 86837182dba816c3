use crate::errors::AcoError;
use log::info;
use serde::Deserialize;

pub const DEFAULT_SETTINGS_FILE: &str = "aco";

// Trail settings
pub const TRAIL_DEFAULT: f64 = f64::MIN_POSITIVE;
pub const TRAIL_MINIMUM: f64 = f64::MIN_POSITIVE;
pub const TRAIL_POWER: f64 = 0.5;
/// Fraction of every trail that evaporates each round.
pub const TRAIL_DECAY: f64 = 0.5;
pub const TRAIL_REWARD: f64 = 0.5;
/// Share of the global trail layer fed back into every target's layer.
pub const TRAIL_FEEDBACK: f64 = 0.1;

// Ant settings
pub const HEURISTIC_POWER: f64 = 0.5;
pub const ITERATION_LIMIT: usize = 10000;
pub const ANT_COUNT: usize = 10;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub trail_default: f64,
    pub trail_minimum: f64,
    /// Exponent applied to an edge's trail when an ant scores it.
    pub trail_power: f64,
    /// Exponent applied to an edge's heuristic when an ant scores it.
    pub heuristic_power: f64,
    pub trail_decay: f64,
    pub trail_reward: f64,
    pub trail_feedback: f64,
    /// Steps an ant may take before it counts as lost.
    pub iteration_limit: usize,
    /// Reports collected before the trails are updated.
    pub ant_count: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            trail_default: TRAIL_DEFAULT,
            trail_minimum: TRAIL_MINIMUM,
            trail_power: TRAIL_POWER,
            heuristic_power: HEURISTIC_POWER,
            trail_decay: TRAIL_DECAY,
            trail_reward: TRAIL_REWARD,
            trail_feedback: TRAIL_FEEDBACK,
            iteration_limit: ITERATION_LIMIT,
            ant_count: ANT_COUNT,
        }
    }
}

/// A partial settings change. Only the fields that are set get merged.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct SettingsUpdate {
    pub trail_default: Option<f64>,
    pub trail_minimum: Option<f64>,
    pub trail_power: Option<f64>,
    pub heuristic_power: Option<f64>,
    pub trail_decay: Option<f64>,
    pub trail_reward: Option<f64>,
    pub trail_feedback: Option<f64>,
    pub iteration_limit: Option<usize>,
    pub ant_count: Option<usize>,
}

impl Settings {
    /// Layers the defaults, an optional settings file and `ACO_` prefixed
    /// environment variables, in that order.
    pub fn load_from_file(settings_file_name: &str) -> Result<Self, AcoError> {
        let mut settings = config::Config::default();
        settings.merge(config::File::with_name(settings_file_name).required(false))?;
        settings.merge(config::Environment::with_prefix("ACO"))?;
        let settings: Settings = settings.try_into()?;
        settings.validate()?;

        info!(
            "successfully loaded settings from '{}'",
            &settings_file_name
        );

        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), AcoError> {
        let positive = [
            ("trail_default", self.trail_default),
            ("trail_minimum", self.trail_minimum),
            ("trail_power", self.trail_power),
            ("heuristic_power", self.heuristic_power),
            ("trail_reward", self.trail_reward),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(AcoError::InvalidSetting { name, value });
            }
        }

        let fractions = [
            ("trail_decay", self.trail_decay),
            ("trail_feedback", self.trail_feedback),
        ];
        for (name, value) in fractions {
            if !(value > 0.0 && value <= 1.0) {
                return Err(AcoError::InvalidSetting { name, value });
            }
        }

        if self.trail_minimum > 1.0 {
            return Err(AcoError::InvalidSetting {
                name: "trail_minimum",
                value: self.trail_minimum,
            });
        }

        // trails start at the default and must stay within [trail_minimum, 1]
        if self.trail_default > 1.0 || self.trail_default < self.trail_minimum {
            return Err(AcoError::InvalidSetting {
                name: "trail_default",
                value: self.trail_default,
            });
        }

        if self.iteration_limit == 0 {
            return Err(AcoError::InvalidSetting {
                name: "iteration_limit",
                value: 0.0,
            });
        }

        Ok(())
    }

    /// A copy of these settings with every field of `update` applied.
    pub fn merged(&self, update: &SettingsUpdate) -> Settings {
        let mut settings = self.clone();
        if let Some(val) = update.trail_default {
            settings.trail_default = val;
        }
        if let Some(val) = update.trail_minimum {
            settings.trail_minimum = val;
        }
        if let Some(val) = update.trail_power {
            settings.trail_power = val;
        }
        if let Some(val) = update.heuristic_power {
            settings.heuristic_power = val;
        }
        if let Some(val) = update.trail_decay {
            settings.trail_decay = val;
        }
        if let Some(val) = update.trail_reward {
            settings.trail_reward = val;
        }
        if let Some(val) = update.trail_feedback {
            settings.trail_feedback = val;
        }
        if let Some(val) = update.iteration_limit {
            settings.iteration_limit = val;
        }
        if let Some(val) = update.ant_count {
            settings.ant_count = val;
        }
        settings
    }

    pub fn did_trail_settings_change(&self, other: &Self) -> bool {
        self.trail_default != other.trail_default
            || self.trail_minimum != other.trail_minimum
            || self.trail_decay != other.trail_decay
            || self.trail_reward != other.trail_reward
            || self.trail_feedback != other.trail_feedback
    }

    pub fn did_ant_settings_change(&self, other: &Self) -> bool {
        self.trail_power != other.trail_power
            || self.heuristic_power != other.heuristic_power
            || self.iteration_limit != other.iteration_limit
            || self.ant_count != other.ant_count
    }
}
