//! Named settings bundles, picked by name from the driver.

use crate::{errors::AcoError, settings::Settings};

pub struct Preset {
    pub name: &'static str,
    pub settings: Settings,
}

pub struct PresetManager {
    presets: Vec<Preset>,
}

impl PresetManager {
    pub fn new(presets: Vec<Preset>) -> Self {
        Self { presets }
    }

    /// Settings of the preset called `name`, case insensitive.
    pub fn settings_for(&self, name: &str) -> Result<Settings, AcoError> {
        self.presets
            .iter()
            .find(|preset| preset.name.eq_ignore_ascii_case(name))
            .map(|preset| preset.settings.clone())
            .ok_or_else(|| AcoError::UnknownPreset(name.to_owned()))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.presets.iter().map(|preset| preset.name).collect()
    }
}

pub fn init_preset_manager() -> PresetManager {
    PresetManager::new(vec![
        Preset {
            name: "Default",
            settings: Settings::default(),
        },
        // Trails barely matter, ants follow the heuristic and spread out
        Preset {
            name: "Exploratory",
            settings: Settings {
                trail_power: 0.1,
                heuristic_power: 0.3,
                trail_decay: 0.8,
                trail_reward: 0.2,
                trail_feedback: 0.05,
                ant_count: 50,
                ..Settings::default()
            },
        },
        Preset {
            name: "Greedy",
            settings: Settings {
                trail_power: 1.0,
                heuristic_power: 1.0,
                trail_decay: 0.3,
                trail_reward: 0.9,
                trail_feedback: 0.2,
                iteration_limit: 2000,
                ..Settings::default()
            },
        },
        // Slow evaporation, routes linger long after they stop being used
        Preset {
            name: "Persistent",
            settings: Settings {
                trail_minimum: 1e-6,
                trail_default: 1e-6,
                trail_power: 0.7,
                trail_decay: 0.05,
                trail_reward: 0.5,
                trail_feedback: 0.5,
                ant_count: 20,
                ..Settings::default()
            },
        },
    ])
}
