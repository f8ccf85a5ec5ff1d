// hrm-emulator Source Code File
//
// Copyright 2026 The hrm-emulator Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Emulator configuration, loaded from a TOML file. Every field has a default, so an empty file
//! (or no file at all) reproduces the stock Heart Rate tracker.
//!
//! ```toml
//! alias = "Flutter Health Tracker"
//! tick_interval_ms = 2000
//! seed = 42
//!
//! [simulation.heart_rate]
//! initial = 72
//! min = 60
//! max = 120
//! step_down = -3
//! step_up = 5
//!
//! [device_information]
//! manufacturer = "Acme Wearables"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::emulator::simulation::SimulationConfig;
use crate::gatt::DEFAULT_BASE_PATH;
use crate::{Error, Result};

pub const DEFAULT_ALIAS: &str = "Flutter Health Tracker";
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 2000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmulatorConfig {
    /// Name the adapter advertises under.
    pub alias: String,
    /// Object path prefix for services and characteristics.
    pub base_path: String,
    pub tick_interval_ms: u64,
    /// Seed for the random walks. Unseeded runs draw from the OS.
    pub seed: Option<u64>,
    pub simulation: SimulationConfig,
    /// When present, a Device Information service is published next to Heart Rate.
    pub device_information: Option<DeviceInformation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceInformation {
    pub manufacturer: String,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        EmulatorConfig {
            alias: DEFAULT_ALIAS.to_string(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            seed: None,
            simulation: SimulationConfig::default(),
            device_information: None,
        }
    }
}

impl EmulatorConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: EmulatorConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.alias.trim().is_empty() {
            return Err(Error::InvalidConfig("alias must not be empty".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "tick_interval_ms must be greater than zero".into(),
            ));
        }
        if !self.base_path.starts_with('/') {
            return Err(Error::InvalidConfig(format!(
                "base_path {:?} must be an absolute object path",
                self.base_path
            )));
        }
        self.simulation.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = EmulatorConfig::from_toml("").unwrap();
        assert_eq!(config, EmulatorConfig::default());
        assert_eq!(config.tick_interval(), Duration::from_secs(2));
        assert_eq!(config.simulation.heart_rate.initial, 72);
    }

    #[test]
    fn partial_tables_override_defaults() {
        let config = EmulatorConfig::from_toml(
            r#"
            alias = "Bench Tracker"
            tick_interval_ms = 500
            seed = 9

            [simulation.stress]
            initial = 50
            min = 40
            max = 60
            step_down = -1
            step_up = 1

            [device_information]
            manufacturer = "Acme"
            "#,
        )
        .unwrap();
        assert_eq!(config.alias, "Bench Tracker");
        assert_eq!(config.tick_interval(), Duration::from_millis(500));
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.simulation.stress.max, 60);
        assert_eq!(config.simulation.heart_rate.max, 120);
        assert_eq!(
            config.device_information,
            Some(DeviceInformation {
                manufacturer: "Acme".into()
            })
        );
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            EmulatorConfig::from_toml("tick_interval_ms = 0"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            EmulatorConfig::from_toml("alias = \"  \""),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            EmulatorConfig::from_toml("base_path = \"relative\""),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            EmulatorConfig::from_toml("unknown = true"),
            Err(Error::Toml(_))
        ));
    }

    #[test]
    fn rejects_walks_that_cannot_tick() {
        assert!(matches!(
            EmulatorConfig::from_toml(
                r#"
                [simulation.spo2]
                initial = 97.5
                min = 95.0
                max = 99.0
                step_down = -inf
                step_up = inf
                "#
            ),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            EmulatorConfig::from_toml(
                r#"
                [simulation.heart_rate]
                initial = 2147483647
                min = 60
                max = 2147483647
                step_down = -3
                step_up = 5
                "#
            ),
            Err(Error::InvalidConfig(_))
        ));
    }
}
