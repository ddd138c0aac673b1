//! # Run configuration
//!
//! Every knob has a default matching the classic setup: the resource starts at 1, writers add 3,
//! actors show up within 0..=2s and spend a second inside.
//!
//! A TOML file may override any subset of fields:
//! ```toml
//! increment = 5
//! arrival_delay_max_ms = 200
//! gate = "semaphore"
//! seed = 42
//! ```

use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    error::{SimError, SimResult},
    sync::GatePolicy,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Value of the resource before anybody touches it
    pub initial_value: i64,
    /// What every writer adds, must be positive
    pub increment: i64,
    pub arrival_delay_min_ms: u64,
    pub arrival_delay_max_ms: u64,
    pub read_duration_ms: u64,
    pub write_duration_ms: u64,
    pub gate: GatePolicy,
    /// Makes arrival delays reproducible, fresh entropy when unset
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            initial_value: 1,
            increment: 3,
            arrival_delay_min_ms: 0,
            arrival_delay_max_ms: 2000,
            read_duration_ms: 1000,
            write_duration_ms: 1000,
            gate: GatePolicy::default(),
            seed: None,
        }
    }
}

impl SimConfig {
    pub fn from_toml_str(text: &str) -> SimResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SimError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.increment <= 0 {
            return Err(SimError::InvalidConfig(format!(
                "writer increment must be positive, got {}",
                self.increment
            )));
        }
        if self.arrival_delay_min_ms > self.arrival_delay_max_ms {
            return Err(SimError::InvalidConfig(format!(
                "arrival delay range is inverted: {}ms..={}ms",
                self.arrival_delay_min_ms, self.arrival_delay_max_ms
            )));
        }
        Ok(())
    }

    pub fn read_duration(&self) -> Duration {
        Duration::from_millis(self.read_duration_ms)
    }

    pub fn write_duration(&self) -> Duration {
        Duration::from_millis(self.write_duration_ms)
    }
}
