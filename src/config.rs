//! Configuration of the demo state producer

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;


/// Tuning of the demo state producer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogicConfig {
    /// Minimal time between two state updates, in seconds of driver time.
    /// Update requests which come sooner than that are no-ops.
    pub tick_period_secs: f64,

    /// Duration of the simulated expensive work of one update, in
    /// milliseconds of wall-clock time
    pub work_millis: u64,
}
//
impl Default for LogicConfig {
    fn default() -> Self {
        Self {
            tick_period_secs: 1.0,
            work_millis: 500,
        }
    }
}
//
impl LogicConfig {
    /// Create a config for testing (no simulated work)
    pub fn for_testing() -> Self {
        Self {
            tick_period_secs: 1.0,
            work_millis: 0,
        }
    }

    /// Create configuration from environment variables
    ///
    /// # Environment Variables
    ///
    /// - `BRIDGE_TICK_PERIOD_SECS`: Minimal time between updates (default: 1.0)
    /// - `BRIDGE_WORK_MILLIS`: Simulated work per update (default: 500)
    ///
    /// Unparsable values are reported and replaced by their default.
    ///
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            tick_period_secs: env_or("BRIDGE_TICK_PERIOD_SECS", defaults.tick_period_secs),
            work_millis: env_or("BRIDGE_WORK_MILLIS", defaults.work_millis),
        }
    }

    /// Simulated work per update
    pub fn work_duration(&self) -> Duration {
        Duration::from_millis(self.work_millis)
    }
}

/// Read and parse an environment variable, falling back to a default
fn env_or<V: FromStr>(name: &str, default: V) -> V {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(variable = name, value = %raw, "Invalid configuration value, using default");
            default
        }),
        Err(_) => default,
    }
}
