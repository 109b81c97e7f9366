use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Periodic breaks taken by the built-in `TakeBreak` preemption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Seconds between breaks (default: 1800)
    #[serde(default = "default_every_secs")]
    pub every_secs: u64,

    /// Length of one break in milliseconds (default: 30000)
    #[serde(default = "default_length_ms")]
    pub length_ms: u64,
}

fn default_every_secs() -> u64 {
    30 * 60
}

fn default_length_ms() -> u64 {
    30_000
}

impl Default for BreakConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            every_secs: default_every_secs(),
            length_ms: default_length_ms(),
        }
    }
}

impl BreakConfig {
    pub fn every(&self) -> Duration {
        Duration::from_secs(self.every_secs)
    }

    pub fn length(&self) -> Duration {
        Duration::from_millis(self.length_ms)
    }
}
