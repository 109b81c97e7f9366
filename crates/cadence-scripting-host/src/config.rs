use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scheduler tuning shared by every script a host starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Idle wait used while no pulse is scheduled or the script is paused (default: 200ms)
    #[serde(default = "default_idle_interval_ms")]
    pub idle_interval_ms: u64,

    /// Prefix for scheduler thread names (default: "script")
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,
}

fn default_idle_interval_ms() -> u64 {
    200
}

fn default_thread_name_prefix() -> String {
    "script".to_string()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            idle_interval_ms: default_idle_interval_ms(),
            thread_name_prefix: default_thread_name_prefix(),
        }
    }
}

impl SchedulerConfig {
    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }

    /// Thread name for a script with the given name
    pub fn thread_name(&self, script_name: &str) -> String {
        format!("{}-{}", self.thread_name_prefix, script_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: SchedulerConfig = toml::from_str("").unwrap();
        assert_eq!(config, SchedulerConfig::default());
        assert_eq!(config.idle_interval(), Duration::from_millis(200));
    }

    #[test]
    fn test_partial_override() {
        let config: SchedulerConfig = toml::from_str("idle_interval_ms = 25").unwrap();
        assert_eq!(config.idle_interval_ms, 25);
        assert_eq!(config.thread_name("heartbeat"), "script-heartbeat");
    }
}
