use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

use cadence_scripting_host::{Preemption, ScriptControl, WaitOutcome};

use crate::config::BreakConfig;

/// Preemption that pauses the calling script for a while once every period
///
/// One instance is shared by every script on a stack, so only the first script to reach a due
/// break takes it. On a scheduler thread the break ends early when that script is terminated.
pub struct TakeBreak {
    every: Duration,
    length: Duration,
    last_break: Mutex<Instant>,
}

impl TakeBreak {
    pub fn new(every: Duration, length: Duration) -> Self {
        Self {
            every,
            length,
            last_break: Mutex::new(Instant::now()),
        }
    }

    pub fn from_config(config: &BreakConfig) -> Self {
        Self::new(config.every(), config.length())
    }

    fn is_due(last_break: Instant, every: Duration) -> bool {
        last_break.elapsed() >= every
    }
}

impl Preemption for TakeBreak {
    fn name(&self) -> &str {
        "take-break"
    }

    fn should_activate(&self) -> bool {
        let last_break = *self.last_break.lock().unwrap_or_else(PoisonError::into_inner);
        Self::is_due(last_break, self.every)
    }

    fn run(&self) {
        {
            let mut last_break = self.last_break.lock().unwrap_or_else(PoisonError::into_inner);
            if !Self::is_due(*last_break, self.every) {
                return;
            }
            *last_break = Instant::now();
        }

        info!(target: "scripting", "Taking a break for {:?}", self.length);
        match ScriptControl::current() {
            Some(script) => {
                if script.wait_for(self.length) == WaitOutcome::Cancelled {
                    info!(target: "scripting", "Break cut short, {} was terminated", script.name());
                }
            }
            None => thread::sleep(self.length),
        }
        *self.last_break.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_due_before_period() {
        let breaks = TakeBreak::new(Duration::from_secs(60), Duration::from_millis(1));
        assert!(!breaks.should_activate());
    }

    #[test]
    fn test_break_blocks_then_resets() {
        let breaks = TakeBreak::new(Duration::ZERO, Duration::from_millis(40));
        assert!(breaks.should_activate());

        let start = Instant::now();
        breaks.run();
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_from_config() {
        let config = BreakConfig {
            enabled: true,
            every_secs: 120,
            length_ms: 500,
        };
        let breaks = TakeBreak::from_config(&config);
        assert_eq!(breaks.every, Duration::from_secs(120));
        assert_eq!(breaks.length, Duration::from_millis(500));
        assert_eq!(breaks.name(), "take-break");
    }
}
