use cadence_scripting_host::{Script, ScriptControl, ScriptDescriptor, Tier};

static DESCRIPTOR: ScriptDescriptor = ScriptDescriptor::new("countdown", Tier::Free, &["cadence"]);

/// Counts down at a fixed interval and ends itself at zero
pub struct CountdownScript {
    remaining: u32,
    interval_ms: i64,
}

impl CountdownScript {
    pub fn new(from: u32, interval_ms: i64) -> Self {
        Self {
            remaining: from,
            interval_ms,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

impl Default for CountdownScript {
    fn default() -> Self {
        Self::new(10, 1_000)
    }
}

impl Script for CountdownScript {
    fn descriptor(&self) -> Option<&'static ScriptDescriptor> {
        Some(&DESCRIPTOR)
    }

    fn init(&mut self, _script: &ScriptControl) -> bool {
        true
    }

    fn pulse(&mut self, script: &ScriptControl) -> i64 {
        if self.remaining == 0 {
            return -1;
        }
        script.log(&format!("{}", self.remaining));
        self.remaining -= 1;
        self.interval_ms
    }

    fn close(&mut self, script: &ScriptControl) {
        if self.remaining == 0 {
            script.log("Liftoff");
        }
    }
}
