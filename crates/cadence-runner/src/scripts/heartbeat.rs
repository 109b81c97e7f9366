use cadence_scripting_host::{util, Script, ScriptControl, ScriptDescriptor, Tier};

static DESCRIPTOR: ScriptDescriptor = ScriptDescriptor::new("heartbeat", Tier::Free, &["cadence"]);

/// Logs a beat at a random interval until asked to stop
#[derive(Default)]
pub struct HeartbeatScript {
    beats: u64,
}

impl HeartbeatScript {
    const MIN_INTERVAL_MS: i64 = 800;
    const MAX_INTERVAL_MS: i64 = 1_500;
}

impl Script for HeartbeatScript {
    fn descriptor(&self) -> Option<&'static ScriptDescriptor> {
        Some(&DESCRIPTOR)
    }

    fn init(&mut self, script: &ScriptControl) -> bool {
        script.log("Heartbeat started");
        true
    }

    fn pulse(&mut self, script: &ScriptControl) -> i64 {
        self.beats += 1;
        script.log(&format!("beat {}", self.beats));
        util::random_range(Self::MIN_INTERVAL_MS, Self::MAX_INTERVAL_MS)
    }

    fn close(&mut self, script: &ScriptControl) {
        script.log(&format!("Heartbeat stopped after {} beats", self.beats));
    }
}
