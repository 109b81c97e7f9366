use chrono::{DateTime, Utc};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn, Level};

use cadence_scripting_host::{
    AuthorizationGate, BoundScript, HostController, ModuleBundle, PreemptionSource,
    SchedulerConfig, Script, ScriptContext, ScriptError, ScriptHandle, ScriptId, Tier,
    UserSession,
};

/// Snapshot of one running script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningScript {
    pub id: ScriptId,
    pub name: &'static str,
    pub tier: Tier,
    pub started_at: DateTime<Utc>,
    pub paused: bool,
}

struct StackEntry {
    handle: ScriptHandle,
    started_at: DateTime<Utc>,
}

/// The host's collection of running scripts.
///
/// The most recently pushed script is the current one. Scripts remove themselves through
/// [`HostController::notify_script_ended`] when their scheduler stops.
pub struct ScriptStack {
    entries: Mutex<Vec<StackEntry>>,
    emptied: Condvar,
    modules: ModuleBundle,
    preemption: Option<Arc<dyn PreemptionSource>>,
    gate: AuthorizationGate,
    user: UserSession,
    config: SchedulerConfig,
}

impl ScriptStack {
    /// Create an empty stack. `preemption` is polled on every tick of every script.
    pub fn new(
        modules: ModuleBundle,
        preemption: Option<Arc<dyn PreemptionSource>>,
        gate: AuthorizationGate,
        user: UserSession,
        config: SchedulerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(Vec::new()),
            emptied: Condvar::new(),
            modules,
            preemption,
            gate,
            user,
            config,
        })
    }

    fn entries(&self) -> MutexGuard<'_, Vec<StackEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind and start a script, making it the current one
    pub fn push(self: &Arc<Self>, script: Box<dyn Script>) -> Result<ScriptHandle, ScriptError> {
        let host: Arc<dyn HostController> = self.clone();
        let mut context = ScriptContext::new(host, self.modules.clone());
        if let Some(preemption) = &self.preemption {
            context = context.with_preemption(Arc::clone(preemption));
        }

        let bound = BoundScript::bind(script, context, &self.gate, &self.user, self.config.clone())?;

        // Hold the lock across start so an immediate notification finds the entry
        let mut entries = self.entries();
        let handle = bound.start()?;
        entries.push(StackEntry {
            handle: handle.clone(),
            started_at: Utc::now(),
        });
        info!(
            target: "scripting",
            "Started script {} ({}), {} running",
            handle.descriptor().name(),
            handle.id(),
            entries.len()
        );

        Ok(handle)
    }

    /// The most recently started script that is still running
    pub fn current(&self) -> Option<ScriptHandle> {
        self.entries().last().map(|entry| entry.handle.clone())
    }

    pub fn get(&self, id: ScriptId) -> Option<ScriptHandle> {
        self.entries()
            .iter()
            .find(|entry| entry.handle.id() == id)
            .map(|entry| entry.handle.clone())
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn running(&self) -> Vec<RunningScript> {
        self.entries()
            .iter()
            .map(|entry| RunningScript {
                id: entry.handle.id(),
                name: entry.handle.descriptor().name(),
                tier: entry.handle.descriptor().tier(),
                started_at: entry.started_at,
                paused: entry.handle.is_paused(),
            })
            .collect()
    }

    pub fn pause_all(&self, paused: bool) {
        for entry in self.entries().iter() {
            entry.handle.set_paused(paused);
        }
    }

    pub fn request_exit_all(&self) {
        for entry in self.entries().iter() {
            entry.handle.request_exit();
        }
    }

    /// Forcefully terminate every running script without waiting for them
    pub fn terminate_all(&self) {
        let handles: Vec<ScriptHandle> = self.entries().iter().map(|e| e.handle.clone()).collect();
        if !handles.is_empty() {
            warn!(target: "scripting", "Terminating {} script(s)", handles.len());
        }
        for handle in handles {
            handle.terminate();
        }
    }

    /// Block until every script has ended. Returns `false` on timeout.
    pub fn wait_until_empty(&self, timeout: Duration) -> bool {
        let (entries, _) = self
            .emptied
            .wait_timeout_while(self.entries(), timeout, |entries| !entries.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        entries.is_empty()
    }
}

impl HostController for ScriptStack {
    fn notify_script_ended(&self, id: ScriptId) {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|entry| entry.handle.id() != id);

        if entries.len() == before {
            debug!(target: "scripting", "Ended script {} was not on the stack", id);
        } else {
            info!(target: "scripting", "Script {} ended, {} still running", id, entries.len());
        }

        if entries.is_empty() {
            self.emptied.notify_all();
        }
    }

    fn log_at(&self, source: &str, level: Level, message: &str) {
        match level {
            Level::ERROR => error!(target: "scripts", script = source, "{}", message),
            Level::WARN => warn!(target: "scripts", script = source, "{}", message),
            Level::INFO => info!(target: "scripts", script = source, "{}", message),
            Level::DEBUG => debug!(target: "scripts", script = source, "{}", message),
            _ => trace!(target: "scripts", script = source, "{}", message),
        }
    }
}
