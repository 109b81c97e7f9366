use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace, warn, Level};

use crate::authorization::{AuthorizationGate, UserSession};
use crate::cancellation::{deadline_after, ForcedCancellation, WaitOutcome};
use crate::config::SchedulerConfig;
use crate::context::ScriptContext;
use crate::control::{ScriptControl, ScriptId};
use crate::descriptor::ScriptDescriptor;
use crate::error::ScriptError;
use crate::fault::{self, Caught, Hook, HookFault};
use crate::Script;

/// A script that passed its authorization check but has not started yet
pub struct BoundScript {
    script: Box<dyn Script>,
    control: ScriptControl,
    config: SchedulerConfig,
}

impl BoundScript {
    /// Attach a context to a script and decide whether it may run.
    ///
    /// The descriptor is read exactly once, here, and the authorization decision is never
    /// revisited.
    pub fn bind(
        script: Box<dyn Script>,
        context: ScriptContext,
        gate: &AuthorizationGate,
        user: &UserSession,
        config: SchedulerConfig,
    ) -> Result<Self, ScriptError> {
        let descriptor = script.descriptor().ok_or(ScriptError::MissingDescriptor)?;

        if !gate.can_run(descriptor, user) {
            warn!(
                target: "scripting",
                "User {} may not run {} script {}",
                user.username().unwrap_or("<anonymous>"),
                descriptor.tier(),
                descriptor.name()
            );
            return Err(ScriptError::Unauthorized {
                script: descriptor.name(),
            });
        }

        let control = ScriptControl::new(descriptor, context);
        debug!(target: "scripting", "Bound script {} ({})", descriptor.name(), control.id());

        Ok(Self {
            script,
            control,
            config,
        })
    }

    pub fn control(&self) -> &ScriptControl {
        &self.control
    }

    pub fn descriptor(&self) -> &'static ScriptDescriptor {
        self.control.descriptor()
    }

    /// Spawn the scheduler thread
    pub fn start(self) -> Result<ScriptHandle, ScriptError> {
        let name = self.control.name();
        let control = self.control.clone();
        let scheduler = Scheduler {
            script: self.script,
            control: self.control,
            idle_interval: self.config.idle_interval(),
            notified: false,
        };

        let join = thread::Builder::new()
            .name(self.config.thread_name(name))
            .spawn(move || scheduler.run())
            .map_err(|source| ScriptError::Spawn {
                script: name,
                source,
            })?;

        debug!(target: "scripting", "Started script {} ({})", name, control.id());

        Ok(ScriptHandle {
            control,
            join: Arc::new(Mutex::new(Some(join))),
        })
    }
}

/// Host-side handle to a running script
#[derive(Clone)]
pub struct ScriptHandle {
    control: ScriptControl,
    join: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl ScriptHandle {
    pub fn control(&self) -> &ScriptControl {
        &self.control
    }

    pub fn id(&self) -> ScriptId {
        self.control.id()
    }

    pub fn descriptor(&self) -> &'static ScriptDescriptor {
        self.control.descriptor()
    }

    pub fn context(&self) -> &ScriptContext {
        self.control.context()
    }

    pub fn request_exit(&self) {
        self.control.request_exit();
    }

    pub fn is_exit_requested(&self) -> bool {
        self.control.is_exit_requested()
    }

    pub fn set_paused(&self, paused: bool) {
        self.control.set_paused(paused);
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    /// Forced, asynchronous termination; see [`ScriptControl::terminate`]
    pub fn terminate(&self) {
        self.control.terminate();
    }

    /// Whether the scheduler thread has exited
    pub fn is_finished(&self) -> bool {
        self.join
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the scheduler thread to exit.
    ///
    /// Returns `false` if the thread ended by panicking. Only the first call on any clone of the
    /// handle waits; later calls return `true` immediately.
    pub fn join(&self) -> bool {
        let join = self
            .join
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match join {
            Some(join) => join.join().is_ok(),
            None => true,
        }
    }
}

/// Why the scheduler loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Termination {
    /// `request_exit` was called
    ExitRequested,
    /// `terminate` was called
    Terminated,
    /// `pulse` returned a negative delay
    Finished,
}

/// State owned by the scheduler thread
struct Scheduler {
    script: Box<dyn Script>,
    control: ScriptControl,
    idle_interval: Duration,
    notified: bool,
}

impl Scheduler {
    fn run(mut self) {
        let _fault_scope = fault::register_current_thread();
        self.control.set_thread(Some(thread::current()));

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| self.drive())) {
            if !payload.is::<ForcedCancellation>() {
                let fault = HookFault::from_scheduler_panic(&*payload);
                error!(target: "scripting", "Scheduler for {} crashed: {}", self.control.name(), fault);
                self.report(&fault);
            }
            self.notify_ended();
        }

        self.control.set_thread(None);
        debug!(target: "scripting", "Scheduler thread for {} ({}) exited", self.control.name(), self.control.id());
    }

    fn drive(&mut self) {
        if !self.initialize() {
            return;
        }

        let termination = self.run_loop();
        debug!(
            target: "scripting",
            "Script {} ({}) stopped: {:?}",
            self.control.name(),
            self.control.id(),
            termination
        );

        match fault::guard(Hook::Close, || self.script.close(&self.control)) {
            Caught::Returned(()) | Caught::Cancelled => {}
            Caught::Faulted(fault) => self.report(&fault),
        }
    }

    /// Call `init` once. Returns whether the loop should start.
    fn initialize(&mut self) -> bool {
        let started = match fault::guard(Hook::Init, || self.script.init(&self.control)) {
            Caught::Returned(started) => started,
            Caught::Cancelled => {
                self.notify_ended();
                return false;
            }
            Caught::Faulted(fault) => {
                self.report(&fault);
                false
            }
        };

        if !started {
            self.control.log_at(
                Level::WARN,
                &format!("Script {} refused to start.", self.control.name()),
            );
            self.notify_ended();
        }
        started
    }

    fn run_loop(&mut self) -> Termination {
        let mut next_execution: Option<Instant> = None;

        loop {
            self.check_preemption();

            if self.control.is_exit_requested() {
                self.notify_ended();
                return if self.control.is_terminated() {
                    Termination::Terminated
                } else {
                    Termination::ExitRequested
                };
            }

            let paused = self.control.is_paused();
            let now = Instant::now();
            if !paused && next_execution.map_or(true, |at| now >= at) {
                match fault::guard(Hook::Pulse, || self.script.pulse(&self.control)) {
                    Caught::Returned(delay) if delay < 0 => {
                        self.notify_ended();
                        return Termination::Finished;
                    }
                    Caught::Returned(delay) => {
                        let delay = Duration::from_millis(delay.unsigned_abs());
                        next_execution = Some(deadline_after(now, delay));
                    }
                    // Only forced termination unwinds this way; the exit check picks it up
                    Caught::Cancelled => {}
                    Caught::Faulted(fault) => {
                        self.report(&fault);
                        next_execution = Some(deadline_after(Instant::now(), self.idle_interval));
                    }
                }
            }

            let deadline = match next_execution {
                Some(at) if !paused => at,
                _ => deadline_after(Instant::now(), self.idle_interval),
            };

            let control = &self.control;
            let outcome = control
                .cancellation()
                .wait_until(deadline, || control.is_exit_requested());
            if outcome != WaitOutcome::Elapsed {
                trace!(target: "scripting", "Idle wait for {} ended early: {:?}", control.name(), outcome);
            }
        }
    }

    fn check_preemption(&self) {
        let Some(source) = self.control.context().preemption().cloned() else {
            return;
        };

        if let Caught::Faulted(fault) = fault::guard(Hook::Preemption, || source.check()) {
            self.report(&fault);
        }
    }

    fn report(&self, fault: &HookFault) {
        for line in fault.report_lines() {
            self.control.log_at(Level::ERROR, &line);
        }
    }

    /// Tell the host this script is done. Only the first call has any effect.
    fn notify_ended(&mut self) {
        if self.notified {
            return;
        }
        self.notified = true;
        self.control
            .context()
            .host()
            .notify_script_ended(self.control.id());
    }
}
