use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::Thread;
use std::time::Duration;
use tracing::{debug, Level};

use crate::cancellation::{CancellationSignal, ForcedCancellation, WaitOutcome};
use crate::context::ScriptContext;
use crate::descriptor::ScriptDescriptor;
use crate::util;

thread_local! {
    /// The script whose scheduler owns the current thread
    static CURRENT: RefCell<Option<ScriptControl>> = const { RefCell::new(None) };
}

/// Unique identifier for a running script instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScriptId(u64);

impl ScriptId {
    pub(crate) fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        ScriptId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Run state and controls of one script instance
///
/// Cheap to clone; every clone refers to the same script. Hooks receive one of these, and the
/// host reaches the same state through a [`crate::ScriptHandle`].
#[derive(Clone)]
pub struct ScriptControl {
    shared: Arc<Shared>,
}

struct Shared {
    id: ScriptId,
    descriptor: &'static ScriptDescriptor,
    context: ScriptContext,
    exit_requested: AtomicBool,
    paused: AtomicBool,
    cancellation: CancellationSignal,
    thread: Mutex<Option<Thread>>,
}

impl ScriptControl {
    pub(crate) fn new(descriptor: &'static ScriptDescriptor, context: ScriptContext) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: ScriptId::next(),
                descriptor,
                context,
                exit_requested: AtomicBool::new(false),
                paused: AtomicBool::new(false),
                cancellation: CancellationSignal::new(),
                thread: Mutex::new(None),
            }),
        }
    }

    pub fn id(&self) -> ScriptId {
        self.shared.id
    }

    pub fn descriptor(&self) -> &'static ScriptDescriptor {
        self.shared.descriptor
    }

    pub fn name(&self) -> &'static str {
        self.shared.descriptor.name()
    }

    pub fn context(&self) -> &ScriptContext {
        &self.shared.context
    }

    /// Shortcut for `context().module::<T>()`
    pub fn module<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.shared.context.module::<T>()
    }

    // ===== Lifecycle =====

    /// Ask the scheduler to stop at the top of its next tick
    pub fn request_exit(&self) {
        self.shared.exit_requested.store(true, Ordering::Release);
        self.shared.cancellation.wake();
    }

    pub fn is_exit_requested(&self) -> bool {
        self.shared.exit_requested.load(Ordering::Acquire)
    }

    /// Pausing only suppresses pulses; preemption checks and exit checks keep running
    pub fn set_paused(&self, paused: bool) {
        self.shared.paused.store(paused, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    /// Abort the script without waiting for it.
    ///
    /// Breaks the scheduler's idle wait and any [`ScriptControl::sleep`] in progress, then
    /// requests an exit so the loop ends at its next opportunity.
    pub fn terminate(&self) {
        debug!(target: "scripting", "Terminating script {} ({})", self.name(), self.id());
        self.shared.cancellation.cancel();
        if let Some(thread) = self.thread() {
            thread.unpark();
        }
        self.request_exit();
    }

    pub fn is_terminated(&self) -> bool {
        self.shared.cancellation.is_cancelled()
    }

    /// The scheduler thread, once it has started running
    pub fn thread(&self) -> Option<Thread> {
        self.shared
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The script being scheduled on the calling thread, if any.
    ///
    /// Lets code a hook calls into without a [`ScriptControl`] (preemption handlers, for one)
    /// find the script it is running for.
    pub fn current() -> Option<ScriptControl> {
        CURRENT.try_with(|current| current.borrow().clone()).ok().flatten()
    }

    /// Record the scheduler thread. Must be called from that thread.
    pub(crate) fn set_thread(&self, thread: Option<Thread>) {
        let current = thread.is_some().then(|| self.clone());
        let _ = CURRENT.try_with(|slot| *slot.borrow_mut() = current);
        *self
            .shared
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = thread;
    }

    pub(crate) fn cancellation(&self) -> &CancellationSignal {
        &self.shared.cancellation
    }

    // ===== Logging =====

    /// Log through the host under this script's name
    pub fn log(&self, message: &str) {
        self.shared.context.host().log(self.name(), message);
    }

    pub fn log_at(&self, level: Level, message: &str) {
        self.shared.context.host().log_at(self.name(), level, message);
    }

    // ===== Ease of use =====

    /// Sleep inside a hook.
    ///
    /// If the script is terminated while sleeping, the current hook is unwound with a
    /// [`ForcedCancellation`] payload, which the scheduler silently discards.
    pub fn sleep(&self, duration: Duration) {
        if self.wait_for(duration) == WaitOutcome::Cancelled {
            panic::resume_unwind(Box::new(ForcedCancellation));
        }
    }

    /// Block for `duration`, returning early with [`WaitOutcome::Cancelled`] if the script is
    /// terminated. Unlike [`ScriptControl::sleep`] this never unwinds.
    pub fn wait_for(&self, duration: Duration) -> WaitOutcome {
        self.shared.cancellation.wait_for(duration)
    }

    /// Sleep for a random duration in `[min_millis, max_millis)`
    pub fn sleep_between(&self, min_millis: u64, max_millis: u64) {
        self.sleep(Duration::from_millis(util::random_range(min_millis, max_millis)));
    }
}

impl fmt::Debug for ScriptControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptControl")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("exit_requested", &self.is_exit_requested())
            .field("paused", &self.is_paused())
            .field("terminated", &self.is_terminated())
            .finish()
    }
}
