use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Upper bound for a single wait; longer delays are clamped to it
const MAX_WAIT: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Unwind payload used to abort a hook when its script is terminated
///
/// The scheduler recognises this payload and does not report it as a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForcedCancellation;

/// Why a wait on a [`CancellationSignal`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The deadline passed
    Elapsed,
    /// The interrupt condition became true
    Interrupted,
    /// The signal was cancelled
    Cancelled,
}

/// One-way cancellation flag with a blocking, abortable wait
#[derive(Debug, Default)]
pub struct CancellationSignal {
    cancelled: Mutex<bool>,
    condvar: Condvar,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the signal, waking every waiter. Cannot be undone.
    pub fn cancel(&self) {
        let mut cancelled = self.cancelled.lock().unwrap_or_else(PoisonError::into_inner);
        *cancelled = true;
        self.condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wake waiters so they re-evaluate their interrupt condition.
    ///
    /// Callers must make the condition true before waking.
    pub fn wake(&self) {
        let _guard = self.cancelled.lock().unwrap_or_else(PoisonError::into_inner);
        self.condvar.notify_all();
    }

    /// Block until `deadline`, cancellation, or `interrupt` returning true.
    ///
    /// A deadline in the past returns immediately.
    pub fn wait_until(&self, deadline: Instant, interrupt: impl Fn() -> bool) -> WaitOutcome {
        let mut cancelled = self.cancelled.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if *cancelled {
                return WaitOutcome::Cancelled;
            }
            if interrupt() {
                return WaitOutcome::Interrupted;
            }
            let now = Instant::now();
            if now >= deadline {
                return WaitOutcome::Elapsed;
            }
            let (guard, _) = self
                .condvar
                .wait_timeout(cancelled, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            cancelled = guard;
        }
    }

    /// Block for `duration` unless cancelled first
    pub fn wait_for(&self, duration: Duration) -> WaitOutcome {
        self.wait_until(deadline_after(Instant::now(), duration), || false)
    }
}

/// `start + duration`, clamped so that very long delays cannot overflow `Instant`
pub fn deadline_after(start: Instant, duration: Duration) -> Instant {
    let duration = duration.min(MAX_WAIT);
    start.checked_add(duration).unwrap_or(start)
}
