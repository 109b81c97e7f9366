//! Fault isolation for script hooks.
//!
//! A single process panic hook is installed on first use. It only acts for threads that have
//! registered through [`register_current_thread`]: for those it records the panic location and a
//! backtrace for the scheduler to report. Every other thread falls through to the hook that was
//! installed before, so scripts never change how the rest of the process reports panics.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;
use std::thread;
use strum_macros::Display;

use crate::cancellation::ForcedCancellation;

thread_local! {
    static REGISTERED: Cell<bool> = const { Cell::new(false) };
    static LAST_PANIC: RefCell<Option<PanicCapture>> = const { RefCell::new(None) };
}

static INSTALL_HOOK: Once = Once::new();

struct PanicCapture {
    location: Option<String>,
    backtrace: String,
}

/// The script hook that was running when a fault happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Hook {
    Init,
    Pulse,
    Preemption,
    Close,
    Scheduler,
}

/// A panic raised by a script hook, with everything needed to diagnose it
#[derive(Debug, Clone)]
pub struct HookFault {
    hook: Hook,
    kind: &'static str,
    thread: String,
    message: String,
    location: Option<String>,
    backtrace: Option<String>,
}

impl HookFault {
    fn from_payload(hook: Hook, payload: &(dyn Any + Send), capture: Option<PanicCapture>) -> Self {
        let (kind, message) = if let Some(message) = payload.downcast_ref::<&'static str>() {
            ("&str", (*message).to_string())
        } else if let Some(message) = payload.downcast_ref::<String>() {
            ("String", message.clone())
        } else {
            ("Box<dyn Any>", "<non-string panic payload>".to_string())
        };

        let (location, backtrace) = match capture {
            Some(capture) => (capture.location, Some(capture.backtrace)),
            None => (None, None),
        };

        Self {
            hook,
            kind,
            thread: thread::current().name().unwrap_or("<unnamed>").to_string(),
            message,
            location,
            backtrace,
        }
    }

    /// A panic that escaped the scheduler itself rather than a hook
    pub(crate) fn from_scheduler_panic(payload: &(dyn Any + Send)) -> Self {
        Self::from_payload(Hook::Scheduler, payload, take_capture())
    }

    pub fn hook(&self) -> Hook {
        self.hook
    }

    /// Type of the panic payload
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn thread(&self) -> &str {
        &self.thread
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn backtrace(&self) -> Option<&str> {
        self.backtrace.as_deref()
    }

    /// One summary line followed by one line per backtrace frame line
    pub fn report_lines(&self) -> Vec<String> {
        let mut lines = vec![self.to_string()];
        if let Some(backtrace) = &self.backtrace {
            lines.extend(
                backtrace
                    .lines()
                    .map(str::trim_end)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string),
            );
        }
        lines
    }
}

impl fmt::Display for HookFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "panic ({}) caught in thread {} during {}: {}",
            self.kind, self.thread, self.hook, self.message
        )?;
        if let Some(location) = &self.location {
            write!(f, " at {}", location)?;
        }
        Ok(())
    }
}

/// Outcome of running a hook under [`guard`]
#[derive(Debug)]
pub(crate) enum Caught<T> {
    Returned(T),
    /// The hook was unwound by forced termination
    Cancelled,
    Faulted(HookFault),
}

/// Keeps the current thread registered for fault capture until dropped
pub struct FaultScope {
    _not_send: PhantomData<*const ()>,
}

impl Drop for FaultScope {
    fn drop(&mut self) {
        let _ = REGISTERED.try_with(|registered| registered.set(false));
        let _ = LAST_PANIC.try_with(|slot| slot.borrow_mut().take());
    }
}

/// Register the calling thread so panics on it are captured instead of printed
pub fn register_current_thread() -> FaultScope {
    install_hook();
    REGISTERED.with(|registered| registered.set(true));
    FaultScope {
        _not_send: PhantomData,
    }
}

fn install_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let registered = REGISTERED.try_with(Cell::get).unwrap_or(false);
            if !registered {
                previous(info);
                return;
            }

            let capture = PanicCapture {
                location: info.location().map(|location| location.to_string()),
                backtrace: Backtrace::force_capture().to_string(),
            };
            let _ = LAST_PANIC.try_with(|slot| {
                if let Ok(mut slot) = slot.try_borrow_mut() {
                    *slot = Some(capture);
                }
            });
        }));
    });
}

fn take_capture() -> Option<PanicCapture> {
    LAST_PANIC
        .try_with(|slot| slot.try_borrow_mut().ok().and_then(|mut slot| slot.take()))
        .ok()
        .flatten()
}

/// Run a hook, turning any panic into a [`Caught`] value
pub(crate) fn guard<T>(hook: Hook, f: impl FnOnce() -> T) -> Caught<T> {
    take_capture();
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Caught::Returned(value),
        Err(payload) if payload.is::<ForcedCancellation>() => Caught::Cancelled,
        Err(payload) => Caught::Faulted(HookFault::from_payload(hook, &*payload, take_capture())),
    }
}
