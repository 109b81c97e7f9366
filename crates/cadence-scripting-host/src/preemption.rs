use tracing::debug;

use crate::context::PreemptionSource;

/// Logic that interrupts normal pulses when its condition holds
pub trait Preemption: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this handler wants to take over the current tick
    fn should_activate(&self) -> bool;

    /// Handle the interruption. Runs to completion before the tick continues.
    fn run(&self);
}

/// Ordered set of preemption handlers polled as one source
///
/// On each check the first handler whose condition holds runs; the rest are skipped until the
/// next tick.
#[derive(Default)]
pub struct PreemptionPool {
    handlers: Vec<Box<dyn Preemption>>,
}

impl PreemptionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, handler: impl Preemption + 'static) -> Self {
        self.register(handler);
        self
    }

    pub fn register(&mut self, handler: impl Preemption + 'static) {
        debug!(target: "scripting", "Registering preemption handler: {}", handler.name());
        self.handlers.push(Box::new(handler));
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.handlers.iter().map(|handler| handler.name()).collect()
    }
}

impl PreemptionSource for PreemptionPool {
    fn check(&self) {
        if let Some(handler) = self.handlers.iter().find(|handler| handler.should_activate()) {
            debug!(target: "scripting", "Preemption handler activated: {}", handler.name());
            handler.run();
        }
    }
}
