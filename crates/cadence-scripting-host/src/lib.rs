/// Host runtime for running cadence scripts
///
/// Every script runs on its own scheduler thread. The scheduler calls `init` once, then
/// repeatedly polls the preemption source, checks for exit requests and dispatches `pulse`
/// whenever the delay returned by the previous pulse has elapsed.
pub mod authorization;
pub mod cancellation;
pub mod config;
pub mod context;
pub mod control;
pub mod descriptor;
pub mod error;
pub mod fault;
pub mod preemption;
pub mod scheduler;
pub mod util;

// Re-export commonly used types for host-side scripting
pub use authorization::{AuthorizationGate, UserGroup, UserSession};
pub use cancellation::{CancellationSignal, ForcedCancellation, WaitOutcome};
pub use config::SchedulerConfig;
pub use context::{HostController, ModuleBundle, ModuleBundleBuilder, PreemptionSource, ScriptContext};
pub use control::{ScriptControl, ScriptId};
pub use descriptor::{ScriptDescriptor, Tier};
pub use error::ScriptError;
pub use fault::{Hook, HookFault};
pub use preemption::{Preemption, PreemptionPool};
pub use scheduler::{BoundScript, ScriptHandle};

/// Trait that scripts must implement
///
/// All hooks run on the script's own scheduler thread, never concurrently with each other.
pub trait Script: Send + 'static {
    /// Static metadata for this script. Scripts without a descriptor cannot be bound.
    fn descriptor(&self) -> Option<&'static ScriptDescriptor>;

    /// Called once before the first pulse. Returning `false` refuses to start.
    fn init(&mut self, script: &ScriptControl) -> bool;

    /// Periodic work. Returns the delay in milliseconds before the next pulse; a negative
    /// value ends the script.
    fn pulse(&mut self, script: &ScriptControl) -> i64;

    /// Called once on the scheduler thread after the loop has ended
    fn close(&mut self, script: &ScriptControl);
}
