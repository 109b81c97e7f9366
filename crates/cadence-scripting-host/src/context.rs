use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::Level;

use crate::control::ScriptId;

/// Callbacks a script's scheduler makes into the process that owns it
pub trait HostController: Send + Sync {
    /// The script has ended and should be removed from the host's active set
    fn notify_script_ended(&self, id: ScriptId);

    /// Log a message on behalf of a script at info level
    fn log(&self, source: &str, message: &str) {
        self.log_at(source, Level::INFO, message);
    }

    /// Log a message on behalf of a script
    fn log_at(&self, source: &str, level: Level, message: &str);
}

/// Something that may take over a script's tick before normal pulses resume
///
/// Polled once per tick on the script's scheduler thread, even while the script is paused.
pub trait PreemptionSource: Send + Sync {
    fn check(&self);
}

impl<F> PreemptionSource for F
where
    F: Fn() + Send + Sync,
{
    fn check(&self) {
        self()
    }
}

/// Immutable set of API modules, keyed by type
#[derive(Clone, Default)]
pub struct ModuleBundle {
    modules: Arc<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl ModuleBundle {
    pub fn builder() -> ModuleBundleBuilder {
        ModuleBundleBuilder::default()
    }

    /// Look up the module of type `T`
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.modules
            .get(&TypeId::of::<T>())
            .and_then(|module| Arc::clone(module).downcast::<T>().ok())
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.modules.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl fmt::Debug for ModuleBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleBundle")
            .field("modules", &self.modules.len())
            .finish()
    }
}

/// Collects modules before they are frozen into a [`ModuleBundle`]
#[derive(Default)]
pub struct ModuleBundleBuilder {
    modules: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ModuleBundleBuilder {
    /// Add a module, replacing any earlier module of the same type
    pub fn with<T: Any + Send + Sync>(self, module: T) -> Self {
        self.with_shared(Arc::new(module))
    }

    /// Add a module that is already shared elsewhere
    pub fn with_shared<T: Any + Send + Sync>(mut self, module: Arc<T>) -> Self {
        self.modules.insert(TypeId::of::<T>(), module);
        self
    }

    pub fn build(self) -> ModuleBundle {
        ModuleBundle {
            modules: Arc::new(self.modules),
        }
    }
}

/// Everything a script can reach in its host
///
/// Shared between the host and the script; the scheduler only ever reads it.
#[derive(Clone)]
pub struct ScriptContext {
    host: Arc<dyn HostController>,
    preemption: Option<Arc<dyn PreemptionSource>>,
    modules: ModuleBundle,
}

impl ScriptContext {
    pub fn new(host: Arc<dyn HostController>, modules: ModuleBundle) -> Self {
        Self {
            host,
            preemption: None,
            modules,
        }
    }

    pub fn with_preemption(mut self, source: Arc<dyn PreemptionSource>) -> Self {
        self.preemption = Some(source);
        self
    }

    pub fn host(&self) -> &Arc<dyn HostController> {
        &self.host
    }

    pub fn preemption(&self) -> Option<&Arc<dyn PreemptionSource>> {
        self.preemption.as_ref()
    }

    pub fn modules(&self) -> &ModuleBundle {
        &self.modules
    }

    /// Shortcut for `modules().get::<T>()`
    pub fn module<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.modules.get::<T>()
    }
}

impl fmt::Debug for ScriptContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptContext")
            .field("preemption", &self.preemption.is_some())
            .field("modules", &self.modules)
            .finish()
    }
}
