use std::collections::HashMap;
use tracing::{debug, warn};

use cadence_scripting_host::{Script, ScriptDescriptor};

/// Factory function type for creating script instances
pub type ScriptFactory = fn() -> Box<dyn Script>;

/// Registry of scripts the host knows how to build, keyed by name
pub struct ScriptRegistry {
    factories: HashMap<String, ScriptFactory>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a script factory, replacing any previous factory with the same name
    pub fn register(&mut self, name: impl Into<String>, factory: ScriptFactory) {
        let name = name.into();
        debug!(target: "scripting", "Registering script factory: {}", name);
        if self.factories.insert(name.clone(), factory).is_some() {
            warn!(target: "scripting", "Replaced existing script factory: {}", name);
        }
    }

    /// Build a fresh instance of the named script
    pub fn create(&self, name: &str) -> Option<Box<dyn Script>> {
        let factory = self.factories.get(name)?;
        debug!(target: "scripting", "Creating script instance: {}", name);
        Some(factory())
    }

    pub fn describe(&self, name: &str) -> Option<&'static ScriptDescriptor> {
        self.factories.get(name).and_then(|factory| factory().descriptor())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// All registered names, sorted
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ScriptRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Register several `Default` scripts under their descriptor names
///
/// # Example
/// ```ignore
/// let mut registry = ScriptRegistry::new();
/// register_scripts!(registry, Heartbeat, Countdown);
/// ```
#[macro_export]
macro_rules! register_scripts {
    ($registry:expr, $($script:ty),+ $(,)?) => {
        $(
            match ::cadence_scripting_host::Script::descriptor(&<$script>::default()) {
                Some(descriptor) => $registry.register(
                    descriptor.name(),
                    || Box::new(<$script>::default()),
                ),
                None => ::tracing::warn!(
                    target: "scripting",
                    "Skipping {} without a descriptor",
                    stringify!($script)
                ),
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_scripting_host::{ScriptControl, Tier};

    static ECHO: ScriptDescriptor = ScriptDescriptor::new("echo", Tier::Free, &["tests"]);

    #[derive(Default)]
    struct Echo;

    impl Script for Echo {
        fn descriptor(&self) -> Option<&'static ScriptDescriptor> {
            Some(&ECHO)
        }

        fn init(&mut self, _script: &ScriptControl) -> bool {
            true
        }

        fn pulse(&mut self, _script: &ScriptControl) -> i64 {
            -1
        }

        fn close(&mut self, _script: &ScriptControl) {}
    }

    #[derive(Default)]
    struct Anonymous;

    impl Script for Anonymous {
        fn descriptor(&self) -> Option<&'static ScriptDescriptor> {
            None
        }

        fn init(&mut self, _script: &ScriptControl) -> bool {
            true
        }

        fn pulse(&mut self, _script: &ScriptControl) -> i64 {
            -1
        }

        fn close(&mut self, _script: &ScriptControl) {}
    }

    #[test]
    fn test_create_known_and_unknown() {
        let mut registry = ScriptRegistry::new();
        registry.register("echo", || Box::new(Echo));

        let script = registry.create("echo").unwrap();
        assert_eq!(script.descriptor().map(|d| d.name()), Some("echo"));
        assert!(registry.create("missing").is_none());
    }

    #[test]
    fn test_available_is_sorted() {
        let mut registry = ScriptRegistry::default();
        registry.register("zeta", || Box::new(Echo));
        registry.register("alpha", || Box::new(Echo));
        registry.register("mid", || Box::new(Echo));

        assert_eq!(registry.available(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_macro_uses_descriptor_name() {
        let mut registry = ScriptRegistry::new();
        crate::register_scripts!(registry, Echo, Anonymous);

        assert_eq!(registry.available(), vec!["echo"]);
        assert_eq!(registry.describe("echo").map(|d| d.tier()), Some(Tier::Free));
    }
}
