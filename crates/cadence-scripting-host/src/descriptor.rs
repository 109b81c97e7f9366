use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Entitlement classification of a script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Tier {
    /// Anyone may run the script
    Free,
    /// Only privileged user groups may run the script
    Restricted,
}

/// Immutable metadata attached to a script implementation
///
/// Scripts declare their descriptor as a `const` and hand out a `'static` reference to it:
///
/// ```
/// use cadence_scripting_host::{ScriptDescriptor, Tier};
///
/// const DESCRIPTOR: ScriptDescriptor =
///     ScriptDescriptor::new("heartbeat", Tier::Free, &["cadence"]);
/// assert_eq!(DESCRIPTOR.name(), "heartbeat");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScriptDescriptor {
    name: &'static str,
    tier: Tier,
    authors: &'static [&'static str],
}

impl ScriptDescriptor {
    pub const fn new(name: &'static str, tier: Tier, authors: &'static [&'static str]) -> Self {
        Self {
            name,
            tier,
            authors,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn authors(&self) -> &'static [&'static str] {
        self.authors
    }
}
