mod countdown;
mod heartbeat;
mod vip_patrol;

pub use countdown::CountdownScript;
pub use heartbeat::HeartbeatScript;
pub use vip_patrol::{VipPatrolScript, Waypoints};

use crate::registry::ScriptRegistry;

/// Registry pre-loaded with every script shipped with cadence
pub fn builtin_registry() -> ScriptRegistry {
    let mut registry = ScriptRegistry::new();
    crate::register_scripts!(registry, HeartbeatScript, CountdownScript, VipPatrolScript);
    registry
}
