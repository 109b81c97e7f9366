pub mod config;
pub mod logging;
mod registry;
mod script_stack;
pub mod scripts;
mod take_break;

pub use config::{BreakConfig, CadenceConfig, ConfigLoadError, ProjectPaths, SessionConfig};
pub use logging::init_logging;
pub use registry::{ScriptFactory, ScriptRegistry};
pub use script_stack::{RunningScript, ScriptStack};
pub use take_break::TakeBreak;
