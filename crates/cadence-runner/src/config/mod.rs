pub mod break_config;
pub mod cadence_config;
pub mod paths;
pub mod session_config;

pub use break_config::BreakConfig;
pub use cadence_config::{CadenceConfig, ConfigLoadError};
pub use paths::ProjectPaths;
pub use session_config::SessionConfig;
