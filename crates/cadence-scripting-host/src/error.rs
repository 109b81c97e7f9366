use std::io;

/// Failures that stop a script before its scheduler loop starts
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("Script does not declare a descriptor")]
    MissingDescriptor,

    #[error("Cannot use script '{script}' with the current account")]
    Unauthorized { script: &'static str },

    #[error("Failed to spawn scheduler thread for script '{script}': {source}")]
    Spawn {
        script: &'static str,
        #[source]
        source: io::Error,
    },
}
