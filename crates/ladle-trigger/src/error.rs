//! Error types for the trigger.

/// The result type used throughout the trigger.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in trigger operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A forward to a stage worker failed at the transport level.
    #[error("dispatch to {stage} failed: {message}")]
    Dispatch {
        /// Label of the stage being invoked.
        stage: String,
        /// Description of the failure.
        message: String,
    },

    /// A configuration value is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// An error from ladle-core.
    #[error("core error: {0}")]
    Core(#[from] ladle_core::Error),
}

impl Error {
    /// Creates a dispatch error.
    #[must_use]
    pub fn dispatch(stage: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Dispatch {
            stage: stage.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_error_names_the_stage() {
        let err = Error::dispatch("cleaner", "connection refused");
        let msg = err.to_string();
        assert!(msg.contains("cleaner"));
        assert!(msg.contains("connection refused"));
    }
}
