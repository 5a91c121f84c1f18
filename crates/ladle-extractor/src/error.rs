//! Error types for the extractor.

/// The result type used throughout the extractor.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during extraction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A single feed request failed.
    #[error("feed request failed: {message}")]
    Feed {
        /// Description of the failure.
        message: String,
    },

    /// The feed stayed unreachable through the whole retry ladder.
    #[error("feed request failed after {attempts} attempts: {message}")]
    FeedRetriesExhausted {
        /// How many attempts were made.
        attempts: u32,
        /// Description of the last failure.
        message: String,
    },

    /// A feed response body could not be parsed as a JSON array.
    #[error("chunk at offset {offset} is not a JSON array: {message}")]
    Parse {
        /// Starting offset of the chunk being parsed.
        offset: u64,
        /// Description of the parse failure.
        message: String,
    },

    /// A lifecycle notification to the trigger failed.
    #[error("trigger notification failed: {0}")]
    Notify(String),

    /// A configuration value is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// An error from ladle-core (storage, manifest, checkpoint).
    #[error("core error: {0}")]
    Core(#[from] ladle_core::Error),
}

impl Error {
    /// Creates a feed error from any displayable cause.
    #[must_use]
    pub fn feed(message: impl std::fmt::Display) -> Self {
        Self::Feed {
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_exhaustion_reports_attempts() {
        let err = Error::FeedRetriesExhausted {
            attempts: 5,
            message: "connection refused".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("5 attempts"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn core_errors_convert() {
        let err: Error = ladle_core::Error::NotFound("x".into()).into();
        assert!(matches!(err, Error::Core(_)));
    }
}
