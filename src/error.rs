use std::time::Duration;

use thiserror::Error;

/// Errors produced by a single pipeline run.
///
/// Every variant is local to one request. Nothing here is retried by the
/// library; the caller decides whether to run the pipeline again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// The image or caption handed to a stage cannot be used.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The caption model identifier is not one of the supported models.
    #[error("unsupported caption model: {0}")]
    UnsupportedModel(String),

    /// The target language is not in the supported language list.
    #[error("unsupported target language: {0}")]
    UnsupportedLanguage(String),

    /// The model server could not be reached.
    #[error("model server unavailable: {0}")]
    ServerUnavailable(String),

    /// The call did not complete within its configured timeout.
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),

    /// The model server answered with a non-2xx status.
    #[error("model server returned {status}: {body}")]
    ModelError { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("malformed model response: {0}")]
    MalformedResponse(String),
}

impl PipelineError {
    /// Returns a stable identifier for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidInput(_) => "invalid_input",
            PipelineError::UnsupportedModel(_) => "unsupported_model",
            PipelineError::UnsupportedLanguage(_) => "unsupported_language",
            PipelineError::ServerUnavailable(_) => "server_unavailable",
            PipelineError::Timeout(_) => "timeout",
            PipelineError::ModelError { .. } => "model_error",
            PipelineError::MalformedResponse(_) => "malformed_response",
        }
    }

    /// Returns true when the error was caused by the caller's input rather
    /// than by the model server.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidInput(_)
                | PipelineError::UnsupportedModel(_)
                | PipelineError::UnsupportedLanguage(_)
        )
    }
}

/// Errors raised while reading a [`crate::PipelineConfig`] from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A timeout variable is not a positive integer.
    #[error("environment variable {name} is not a valid number of seconds: {value:?}")]
    InvalidTimeout { name: &'static str, value: String },

    /// A string variable is set but blank.
    #[error("environment variable {name} must not be empty")]
    Empty { name: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct() {
        let errors = [
            PipelineError::InvalidInput(String::new()),
            PipelineError::UnsupportedModel(String::new()),
            PipelineError::UnsupportedLanguage(String::new()),
            PipelineError::ServerUnavailable(String::new()),
            PipelineError::Timeout(Duration::from_secs(1)),
            PipelineError::ModelError {
                status: 500,
                body: String::new(),
            },
            PipelineError::MalformedResponse(String::new()),
        ];

        let mut kinds: Vec<_> = errors.iter().map(|e| e.kind()).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn input_errors() {
        assert!(PipelineError::UnsupportedLanguage("Klingon".into()).is_input_error());
        assert!(!PipelineError::Timeout(Duration::from_secs(60)).is_input_error());
    }

    #[test]
    fn model_error_display_carries_status() {
        let err = PipelineError::ModelError {
            status: 500,
            body: "model not loaded".into(),
        };
        assert_eq!(err.to_string(), "model server returned 500: model not loaded");
    }
}
