use thiserror::Error;

/// Raised when a scenario description cannot be expanded into runs.
///
/// Always fatal: nothing is dispatched once one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConfigurationError {
    message: String,
}

impl ConfigurationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_json::Error> for ConfigurationError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(format!("Scenario description is not valid JSON: {error}"))
    }
}
