//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
///
/// Element-level variants (`StaleElement`, `AttributeUnavailable`) are expected
/// during a scrape and are absorbed by the caller. `Session` means the automation
/// backend is gone and nothing further can succeed.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Stale element: {0}")]
    StaleElement(String),

    #[error("Attribute unavailable: {0}")]
    AttributeUnavailable(String),

    #[error("Automation error: {0}")]
    Automation(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Create a stale element error
    pub fn stale(msg: impl Into<String>) -> Self {
        Self::StaleElement(msg.into())
    }

    /// Create an attribute unavailable error
    pub fn attribute_unavailable(msg: impl Into<String>) -> Self {
        Self::AttributeUnavailable(msg.into())
    }

    /// Create a session error
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }

    /// Create an automation error
    pub fn automation(msg: impl Into<String>) -> Self {
        Self::Automation(msg.into())
    }

    /// True when the automation session can no longer be used.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Session(_))
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_session_errors_are_fatal() {
        assert!(Error::session("gone").is_fatal());
        assert!(!Error::stale("elem-1").is_fatal());
        assert!(!Error::attribute_unavailable("label").is_fatal());
        assert!(!Error::automation("unknown error").is_fatal());
        assert!(!Error::Unsupported("detail view".into()).is_fatal());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::attribute_unavailable("visible");
        assert_eq!(err.to_string(), "Attribute unavailable: visible");

        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(err.to_string().starts_with("IO error"));
    }
}
