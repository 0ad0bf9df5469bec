//! Error handling for the Slicks telemetry engine
//!
//! This module defines custom error types and a Result alias for use
//! throughout the crate.
//!
//! Only out-of-contract calls produce errors. Data problems (empty tables,
//! absent samples, no stationary window) degrade to neutral results instead.

use thiserror::Error;

/// Main error type for Slicks operations
#[derive(Error, Debug)]
pub enum SlicksError {
    /// Invalid time range (window end not after start, unrepresentable instant)
    #[error("Range error: {0}")]
    Range(String),

    /// Control call not allowed in the current replay state
    #[error("State error: cannot {operation} while {state}")]
    State {
        operation: &'static str,
        state: &'static str,
    },

    /// Signal table failed validation at construction
    #[error("Table error: {0}")]
    Table(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors raised by a telemetry source
    #[error("Source error: {0}")]
    Source(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<SlicksError>,
    },
}

impl SlicksError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        SlicksError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns true if this is (or wraps) a range error
    pub fn is_range(&self) -> bool {
        match self {
            SlicksError::Range(_) => true,
            SlicksError::WithContext { source, .. } => source.is_range(),
            _ => false,
        }
    }

    /// Returns true if this is (or wraps) a replay state error
    pub fn is_state(&self) -> bool {
        match self {
            SlicksError::State { .. } => true,
            SlicksError::WithContext { source, .. } => source.is_state(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for SlicksError {
    fn from(err: serde_json::Error) -> Self {
        SlicksError::Serialization(err.to_string())
    }
}

/// Result type alias for Slicks operations
pub type Result<T> = std::result::Result<T, SlicksError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| SlicksError::Io(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| SlicksError::Io(e).with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SlicksError::Range("window end must be after start".to_string());
        assert_eq!(
            err.to_string(),
            "Range error: window end must be after start"
        );
    }

    #[test]
    fn test_state_error_display() {
        let err = SlicksError::State {
            operation: "resume",
            state: "Stopped",
        };
        assert_eq!(err.to_string(), "State error: cannot resume while Stopped");
        assert!(err.is_state());
        assert!(!err.is_range());
    }

    #[test]
    fn test_error_with_context() {
        let err = SlicksError::Range("bad".to_string()).with_context("Failed to open session");
        assert!(err.to_string().contains("Failed to open session"));
        assert!(err.is_range());
    }

    #[test]
    fn test_result_ext_context() {
        let result: Result<()> = Err(SlicksError::Table("unsorted".to_string()));
        let err = result.context("Loading recording").unwrap_err();
        assert!(err.to_string().starts_with("Loading recording"));
    }
}
