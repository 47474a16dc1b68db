//! User-facing error model for generated functions.
//!
//! The platform distinguishes deliberate business rejections from everything
//! else: an [`ApplicationError`] travels verbatim all the way to the UI/REST
//! layer, while any other failure is treated as internal, logged server-side
//! and surfaced generically.

use thiserror::Error;

/// Result type returned by every generated function entry point.
pub type FunctionResult<T> = std::result::Result<T, FunctionError>;

/// A deliberate business rejection raised by user code.
///
/// This is the only error a generated function can surface to end users
/// unchanged (e.g. a validation failure with a human-readable message).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApplicationError {
    /// Human-readable message, rendered by the invoking layer.
    pub message: String,
    /// Optional message parameters for localization.
    pub params: Vec<String>,
}

impl ApplicationError {
    /// Create an application error with a plain message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            params: Vec::new(),
        }
    }

    /// Attach message parameters.
    pub fn with_params(mut self, params: Vec<String>) -> Self {
        self.params = params;
        self
    }
}

/// Error returned by a generated function body.
#[derive(Debug, Error)]
pub enum FunctionError {
    /// Business rejection; propagated verbatim to the caller.
    #[error(transparent)]
    Application(#[from] ApplicationError),

    /// Anything else; classified as an internal failure by the dispatcher.
    #[error("{0}")]
    Other(String),
}

impl FunctionError {
    /// Wrap an arbitrary failure as a non-business error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<serde_json::Error> for FunctionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(err.to_string())
    }
}
