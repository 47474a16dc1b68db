//! Error types for crucible-core.

use thiserror::Error;

use crucible_api::ApplicationError;

use crate::codegen::QualifiedName;
use crate::compile::CompileFailure;

/// Result type for crucible-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in crucible-core.
#[derive(Debug, Error)]
pub enum Error {
    /// Fragment metadata is insufficient to synthesize a source unit.
    #[error("malformed fragment '{fragment}': {reason}")]
    MalformedFragment { fragment: String, reason: String },

    /// One or more units failed compilation; the whole batch was rejected.
    #[error(transparent)]
    Compile(#[from] CompileFailure),

    /// No usable compiler backend could be located at startup.
    #[error("toolchain unavailable: {0}")]
    ToolchainUnavailable(String),

    /// A rebuild was requested while another one is running.
    #[error("rebuild already in progress")]
    RebuildInProgress,

    /// No artifact with the given logical name in the active registry.
    #[error("artifact not found: {0}")]
    NotFound(QualifiedName),

    /// A resolved artifact could not be instantiated.
    #[error("failed to construct artifact {name}: {message}")]
    Construction {
        name: QualifiedName,
        message: String,
    },

    /// The caller violated the invocation contract (programming error,
    /// e.g. supplying both an ambient session and an ambient context).
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// Business rejection raised by user code; propagated verbatim.
    #[error(transparent)]
    Application(#[from] ApplicationError),

    /// Unexpected failure from user code or the dispatch machinery.
    /// Logged in full server-side, surfaced generically to end users.
    #[error("internal error: {0}")]
    Internal(String),

    /// Failed to load a compiled artifact library.
    #[error("failed to load artifact library: {0}")]
    LibraryLoad(#[from] libloading::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is a deliberate business rejection that the
    /// invoking layer should render to the user unchanged.
    pub fn is_business(&self) -> bool {
        matches!(self, Self::Application(_))
    }
}
