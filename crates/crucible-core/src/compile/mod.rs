//! Batch compilation of generated source units.
//!
//! The [`Toolchain`] trait is the swappable boundary; [`RustcToolchain`] is
//! the production backend. Compilation is all-or-nothing per batch and the
//! resulting artifacts carry enough identity to index and instantiate every
//! unit.

mod diagnostics;
mod rustc;
mod toolchain;
mod types;

pub use diagnostics::{
    template_line, CompileFailure, Diagnostic, DiagnosticParser, Severity,
};
pub use rustc::RustcToolchain;
pub use toolchain::Toolchain;
pub use types::{
    dylib_extension, dylib_prefix, BatchArtifacts, BatchUnit, CompiledBatch, Constructor,
    ToolchainConfig,
};
