//! The compiler backend boundary.

use crate::codegen::SourceUnit;
use crate::error::Result;

/// Compiles one batch of generated source units into loadable artifacts.
///
/// The engine only ever talks to this trait; swapping the backend (a
/// different compiler, a remote build farm, an in-process test double) must
/// not change anything above it. A batch is all-or-nothing: any error in any
/// unit rejects the whole batch.
pub trait Toolchain: Send + Sync {
    /// Human-readable backend description, for startup logging.
    fn describe(&self) -> String;

    /// Compile the batch. Must not return partial artifacts.
    fn compile(&self, units: &[SourceUnit]) -> Result<super::CompiledBatch>;
}
