//! Dynamic code generation, compilation, and execution for metadata-driven
//! applications.
//!
//! User-authored function bodies attached to metadata fragments (entities,
//! tasks, transformers, REST endpoints, custom code) are rendered into
//! complete source units, batch-compiled into a dynamic library, loaded,
//! and indexed by logical name and contract. The active generation is
//! swapped atomically on rebuild; in-flight invocations keep using the
//! generation they resolved against.
//!
//! # Pipeline
//!
//! ```text
//! metadata stores ──> SourceUnitProviders ──> SourceUnits
//!                                                 │
//!                                          Toolchain::compile
//!                                                 │
//!                                          ArtifactLoader::load
//!                                                 │
//! CodeManager ── atomic swap ──> ArtifactRegistry (generation N)
//!                                                 │
//! InvocationDispatcher ── instantiate per call ──> user code
//! ```
//!
//! Generated code compiles against the `crucible-api` crate, which is the
//! only surface the engine and user code share.

pub mod artifact;
pub mod codegen;
pub mod compile;
pub mod dispatch;
pub mod error;
pub mod manager;
pub mod metadata;

pub use dispatch::{EntityEvent, EventKind, InvocationDispatcher, TaskRun};
pub use error::{Error, Result};
pub use manager::{BuildReport, CodeManager, SkippedFragment};
