//! Loaded artifacts: libraries, handles, and the per-generation registry.

mod loader;
mod registry;

pub use loader::ArtifactLoader;
pub use registry::{ArtifactHandle, ArtifactRegistry};
