//! Rebuild orchestration and the atomic registry swap.
//!
//! [`CodeManager`] owns the compiler backend and the active
//! [`ArtifactRegistry`]. A rebuild regenerates every source unit from
//! metadata, compiles the batch, loads it, and swaps the registry pointer
//! in one step. Lookups never block on a rebuild and a failed rebuild
//! leaves the active generation untouched.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, TryLockError};
use std::time::Instant;

use crucible_api::ContractKind;

use crate::artifact::{ArtifactHandle, ArtifactLoader, ArtifactRegistry};
use crate::codegen::{QualifiedName, SourceUnit, SourceUnitProvider};
use crate::compile::Toolchain;
use crate::error::{Error, Result};

/// A metadata fragment left out of a rebuild.
#[derive(Debug, Clone)]
pub struct SkippedFragment {
    pub fragment: String,
    pub reason: String,
}

/// Outcome of one successful rebuild.
#[derive(Debug)]
pub struct BuildReport {
    /// Generation that is now active.
    pub generation: u64,

    /// Number of artifacts in the new registry.
    pub units: usize,

    /// Compilation time in milliseconds.
    pub compile_time_ms: u64,

    /// Fragments whose metadata could not be rendered into source units.
    pub skipped: Vec<SkippedFragment>,
}

/// Owns the toolchain, the providers, and the active artifact generation.
pub struct CodeManager {
    toolchain: Box<dyn Toolchain>,
    providers: Vec<Box<dyn SourceUnitProvider>>,

    /// The active registry. Writes only swap the Arc, so readers are never
    /// blocked for the duration of a rebuild.
    active: RwLock<Arc<ArtifactRegistry>>,

    /// Single-flight rebuild guard.
    rebuild_lock: Mutex<()>,

    /// Last activated generation; 0 until the first rebuild.
    generation: AtomicU64,
}

impl CodeManager {
    pub fn new(
        toolchain: Box<dyn Toolchain>,
        providers: Vec<Box<dyn SourceUnitProvider>>,
    ) -> Self {
        tracing::info!("code manager using {}", toolchain.describe());
        Self {
            toolchain,
            providers,
            active: RwLock::new(Arc::new(ArtifactRegistry::empty())),
            rebuild_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// The active registry. Callers resolving several artifacts for one
    /// logical operation should hold on to this so all lookups hit the
    /// same generation.
    pub fn registry(&self) -> Arc<ArtifactRegistry> {
        match self.active.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Resolve one artifact by logical name in the active generation.
    pub fn artifact(&self, name: &QualifiedName) -> Result<ArtifactHandle> {
        self.registry().resolve_by_name(name)
    }

    /// All artifacts of the active generation implementing the contract.
    pub fn artifacts(&self, contract: ContractKind) -> Vec<ArtifactHandle> {
        self.registry().resolve_by_capability(contract).to_vec()
    }

    /// Generation currently active.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Regenerate, compile, load, and activate a new artifact generation.
    ///
    /// Fragments whose metadata cannot be rendered are skipped with a
    /// warning and reported; a compile error in any generated unit rejects
    /// the whole batch and keeps the current generation active.
    pub fn rebuild(&self) -> Result<BuildReport> {
        let _guard = match self.rebuild_lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(Error::RebuildInProgress),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let start = Instant::now();
        let mut units: Vec<SourceUnit> = Vec::new();
        let mut skipped = Vec::new();

        for provider in &self.providers {
            for builder in provider.builders() {
                match builder.build() {
                    Ok(unit) => units.push(unit),
                    Err(Error::MalformedFragment { fragment, reason }) => {
                        tracing::warn!("skipping malformed fragment '{fragment}': {reason}");
                        skipped.push(SkippedFragment { fragment, reason });
                    }
                    Err(other) => return Err(other),
                }
            }
        }

        let batch = self.toolchain.compile(&units)?;
        let compile_time_ms = batch.compile_time_ms;

        let generation = self.generation.load(Ordering::SeqCst) + 1;
        let registry = Arc::new(ArtifactLoader::load(batch, generation)?);
        let unit_count = registry.len();

        match self.active.write() {
            Ok(mut guard) => *guard = registry,
            Err(poisoned) => *poisoned.into_inner() = registry,
        }
        self.generation.store(generation, Ordering::SeqCst);

        tracing::info!(
            generation,
            units = unit_count,
            skipped = skipped.len(),
            compile_time_ms,
            total_ms = start.elapsed().as_millis() as u64,
            "activated new artifact generation"
        );

        Ok(BuildReport {
            generation,
            units: unit_count,
            compile_time_ms,
            skipped,
        })
    }

    /// Drop the active generation, releasing its backing library once the
    /// last outstanding handle is gone.
    pub fn shutdown(&self) {
        match self.active.write() {
            Ok(mut guard) => *guard = Arc::new(ArtifactRegistry::empty()),
            Err(poisoned) => *poisoned.into_inner() = Arc::new(ArtifactRegistry::empty()),
        }
        tracing::info!("code manager shut down, active generation released");
    }
}
