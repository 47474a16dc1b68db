//! Common types for the compilation pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use crucible_api::FunctionInstance;

use crate::codegen::{QualifiedName, SourceKind};
use crate::error::Result;

/// Configuration for the compiler backend.
#[derive(Debug, Clone)]
pub struct ToolchainConfig {
    /// Directory for batch build trees (.crucible/build/)
    pub build_dir: PathBuf,

    /// Path to the crucible-api crate the generated code compiles against.
    /// If None, uses the crates.io published version.
    pub api_crate_path: Option<PathBuf>,

    /// Optimization level (0-3)
    pub opt_level: u8,

    /// Additional rustc flags
    pub extra_rustc_flags: Vec<String>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            build_dir: PathBuf::from(".crucible/build"),
            api_crate_path: Self::detect_api_crate_path(),
            opt_level: 0,
            extra_rustc_flags: Vec::new(),
        }
    }
}

impl ToolchainConfig {
    /// Detect the path to the crucible-api crate.
    ///
    /// During development (running from the workspace), returns the path to
    /// crates/crucible-api. In production (installed binary), returns None to
    /// use the crates.io version.
    fn detect_api_crate_path() -> Option<PathBuf> {
        if let Ok(exe_path) = std::env::current_exe() {
            // e.g. /path/to/crucible/target/release/<bin>
            if let Some(target_dir) = exe_path.parent() {
                let workspace_root = target_dir.parent().and_then(|p| p.parent());
                if let Some(root) = workspace_root {
                    let api_crate = root.join("crates").join("crucible-api");
                    if api_crate.join("Cargo.toml").exists() {
                        return Some(api_crate);
                    }
                }
            }
        }

        // Fallback: CARGO_MANIFEST_DIR is available during cargo test
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let manifest_path = PathBuf::from(&manifest_dir);
            if let Some(workspace_root) = manifest_path.ancestors().find(|p| {
                p.join("crates").join("crucible-api").join("Cargo.toml").exists()
            }) {
                return Some(workspace_root.join("crates").join("crucible-api"));
            }
        }

        None
    }
}

/// Shared constructor for one compiled unit. Each call yields a fresh,
/// stateless instance.
pub type Constructor = Arc<dyn Fn() -> Result<FunctionInstance> + Send + Sync>;

/// Identity of one unit inside a compiled batch.
#[derive(Debug, Clone)]
pub struct BatchUnit {
    pub name: QualifiedName,
    pub kind: SourceKind,
}

/// Where the executable code of a batch lives.
pub enum BatchArtifacts {
    /// A dynamic library on disk; constructors are resolved by symbol name.
    Library { path: PathBuf },

    /// Constructors handed over directly, bypassing symbol resolution.
    /// Used by in-process backends.
    Prebuilt(Vec<(QualifiedName, Constructor)>),
}

impl std::fmt::Debug for BatchArtifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Library { path } => f.debug_struct("Library").field("path", path).finish(),
            Self::Prebuilt(entries) => f
                .debug_tuple("Prebuilt")
                .field(&entries.iter().map(|(name, _)| name).collect::<Vec<_>>())
                .finish(),
        }
    }
}

/// Result of compiling one batch of source units.
#[derive(Debug)]
pub struct CompiledBatch {
    /// Units in the batch, in generation order.
    pub units: Vec<BatchUnit>,

    /// The compiled code.
    pub artifacts: BatchArtifacts,

    /// Compilation time in milliseconds.
    pub compile_time_ms: u64,
}

/// Platform-specific dynamic library extension.
pub fn dylib_extension() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        "dll"
    }
    #[cfg(target_os = "macos")]
    {
        "dylib"
    }
    #[cfg(target_os = "linux")]
    {
        "so"
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        "so"
    }
}

/// Platform-specific dynamic library prefix.
pub fn dylib_prefix() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        ""
    }
    #[cfg(not(target_os = "windows"))]
    {
        "lib"
    }
}
