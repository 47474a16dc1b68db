//! Cargo-based compiler backend.
//!
//! Each batch is materialized as a throwaway cargo package in its own
//! directory under the build dir: one source file per unit, a lib.rs that
//! declares them all as modules, and a manifest building a cdylib against
//! crucible-api. The package is built with `--message-format=json` so
//! diagnostics can be attributed back to the authored fragments.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use std::time::Instant;

use uuid::Uuid;

use crate::codegen::SourceUnit;
use crate::error::{Error, Result};

use super::diagnostics::{CompileFailure, Diagnostic, DiagnosticParser, Severity};
use super::toolchain::Toolchain;
use super::types::{
    dylib_extension, dylib_prefix, BatchArtifacts, BatchUnit, CompiledBatch, ToolchainConfig,
};

/// Fixed package name for batch builds; batches are distinguished by
/// directory, not by package.
const BATCH_PACKAGE: &str = "crucible_batch";

/// Compiles batches with the ambient cargo/rustc installation.
pub struct RustcToolchain {
    config: ToolchainConfig,

    /// Path to cargo
    cargo_path: PathBuf,

    /// Toolchain version string
    rustc_version: String,

    /// Build tree of the previous successful batch, removed on the next
    /// success. Unlinking while the old library is still mapped is fine.
    previous_batch: Mutex<Option<PathBuf>>,
}

impl RustcToolchain {
    /// Locate cargo and rustc in PATH.
    pub fn locate(config: ToolchainConfig) -> Result<Self> {
        let cargo_path = which::which("cargo")
            .map_err(|_| Error::ToolchainUnavailable("cargo not found in PATH".to_string()))?;
        let rustc_path = which::which("rustc")
            .map_err(|_| Error::ToolchainUnavailable("rustc not found in PATH".to_string()))?;
        let rustc_version = Self::get_rustc_version(&rustc_path)?;

        Ok(Self {
            config,
            cargo_path,
            rustc_version,
            previous_batch: Mutex::new(None),
        })
    }

    /// Get the toolchain version.
    pub fn version(&self) -> &str {
        &self.rustc_version
    }

    fn get_rustc_version(rustc: &Path) -> Result<String> {
        let output = Command::new(rustc)
            .arg("--version")
            .output()
            .map_err(|e| Error::ToolchainUnavailable(format!("failed to run rustc: {e}")))?;

        if !output.status.success() {
            return Err(Error::ToolchainUnavailable(
                "failed to get rustc version".to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn write_package(&self, batch_dir: &Path, units: &[SourceUnit]) -> Result<()> {
        let src_dir = batch_dir.join("src");
        fs::create_dir_all(&src_dir)?;

        fs::write(
            batch_dir.join("Cargo.toml"),
            generate_manifest(&self.config),
        )?;
        fs::write(src_dir.join("lib.rs"), generate_lib_rs(units))?;
        for unit in units {
            fs::write(src_dir.join(unit.name().file_name()), unit.content())?;
        }

        Ok(())
    }

    fn run_cargo(&self, batch_dir: &Path) -> Result<std::process::Output> {
        let mut cmd = Command::new(&self.cargo_path);
        cmd.current_dir(batch_dir)
            .args(["build", "--release", "--message-format=json"]);

        if !self.config.extra_rustc_flags.is_empty() {
            cmd.env("RUSTFLAGS", self.config.extra_rustc_flags.join(" "));
        }

        cmd.output().map_err(|e| {
            Error::Internal(format!(
                "failed to run cargo (working dir: {}): {e}",
                batch_dir.display()
            ))
        })
    }

    /// Best-effort removal of a batch build tree.
    fn remove_batch_dir(batch_dir: &Path) {
        if let Err(e) = fs::remove_dir_all(batch_dir) {
            tracing::warn!(
                "Failed to clean up batch directory {}: {e}",
                batch_dir.display()
            );
        }
    }
}

impl Toolchain for RustcToolchain {
    fn describe(&self) -> String {
        format!("cargo cdylib builds ({})", self.rustc_version)
    }

    fn compile(&self, units: &[SourceUnit]) -> Result<CompiledBatch> {
        if units.is_empty() {
            return Ok(CompiledBatch {
                units: Vec::new(),
                artifacts: BatchArtifacts::Prebuilt(Vec::new()),
                compile_time_ms: 0,
            });
        }

        let start = Instant::now();
        let batch_dir = self
            .config
            .build_dir
            .join(format!("batch-{}", Uuid::new_v4().simple()));

        if let Err(e) = self.write_package(&batch_dir, units) {
            Self::remove_batch_dir(&batch_dir);
            return Err(e);
        }
        let output = match self.run_cargo(&batch_dir) {
            Ok(output) => output,
            Err(e) => {
                Self::remove_batch_dir(&batch_dir);
                return Err(e);
            }
        };

        if !output.status.success() {
            let parser = DiagnosticParser::new(units);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let mut diagnostics = parser.parse_cargo_output(&stdout);

            // Linker failures and the like produce no JSON diagnostics.
            if !diagnostics.iter().any(|d| d.severity == Severity::Error) {
                diagnostics.push(Diagnostic {
                    unit: None,
                    line: None,
                    severity: Severity::Error,
                    message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                    code: None,
                    rendered: None,
                });
            }

            Self::remove_batch_dir(&batch_dir);
            return Err(CompileFailure::new(diagnostics).into());
        }

        let library_path = batch_dir
            .join("target")
            .join("release")
            .join(format!("{}{BATCH_PACKAGE}.{}", dylib_prefix(), dylib_extension()));
        if !library_path.exists() {
            Self::remove_batch_dir(&batch_dir);
            return Err(Error::Internal(format!(
                "cargo reported success but produced no library at {}",
                library_path.display()
            )));
        }

        // Retire the previous batch tree now that a fresh library exists.
        let retired = self
            .previous_batch
            .lock()
            .map(|mut slot| slot.replace(batch_dir.clone()))
            .unwrap_or(None);
        if let Some(old_dir) = retired {
            Self::remove_batch_dir(&old_dir);
        }

        let compile_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            units = units.len(),
            compile_time_ms,
            "batch compiled to {}",
            library_path.display()
        );

        Ok(CompiledBatch {
            units: units
                .iter()
                .map(|unit| BatchUnit {
                    name: unit.name().clone(),
                    kind: unit.kind(),
                })
                .collect(),
            artifacts: BatchArtifacts::Library { path: library_path },
            compile_time_ms,
        })
    }
}

/// Manifest for a batch package. Built against the workspace crucible-api
/// during development, the published version otherwise.
fn generate_manifest(config: &ToolchainConfig) -> String {
    let api_dependency = match &config.api_crate_path {
        Some(path) => format!("crucible-api = {{ path = {:?} }}", path.display().to_string()),
        None => format!("crucible-api = \"{}\"", env!("CARGO_PKG_VERSION")),
    };

    format!(
        r#"[package]
name = "{BATCH_PACKAGE}"
version = "0.0.0"
edition = "2021"

[lib]
crate-type = ["cdylib"]

[dependencies]
{api_dependency}

[profile.release]
opt-level = {opt_level}
debug = false

[workspace]
"#,
        opt_level = config.opt_level,
    )
}

/// Crate root declaring every unit as a module. Generated code is allowed
/// to ignore its arguments and to use logical-name casing.
fn generate_lib_rs(units: &[SourceUnit]) -> String {
    let mut code = String::new();
    code.push_str("#![allow(non_snake_case, unused_imports, unused_variables, unused_mut, dead_code)]\n\n");
    for unit in units {
        code.push_str(&format!("pub mod {};\n", unit.name().module_name()));
    }
    code
}
