//! Parsing and mapping of compiler diagnostics.
//!
//! Cargo is run with `--message-format=json`; each diagnostic carries the
//! generated file it points at. Diagnostics are mapped back to the logical
//! unit and, where the location falls inside the embedded fragment, to the
//! line number the author sees in the editor.

use serde::Deserialize;
use rustc_hash::FxHashMap;

use crate::codegen::{QualifiedName, SourceKind, SourceUnit};

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
    Help,
}

impl Severity {
    fn from_level(level: &str) -> Option<Self> {
        match level {
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "note" => Some(Self::Note),
            "help" => Some(Self::Help),
            _ => None, // Skip unknown levels
        }
    }
}

/// One diagnostic, mapped back to the authored fragment where possible.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Logical unit the diagnostic points at, if it could be attributed.
    pub unit: Option<QualifiedName>,

    /// Line number within the authored fragment (1-indexed). None when the
    /// location falls in generated scaffolding or could not be attributed.
    pub line: Option<usize>,

    /// Severity level
    pub severity: Severity,

    /// Diagnostic message
    pub message: String,

    /// Error code (e.g., "E0308")
    pub code: Option<String>,

    /// Rendered message (for display)
    pub rendered: Option<String>,
}

/// A rejected batch: every error diagnostic cargo reported.
#[derive(Debug, Clone)]
pub struct CompileFailure {
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileFailure {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    /// Errors only, skipping warnings and notes.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }
}

impl std::fmt::Display for CompileFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let errors: Vec<&Diagnostic> = self.errors().collect();
        write!(f, "batch compilation failed with {} error(s)", errors.len())?;
        for diagnostic in errors {
            write!(f, "\n  ")?;
            if let Some(unit) = &diagnostic.unit {
                write!(f, "{unit}")?;
                if let Some(line) = diagnostic.line {
                    write!(f, ":{line}")?;
                }
                write!(f, ": ")?;
            }
            write!(f, "{}", diagnostic.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileFailure {}

/// Map a line in a generated unit back to the authored fragment.
///
/// Fragment line 1 sits directly below the fixed scaffolding header, so the
/// header lines are subtracted; locations inside the scaffolding itself map
/// to nothing.
pub fn template_line(kind: SourceKind, generated_line: usize) -> Option<usize> {
    let offset = kind.template_line_offset();
    if generated_line > offset {
        Some(generated_line - offset)
    } else {
        None
    }
}

/// Cargo JSON message envelope.
#[derive(Debug, Deserialize)]
struct CargoMessage {
    reason: String,
    message: Option<RustcDiagnostic>,
}

/// Rustc JSON diagnostic format.
#[derive(Debug, Deserialize)]
struct RustcDiagnostic {
    message: String,
    code: Option<RustcCode>,
    level: String,
    spans: Vec<RustcSpan>,
    rendered: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RustcCode {
    code: String,
}

#[derive(Debug, Deserialize)]
struct RustcSpan {
    file_name: String,
    line_start: usize,
    is_primary: bool,
}

/// Parses cargo JSON output and attributes diagnostics to batch units.
pub struct DiagnosticParser {
    /// Generated file name -> (unit name, kind)
    by_file: FxHashMap<String, (QualifiedName, SourceKind)>,
}

impl DiagnosticParser {
    pub fn new(units: &[SourceUnit]) -> Self {
        let by_file = units
            .iter()
            .map(|unit| {
                (
                    unit.name().file_name(),
                    (unit.name().clone(), unit.kind()),
                )
            })
            .collect();
        Self { by_file }
    }

    /// Parse one cargo run's stdout into mapped diagnostics.
    pub fn parse_cargo_output(&self, output: &str) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for line in output.lines() {
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<CargoMessage>(line) {
                Ok(message) => {
                    if message.reason != "compiler-message" {
                        continue;
                    }
                    if let Some(diagnostic) = message.message.and_then(|d| self.map_diagnostic(d)) {
                        diagnostics.push(diagnostic);
                    }
                }
                Err(e) => {
                    // Truncate on a char boundary; raw compiler output is
                    // not guaranteed to be ASCII.
                    let cut = line.char_indices().nth(100).map_or(line.len(), |(i, _)| i);
                    tracing::debug!("Failed to parse cargo JSON: {} (line: {})", e, &line[..cut]);
                }
            }
        }

        diagnostics
    }

    fn map_diagnostic(&self, diagnostic: RustcDiagnostic) -> Option<Diagnostic> {
        let severity = Severity::from_level(&diagnostic.level)?;

        let primary_span = diagnostic.spans.iter().find(|s| s.is_primary);
        let attribution = primary_span.and_then(|span| {
            let file = std::path::Path::new(&span.file_name)
                .file_name()
                .and_then(|n| n.to_str())?;
            let (name, kind) = self.by_file.get(file)?;
            Some((name.clone(), template_line(*kind, span.line_start)))
        });
        let (unit, line) = match attribution {
            Some((name, line)) => (Some(name), line),
            None => (None, None),
        };

        Some(Diagnostic {
            unit,
            line,
            severity,
            message: diagnostic.message,
            code: diagnostic.code.map(|c| c.code),
            rendered: diagnostic.rendered,
        })
    }
}
