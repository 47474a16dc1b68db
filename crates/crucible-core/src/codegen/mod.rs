//! Source unit synthesis for user-authored code fragments.
//!
//! This module turns metadata fragments (a user-authored function body plus
//! its structural context) into complete, compilable source units:
//!
//! - [`SourceUnit`] — one full, named, immutable rendering of a fragment
//! - [`SourceUnitBuilder`] — renders one fragment, in full form for the
//!   compiler or as an editable template for the code editor
//! - [`SourceUnitProvider`] — one producer per metadata kind, enumerating
//!   all currently stored fragments of its kind
//!
//! Rendering is string-template based: a fixed per-kind header and trailer
//! around the verbatim user body. The template is the exact substring that
//! `build()` embeds, so compiler diagnostics map back to template lines via
//! a fixed per-kind offset.

mod custom;
mod entity;
mod name;
mod rest;
mod task;
mod transform;

pub use custom::{CustomCodeBuilder, CustomCodeProvider};
pub use entity::{EntityCodeProvider, EntityFunctionBuilder};
pub use name::QualifiedName;
pub use rest::{RestCodeProvider, RestFunctionBuilder};
pub use task::{TaskCodeBuilder, TaskCodeProvider};
pub use transform::{TransformerBuilder, TransformerCodeProvider};

use crucible_api::ContractKind;

use crate::error::{Error, Result};

/// Origin kind of a source unit. Each kind owns a fixed namespace so
/// logical names never collide across kinds, even when user-chosen
/// display names coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    CustomCode,
    Task,
    TransformerFunction,
    RestFunction,
    EntityFunction,
}

impl SourceKind {
    /// Fixed generated-code namespace of this kind.
    pub fn namespace(self) -> &'static str {
        match self {
            Self::CustomCode => "custom",
            Self::Task => "task",
            Self::TransformerFunction => "transform",
            Self::RestFunction => "rest",
            Self::EntityFunction => "entity",
        }
    }

    /// Prefix of the deterministic, id-derived simple type name.
    pub fn type_prefix(self) -> &'static str {
        match self {
            Self::CustomCode => "Custom",
            Self::Task => "Job",
            Self::TransformerFunction => "Transformer",
            Self::RestFunction => "Call",
            Self::EntityFunction => "Hook",
        }
    }

    /// Contract a unit of this kind implements.
    pub fn contract(self) -> ContractKind {
        match self {
            Self::CustomCode => ContractKind::Library,
            Self::Task => ContractKind::Job,
            Self::TransformerFunction => ContractKind::Transformer,
            Self::RestFunction => ContractKind::Rest,
            Self::EntityFunction => ContractKind::Callback,
        }
    }

    /// Logical name of the unit generated for the fragment with the given
    /// stable id.
    pub fn qualified_name(self, fragment_id: u64) -> QualifiedName {
        QualifiedName::new(
            self.namespace(),
            &format!("{}{}", self.type_prefix(), fragment_id),
        )
    }

    /// Number of boilerplate lines preceding the embedded template.
    ///
    /// `generated_line - offset` is the corresponding template line. The
    /// offsets are fixed by the builders' headers and asserted by tests.
    pub fn template_line_offset(self) -> usize {
        match self {
            Self::CustomCode => 1,
            _ => 8,
        }
    }
}

/// One complete, compilable source unit. Created fresh on every rebuild
/// and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    name: QualifiedName,
    kind: SourceKind,
    content: String,
}

impl SourceUnit {
    pub(crate) fn new(name: QualifiedName, kind: SourceKind, content: String) -> Self {
        Self {
            name,
            kind,
            content,
        }
    }

    /// Logical name, unique within a batch.
    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    /// Origin kind.
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Full source text.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Constructor symbol the unit exports, if it is instantiable.
    pub fn entry_symbol(&self) -> Option<String> {
        match self.kind.contract() {
            ContractKind::Library => None,
            _ => Some(self.name.entry_symbol()),
        }
    }
}

/// Renders one metadata fragment into a source unit.
///
/// `build` produces the full compilable form; `build_template` the
/// editable fragment only. The template text is embedded verbatim into the
/// full form, byte for byte.
pub trait SourceUnitBuilder {
    /// Origin kind of the rendered unit.
    fn kind(&self) -> SourceKind;

    /// Render the complete compilable unit.
    ///
    /// Fails with [`Error::MalformedFragment`] when the fragment's
    /// structural metadata is insufficient; this is detected here, not
    /// deferred to the compiler.
    fn build(&self) -> Result<SourceUnit>;

    /// Render the editable template view.
    fn build_template(&self) -> String;
}

/// A producer of source unit builders, one per metadata kind.
pub trait SourceUnitProvider: Send + Sync {
    /// One builder per currently stored fragment of this provider's kind.
    fn builders(&self) -> Vec<Box<dyn SourceUnitBuilder>>;
}

/// Shared malformed-fragment error constructor.
fn malformed(fragment: impl Into<String>, reason: impl Into<String>) -> Error {
    Error::MalformedFragment {
        fragment: fragment.into(),
        reason: reason.into(),
    }
}

/// The body text is embedded verbatim; reject fragments without one.
fn require_body<'a>(fragment: &str, body: &'a str) -> Result<&'a str> {
    if body.trim().is_empty() {
        return Err(malformed(fragment, "function body is missing"));
    }
    Ok(body)
}

/// Append the body exactly as authored, normalizing only the trailing
/// newline so the closing brace lands on its own line.
fn push_body(code: &mut String, body: &str) {
    code.push_str(body);
    if !body.ends_with('\n') {
        code.push('\n');
    }
}
