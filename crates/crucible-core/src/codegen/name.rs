//! Logical names of generated source units.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix of every exported constructor symbol.
const SYMBOL_PREFIX: &str = "crucible_unit_";

/// The qualified logical name of a generated unit: a per-kind namespace
/// and a simple type name, joined with a dot.
///
/// Logical names are derived from stable fragment ids, so they are unique
/// within a batch and survive display-name changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName(String);

impl QualifiedName {
    /// Join a namespace and a simple name.
    pub fn new(namespace: &str, simple_name: &str) -> Self {
        Self(format!("{namespace}.{simple_name}"))
    }

    /// Adopt an already dotted name.
    pub fn from_dotted(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The namespace part (everything before the last dot).
    pub fn namespace(&self) -> &str {
        match self.0.rfind('.') {
            Some(idx) => &self.0[..idx],
            None => "",
        }
    }

    /// The simple type name (everything after the last dot).
    pub fn simple_name(&self) -> &str {
        match self.0.rfind('.') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// The dotted form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifier-safe mangling of the dotted form.
    pub fn mangled(&self) -> String {
        self.0.replace('.', "_")
    }

    /// Name of the constructor symbol an instantiable unit exports.
    pub fn entry_symbol(&self) -> String {
        format!("{SYMBOL_PREFIX}{}", self.mangled())
    }

    /// File name of the unit inside a generated batch package.
    pub fn file_name(&self) -> String {
        format!("{}.rs", self.mangled())
    }

    /// Module name of the unit inside a generated batch package.
    pub fn module_name(&self) -> String {
        self.mangled()
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_namespace_and_simple_name() {
        let name = QualifiedName::new("entity", "Hook7");
        assert_eq!(name.as_str(), "entity.Hook7");
        assert_eq!(name.namespace(), "entity");
        assert_eq!(name.simple_name(), "Hook7");
    }

    #[test]
    fn undotted_name_has_empty_namespace() {
        let name = QualifiedName::from_dotted("Orphan");
        assert_eq!(name.namespace(), "");
        assert_eq!(name.simple_name(), "Orphan");
    }

    #[test]
    fn mangling_and_symbols() {
        let name = QualifiedName::new("rest", "Call2");
        assert_eq!(name.mangled(), "rest_Call2");
        assert_eq!(name.entry_symbol(), "crucible_unit_rest_Call2");
        assert_eq!(name.file_name(), "rest_Call2.rs");
    }
}
