//! Source units for entity-to-entity transformer functions.

use std::sync::Arc;

use crate::error::Result;
use crate::metadata::{TransformerMeta, TransformerStore};

use super::{
    malformed, push_body, require_body, SourceKind, SourceUnit, SourceUnitBuilder,
    SourceUnitProvider,
};

/// Renders one transformer into a `TransformerFunction` unit.
pub struct TransformerBuilder {
    transformer: TransformerMeta,
}

impl TransformerBuilder {
    pub fn new(transformer: &TransformerMeta) -> Self {
        Self {
            transformer: transformer.clone(),
        }
    }
}

impl SourceUnitBuilder for TransformerBuilder {
    fn kind(&self) -> SourceKind {
        SourceKind::TransformerFunction
    }

    fn build(&self) -> Result<SourceUnit> {
        if self.transformer.source_entity.trim().is_empty() {
            return Err(malformed(&self.transformer.name, "source entity is missing"));
        }
        if self.transformer.target_entity.trim().is_empty() {
            return Err(malformed(&self.transformer.name, "target entity is missing"));
        }
        let body = require_body(&self.transformer.name, &self.transformer.body)?;

        let name = self.transformer.qualified_name();
        let simple = name.simple_name();
        let mut code = String::new();
        code.push_str(&format!(
            "// Generated from transformer \"{}\" ({} -> {}). Regenerated on every rebuild.\n",
            self.transformer.name, self.transformer.source_entity, self.transformer.target_entity
        ));
        code.push_str("use crucible_api::prelude::*;\n\n");
        code.push_str("#[derive(Default)]\n");
        code.push_str(&format!("pub struct {simple};\n\n"));
        code.push_str(&format!("impl TransformerFunction for {simple} {{\n"));
        code.push_str(
            "    fn transform(&mut self, source: &DomainObject, target: &mut DomainObject, context: &mut FunctionContext) -> FunctionResult<()> {\n",
        );
        push_body(&mut code, body);
        code.push_str("    }\n}\n\n");
        code.push_str(&format!(
            "crucible_api::export_function!({simple}, Transformer, {});\n",
            name.entry_symbol()
        ));

        Ok(SourceUnit::new(name, self.kind(), code))
    }

    fn build_template(&self) -> String {
        self.transformer.body.clone()
    }
}

/// Enumerates transformers from the transformer store.
pub struct TransformerCodeProvider {
    store: Arc<dyn TransformerStore>,
}

impl TransformerCodeProvider {
    pub fn new(store: Arc<dyn TransformerStore>) -> Self {
        Self { store }
    }

    pub fn function_template(&self, transformer: &TransformerMeta) -> String {
        TransformerBuilder::new(transformer).build_template()
    }

    pub fn function_source(&self, transformer: &TransformerMeta) -> Result<SourceUnit> {
        TransformerBuilder::new(transformer).build()
    }
}

impl SourceUnitProvider for TransformerCodeProvider {
    fn builders(&self) -> Vec<Box<dyn SourceUnitBuilder>> {
        self.store
            .list()
            .iter()
            .map(|t| Box::new(TransformerBuilder::new(t)) as Box<dyn SourceUnitBuilder>)
            .collect()
    }
}
