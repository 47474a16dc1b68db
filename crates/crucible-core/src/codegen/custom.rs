//! Source units for free-form custom code modules.
//!
//! Custom code is compiled verbatim as a library module. It carries no
//! generated scaffolding beyond a provenance comment, so other generated
//! units in the same batch can call into it.

use std::sync::Arc;

use crate::error::Result;
use crate::metadata::{CustomCodeMeta, CustomCodeStore};

use super::{
    push_body, require_body, SourceKind, SourceUnit, SourceUnitBuilder, SourceUnitProvider,
};

pub struct CustomCodeBuilder {
    code: CustomCodeMeta,
}

impl CustomCodeBuilder {
    pub fn new(code: &CustomCodeMeta) -> Self {
        Self { code: code.clone() }
    }
}

impl SourceUnitBuilder for CustomCodeBuilder {
    fn kind(&self) -> SourceKind {
        SourceKind::CustomCode
    }

    fn build(&self) -> Result<SourceUnit> {
        let content = require_body(&self.code.name, &self.code.content)?;

        let name = self.code.qualified_name();
        let mut code = String::new();
        code.push_str(&format!(
            "// Generated from custom code \"{}\". Regenerated on every rebuild.\n",
            self.code.name
        ));
        push_body(&mut code, content);

        Ok(SourceUnit::new(name, self.kind(), code))
    }

    fn build_template(&self) -> String {
        self.code.content.clone()
    }
}

/// Enumerates custom code modules from the custom code store.
pub struct CustomCodeProvider {
    store: Arc<dyn CustomCodeStore>,
}

impl CustomCodeProvider {
    pub fn new(store: Arc<dyn CustomCodeStore>) -> Self {
        Self { store }
    }

    pub fn function_template(&self, code: &CustomCodeMeta) -> String {
        CustomCodeBuilder::new(code).build_template()
    }

    pub fn function_source(&self, code: &CustomCodeMeta) -> Result<SourceUnit> {
        CustomCodeBuilder::new(code).build()
    }
}

impl SourceUnitProvider for CustomCodeProvider {
    fn builders(&self) -> Vec<Box<dyn SourceUnitBuilder>> {
        self.store
            .list()
            .iter()
            .map(|c| Box::new(CustomCodeBuilder::new(c)) as Box<dyn SourceUnitBuilder>)
            .collect()
    }
}
