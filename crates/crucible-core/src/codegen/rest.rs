//! Source units for REST endpoint functions.

use std::sync::Arc;

use crate::error::Result;
use crate::metadata::{RestFunctionMeta, RestStore};

use super::{
    push_body, require_body, SourceKind, SourceUnit, SourceUnitBuilder, SourceUnitProvider,
};

/// Renders one REST function into a `RestFunction` unit.
pub struct RestFunctionBuilder {
    function: RestFunctionMeta,
}

impl RestFunctionBuilder {
    pub fn new(function: &RestFunctionMeta) -> Self {
        Self {
            function: function.clone(),
        }
    }
}

impl SourceUnitBuilder for RestFunctionBuilder {
    fn kind(&self) -> SourceKind {
        SourceKind::RestFunction
    }

    fn build(&self) -> Result<SourceUnit> {
        let body = require_body(&self.function.name, &self.function.body)?;

        let name = self.function.qualified_name();
        let simple = name.simple_name();
        let mut code = String::new();
        code.push_str(&format!(
            "// Generated from REST function \"{}\". Regenerated on every rebuild.\n",
            self.function.name
        ));
        code.push_str("use crucible_api::prelude::*;\n\n");
        code.push_str("#[derive(Default)]\n");
        code.push_str(&format!("pub struct {simple};\n\n"));
        code.push_str(&format!("impl RestFunction for {simple} {{\n"));
        code.push_str("    fn call(&mut self, context: &mut RestContext) -> FunctionResult<Value> {\n");
        push_body(&mut code, body);
        code.push_str("    }\n}\n\n");
        code.push_str(&format!(
            "crucible_api::export_function!({simple}, Rest, {});\n",
            name.entry_symbol()
        ));

        Ok(SourceUnit::new(name, self.kind(), code))
    }

    fn build_template(&self) -> String {
        self.function.body.clone()
    }
}

/// Enumerates REST functions from the REST store.
pub struct RestCodeProvider {
    store: Arc<dyn RestStore>,
}

impl RestCodeProvider {
    pub fn new(store: Arc<dyn RestStore>) -> Self {
        Self { store }
    }

    pub fn function_template(&self, function: &RestFunctionMeta) -> String {
        RestFunctionBuilder::new(function).build_template()
    }

    pub fn function_source(&self, function: &RestFunctionMeta) -> Result<SourceUnit> {
        RestFunctionBuilder::new(function).build()
    }
}

impl SourceUnitProvider for RestCodeProvider {
    fn builders(&self) -> Vec<Box<dyn SourceUnitBuilder>> {
        self.store
            .list()
            .iter()
            .map(|f| Box::new(RestFunctionBuilder::new(f)) as Box<dyn SourceUnitBuilder>)
            .collect()
    }
}
