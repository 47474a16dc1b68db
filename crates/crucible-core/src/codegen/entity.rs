//! Source units for entity lifecycle and status-transition functions.

use std::sync::Arc;

use crate::error::Result;
use crate::metadata::{EntityFunctionMeta, EntityMeta, EntityStore};

use super::{
    malformed, push_body, require_body, SourceKind, SourceUnit, SourceUnitBuilder,
    SourceUnitProvider,
};

/// Renders one entity function into a `CallbackFunction` unit.
pub struct EntityFunctionBuilder {
    entity_name: String,
    function: EntityFunctionMeta,
}

impl EntityFunctionBuilder {
    pub fn new(entity: &EntityMeta, function: &EntityFunctionMeta) -> Self {
        Self {
            entity_name: entity.name.clone(),
            function: function.clone(),
        }
    }
}

impl SourceUnitBuilder for EntityFunctionBuilder {
    fn kind(&self) -> SourceKind {
        SourceKind::EntityFunction
    }

    fn build(&self) -> Result<SourceUnit> {
        if self.entity_name.trim().is_empty() {
            return Err(malformed(&self.function.name, "owning entity is missing"));
        }
        let body = require_body(&self.function.name, &self.function.body)?;

        let name = self.function.qualified_name();
        let simple = name.simple_name();
        let mut code = String::new();
        code.push_str(&format!(
            "// Generated from entity function \"{}\" on entity \"{}\". Regenerated on every rebuild.\n",
            self.function.name, self.entity_name
        ));
        code.push_str("use crucible_api::prelude::*;\n\n");
        code.push_str("#[derive(Default)]\n");
        code.push_str(&format!("pub struct {simple};\n\n"));
        code.push_str(&format!("impl CallbackFunction for {simple} {{\n"));
        code.push_str(
            "    fn call(&mut self, object: &mut DomainObject, context: &mut FunctionContext) -> FunctionResult<()> {\n",
        );
        push_body(&mut code, body);
        code.push_str("    }\n}\n\n");
        code.push_str(&format!(
            "crucible_api::export_function!({simple}, Callback, {});\n",
            name.entry_symbol()
        ));

        Ok(SourceUnit::new(name, self.kind(), code))
    }

    fn build_template(&self) -> String {
        self.function.body.clone()
    }
}

/// Enumerates entity functions from the entity store.
pub struct EntityCodeProvider {
    store: Arc<dyn EntityStore>,
}

impl EntityCodeProvider {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Editable template of one function, for the code editor.
    pub fn function_template(&self, entity: &EntityMeta, function: &EntityFunctionMeta) -> String {
        EntityFunctionBuilder::new(entity, function).build_template()
    }

    /// Full source of one function, for preview.
    pub fn function_source(
        &self,
        entity: &EntityMeta,
        function: &EntityFunctionMeta,
    ) -> Result<SourceUnit> {
        EntityFunctionBuilder::new(entity, function).build()
    }
}

impl SourceUnitProvider for EntityCodeProvider {
    fn builders(&self) -> Vec<Box<dyn SourceUnitBuilder>> {
        let mut result: Vec<Box<dyn SourceUnitBuilder>> = Vec::new();
        for entity in self.store.list() {
            for function in &entity.functions {
                result.push(Box::new(EntityFunctionBuilder::new(&entity, function)));
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::EntityFunctionMeta;

    fn customer_entity() -> EntityMeta {
        EntityMeta {
            id: 1,
            name: "customer".into(),
            module: Some("sales".into()),
            functions: Vec::new(),
            status_transitions: Vec::new(),
        }
    }

    #[test]
    fn template_is_embedded_verbatim() {
        let body = "        let limit = 100;\n        object.set_value(\"limit\", json!(limit));\n        Ok(())";
        let function = EntityFunctionMeta::new(7, "set limit", body);
        let builder = EntityFunctionBuilder::new(&customer_entity(), &function);

        let template = builder.build_template();
        let unit = builder.build().unwrap();

        assert_eq!(template, body);
        assert!(unit.content().contains(&template));
        assert_eq!(unit.name().as_str(), "entity.Hook7");
        assert_eq!(unit.kind(), SourceKind::EntityFunction);
    }

    #[test]
    fn body_starts_at_the_fixed_offset() {
        let function = EntityFunctionMeta::new(7, "check", "Ok(())");
        let unit = EntityFunctionBuilder::new(&customer_entity(), &function)
            .build()
            .unwrap();

        let body_index = unit
            .content()
            .lines()
            .position(|line| line == "Ok(())")
            .unwrap();
        assert_eq!(body_index, SourceKind::EntityFunction.template_line_offset());
    }

    #[test]
    fn name_derives_from_id_not_display_name() {
        let function = EntityFunctionMeta::new(12, "spaces & symbols!", "Ok(())");
        let unit = EntityFunctionBuilder::new(&customer_entity(), &function)
            .build()
            .unwrap();

        assert_eq!(unit.name().simple_name(), "Hook12");
        assert!(unit.content().contains("pub struct Hook12;"));
        assert!(unit
            .content()
            .contains("crucible_api::export_function!(Hook12, Callback, crucible_unit_entity_Hook12);"));
    }

    #[test]
    fn empty_body_is_malformed() {
        let function = EntityFunctionMeta::new(1, "broken", "   \n");
        let err = EntityFunctionBuilder::new(&customer_entity(), &function)
            .build()
            .unwrap_err();
        assert!(matches!(err, crate::Error::MalformedFragment { .. }));
    }

    #[test]
    fn missing_entity_is_malformed() {
        let mut entity = customer_entity();
        entity.name = String::new();
        let function = EntityFunctionMeta::new(1, "orphan", "Ok(())");
        let err = EntityFunctionBuilder::new(&entity, &function)
            .build()
            .unwrap_err();
        assert!(matches!(err, crate::Error::MalformedFragment { .. }));
    }
}
