//! Source units for scheduled task bodies.

use std::sync::Arc;

use crate::error::Result;
use crate::metadata::{TaskMeta, TaskStore};

use super::{
    push_body, require_body, SourceKind, SourceUnit, SourceUnitBuilder, SourceUnitProvider,
};

/// Renders one task body into a `JobFunction` unit.
pub struct TaskCodeBuilder {
    task: TaskMeta,
}

impl TaskCodeBuilder {
    pub fn new(task: &TaskMeta) -> Self {
        Self { task: task.clone() }
    }
}

impl SourceUnitBuilder for TaskCodeBuilder {
    fn kind(&self) -> SourceKind {
        SourceKind::Task
    }

    fn build(&self) -> Result<SourceUnit> {
        let body = require_body(&self.task.name, &self.task.body)?;

        let name = self.task.qualified_name();
        let simple = name.simple_name();
        let mut code = String::new();
        code.push_str(&format!(
            "// Generated from task \"{}\". Regenerated on every rebuild.\n",
            self.task.name
        ));
        code.push_str("use crucible_api::prelude::*;\n\n");
        code.push_str("#[derive(Default)]\n");
        code.push_str(&format!("pub struct {simple};\n\n"));
        code.push_str(&format!("impl JobFunction for {simple} {{\n"));
        code.push_str("    fn execute(&mut self, context: &mut JobContext) -> FunctionResult<()> {\n");
        push_body(&mut code, body);
        code.push_str("    }\n}\n\n");
        code.push_str(&format!(
            "crucible_api::export_function!({simple}, Job, {});\n",
            name.entry_symbol()
        ));

        Ok(SourceUnit::new(name, self.kind(), code))
    }

    fn build_template(&self) -> String {
        self.task.body.clone()
    }
}

/// Enumerates task bodies from the task store.
pub struct TaskCodeProvider {
    store: Arc<dyn TaskStore>,
}

impl TaskCodeProvider {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    pub fn function_template(&self, task: &TaskMeta) -> String {
        TaskCodeBuilder::new(task).build_template()
    }

    pub fn function_source(&self, task: &TaskMeta) -> Result<SourceUnit> {
        TaskCodeBuilder::new(task).build()
    }
}

impl SourceUnitProvider for TaskCodeProvider {
    fn builders(&self) -> Vec<Box<dyn SourceUnitBuilder>> {
        self.store
            .list()
            .iter()
            .map(|task| Box::new(TaskCodeBuilder::new(task)) as Box<dyn SourceUnitBuilder>)
            .collect()
    }
}
