//! Shared fixtures: an in-process compiler backend and in-memory stores.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crucible_api::{
    CallbackFunction, ContractKind, DomainObject, FunctionContext, FunctionInstance,
    FunctionResult, JobContext, JobFunction, RestContext, RestFunction, TransformerFunction,
};
use crucible_core::codegen::{QualifiedName, SourceUnit};
use crucible_core::compile::{
    BatchArtifacts, BatchUnit, CompileFailure, CompiledBatch, Constructor, Diagnostic, Severity,
    Toolchain,
};
use crucible_core::error::Result;
use crucible_core::metadata::{
    CustomCodeMeta, CustomCodeStore, EntityFunctionMeta, EntityMeta, EntityStore,
    RestFunctionMeta, RestStore, TaskMeta, TaskStore, TransformerMeta, TransformerStore,
};

#[derive(Default)]
struct NoopCallback;

impl CallbackFunction for NoopCallback {
    fn call(
        &mut self,
        _object: &mut DomainObject,
        _context: &mut FunctionContext,
    ) -> FunctionResult<()> {
        Ok(())
    }
}

#[derive(Default)]
struct NoopJob;

impl JobFunction for NoopJob {
    fn execute(&mut self, _context: &mut JobContext) -> FunctionResult<()> {
        Ok(())
    }
}

#[derive(Default)]
struct NullRest;

impl RestFunction for NullRest {
    fn call(&mut self, _context: &mut RestContext) -> FunctionResult<Value> {
        Ok(Value::Null)
    }
}

#[derive(Default)]
struct NoopTransformer;

impl TransformerFunction for NoopTransformer {
    fn transform(
        &mut self,
        _source: &DomainObject,
        _target: &mut DomainObject,
        _context: &mut FunctionContext,
    ) -> FunctionResult<()> {
        Ok(())
    }
}

/// In-process backend: checks every unit's syntax with `syn` and hands out
/// closure constructors instead of building a real library. Behavior per
/// unit can be overridden with [`FixtureToolchain::register`]; clones
/// share state, so a handle kept outside the manager still steers it.
#[derive(Clone, Default)]
pub struct FixtureToolchain {
    constructors: Arc<Mutex<HashMap<QualifiedName, Constructor>>>,
    compiles: Arc<AtomicUsize>,
}

impl FixtureToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the constructor for one unit.
    pub fn register(&self, name: QualifiedName, constructor: Constructor) {
        self.constructors
            .lock()
            .unwrap()
            .insert(name, constructor);
    }

    /// How many batches have been compiled.
    pub fn compiles(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }

    fn default_constructor(contract: ContractKind) -> Option<Constructor> {
        match contract {
            ContractKind::Callback => Some(Arc::new(|| {
                Ok(FunctionInstance::Callback(Box::new(NoopCallback)))
            })),
            ContractKind::Job => Some(Arc::new(|| Ok(FunctionInstance::Job(Box::new(NoopJob))))),
            ContractKind::Rest => Some(Arc::new(|| Ok(FunctionInstance::Rest(Box::new(NullRest))))),
            ContractKind::Transformer => Some(Arc::new(|| {
                Ok(FunctionInstance::Transformer(Box::new(NoopTransformer)))
            })),
            ContractKind::Library => None,
        }
    }
}

impl Toolchain for FixtureToolchain {
    fn describe(&self) -> String {
        "in-process fixture backend".to_string()
    }

    fn compile(&self, units: &[SourceUnit]) -> Result<CompiledBatch> {
        self.compiles.fetch_add(1, Ordering::SeqCst);

        let mut diagnostics = Vec::new();
        for unit in units {
            if let Err(error) = syn::parse_file(unit.content()) {
                let line = error.span().start().line;
                diagnostics.push(Diagnostic {
                    unit: Some(unit.name().clone()),
                    line: crucible_core::compile::template_line(unit.kind(), line),
                    severity: Severity::Error,
                    message: error.to_string(),
                    code: None,
                    rendered: None,
                });
            }
        }
        if !diagnostics.is_empty() {
            return Err(CompileFailure::new(diagnostics).into());
        }

        let overrides = self.constructors.lock().unwrap();
        let mut constructors: Vec<(QualifiedName, Constructor)> = Vec::new();
        for unit in units {
            let constructor = overrides
                .get(unit.name())
                .cloned()
                .or_else(|| Self::default_constructor(unit.kind().contract()));
            if let Some(constructor) = constructor {
                constructors.push((unit.name().clone(), constructor));
            }
        }

        Ok(CompiledBatch {
            units: units
                .iter()
                .map(|unit| BatchUnit {
                    name: unit.name().clone(),
                    kind: unit.kind(),
                })
                .collect(),
            artifacts: BatchArtifacts::Prebuilt(constructors),
            compile_time_ms: 0,
        })
    }
}

// In-memory stores.

pub struct MemoryEntities(pub Vec<Arc<EntityMeta>>);

impl EntityStore for MemoryEntities {
    fn list(&self) -> Vec<Arc<EntityMeta>> {
        self.0.clone()
    }

    fn get(&self, id: u64) -> Option<Arc<EntityMeta>> {
        self.0.iter().find(|entity| entity.id == id).cloned()
    }
}

pub struct MemoryTasks(pub Vec<Arc<TaskMeta>>);

impl TaskStore for MemoryTasks {
    fn list(&self) -> Vec<Arc<TaskMeta>> {
        self.0.clone()
    }
}

pub struct MemoryTransformers(pub Vec<Arc<TransformerMeta>>);

impl TransformerStore for MemoryTransformers {
    fn list(&self) -> Vec<Arc<TransformerMeta>> {
        self.0.clone()
    }
}

pub struct MemoryRest(pub Vec<Arc<RestFunctionMeta>>);

impl RestStore for MemoryRest {
    fn list(&self) -> Vec<Arc<RestFunctionMeta>> {
        self.0.clone()
    }
}

pub struct MemoryCustomCode(pub Vec<Arc<CustomCodeMeta>>);

impl CustomCodeStore for MemoryCustomCode {
    fn list(&self) -> Vec<Arc<CustomCodeMeta>> {
        self.0.clone()
    }
}

// Metadata builders.

pub fn entity(id: u64, name: &str, functions: Vec<EntityFunctionMeta>) -> Arc<EntityMeta> {
    Arc::new(EntityMeta {
        id,
        name: name.into(),
        module: None,
        functions,
        status_transitions: Vec::new(),
    })
}

pub fn hook(id: u64, name: &str, configure: impl FnOnce(&mut EntityFunctionMeta)) -> EntityFunctionMeta {
    let mut function = EntityFunctionMeta::new(id, name, "        Ok(())");
    configure(&mut function);
    function
}

pub fn task(id: u64, name: &str, body: &str) -> Arc<TaskMeta> {
    Arc::new(TaskMeta {
        id,
        name: name.into(),
        module: None,
        body: body.into(),
        parameters: Vec::new(),
    })
}

pub fn transformer(id: u64, name: &str) -> Arc<TransformerMeta> {
    Arc::new(TransformerMeta {
        id,
        name: name.into(),
        module: None,
        source_entity: "lead".into(),
        target_entity: "customer".into(),
        body: "        Ok(())".into(),
    })
}

pub fn rest_function(id: u64, name: &str, body: &str) -> Arc<RestFunctionMeta> {
    Arc::new(RestFunctionMeta {
        id,
        name: name.into(),
        module: None,
        body: body.into(),
    })
}

pub fn custom_code(id: u64, name: &str, content: &str) -> Arc<CustomCodeMeta> {
    Arc::new(CustomCodeMeta {
        id,
        name: name.into(),
        module: None,
        content: content.into(),
    })
}
