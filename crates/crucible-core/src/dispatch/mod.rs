//! Invocation of generated functions against domain objects.
//!
//! The dispatcher is the only place user code runs. It resolves artifacts
//! from the active generation, instantiates one fresh instance per
//! invocation, and classifies every failure at the boundary: business
//! rejections pass through verbatim, everything else (including panics)
//! is logged in full and surfaced as an opaque internal error.

mod events;

pub use events::{EntityEvent, EventKind};

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;

use crucible_api::{
    CallbackFunction, ContractKind, DomainObject, FunctionContext, FunctionError,
    FunctionInstance, FunctionResult, JobContext, JobLogEntry, JobParameter, RestContext,
    RestFunction, RestMethod, Session, TransformerFunction,
};

use crate::artifact::ArtifactRegistry;
use crate::codegen::QualifiedName;
use crate::error::{Error, Result};
use crate::manager::CodeManager;
use crate::metadata::{
    EntityFunctionMeta, EntityMeta, EntityStore, RestFunctionMeta, StatusTransitionMeta, TaskMeta,
    TransformerMeta,
};

/// Outcome of one task run. The log is preserved even when the body failed.
#[derive(Debug)]
pub struct TaskRun {
    pub logs: Vec<JobLogEntry>,
    pub outcome: Result<()>,
}

/// Dispatches lifecycle events, user actions, tasks, transformers, and
/// REST calls against the active artifact generation.
pub struct InvocationDispatcher {
    manager: Arc<CodeManager>,
    entities: Arc<dyn EntityStore>,
}

impl InvocationDispatcher {
    pub fn new(manager: Arc<CodeManager>, entities: Arc<dyn EntityStore>) -> Self {
        Self { manager, entities }
    }

    /// Dispatch one lifecycle event. Returns whether any hook ran.
    ///
    /// User actions have an explicit result and go through
    /// [`Self::process_user_event`] instead.
    pub fn process_event(&self, event: EntityEvent<'_>) -> Result<bool> {
        if event.kind == EventKind::UserAction {
            return Err(Error::ContractViolation(
                "user actions go through process_user_event".to_string(),
            ));
        }

        match event.kind {
            EventKind::BeforeTransition | EventKind::AfterTransition => {
                self.process_transition_event(event)
            }
            _ => self.process_entity_event(event),
        }
    }

    /// Invoke one callable hook explicitly, returning the success message
    /// the hook set, if any.
    pub fn process_user_event(&self, event: EntityEvent<'_>) -> Result<Option<String>> {
        let function_id = event.function_id.ok_or_else(|| {
            Error::ContractViolation("user action event carries no function id".to_string())
        })?;
        let entity = self.entity_of(event.object)?;
        let function = entity.function(function_id).ok_or_else(|| {
            Error::ContractViolation(format!(
                "entity '{}' has no function with id {function_id}",
                entity.name
            ))
        })?;

        let registry = self.manager.registry();
        self.call_hook(
            &registry,
            &entity,
            function,
            event.object,
            event.session.as_ref(),
            event.context,
            None,
        )
    }

    /// Run one REST endpoint function and return its response body.
    pub fn call_rest_function(
        &self,
        function: &RestFunctionMeta,
        method: RestMethod,
        body: Value,
        parameters: Vec<String>,
        session: Session,
    ) -> Result<Value> {
        let registry = self.manager.registry();
        let name = function.qualified_name();
        let handle = registry.resolve_by_name(&name)?;
        let mut instance = expect_rest(&name, handle.instantiate()?)?;

        let base = FunctionContext::new(session, function.module.clone());
        let mut context = RestContext::new(base, method, body, parameters);

        tracing::debug!("calling REST function '{}' ({name})", function.name);
        run_function(&name, || instance.call(&mut context))
    }

    /// Run one task body to completion.
    ///
    /// Resolution and contract failures are returned as `Err`; once the
    /// body has started, its outcome and accumulated log are both carried
    /// in the [`TaskRun`] so a failed run still yields its log.
    pub fn run_task(
        &self,
        task: &TaskMeta,
        parameters: Vec<JobParameter>,
        session: Session,
    ) -> Result<TaskRun> {
        let registry = self.manager.registry();
        let name = task.qualified_name();
        let handle = registry.resolve_by_name(&name)?;
        let mut instance = expect_job(&name, handle.instantiate()?)?;

        let base = FunctionContext::new(session, task.module.clone());
        let mut context = JobContext::new(base, parameters);

        tracing::debug!("running task '{}' ({name})", task.name);
        let outcome = run_function(&name, || instance.execute(&mut context));
        Ok(TaskRun {
            logs: context.take_logs(),
            outcome,
        })
    }

    /// Run one transformer, deriving target state from the source object.
    pub fn transform(
        &self,
        transformer: &TransformerMeta,
        source: &DomainObject,
        target: &mut DomainObject,
        session: Session,
    ) -> Result<()> {
        let registry = self.manager.registry();
        let name = transformer.qualified_name();
        let handle = registry.resolve_by_name(&name)?;
        let mut instance = expect_transformer(&name, handle.instantiate()?)?;

        let mut context = FunctionContext::new(session, transformer.module.clone());

        tracing::debug!("running transformer '{}' ({name})", transformer.name);
        run_function(&name, || instance.transform(source, target, &mut context))
    }

    fn process_entity_event(&self, mut event: EntityEvent<'_>) -> Result<bool> {
        let entity = self.entity_of(event.object)?;
        let registry = self.manager.registry();

        let mut executed = false;
        for function in &entity.functions {
            if !function.active {
                continue;
            }
            let execute = match event.kind {
                EventKind::Create => function.on_create,
                EventKind::Modify => function.on_modify,
                EventKind::BeforeInsert => function.before_insert,
                EventKind::AfterInsert => function.after_insert,
                EventKind::BeforeUpdate => function.before_update,
                EventKind::AfterUpdate => function.after_update,
                EventKind::BeforeDelete => function.before_delete,
                EventKind::AfterDelete => function.after_delete,
                other => {
                    return Err(Error::ContractViolation(format!(
                        "unsupported entity event {other:?}"
                    )))
                }
            };
            if execute {
                self.call_hook(
                    &registry,
                    &entity,
                    function,
                    event.object,
                    event.session.as_ref(),
                    event.context.as_deref_mut(),
                    None,
                )?;
                executed = true;
            }
        }
        Ok(executed)
    }

    fn process_transition_event(&self, mut event: EntityEvent<'_>) -> Result<bool> {
        let transition = event.status_transition.ok_or_else(|| {
            Error::ContractViolation("transition event carries no status transition".to_string())
        })?;
        let entity = self.entity_of(event.object)?;
        let registry = self.manager.registry();

        let mut executed = false;
        for hook in &transition.hooks {
            let function = entity.function(hook.function_id).ok_or_else(|| {
                Error::Internal(format!(
                    "transition {} references unknown function id {}",
                    transition.transition.id, hook.function_id
                ))
            })?;
            if !function.active {
                continue;
            }
            let execute = match event.kind {
                EventKind::BeforeTransition => hook.before,
                EventKind::AfterTransition => hook.after,
                other => {
                    return Err(Error::ContractViolation(format!(
                        "unsupported transition event {other:?}"
                    )))
                }
            };
            if execute {
                self.call_hook(
                    &registry,
                    &entity,
                    function,
                    event.object,
                    event.session.as_ref(),
                    event.context.as_deref_mut(),
                    Some(transition),
                )?;
                executed = true;
            }
        }
        Ok(executed)
    }

    fn entity_of(&self, object: &DomainObject) -> Result<Arc<EntityMeta>> {
        self.entities
            .get(object.entity_id())
            .ok_or_else(|| Error::Internal(format!("unknown entity id {}", object.entity_id())))
    }

    /// Invoke one hook. The ambient contract is checked before the
    /// artifact is resolved, so contract violations surface even when the
    /// registry has no matching artifact.
    #[allow(clippy::too_many_arguments)]
    fn call_hook(
        &self,
        registry: &ArtifactRegistry,
        entity: &EntityMeta,
        function: &EntityFunctionMeta,
        object: &mut DomainObject,
        session: Option<&Session>,
        context: Option<&mut FunctionContext>,
        transition: Option<&StatusTransitionMeta>,
    ) -> Result<Option<String>> {
        let name = function.qualified_name();
        tracing::debug!(
            "executing function '{}' on {} id:{:?}",
            function.name,
            entity.name,
            object.id()
        );

        match (session, context) {
            (None, None) => Err(Error::ContractViolation(
                "no session or function context provided".to_string(),
            )),
            (Some(_), Some(_)) => Err(Error::ContractViolation(
                "only one of session and function context allowed".to_string(),
            )),
            (None, Some(context)) => {
                let handle = registry.resolve_by_name(&name)?;
                let mut instance = expect_callback(&name, handle.instantiate()?)?;
                run_function(&name, || instance.call(object, context))?;
                Ok(context.success_message().map(str::to_owned))
            }
            (Some(session), None) => {
                let handle = registry.resolve_by_name(&name)?;
                let mut instance = expect_callback(&name, handle.instantiate()?)?;

                let mut context =
                    FunctionContext::new(session.clone(), entity.module.clone());
                if let Some(transition) = transition {
                    context = context.with_status_transition(transition.transition.clone());
                }

                run_function(&name, || instance.call(object, &mut context))?;
                Ok(context.take_success_message())
            }
        }
    }
}

/// Run user code and classify the outcome at the boundary.
fn run_function<R>(name: &QualifiedName, f: impl FnOnce() -> FunctionResult<R>) -> Result<R> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(FunctionError::Application(error))) => Err(Error::Application(error)),
        Ok(Err(FunctionError::Other(message))) => {
            tracing::error!("function {name} failed: {message}");
            Err(Error::Internal(format!("function {name} failed: {message}")))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!("function {name} panicked: {message}");
            Err(Error::Internal(format!(
                "function {name} panicked: {message}"
            )))
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn contract_mismatch(name: &QualifiedName, expected: ContractKind, got: &FunctionInstance) -> Error {
    Error::Internal(format!(
        "artifact {name} implements {}, expected {}",
        got.contract().name(),
        expected.name()
    ))
}

fn expect_callback(
    name: &QualifiedName,
    instance: FunctionInstance,
) -> Result<Box<dyn CallbackFunction>> {
    match instance {
        FunctionInstance::Callback(function) => Ok(function),
        other => Err(contract_mismatch(name, ContractKind::Callback, &other)),
    }
}

fn expect_rest(name: &QualifiedName, instance: FunctionInstance) -> Result<Box<dyn RestFunction>> {
    match instance {
        FunctionInstance::Rest(function) => Ok(function),
        other => Err(contract_mismatch(name, ContractKind::Rest, &other)),
    }
}

fn expect_job(
    name: &QualifiedName,
    instance: FunctionInstance,
) -> Result<Box<dyn crucible_api::JobFunction>> {
    match instance {
        FunctionInstance::Job(function) => Ok(function),
        other => Err(contract_mismatch(name, ContractKind::Job, &other)),
    }
}

fn expect_transformer(
    name: &QualifiedName,
    instance: FunctionInstance,
) -> Result<Box<dyn TransformerFunction>> {
    match instance {
        FunctionInstance::Transformer(function) => Ok(function),
        other => Err(contract_mismatch(name, ContractKind::Transformer, &other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::SourceUnit;
    use crate::compile::{CompiledBatch, Toolchain};

    /// Backend for tests that never rebuild: compiling is a bug.
    struct UnreachableToolchain;

    impl Toolchain for UnreachableToolchain {
        fn describe(&self) -> String {
            "unreachable".to_string()
        }

        fn compile(&self, _units: &[SourceUnit]) -> Result<CompiledBatch> {
            Err(Error::Internal("compile must not be reached".into()))
        }
    }

    struct OneEntity(Arc<EntityMeta>);

    impl EntityStore for OneEntity {
        fn list(&self) -> Vec<Arc<EntityMeta>> {
            vec![Arc::clone(&self.0)]
        }

        fn get(&self, id: u64) -> Option<Arc<EntityMeta>> {
            (self.0.id == id).then(|| Arc::clone(&self.0))
        }
    }

    fn dispatcher_with(entity: EntityMeta) -> InvocationDispatcher {
        let manager = Arc::new(CodeManager::new(Box::new(UnreachableToolchain), Vec::new()));
        InvocationDispatcher::new(manager, Arc::new(OneEntity(Arc::new(entity))))
    }

    fn entity_with_create_hook() -> EntityMeta {
        let mut function = EntityFunctionMeta::new(7, "on create", "Ok(())");
        function.on_create = true;
        EntityMeta {
            id: 1,
            name: "customer".into(),
            module: None,
            functions: vec![function],
            status_transitions: Vec::new(),
        }
    }

    #[test]
    fn both_ambients_violate_the_contract_before_resolution() {
        let dispatcher = dispatcher_with(entity_with_create_hook());
        let mut object = DomainObject::new(1);
        let session = Session::new(1);
        let mut context = FunctionContext::new(session.clone(), None);

        // The registry is empty; a resolution attempt would be NotFound.
        let event = EntityEvent::new(EventKind::Create, &mut object)
            .with_session(session)
            .with_context(&mut context);
        let err = dispatcher.process_event(event).unwrap_err();
        assert!(matches!(err, Error::ContractViolation(_)));
    }

    #[test]
    fn missing_ambient_violates_the_contract() {
        let dispatcher = dispatcher_with(entity_with_create_hook());
        let mut object = DomainObject::new(1);

        let event = EntityEvent::new(EventKind::Create, &mut object);
        let err = dispatcher.process_event(event).unwrap_err();
        assert!(matches!(err, Error::ContractViolation(_)));
    }

    #[test]
    fn stale_artifact_is_not_found() {
        let dispatcher = dispatcher_with(entity_with_create_hook());
        let mut object = DomainObject::new(1);

        let event = EntityEvent::new(EventKind::Create, &mut object).with_session(Session::new(1));
        let err = dispatcher.process_event(event).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn no_matching_hook_means_nothing_ran() {
        // The hook only fires on Create; a Modify event runs nothing and
        // never touches the registry.
        let dispatcher = dispatcher_with(entity_with_create_hook());
        let mut object = DomainObject::new(1);

        let event = EntityEvent::new(EventKind::Modify, &mut object).with_session(Session::new(1));
        assert!(!dispatcher.process_event(event).unwrap());
    }

    #[test]
    fn user_actions_are_rejected_by_process_event() {
        let dispatcher = dispatcher_with(entity_with_create_hook());
        let mut object = DomainObject::new(1);

        let event = EntityEvent::new(EventKind::UserAction, &mut object).with_session(Session::new(1));
        let err = dispatcher.process_event(event).unwrap_err();
        assert!(matches!(err, Error::ContractViolation(_)));
    }

    #[test]
    fn user_event_requires_a_known_function_id() {
        let dispatcher = dispatcher_with(entity_with_create_hook());
        let mut object = DomainObject::new(1);

        let event = EntityEvent::new(EventKind::UserAction, &mut object)
            .with_session(Session::new(1))
            .with_function_id(99);
        let err = dispatcher.process_user_event(event).unwrap_err();
        assert!(matches!(err, Error::ContractViolation(_)));
    }
}
