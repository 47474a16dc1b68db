//! Metadata fragments and the store interfaces that supply them.
//!
//! The metadata domains (entities, tasks, transformers, REST endpoints,
//! custom code) are external collaborators: their persistence, validation
//! and administration live elsewhere. This module only defines the shape
//! of a fragment as the engine consumes it, plus one store trait per kind
//! through which the code providers enumerate the currently stored
//! fragments.
//!
//! Every fragment carries a stable numeric id; generated type names and
//! logical names are derived from it, never from the display name.

use std::sync::Arc;

use crucible_api::{JobParameter, StatusTransition};

use crate::codegen::{QualifiedName, SourceKind};

/// An entity definition, reduced to what dispatch and codegen need.
#[derive(Debug, Clone)]
pub struct EntityMeta {
    pub id: u64,
    pub name: String,
    pub module: Option<String>,
    /// Hook definitions in declared order.
    pub functions: Vec<EntityFunctionMeta>,
    pub status_transitions: Vec<StatusTransitionMeta>,
}

impl EntityMeta {
    /// Look up a hook definition by its stable id.
    pub fn function(&self, id: u64) -> Option<&EntityFunctionMeta> {
        self.functions.iter().find(|function| function.id == id)
    }

    /// Look up a status transition by its stable id.
    pub fn status_transition(&self, id: u64) -> Option<&StatusTransitionMeta> {
        self.status_transitions
            .iter()
            .find(|transition| transition.transition.id == id)
    }
}

/// A user-authored entity function (lifecycle / transition / user-invoked
/// hook) with its activation flags.
#[derive(Debug, Clone)]
pub struct EntityFunctionMeta {
    pub id: u64,
    pub name: String,
    pub body: String,
    /// Master switch; inactive functions are never dispatched.
    pub active: bool,
    pub on_create: bool,
    pub on_modify: bool,
    pub before_insert: bool,
    pub after_insert: bool,
    pub before_update: bool,
    pub after_update: bool,
    pub before_delete: bool,
    pub after_delete: bool,
    /// Whether the function may be invoked directly by a user action.
    pub callable: bool,
}

impl EntityFunctionMeta {
    /// A function with the given identity and body; active, with all
    /// event flags off.
    pub fn new(id: u64, name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            body: body.into(),
            active: true,
            on_create: false,
            on_modify: false,
            before_insert: false,
            after_insert: false,
            before_update: false,
            after_update: false,
            before_delete: false,
            after_delete: false,
            callable: false,
        }
    }

    /// Logical name of the generated unit for this function.
    pub fn qualified_name(&self) -> QualifiedName {
        SourceKind::EntityFunction.qualified_name(self.id)
    }
}

/// A status transition and the hooks attached to it.
#[derive(Debug, Clone)]
pub struct StatusTransitionMeta {
    /// The transition definition as transition hooks see it.
    pub transition: StatusTransition,
    /// Hook attachments in declared order.
    pub hooks: Vec<TransitionHookMeta>,
}

/// Attachment of an entity function to a status transition.
#[derive(Debug, Clone)]
pub struct TransitionHookMeta {
    /// Id of a function in the owning entity's function list.
    pub function_id: u64,
    /// Run before the transition is applied.
    pub before: bool,
    /// Run after the transition is applied.
    pub after: bool,
}

/// A scheduled task with its body and run parameters.
#[derive(Debug, Clone)]
pub struct TaskMeta {
    pub id: u64,
    pub name: String,
    pub module: Option<String>,
    pub body: String,
    pub parameters: Vec<JobParameter>,
}

impl TaskMeta {
    pub fn qualified_name(&self) -> QualifiedName {
        SourceKind::Task.qualified_name(self.id)
    }
}

/// A transformer function between a source and a target entity.
#[derive(Debug, Clone)]
pub struct TransformerMeta {
    pub id: u64,
    pub name: String,
    pub module: Option<String>,
    pub source_entity: String,
    pub target_entity: String,
    pub body: String,
}

impl TransformerMeta {
    pub fn qualified_name(&self) -> QualifiedName {
        SourceKind::TransformerFunction.qualified_name(self.id)
    }
}

/// A REST endpoint function.
#[derive(Debug, Clone)]
pub struct RestFunctionMeta {
    pub id: u64,
    pub name: String,
    pub module: Option<String>,
    pub body: String,
}

impl RestFunctionMeta {
    pub fn qualified_name(&self) -> QualifiedName {
        SourceKind::RestFunction.qualified_name(self.id)
    }
}

/// Free-standing custom code: a complete module source with no fixed
/// entry point, linkable from other generated units.
#[derive(Debug, Clone)]
pub struct CustomCodeMeta {
    pub id: u64,
    pub name: String,
    pub module: Option<String>,
    pub content: String,
}

impl CustomCodeMeta {
    pub fn qualified_name(&self) -> QualifiedName {
        SourceKind::CustomCode.qualified_name(self.id)
    }
}

/// Source of entity definitions. Dispatch also resolves entities by id
/// through this trait on every lifecycle event.
pub trait EntityStore: Send + Sync {
    fn list(&self) -> Vec<Arc<EntityMeta>>;
    fn get(&self, id: u64) -> Option<Arc<EntityMeta>>;
}

/// Source of scheduled-task definitions.
pub trait TaskStore: Send + Sync {
    fn list(&self) -> Vec<Arc<TaskMeta>>;
}

/// Source of transformer definitions.
pub trait TransformerStore: Send + Sync {
    fn list(&self) -> Vec<Arc<TransformerMeta>>;
}

/// Source of REST endpoint function definitions.
pub trait RestStore: Send + Sync {
    fn list(&self) -> Vec<Arc<RestFunctionMeta>>;
}

/// Source of custom code definitions.
pub trait CustomCodeStore: Send + Sync {
    fn list(&self) -> Vec<Arc<CustomCodeMeta>>;
}
