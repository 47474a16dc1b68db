//! Lifecycle events dispatched against entity hook functions.

use crucible_api::{DomainObject, FunctionContext, Session};

use crate::metadata::StatusTransitionMeta;

/// What happened to a domain object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Create,
    Modify,
    BeforeInsert,
    AfterInsert,
    BeforeUpdate,
    AfterUpdate,
    BeforeDelete,
    AfterDelete,
    BeforeTransition,
    AfterTransition,
    /// Explicit invocation of one callable hook by a user.
    UserAction,
}

/// One lifecycle event against one domain object.
///
/// Exactly one ambient must be supplied: either a session (a fresh function
/// context is built per invoked hook) or an existing function context
/// (reused across all hooks of the event).
pub struct EntityEvent<'a> {
    pub kind: EventKind,
    pub object: &'a mut DomainObject,
    pub session: Option<Session>,
    pub context: Option<&'a mut FunctionContext>,

    /// The transition definition; required for transition events.
    pub status_transition: Option<&'a StatusTransitionMeta>,

    /// Target function id; required for UserAction.
    pub function_id: Option<u64>,
}

impl<'a> EntityEvent<'a> {
    pub fn new(kind: EventKind, object: &'a mut DomainObject) -> Self {
        Self {
            kind,
            object,
            session: None,
            context: None,
            status_transition: None,
            function_id: None,
        }
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_context(mut self, context: &'a mut FunctionContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_status_transition(mut self, transition: &'a StatusTransitionMeta) -> Self {
        self.status_transition = Some(transition);
        self
    }

    pub fn with_function_id(mut self, function_id: u64) -> Self {
        self.function_id = Some(function_id);
        self
    }
}
