//! Invocation contexts handed to generated functions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::object::Session;

/// Definition of a status transition, as seen by a transition hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTransition {
    /// Stable internal identifier.
    pub id: u64,
    /// Display name of the transition.
    pub name: String,
    /// Status the object leaves, if any.
    pub source_status: Option<String>,
    /// Status the object enters, if any.
    pub target_status: Option<String>,
}

/// Context for entity lifecycle and transformer functions.
///
/// Carries the transactional session, the owning module scope, the
/// transition definition for status-transition hooks, and a success-message
/// channel the caller may display after the event completes.
#[derive(Debug, Clone)]
pub struct FunctionContext {
    session: Session,
    module: Option<String>,
    status_transition: Option<StatusTransition>,
    success_message: Option<String>,
}

impl FunctionContext {
    /// Create a context bound to a session and module scope.
    pub fn new(session: Session, module: Option<String>) -> Self {
        Self {
            session,
            module,
            status_transition: None,
            success_message: None,
        }
    }

    /// Attach the transition definition for a status-transition event.
    pub fn with_status_transition(mut self, transition: StatusTransition) -> Self {
        self.status_transition = Some(transition);
        self
    }

    /// The transactional session for this invocation.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The owning module scope, if any.
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// The transition being executed, for transition hooks.
    pub fn status_transition(&self) -> Option<&StatusTransition> {
        self.status_transition.as_ref()
    }

    /// Set the message shown to the user after the event completes.
    pub fn set_success_message(&mut self, message: impl Into<String>) {
        self.success_message = Some(message.into());
    }

    /// The success message set by the function, if any.
    pub fn success_message(&self) -> Option<&str> {
        self.success_message.as_deref()
    }

    /// Take the success message out of the context.
    pub fn take_success_message(&mut self) -> Option<String> {
        self.success_message.take()
    }
}

/// HTTP method of a REST function invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestMethod {
    Get,
    Post,
    Put,
    Delete,
}

/// Context for REST endpoint functions.
///
/// Wraps the base [`FunctionContext`] with the raw request: HTTP method,
/// decoded body, and positional path parameters.
#[derive(Debug)]
pub struct RestContext {
    base: FunctionContext,
    method: RestMethod,
    body: Value,
    parameters: Vec<String>,
}

impl RestContext {
    /// Create a REST context for one request.
    pub fn new(
        base: FunctionContext,
        method: RestMethod,
        body: Value,
        parameters: Vec<String>,
    ) -> Self {
        Self {
            base,
            method,
            body,
            parameters,
        }
    }

    /// The transactional session for this invocation.
    pub fn session(&self) -> &Session {
        self.base.session()
    }

    /// The owning module scope, if any.
    pub fn module(&self) -> Option<&str> {
        self.base.module()
    }

    /// HTTP method of the request.
    pub fn method(&self) -> RestMethod {
        self.method
    }

    /// Decoded request body (JSON `null` when absent).
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Positional path parameter, if present.
    pub fn parameter(&self, index: usize) -> Option<&str> {
        self.parameters.get(index).map(String::as_str)
    }

    /// All positional path parameters.
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_message_channel() {
        let mut ctx = FunctionContext::new(Session::new(1), Some("sales".into()));
        assert!(ctx.success_message().is_none());

        ctx.set_success_message("two objects merged");
        assert_eq!(ctx.success_message(), Some("two objects merged"));
        assert_eq!(ctx.take_success_message().as_deref(), Some("two objects merged"));
        assert!(ctx.success_message().is_none());
    }

    #[test]
    fn rest_context_accessors() {
        let base = FunctionContext::new(Session::new(2), None);
        let ctx = RestContext::new(
            base,
            RestMethod::Post,
            json!({"qty": 3}),
            vec!["batch".into(), "7".into()],
        );

        assert_eq!(ctx.method(), RestMethod::Post);
        assert_eq!(ctx.body()["qty"], json!(3));
        assert_eq!(ctx.parameter(1), Some("7"));
        assert_eq!(ctx.parameter(2), None);
    }
}
