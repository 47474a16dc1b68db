//! Domain object and session handles.
//!
//! The engine is metadata-driven: domain objects have no compile-time shape,
//! so generated functions see them as an id-carrying bag of JSON-typed field
//! values. Persistence of the object and the lifecycle of the transactional
//! session both belong to external collaborators; this crate only carries
//! the handles across the invocation boundary.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A metadata-defined domain object instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainObject {
    entity_id: u64,
    id: Option<u64>,
    status: Option<String>,
    fields: Map<String, Value>,
}

impl DomainObject {
    /// Create a new, unpersisted object of the given entity.
    pub fn new(entity_id: u64) -> Self {
        Self {
            entity_id,
            id: None,
            status: None,
            fields: Map::new(),
        }
    }

    /// Set the persistent identifier.
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// Identifier of the owning entity definition.
    pub fn entity_id(&self) -> u64 {
        self.entity_id
    }

    /// Persistent identifier, if the object has been stored.
    pub fn id(&self) -> Option<u64> {
        self.id
    }

    /// Current status name, if the entity defines a status model.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Set the current status name.
    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    /// Read a field value.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Write a field value.
    pub fn set_value(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Whether a field has a value.
    pub fn has_value(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// All field values.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Opaque handle to a transactional session owned by the platform's
/// persistence layer.
///
/// The handle is cheaply cloneable so a context can carry it without
/// lifetimes, but each invocation owns its session exclusively for the
/// duration of the call.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    id: u64,
}

impl Session {
    /// Wrap an externally managed session id.
    pub fn new(id: u64) -> Self {
        Self {
            inner: Arc::new(SessionInner { id }),
        }
    }

    /// Identifier of the underlying session.
    pub fn id(&self) -> u64 {
        self.inner.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_access() {
        let mut object = DomainObject::new(7).with_id(99);
        assert_eq!(object.entity_id(), 7);
        assert_eq!(object.id(), Some(99));
        assert!(!object.has_value("name"));

        object.set_value("name", json!("item-1"));
        assert_eq!(object.value("name"), Some(&json!("item-1")));
        assert!(object.has_value("name"));
    }

    #[test]
    fn status_roundtrip() {
        let mut object = DomainObject::new(1);
        assert!(object.status().is_none());
        object.set_status("released");
        assert_eq!(object.status(), Some("released"));
    }

    #[test]
    fn session_clone_shares_id() {
        let session = Session::new(42);
        let clone = session.clone();
        assert_eq!(session.id(), clone.id());
    }
}
