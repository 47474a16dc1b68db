//! Platform API surface for Crucible generated code.
//!
//! Everything a generated source unit is allowed to touch lives in this
//! crate: the domain object and session handles, the per-invocation
//! contexts, the callback contracts, and the user-facing error model.
//! The engine (`crucible-core`) compiles generated units against this
//! crate and links them back through the `FunctionInstance` handle and
//! the constructor symbol emitted by [`export_function!`].
//!
//! # Stability
//!
//! This is the compile-time contract of every user function stored in the
//! platform. Changing a trait signature here invalidates all stored
//! function bodies, so additions are fine, changes are not.
//!
//! # Example
//!
//! A generated entity-function unit looks like this:
//!
//! ```rust,ignore
//! use crucible_api::prelude::*;
//!
//! #[derive(Default)]
//! pub struct Hook42;
//!
//! impl CallbackFunction for Hook42 {
//!     fn call(&mut self, object: &mut DomainObject, context: &mut FunctionContext) -> FunctionResult<()> {
//!         // user-authored body
//!         object.set_value("checked", Value::Bool(true));
//!         Ok(())
//!     }
//! }
//!
//! crucible_api::export_function!(Hook42, Callback, crucible_unit_entity_Hook42);
//! ```

mod context;
mod error;
mod instance;
mod job;
mod object;

pub use context::{FunctionContext, RestContext, RestMethod, StatusTransition};
pub use error::{ApplicationError, FunctionError, FunctionResult};
pub use instance::{
    CallbackFunction, ConstructorFn, ContractKind, FunctionInstance, JobFunction, RestFunction,
    TransformerFunction,
};
pub use job::{JobContext, JobLogEntry, JobParameter, LogLevel, DEFAULT_LOG_LIMIT};
pub use object::{DomainObject, Session};

pub mod prelude {
    //! Common imports for generated source units.
    //!
    //! ```rust,ignore
    //! use crucible_api::prelude::*;
    //! ```

    pub use crate::context::{FunctionContext, RestContext, RestMethod, StatusTransition};
    pub use crate::error::{ApplicationError, FunctionError, FunctionResult};
    pub use crate::instance::{
        CallbackFunction, JobFunction, RestFunction, TransformerFunction,
    };
    pub use crate::job::{JobContext, LogLevel};
    pub use crate::object::{DomainObject, Session};

    // User bodies work with plain JSON values for metadata-typed fields.
    pub use serde_json::{json, Value};
}
