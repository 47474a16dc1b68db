//! Callback contracts and the type-erased instance handle.
//!
//! Each origin kind of generated code implements exactly one of the
//! contracts below. The engine never downcasts concrete generated types;
//! it matches on [`FunctionInstance`] variants, keyed by [`ContractKind`]
//! tags recorded at load time.

use serde_json::Value;

use crate::context::{FunctionContext, RestContext};
use crate::error::FunctionResult;
use crate::job::JobContext;
use crate::object::DomainObject;

/// The closed set of contracts generated code can implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractKind {
    /// Entity lifecycle and status-transition hooks.
    Callback,
    /// Object-to-object transformer functions.
    Transformer,
    /// REST endpoint handlers.
    Rest,
    /// Scheduled-task bodies.
    Job,
    /// Link-only custom code with no entry point.
    Library,
}

impl ContractKind {
    /// Stable name, used in logs and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::Callback => "callback",
            Self::Transformer => "transformer",
            Self::Rest => "rest",
            Self::Job => "job",
            Self::Library => "library",
        }
    }
}

/// Entity lifecycle / status-transition hook.
pub trait CallbackFunction: Send {
    /// Invoked with the affected object and the invocation context.
    fn call(
        &mut self,
        object: &mut DomainObject,
        context: &mut FunctionContext,
    ) -> FunctionResult<()>;
}

/// Transformer function copying/deriving state between two objects.
pub trait TransformerFunction: Send {
    fn transform(
        &mut self,
        source: &DomainObject,
        target: &mut DomainObject,
        context: &mut FunctionContext,
    ) -> FunctionResult<()>;
}

/// REST endpoint handler.
pub trait RestFunction: Send {
    /// Handles one request; the returned value is the response body.
    fn call(&mut self, context: &mut RestContext) -> FunctionResult<Value>;
}

/// Scheduled-task body.
pub trait JobFunction: Send {
    fn execute(&mut self, context: &mut JobContext) -> FunctionResult<()>;
}

/// A freshly constructed, type-erased instance of a generated function.
///
/// One instance serves exactly one invocation; the engine constructs a new
/// one per call, so implementations may keep per-call state in `&mut self`.
pub enum FunctionInstance {
    Callback(Box<dyn CallbackFunction>),
    Transformer(Box<dyn TransformerFunction>),
    Rest(Box<dyn RestFunction>),
    Job(Box<dyn JobFunction>),
}

impl FunctionInstance {
    /// The contract this instance implements.
    pub fn contract(&self) -> ContractKind {
        match self {
            Self::Callback(_) => ContractKind::Callback,
            Self::Transformer(_) => ContractKind::Transformer,
            Self::Rest(_) => ContractKind::Rest,
            Self::Job(_) => ContractKind::Job,
        }
    }
}

impl std::fmt::Debug for FunctionInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FunctionInstance")
            .field(&self.contract().name())
            .finish()
    }
}

/// Signature of the constructor symbol each instantiable unit exports.
///
/// The returned pointer is a `Box::into_raw` the caller must reclaim with
/// `Box::from_raw`. Host and generated library must be built from the same
/// `crucible-api` source with the same toolchain; the engine's build
/// pipeline guarantees this by compiling every batch against its own copy
/// of this crate.
pub type ConstructorFn = extern "C" fn() -> *mut FunctionInstance;

/// Export the C-ABI constructor symbol for a generated function type.
///
/// `$contract` names the [`FunctionInstance`] variant the type belongs to.
#[macro_export]
macro_rules! export_function {
    ($ty:ty, $contract:ident, $symbol:ident) => {
        #[no_mangle]
        pub extern "C" fn $symbol() -> *mut $crate::FunctionInstance {
            Box::into_raw(Box::new($crate::FunctionInstance::$contract(Box::new(
                <$ty>::default(),
            ))))
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Session;

    #[derive(Default)]
    struct Noop;

    impl CallbackFunction for Noop {
        fn call(
            &mut self,
            _object: &mut DomainObject,
            context: &mut FunctionContext,
        ) -> FunctionResult<()> {
            context.set_success_message("done");
            Ok(())
        }
    }

    crate::export_function!(Noop, Callback, test_unit_noop);

    #[test]
    fn exported_constructor_builds_fresh_instances() {
        let raw = test_unit_noop();
        // Safety: raw comes from Box::into_raw in the macro expansion above.
        let mut instance = unsafe { Box::from_raw(raw) };
        assert_eq!(instance.contract(), ContractKind::Callback);

        let mut object = DomainObject::new(1);
        let mut context = FunctionContext::new(Session::new(1), None);
        match instance.as_mut() {
            FunctionInstance::Callback(callback) => {
                callback.call(&mut object, &mut context).unwrap();
            }
            other => panic!("unexpected contract: {:?}", other.contract()),
        }
        assert_eq!(context.success_message(), Some("done"));
    }

    #[test]
    fn contract_names() {
        assert_eq!(ContractKind::Callback.name(), "callback");
        assert_eq!(ContractKind::Library.name(), "library");
    }
}
