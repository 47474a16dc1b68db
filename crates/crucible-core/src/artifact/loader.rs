//! Turns compiled batch artifacts into a registry.

use std::sync::Arc;

use libloading::Library;
use rustc_hash::FxHashMap;

use crucible_api::{ConstructorFn, ContractKind};

use crate::codegen::QualifiedName;
use crate::compile::{BatchArtifacts, CompiledBatch, Constructor};
use crate::error::{Error, Result};

use super::registry::{ArtifactHandle, ArtifactRegistry};

/// Loads one compiled batch and indexes its units.
pub struct ArtifactLoader;

impl ArtifactLoader {
    /// Load the batch into a fresh registry with the given generation.
    ///
    /// For library batches every instantiable unit's entry symbol is
    /// resolved eagerly, so a missing export rejects the whole batch here
    /// instead of failing on first invocation.
    pub fn load(batch: CompiledBatch, generation: u64) -> Result<ArtifactRegistry> {
        let handles = match batch.artifacts {
            BatchArtifacts::Library { path } => {
                // Safety: the library was built by our own toolchain in this
                // process's lifetime, against the same crucible-api build the
                // engine links. It only ever exports the C-ABI constructors
                // emitted by export_function!.
                let library = Arc::new(unsafe { Library::new(&path)? });

                let mut handles = Vec::with_capacity(batch.units.len());
                for unit in &batch.units {
                    let contract = unit.kind.contract();
                    let constructor = match contract {
                        ContractKind::Library => None,
                        _ => Some(symbol_constructor(&library, unit.name.clone())?),
                    };
                    handles.push(ArtifactHandle::new(unit.name.clone(), contract, constructor));
                }
                handles
            }

            BatchArtifacts::Prebuilt(entries) => {
                let mut constructors: FxHashMap<QualifiedName, Constructor> =
                    entries.into_iter().collect();

                let mut handles = Vec::with_capacity(batch.units.len());
                for unit in &batch.units {
                    let contract = unit.kind.contract();
                    let constructor = match contract {
                        ContractKind::Library => None,
                        _ => Some(constructors.remove(&unit.name).ok_or_else(|| {
                            Error::Internal(format!(
                                "backend returned no constructor for unit {}",
                                unit.name
                            ))
                        })?),
                    };
                    handles.push(ArtifactHandle::new(unit.name.clone(), contract, constructor));
                }
                handles
            }
        };

        ArtifactRegistry::new(handles, generation)
    }
}

/// Constructor resolving the unit's entry symbol on each instantiation.
/// The closure keeps the library mapped for as long as any handle lives.
fn symbol_constructor(library: &Arc<Library>, name: QualifiedName) -> Result<Constructor> {
    let symbol = name.entry_symbol();

    // Fail fast on missing exports.
    unsafe {
        library.get::<ConstructorFn>(symbol.as_bytes())?;
    }

    let library = Arc::clone(library);
    Ok(Arc::new(move || {
        let constructor: libloading::Symbol<'_, ConstructorFn> =
            unsafe { library.get(symbol.as_bytes()) }.map_err(Error::LibraryLoad)?;
        let raw = constructor();
        if raw.is_null() {
            return Err(Error::Construction {
                name: name.clone(),
                message: "entry symbol returned null".to_string(),
            });
        }
        // Safety: the pointer was produced by Box::into_raw in
        // export_function! inside this same library.
        Ok(*unsafe { Box::from_raw(raw) })
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::SourceKind;
    use crate::compile::BatchUnit;
    use crucible_api::{CallbackFunction, DomainObject, FunctionContext, FunctionInstance, FunctionResult};

    #[derive(Default)]
    struct Noop;

    impl CallbackFunction for Noop {
        fn call(
            &mut self,
            _object: &mut DomainObject,
            _context: &mut FunctionContext,
        ) -> FunctionResult<()> {
            Ok(())
        }
    }

    fn prebuilt_batch(with_constructor: bool) -> CompiledBatch {
        let name = QualifiedName::from_dotted("entity.Hook1");
        let constructors: Vec<(QualifiedName, Constructor)> = if with_constructor {
            vec![(
                name.clone(),
                Arc::new(|| Ok(FunctionInstance::Callback(Box::new(Noop)))),
            )]
        } else {
            Vec::new()
        };

        CompiledBatch {
            units: vec![BatchUnit {
                name,
                kind: SourceKind::EntityFunction,
            }],
            artifacts: BatchArtifacts::Prebuilt(constructors),
            compile_time_ms: 0,
        }
    }

    #[test]
    fn loads_prebuilt_constructors() {
        let registry = ArtifactLoader::load(prebuilt_batch(true), 1).unwrap();
        let handle = registry
            .resolve_by_name(&QualifiedName::from_dotted("entity.Hook1"))
            .unwrap();
        assert_eq!(handle.contract(), ContractKind::Callback);

        let instance = handle.instantiate().unwrap();
        assert_eq!(instance.contract(), ContractKind::Callback);
    }

    #[test]
    fn missing_constructor_for_instantiable_unit_is_rejected() {
        let err = ArtifactLoader::load(prebuilt_batch(false), 1).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }
}
