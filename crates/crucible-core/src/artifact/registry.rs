//! Immutable index over one loaded batch.
//!
//! A registry is built once per successful rebuild and never mutated; the
//! manager swaps a shared pointer to it. Handles cloned out of a registry
//! keep its backing library alive even after the registry has been replaced.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crucible_api::{ContractKind, FunctionInstance};

use crate::codegen::QualifiedName;
use crate::compile::Constructor;
use crate::error::{Error, Result};

struct HandleInner {
    name: QualifiedName,
    contract: ContractKind,

    /// None for library units, which export nothing instantiable.
    constructor: Option<Constructor>,
}

/// A resolved artifact. Cheap to clone; each clone can mint instances
/// independently of the registry it came from.
#[derive(Clone)]
pub struct ArtifactHandle {
    inner: Arc<HandleInner>,
}

impl ArtifactHandle {
    pub(crate) fn new(
        name: QualifiedName,
        contract: ContractKind,
        constructor: Option<Constructor>,
    ) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                name,
                contract,
                constructor,
            }),
        }
    }

    /// Logical name of the artifact.
    pub fn name(&self) -> &QualifiedName {
        &self.inner.name
    }

    /// Contract the artifact implements.
    pub fn contract(&self) -> ContractKind {
        self.inner.contract
    }

    /// Construct a fresh instance. Every invocation gets its own.
    pub fn instantiate(&self) -> Result<FunctionInstance> {
        match &self.inner.constructor {
            Some(constructor) => constructor(),
            None => Err(Error::Construction {
                name: self.inner.name.clone(),
                message: format!(
                    "{} units are not instantiable",
                    self.inner.contract.name()
                ),
            }),
        }
    }
}

impl std::fmt::Debug for ArtifactHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactHandle")
            .field("name", &self.inner.name)
            .field("contract", &self.inner.contract)
            .finish()
    }
}

/// All artifacts of one generation, indexed by logical name and by contract.
#[derive(Debug)]
pub struct ArtifactRegistry {
    by_name: FxHashMap<QualifiedName, ArtifactHandle>,
    by_contract: FxHashMap<ContractKind, Vec<ArtifactHandle>>,
    generation: u64,
}

impl ArtifactRegistry {
    /// The registry active before the first rebuild. Resolves nothing.
    pub fn empty() -> Self {
        Self {
            by_name: FxHashMap::default(),
            by_contract: FxHashMap::default(),
            generation: 0,
        }
    }

    /// Index a freshly loaded batch. Duplicate logical names mean the
    /// providers produced inconsistent metadata; the batch is rejected.
    pub(crate) fn new(handles: Vec<ArtifactHandle>, generation: u64) -> Result<Self> {
        let mut by_name = FxHashMap::default();
        let mut by_contract: FxHashMap<ContractKind, Vec<ArtifactHandle>> = FxHashMap::default();

        for handle in handles {
            by_contract
                .entry(handle.contract())
                .or_default()
                .push(handle.clone());
            if let Some(previous) = by_name.insert(handle.name().clone(), handle) {
                return Err(Error::Internal(format!(
                    "duplicate artifact name in batch: {}",
                    previous.name()
                )));
            }
        }

        Ok(Self {
            by_name,
            by_contract,
            generation,
        })
    }

    /// Look up one artifact by logical name.
    pub fn resolve_by_name(&self, name: &QualifiedName) -> Result<ArtifactHandle> {
        self.by_name
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(name.clone()))
    }

    /// All artifacts implementing the given contract. Order follows the
    /// generation order of the batch.
    pub fn resolve_by_capability(&self, contract: ContractKind) -> &[ArtifactHandle] {
        self.by_contract
            .get(&contract)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Monotonic generation counter; 0 is the pre-first-rebuild registry.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callback_handle(name: &str) -> ArtifactHandle {
        ArtifactHandle::new(
            QualifiedName::from_dotted(name),
            ContractKind::Callback,
            Some(Arc::new(|| {
                Err(Error::Internal("test constructor".into()))
            })),
        )
    }

    #[test]
    fn resolves_by_name_and_capability() {
        let registry = ArtifactRegistry::new(
            vec![
                callback_handle("entity.Hook1"),
                callback_handle("entity.Hook2"),
                ArtifactHandle::new(
                    QualifiedName::from_dotted("custom.Custom1"),
                    ContractKind::Library,
                    None,
                ),
            ],
            1,
        )
        .unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.generation(), 1);

        let handle = registry
            .resolve_by_name(&QualifiedName::from_dotted("entity.Hook2"))
            .unwrap();
        assert_eq!(handle.contract(), ContractKind::Callback);

        let callbacks = registry.resolve_by_capability(ContractKind::Callback);
        assert_eq!(callbacks.len(), 2);
        assert_eq!(callbacks[0].name().as_str(), "entity.Hook1");

        // No REST units in this batch.
        assert!(registry.resolve_by_capability(ContractKind::Rest).is_empty());
    }

    #[test]
    fn unknown_name_is_not_found() {
        let registry = ArtifactRegistry::empty();
        let err = registry
            .resolve_by_name(&QualifiedName::from_dotted("entity.Hook9"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = ArtifactRegistry::new(
            vec![callback_handle("entity.Hook1"), callback_handle("entity.Hook1")],
            1,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn library_handles_are_not_instantiable() {
        let handle = ArtifactHandle::new(
            QualifiedName::from_dotted("custom.Custom1"),
            ContractKind::Library,
            None,
        );
        let err = handle.instantiate().unwrap_err();
        assert!(matches!(err, Error::Construction { .. }));
    }
}
