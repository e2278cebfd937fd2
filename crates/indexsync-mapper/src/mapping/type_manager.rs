use super::work_plan::{TypeWorkPlan, WorkPlan};
use crate::dirtiness::node::ResolutionContext;
use crate::dirtiness::{DirtyState, ReindexingCollector, ResolverNode};
use indexsync_core::{
    DocumentContributor, DocumentPopulator, DocumentReference, IdentifierMapping, IndexManager,
    PojoRef, Result, RuntimeIntrospector, TypeName,
};
use std::any::Any;
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

/// Bounds required of entity identifiers used as work plan keys.
pub trait EntityIdentifier: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

impl<T> EntityIdentifier for T where T: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

/// Backend side of an indexed type.
#[derive(Clone)]
pub(crate) struct IndexTarget {
    pub(crate) manager: Arc<dyn IndexManager>,
    pub(crate) populator: Arc<dyn DocumentPopulator>,
}

/// Per-type runtime state shared by every changeset: identifier mapping,
/// resolver root, self-dependency paths and, for indexed types, the index.
pub struct TypeManager<I> {
    type_name: TypeName,
    identifier_mapping: Arc<dyn IdentifierMapping<I>>,
    resolver: Option<Arc<ResolverNode>>,
    self_paths: Arc<BTreeSet<String>>,
    index: Option<IndexTarget>,
}

impl<I> Clone for TypeManager<I> {
    fn clone(&self) -> Self {
        Self {
            type_name: self.type_name.clone(),
            identifier_mapping: self.identifier_mapping.clone(),
            resolver: self.resolver.clone(),
            self_paths: self.self_paths.clone(),
            index: self.index.clone(),
        }
    }
}

impl<I: EntityIdentifier> TypeManager<I> {
    pub(crate) fn indexed(
        type_name: TypeName,
        identifier_mapping: Arc<dyn IdentifierMapping<I>>,
        resolver: Option<Arc<ResolverNode>>,
        self_paths: BTreeSet<String>,
        index: IndexTarget,
    ) -> Self {
        Self {
            type_name,
            identifier_mapping,
            resolver,
            self_paths: Arc::new(self_paths),
            index: Some(index),
        }
    }

    /// Manager for a type that is only tracked to resolve its containers.
    pub(crate) fn contained(
        type_name: TypeName,
        identifier_mapping: Arc<dyn IdentifierMapping<I>>,
        resolver: Option<Arc<ResolverNode>>,
    ) -> Self {
        Self {
            type_name,
            identifier_mapping,
            resolver,
            self_paths: Arc::new(BTreeSet::new()),
            index: None,
        }
    }

    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    pub fn identifier(&self, provided_id: Option<&dyn Any>, entity: &PojoRef) -> Result<I> {
        self.identifier_mapping.identifier(provided_id, entity)
    }

    /// Walk the resolver graph from `entity`, marking containing entities.
    pub fn resolve_entities_to_reindex(
        &self,
        collector: &mut ReindexingCollector,
        introspector: &dyn RuntimeIntrospector,
        entity: &PojoRef,
        dirty: &DirtyState,
    ) -> Result<()> {
        let Some(resolver) = &self.resolver else {
            return Ok(());
        };
        let mut ctx = ResolutionContext {
            introspector,
            dirty,
            collector,
        };
        resolver.resolve(&mut ctx, entity)
    }

    /// Whether a change limited to `dirty_paths` affects this type's own document.
    pub fn requires_self_reindexing(&self, dirty_paths: &BTreeSet<String>) -> bool {
        dirty_paths.iter().any(|path| self.self_paths.contains(path))
    }

    pub(crate) fn index(&self) -> Option<&IndexTarget> {
        self.index.as_ref()
    }

    pub(crate) fn document_reference(&self, index: &IndexTarget, identifier: &I) -> DocumentReference {
        DocumentReference::new(
            index.manager.index_name(),
            self.identifier_mapping.to_document_identifier(identifier),
        )
    }

    pub(crate) fn contributor(&self, index: &IndexTarget, entity: PojoRef) -> DocumentContributor {
        DocumentContributor::new(index.populator.clone(), entity)
    }
}

/// Type-erased view of a [`TypeManager`], whatever its identifier type.
pub(crate) trait AnyTypeManager: Send + Sync {
    fn is_indexed(&self) -> bool;
    fn create_work_plan(&self) -> Box<dyn TypeWorkPlan>;
}

impl<I: EntityIdentifier> AnyTypeManager for TypeManager<I> {
    fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    fn create_work_plan(&self) -> Box<dyn TypeWorkPlan> {
        Box::new(WorkPlan::new(self.clone()))
    }
}
