//! Bootstrapped mapping: one type manager per entity type, and changesets
//! planning index work against them.

pub mod changeset;
pub mod type_manager;
pub(crate) mod work_plan;

pub use changeset::{Changeset, ChangesetReport};
pub use type_manager::{EntityIdentifier, TypeManager};

use crate::declarations::MappingDeclarations;
use crate::dirtiness::{ResolverGraph, ResolverGraphBuilder, ResolverNode};
use crate::introspector::DeclaredTypeIntrospector;
use indexsync_core::{
    ConfigurationError, DocumentPopulator, IdentifierMapping, IdentityIdentifierMapping,
    IndexManager, IndexingConfig, ObjectIdentity, RuntimeIntrospector, TypeName,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::info;
use type_manager::{AnyTypeManager, IndexTarget};

/// Identifier mapping, populator and index backing one indexed type.
pub struct IndexedTypeBinding<I> {
    identifier_mapping: Option<Arc<dyn IdentifierMapping<I>>>,
    populator: Option<Arc<dyn DocumentPopulator>>,
    index_manager: Option<Arc<dyn IndexManager>>,
}

impl<I> Default for IndexedTypeBinding<I> {
    fn default() -> Self {
        Self {
            identifier_mapping: None,
            populator: None,
            index_manager: None,
        }
    }
}

impl<I: EntityIdentifier> IndexedTypeBinding<I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identifier_mapping(mut self, mapping: Arc<dyn IdentifierMapping<I>>) -> Self {
        self.identifier_mapping = Some(mapping);
        self
    }

    pub fn populator(mut self, populator: Arc<dyn DocumentPopulator>) -> Self {
        self.populator = Some(populator);
        self
    }

    pub fn index_manager(mut self, index_manager: Arc<dyn IndexManager>) -> Self {
        self.index_manager = Some(index_manager);
        self
    }
}

/// Binding whose identifier type is only known to itself.
trait PendingBinding: Send {
    fn into_manager(
        self: Box<Self>,
        type_name: TypeName,
        resolver: Option<Arc<ResolverNode>>,
        self_paths: BTreeSet<String>,
    ) -> Result<Arc<dyn AnyTypeManager>, ConfigurationError>;
}

impl<I: EntityIdentifier> PendingBinding for IndexedTypeBinding<I> {
    fn into_manager(
        self: Box<Self>,
        type_name: TypeName,
        resolver: Option<Arc<ResolverNode>>,
        self_paths: BTreeSet<String>,
    ) -> Result<Arc<dyn AnyTypeManager>, ConfigurationError> {
        let identifier_mapping = self
            .identifier_mapping
            .ok_or_else(|| ConfigurationError::MissingIdentifierMapping(type_name.clone()))?;
        let populator = self
            .populator
            .ok_or_else(|| ConfigurationError::MissingDocumentPopulator(type_name.clone()))?;
        let manager = self
            .index_manager
            .ok_or_else(|| ConfigurationError::MissingIndexManager(type_name.clone()))?;
        Ok(Arc::new(TypeManager::indexed(
            type_name,
            identifier_mapping,
            resolver,
            self_paths,
            IndexTarget { manager, populator },
        )))
    }
}

pub struct MappingBuilder {
    declarations: MappingDeclarations,
    bindings: Vec<(TypeName, Box<dyn PendingBinding>)>,
    introspector: Option<Arc<dyn RuntimeIntrospector>>,
    config: IndexingConfig,
}

impl MappingBuilder {
    pub fn new(declarations: MappingDeclarations) -> Self {
        Self {
            declarations,
            bindings: Vec::new(),
            introspector: None,
            config: IndexingConfig::default(),
        }
    }

    pub fn bind<I: EntityIdentifier>(
        mut self,
        type_name: impl Into<TypeName>,
        binding: IndexedTypeBinding<I>,
    ) -> Self {
        self.bindings.push((type_name.into(), Box::new(binding)));
        self
    }

    /// Replace the introspector derived from the declarations.
    pub fn with_introspector(mut self, introspector: Arc<dyn RuntimeIntrospector>) -> Self {
        self.introspector = Some(introspector);
        self
    }

    pub fn with_config(mut self, config: IndexingConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate declarations, build the resolver graph and one type manager
    /// per entity type. Nothing is handed out unless every check passes.
    pub fn build(self) -> Result<Arc<SearchMapping>, ConfigurationError> {
        let graph = ResolverGraphBuilder::new(&self.declarations).build()?;

        let mut bindings: HashMap<TypeName, Box<dyn PendingBinding>> = HashMap::new();
        for (type_name, binding) in self.bindings {
            let declaration =
                self.declarations
                    .get(&type_name)
                    .ok_or_else(|| ConfigurationError::UnknownType {
                        type_name: type_name.clone(),
                        path: "index binding".to_string(),
                    })?;
            if !(declaration.is_entity() && declaration.is_indexed()) {
                return Err(ConfigurationError::UnexpectedBinding(type_name));
            }
            if bindings.insert(type_name.clone(), binding).is_some() {
                return Err(ConfigurationError::DuplicateType(type_name));
            }
        }

        let mut managers: HashMap<TypeName, Arc<dyn AnyTypeManager>> = HashMap::new();
        for declaration in self.declarations.iter().filter(|d| d.is_entity()) {
            let type_name = declaration.name().clone();
            let resolver = graph.resolver_for(&type_name).cloned();
            let manager = if declaration.is_indexed() {
                let binding = bindings
                    .remove(&type_name)
                    .ok_or_else(|| ConfigurationError::MissingIdentifierMapping(type_name.clone()))?;
                let self_paths = graph.self_paths(&type_name).cloned().unwrap_or_default();
                binding.into_manager(type_name.clone(), resolver, self_paths)?
            } else {
                let contained = TypeManager::<ObjectIdentity>::contained(
                    type_name.clone(),
                    Arc::new(IdentityIdentifierMapping),
                    resolver,
                );
                Arc::new(contained) as Arc<dyn AnyTypeManager>
            };
            managers.insert(type_name, manager);
        }

        let introspector = self
            .introspector
            .unwrap_or_else(|| {
                Arc::new(DeclaredTypeIntrospector::new(&self.declarations)) as Arc<dyn RuntimeIntrospector>
            });

        info!(
            "Built search mapping: {} entity type(s), {} indexed",
            managers.len(),
            managers.values().filter(|m| m.is_indexed()).count()
        );

        Ok(Arc::new(SearchMapping {
            managers,
            introspector,
            config: self.config,
            graph,
        }))
    }
}

/// Immutable result of bootstrapping; shared by every changeset.
pub struct SearchMapping {
    managers: HashMap<TypeName, Arc<dyn AnyTypeManager>>,
    introspector: Arc<dyn RuntimeIntrospector>,
    config: IndexingConfig,
    graph: ResolverGraph,
}

impl SearchMapping {
    pub fn builder(declarations: MappingDeclarations) -> MappingBuilder {
        MappingBuilder::new(declarations)
    }

    pub fn create_changeset(self: &Arc<Self>) -> Changeset {
        Changeset::new(self.clone())
    }

    pub fn introspector(&self) -> &dyn RuntimeIntrospector {
        self.introspector.as_ref()
    }

    pub fn config(&self) -> &IndexingConfig {
        &self.config
    }

    pub fn is_indexed(&self, type_name: &TypeName) -> bool {
        self.managers
            .get(type_name)
            .is_some_and(|manager| manager.is_indexed())
    }

    /// Resolver root for entities of `type_name`, for inspection.
    pub fn resolver_for(&self, type_name: &TypeName) -> Option<&Arc<ResolverNode>> {
        self.graph.resolver_for(type_name)
    }

    pub(crate) fn type_manager(&self, type_name: &TypeName) -> Option<&Arc<dyn AnyTypeManager>> {
        self.managers.get(type_name)
    }
}
