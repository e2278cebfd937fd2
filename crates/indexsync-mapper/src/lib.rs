//! Automatic indexing: plans add/update/delete document operations for
//! changed entities, and reindexes the indexed entities that embed them.

pub mod declarations;
pub mod dirtiness;
pub mod introspector;
pub mod mapping;

pub use declarations::{MappingDeclarations, ModelPath, PathHop, PropertyDeclaration, TypeDeclaration};
pub use dirtiness::{DirtyState, ReindexingCollector, ResolverGraph, ResolverGraphBuilder, ResolverNode};
pub use introspector::DeclaredTypeIntrospector;
pub use mapping::{
    Changeset, ChangesetReport, EntityIdentifier, IndexedTypeBinding, MappingBuilder, SearchMapping,
    TypeManager,
};
