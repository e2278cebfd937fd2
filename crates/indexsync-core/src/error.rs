use thiserror::Error;

use crate::model::TypeName;

/// Bootstrap-time failures while building the resolver graph or type managers.
///
/// These abort mapping construction entirely; a mapping is never handed out
/// with a partially-built resolver graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Type '{0}' is declared more than once")]
    DuplicateType(TypeName),

    #[error("Unknown type '{type_name}' referenced from path '{path}'")]
    UnknownType { type_name: TypeName, path: String },

    #[error("Type '{type_name}' has no property '{property}' (path '{path}')")]
    UnknownProperty {
        type_name: TypeName,
        property: String,
        path: String,
    },

    #[error(
        "Association '{path}' on type '{type_name}' crosses an entity boundary but declares no inverse side"
    )]
    MissingInverseSide { type_name: TypeName, path: String },

    #[error("Inverse side '{inverse_path}' of association '{path}' on type '{type_name}' cannot be resolved: {reason}")]
    UnresolvableInversePath {
        type_name: TypeName,
        path: String,
        inverse_path: String,
        reason: String,
    },

    #[error(
        "Inverse side '{inverse_path}' of association '{path}' on type '{type_name}' targets '{inverse_type}', which is neither a supertype nor a subtype of '{type_name}'"
    )]
    IncompatibleInverseSide {
        type_name: TypeName,
        path: String,
        inverse_path: String,
        inverse_type: TypeName,
    },

    #[error("Cyclic derived dependency on type '{type_name}': {cycle}")]
    CyclicDerivedDependency { type_name: TypeName, cycle: String },

    #[error("Indexed type '{0}' has no identifier mapping")]
    MissingIdentifierMapping(TypeName),

    #[error("Indexed type '{0}' has no document populator")]
    MissingDocumentPopulator(TypeName),

    #[error("Indexed type '{0}' has no index manager")]
    MissingIndexManager(TypeName),

    #[error("Binding provided for '{0}', which is not an indexed type")]
    UnexpectedBinding(TypeName),

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

#[derive(Error, Debug)]
pub enum IndexSyncError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Failed to read property '{property}': {reason}")]
    PropertyAccess { property: String, reason: String },

    #[error("Container extractor '{extractor}' cannot extract from {found}")]
    ContainerExtraction { extractor: String, found: String },

    #[error("Expected an object while traversing '{context}', found {found}")]
    UnexpectedValue { context: String, found: String },

    #[error("Invalid identifier for type '{type_name}': {reason}")]
    InvalidIdentifier { type_name: TypeName, reason: String },

    #[error("Entity type is not mapped: {0}")]
    UnknownEntityType(String),

    #[error("Document population failed for '{document_id}': {reason}")]
    DocumentPopulation { document_id: String, reason: String },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

pub type Result<T> = std::result::Result<T, IndexSyncError>;
