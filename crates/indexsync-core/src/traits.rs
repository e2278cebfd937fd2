use crate::model::{ObjectIdentity, PojoRef, PropertyValue, TypeName};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Document body handed to a backend. Field layout is owned by the populator.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Read access to one property of a mapped type.
pub trait PropertyHandle: Send + Sync {
    fn name(&self) -> &str;
    fn get(&self, object: &PojoRef) -> Result<PropertyValue>;
}

impl fmt::Debug for dyn PropertyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyHandle({})", self.name())
    }
}

/// Unwraps one container level of a property value into its elements.
pub trait ContainerExtractor: Send + Sync {
    fn name(&self) -> &str;
    fn extract(&self, value: PropertyValue) -> Result<Vec<PropertyValue>>;
}

impl fmt::Debug for dyn ContainerExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContainerExtractor({})", self.name())
    }
}

/// Runtime view of the object model used while resolving dependencies.
pub trait RuntimeIntrospector: Send + Sync {
    /// Mapped type of the live instance, if it is mapped at all.
    fn type_of(&self, object: &PojoRef) -> Option<TypeName>;

    /// Whether `candidate` is `parent` or one of its (transitive) subtypes.
    fn is_subtype_of(&self, candidate: &TypeName, parent: &TypeName) -> bool;

    fn identity(&self, object: &PojoRef) -> ObjectIdentity {
        object.identity()
    }

    /// Checked narrowing: returns the handle when the instance is a `target`.
    fn cast(&self, object: &PojoRef, target: &TypeName) -> Option<PojoRef> {
        let actual = self.type_of(object)?;
        self.is_subtype_of(&actual, target).then(|| object.clone())
    }
}

/// Maps entities of one type to their identifier and document identifier.
pub trait IdentifierMapping<I>: Send + Sync {
    /// Identifier of the entity, from the provided id when there is one.
    fn identifier(&self, provided_id: Option<&dyn Any>, entity: &PojoRef) -> Result<I>;

    fn to_document_identifier(&self, identifier: &I) -> String;

    fn from_document_identifier(&self, document_id: &str) -> Result<I>;
}

/// Fills a document from an entity of one indexed type.
pub trait DocumentPopulator: Send + Sync {
    fn populate(&self, entity: &PojoRef, document: &mut Document) -> Result<()>;
}

/// Locates one document in one index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentReference {
    pub index_name: String,
    pub document_id: String,
}

impl DocumentReference {
    pub fn new(index_name: impl Into<String>, document_id: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            document_id: document_id.into(),
        }
    }
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.index_name, self.document_id)
    }
}

/// Deferred document population for one entity, invoked by the backend.
#[derive(Clone)]
pub struct DocumentContributor {
    populator: Arc<dyn DocumentPopulator>,
    entity: PojoRef,
}

impl DocumentContributor {
    pub fn new(populator: Arc<dyn DocumentPopulator>, entity: PojoRef) -> Self {
        Self { populator, entity }
    }

    pub fn entity(&self) -> &PojoRef {
        &self.entity
    }

    pub fn contribute(&self, document: &mut Document) -> Result<()> {
        self.populator.populate(&self.entity, document)
    }

    pub fn build(&self) -> Result<Document> {
        let mut document = Document::new();
        self.contribute(&mut document)?;
        Ok(document)
    }
}

impl fmt::Debug for DocumentContributor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentContributor")
            .field("entity", &self.entity)
            .finish()
    }
}

/// Per-changeset document operations against one index.
///
/// Implementations buffer calls until `execute`; `execute` must work with or
/// without a prior `prepare`.
#[async_trait]
pub trait ChangesetIndexWorker: Send {
    fn add(&mut self, reference: DocumentReference, contributor: DocumentContributor);
    fn update(&mut self, reference: DocumentReference, contributor: DocumentContributor);
    fn delete(&mut self, reference: DocumentReference);
    fn prepare(&mut self) -> Result<()>;
    async fn execute(&mut self) -> Result<()>;
}

/// Entry point of a backend index.
pub trait IndexManager: Send + Sync {
    fn index_name(&self) -> &str;
    fn create_changeset_worker(&self) -> Box<dyn ChangesetIndexWorker>;
}
