use crate::model::{ObjectIdentity, PojoRef, PropertyValue, TypeName};
use crate::traits::{IdentifierMapping, PropertyHandle};
use crate::{IndexSyncError, Result};
use std::any::Any;
use std::sync::Arc;
use uuid::Uuid;

/// Two-way conversion between an identifier value and a document identifier.
pub trait IdentifierBridge<I>: Send + Sync {
    fn from_property_value(&self, value: &serde_json::Value) -> Option<I>;
    fn to_document_identifier(&self, identifier: &I) -> String;
    fn from_document_identifier(&self, document_id: &str) -> Option<I>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct I64IdentifierBridge;

impl IdentifierBridge<i64> for I64IdentifierBridge {
    fn from_property_value(&self, value: &serde_json::Value) -> Option<i64> {
        value.as_i64()
    }

    fn to_document_identifier(&self, identifier: &i64) -> String {
        identifier.to_string()
    }

    fn from_document_identifier(&self, document_id: &str) -> Option<i64> {
        document_id.parse().ok()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StringIdentifierBridge;

impl IdentifierBridge<String> for StringIdentifierBridge {
    fn from_property_value(&self, value: &serde_json::Value) -> Option<String> {
        value.as_str().map(str::to_string)
    }

    fn to_document_identifier(&self, identifier: &String) -> String {
        identifier.clone()
    }

    fn from_document_identifier(&self, document_id: &str) -> Option<String> {
        Some(document_id.to_string())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdentifierBridge;

impl IdentifierBridge<Uuid> for UuidIdentifierBridge {
    fn from_property_value(&self, value: &serde_json::Value) -> Option<Uuid> {
        value.as_str().and_then(|s| Uuid::parse_str(s).ok())
    }

    fn to_document_identifier(&self, identifier: &Uuid) -> String {
        identifier.hyphenated().to_string()
    }

    fn from_document_identifier(&self, document_id: &str) -> Option<Uuid> {
        Uuid::parse_str(document_id).ok()
    }
}

/// Identifier mapping reading the identifier from a property of the entity,
/// unless the caller provides one explicitly.
pub struct PropertyIdentifierMapping<I> {
    type_name: TypeName,
    property: Option<Arc<dyn PropertyHandle>>,
    bridge: Arc<dyn IdentifierBridge<I>>,
}

impl<I> PropertyIdentifierMapping<I>
where
    I: Clone + Send + Sync + 'static,
{
    pub fn new(
        type_name: TypeName,
        property: Arc<dyn PropertyHandle>,
        bridge: Arc<dyn IdentifierBridge<I>>,
    ) -> Self {
        Self {
            type_name,
            property: Some(property),
            bridge,
        }
    }

    /// Mapping that only accepts identifiers provided by the caller.
    pub fn provided_only(type_name: TypeName, bridge: Arc<dyn IdentifierBridge<I>>) -> Self {
        Self {
            type_name,
            property: None,
            bridge,
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> IndexSyncError {
        IndexSyncError::InvalidIdentifier {
            type_name: self.type_name.clone(),
            reason: reason.into(),
        }
    }
}

impl<I> IdentifierMapping<I> for PropertyIdentifierMapping<I>
where
    I: Clone + Send + Sync + 'static,
{
    fn identifier(&self, provided_id: Option<&dyn Any>, entity: &PojoRef) -> Result<I> {
        if let Some(provided) = provided_id {
            return provided
                .downcast_ref::<I>()
                .cloned()
                .ok_or_else(|| self.invalid("provided identifier has the wrong type"));
        }
        let Some(property) = &self.property else {
            return Err(self.invalid(
                "no identifier was provided, and this mapping does not define how to extract the identifier from the entity",
            ));
        };
        match property.get(entity)? {
            PropertyValue::Scalar(value) => self
                .bridge
                .from_property_value(&value)
                .ok_or_else(|| self.invalid(format!("cannot convert '{}' to an identifier", value))),
            other => Err(self.invalid(format!(
                "identifier property '{}' holds {}",
                property.name(),
                other.kind()
            ))),
        }
    }

    fn to_document_identifier(&self, identifier: &I) -> String {
        self.bridge.to_document_identifier(identifier)
    }

    fn from_document_identifier(&self, document_id: &str) -> Result<I> {
        self.bridge
            .from_document_identifier(document_id)
            .ok_or_else(|| self.invalid(format!("malformed document identifier '{}'", document_id)))
    }
}

/// Keys entities by object identity. Used for types that are tracked for
/// dependency resolution but never indexed themselves.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityIdentifierMapping;

impl IdentifierMapping<ObjectIdentity> for IdentityIdentifierMapping {
    fn identifier(&self, _provided_id: Option<&dyn Any>, entity: &PojoRef) -> Result<ObjectIdentity> {
        Ok(entity.identity())
    }

    fn to_document_identifier(&self, identifier: &ObjectIdentity) -> String {
        identifier.to_string()
    }

    fn from_document_identifier(&self, document_id: &str) -> Result<ObjectIdentity> {
        Err(IndexSyncError::InvalidOperation(format!(
            "identity-keyed entities have no document identifier ('{}')",
            document_id
        )))
    }
}

/// Convenience constructor for the common "numeric id property" case.
pub fn i64_property_mapping(
    type_name: TypeName,
    property: Arc<dyn PropertyHandle>,
) -> Arc<dyn IdentifierMapping<i64>> {
    Arc::new(PropertyIdentifierMapping::new(
        type_name,
        property,
        Arc::new(I64IdentifierBridge),
    ))
}
