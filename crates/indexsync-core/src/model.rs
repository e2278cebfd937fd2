use std::any::{Any, TypeId};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Name of a mapped type. Cheap to clone and usable as a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeName(Arc<str>);

impl TypeName {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TypeName {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl Borrow<str> for TypeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Identity of a live object, derived from its allocation address.
///
/// Only meaningful while at least one [`PojoRef`] on the object is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectIdentity(usize);

impl ObjectIdentity {
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{:x}", self.0)
    }
}

/// Shared handle on a live domain object.
///
/// Handles are cheap to clone; two handles created from the same `Arc`
/// report the same [`ObjectIdentity`].
#[derive(Clone)]
pub struct PojoRef(Arc<dyn Any + Send + Sync>);

impl PojoRef {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self(value)
    }

    pub fn identity(&self) -> ObjectIdentity {
        ObjectIdentity(Arc::as_ptr(&self.0) as *const () as usize)
    }

    /// `TypeId` of the concrete Rust value behind the handle.
    pub fn runtime_type_id(&self) -> TypeId {
        let value: &dyn Any = &*self.0;
        value.type_id()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    pub fn downcast_arc<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.0.clone().downcast::<T>().ok()
    }

    pub fn same_instance(&self, other: &PojoRef) -> bool {
        self.identity() == other.identity()
    }
}

impl fmt::Debug for PojoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PojoRef({})", self.identity())
    }
}

/// Value produced by reading a property off a domain object.
#[derive(Debug, Clone)]
pub enum PropertyValue {
    Null,
    Scalar(serde_json::Value),
    Object(PojoRef),
    List(Vec<PropertyValue>),
    Map(Vec<(PropertyValue, PropertyValue)>),
    Optional(Option<Box<PropertyValue>>),
}

impl PropertyValue {
    pub fn object<T: Any + Send + Sync>(value: &Arc<T>) -> Self {
        PropertyValue::Object(PojoRef::from_arc(value.clone()))
    }

    pub fn objects<'a, T, I>(values: I) -> Self
    where
        T: Any + Send + Sync,
        I: IntoIterator<Item = &'a Arc<T>>,
    {
        PropertyValue::List(values.into_iter().map(Self::object).collect())
    }

    pub fn scalar(value: impl Into<serde_json::Value>) -> Self {
        PropertyValue::Scalar(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    pub fn as_object(&self) -> Option<&PojoRef> {
        match self {
            PropertyValue::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Short description of the value shape, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            PropertyValue::Null => "null",
            PropertyValue::Scalar(_) => "a scalar",
            PropertyValue::Object(_) => "an object",
            PropertyValue::List(_) => "a list",
            PropertyValue::Map(_) => "a map",
            PropertyValue::Optional(_) => "an optional",
        }
    }
}

impl<T: Any + Send + Sync> From<Option<Arc<T>>> for PropertyValue {
    fn from(value: Option<Arc<T>>) -> Self {
        match value {
            Some(object) => PropertyValue::object(&object),
            None => PropertyValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sample {
        _value: u32,
    }

    #[test]
    fn handles_on_same_allocation_share_identity() {
        let sample = Arc::new(Sample { _value: 1 });
        let a = PojoRef::from_arc(sample.clone());
        let b = PojoRef::from_arc(sample);
        assert_eq!(a.identity(), b.identity());
        assert!(a.same_instance(&b));

        let other = PojoRef::new(Sample { _value: 1 });
        assert_ne!(a.identity(), other.identity());
    }

    #[test]
    fn runtime_type_id_sees_through_the_handle() {
        let handle = PojoRef::new(Sample { _value: 3 });
        assert_eq!(handle.runtime_type_id(), TypeId::of::<Sample>());
        assert!(handle.downcast_ref::<Sample>().is_some());
        assert!(handle.downcast_ref::<String>().is_none());
    }

    #[test]
    fn type_names_compare_by_content() {
        assert_eq!(TypeName::new("Book"), TypeName::from("Book"));
        assert_eq!(TypeName::from("Book".to_string()).as_str(), "Book");
    }
}
