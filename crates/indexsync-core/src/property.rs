use crate::model::{PojoRef, PropertyValue};
use crate::traits::PropertyHandle;
use crate::{IndexSyncError, Result};
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

/// Property handle reading a typed domain object through a closure.
///
/// The handle downcasts the object to `T` before calling the accessor; a
/// handle applied to an object of another type fails with `PropertyAccess`.
pub struct FnPropertyHandle<T, F> {
    name: String,
    accessor: F,
    _marker: PhantomData<fn(&T)>,
}

impl<T, F> FnPropertyHandle<T, F>
where
    T: Any + Send + Sync,
    F: Fn(&T) -> PropertyValue + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, accessor: F) -> Self {
        Self {
            name: name.into(),
            accessor,
            _marker: PhantomData,
        }
    }

    pub fn shared(name: impl Into<String>, accessor: F) -> Arc<dyn PropertyHandle> {
        Arc::new(Self::new(name, accessor))
    }
}

impl<T, F> PropertyHandle for FnPropertyHandle<T, F>
where
    T: Any + Send + Sync,
    F: Fn(&T) -> PropertyValue + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, object: &PojoRef) -> Result<PropertyValue> {
        let typed = object
            .downcast_ref::<T>()
            .ok_or_else(|| IndexSyncError::PropertyAccess {
                property: self.name.clone(),
                reason: format!(
                    "object {} is not a {}",
                    object.identity(),
                    std::any::type_name::<T>()
                ),
            })?;
        Ok((self.accessor)(typed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Author {
        name: String,
    }

    #[test]
    fn reads_through_downcast() {
        let handle = FnPropertyHandle::shared("name", |a: &Author| {
            PropertyValue::scalar(a.name.clone())
        });
        let author = PojoRef::new(Author {
            name: "Ursula".to_string(),
        });
        let value = handle.get(&author).unwrap();
        assert!(matches!(value, PropertyValue::Scalar(v) if v == "Ursula"));
    }

    #[test]
    fn wrong_object_type_is_a_property_access_error() {
        let handle = FnPropertyHandle::shared("name", |a: &Author| {
            PropertyValue::scalar(a.name.clone())
        });
        let err = handle.get(&PojoRef::new(42u32)).unwrap_err();
        assert!(matches!(err, IndexSyncError::PropertyAccess { property, .. } if property == "name"));
    }
}
