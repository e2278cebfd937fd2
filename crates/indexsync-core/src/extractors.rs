//! Built-in container extractors and extractor chains.

use crate::model::PropertyValue;
use crate::traits::ContainerExtractor;
use crate::{IndexSyncError, Result};
use std::fmt;
use std::sync::Arc;

pub const COLLECTION: &str = "collection";
pub const ARRAY: &str = "array";
pub const MAP_VALUE: &str = "map-value";
pub const MAP_KEY: &str = "map-key";
pub const OPTIONAL: &str = "optional";

fn mismatch(extractor: &str, value: &PropertyValue) -> IndexSyncError {
    IndexSyncError::ContainerExtraction {
        extractor: extractor.to_string(),
        found: value.kind().to_string(),
    }
}

/// Elements of a list-like value. Registered as both `collection` and `array`.
#[derive(Debug, Clone)]
pub struct ListElementExtractor {
    name: &'static str,
}

impl ListElementExtractor {
    pub fn collection() -> Self {
        Self { name: COLLECTION }
    }

    pub fn array() -> Self {
        Self { name: ARRAY }
    }
}

impl ContainerExtractor for ListElementExtractor {
    fn name(&self) -> &str {
        self.name
    }

    fn extract(&self, value: PropertyValue) -> Result<Vec<PropertyValue>> {
        match value {
            PropertyValue::Null => Ok(Vec::new()),
            PropertyValue::List(elements) => Ok(elements),
            other => Err(mismatch(self.name, &other)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MapValueExtractor;

impl ContainerExtractor for MapValueExtractor {
    fn name(&self) -> &str {
        MAP_VALUE
    }

    fn extract(&self, value: PropertyValue) -> Result<Vec<PropertyValue>> {
        match value {
            PropertyValue::Null => Ok(Vec::new()),
            PropertyValue::Map(entries) => Ok(entries.into_iter().map(|(_, v)| v).collect()),
            other => Err(mismatch(MAP_VALUE, &other)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MapKeyExtractor;

impl ContainerExtractor for MapKeyExtractor {
    fn name(&self) -> &str {
        MAP_KEY
    }

    fn extract(&self, value: PropertyValue) -> Result<Vec<PropertyValue>> {
        match value {
            PropertyValue::Null => Ok(Vec::new()),
            PropertyValue::Map(entries) => Ok(entries.into_iter().map(|(k, _)| k).collect()),
            other => Err(mismatch(MAP_KEY, &other)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OptionalValueExtractor;

impl ContainerExtractor for OptionalValueExtractor {
    fn name(&self) -> &str {
        OPTIONAL
    }

    fn extract(&self, value: PropertyValue) -> Result<Vec<PropertyValue>> {
        match value {
            PropertyValue::Null | PropertyValue::Optional(None) => Ok(Vec::new()),
            PropertyValue::Optional(Some(inner)) => Ok(vec![*inner]),
            other => Err(mismatch(OPTIONAL, &other)),
        }
    }
}

/// Look up a built-in extractor by name.
pub fn builtin(name: &str) -> Option<Arc<dyn ContainerExtractor>> {
    let extractor: Arc<dyn ContainerExtractor> = match name {
        COLLECTION => Arc::new(ListElementExtractor::collection()),
        ARRAY => Arc::new(ListElementExtractor::array()),
        MAP_VALUE => Arc::new(MapValueExtractor),
        MAP_KEY => Arc::new(MapKeyExtractor),
        OPTIONAL => Arc::new(OptionalValueExtractor),
        _ => return None,
    };
    Some(extractor)
}

/// Ordered chain of extractors applied to a raw property value.
///
/// An empty chain passes the raw value through unchanged.
#[derive(Clone, Default)]
pub struct ContainerExtractorPath {
    extractors: Vec<Arc<dyn ContainerExtractor>>,
}

impl ContainerExtractorPath {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn of(extractors: Vec<Arc<dyn ContainerExtractor>>) -> Self {
        Self { extractors }
    }

    /// Chain of built-in extractors, `None` when a name is unknown.
    pub fn builtin(names: &[&str]) -> Option<Self> {
        names
            .iter()
            .map(|name| builtin(name))
            .collect::<Option<Vec<_>>>()
            .map(Self::of)
    }

    pub fn then(mut self, extractor: Arc<dyn ContainerExtractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    /// Stable key identifying the chain when merging graph branches.
    pub fn key(&self) -> String {
        self.extractors
            .iter()
            .map(|e| e.name())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Apply every extractor in turn. `Null` values never reach the output.
    pub fn extract(&self, value: PropertyValue) -> Result<Vec<PropertyValue>> {
        let mut current = vec![value];
        for extractor in &self.extractors {
            let mut next = Vec::with_capacity(current.len());
            for value in current {
                next.extend(extractor.extract(value)?);
            }
            current = next;
        }
        current.retain(|value| !value.is_null());
        Ok(current)
    }
}

impl fmt::Debug for ContainerExtractorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.key())
    }
}

impl fmt::Display for ContainerExtractorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("(none)")
        } else {
            f.write_str(&self.key())
        }
    }
}
