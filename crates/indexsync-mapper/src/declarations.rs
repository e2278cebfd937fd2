//! Build-time description of mapped types, their properties and the paths
//! their documents depend on.

use indexsync_core::{ConfigurationError, ContainerExtractorPath, PropertyHandle, TypeName};
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// One property step of a [`ModelPath`].
#[derive(Debug, Clone)]
pub struct PathHop {
    pub property: String,
    /// Overrides the property's declared extractor chain when set
    pub extractors: Option<ContainerExtractorPath>,
}

impl PathHop {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            extractors: None,
        }
    }
}

/// Dotted property path relative to a type, e.g. `author.name`.
#[derive(Debug, Clone)]
pub struct ModelPath {
    hops: Vec<PathHop>,
}

impl ModelPath {
    pub fn property(name: impl Into<String>) -> Self {
        Self {
            hops: vec![PathHop::new(name)],
        }
    }

    pub fn then(mut self, name: impl Into<String>) -> Self {
        self.hops.push(PathHop::new(name));
        self
    }

    /// Use `extractors` instead of the declared chain for the last hop.
    pub fn with_extractors(mut self, extractors: ContainerExtractorPath) -> Self {
        if let Some(last) = self.hops.last_mut() {
            last.extractors = Some(extractors);
        }
        self
    }

    pub fn hops(&self) -> &[PathHop] {
        &self.hops
    }

    /// Dirty path as reported by change detection: property names joined by dots.
    pub fn dirty_path(&self) -> String {
        self.hops
            .iter()
            .map(|hop| hop.property.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigurationError> {
        if self.hops.is_empty() || self.hops.iter().any(|hop| hop.property.is_empty()) {
            return Err(ConfigurationError::InvalidPath {
                path: self.dirty_path(),
                reason: "paths must have at least one segment and no empty segments".to_string(),
            });
        }
        Ok(())
    }
}

impl From<&str> for ModelPath {
    fn from(path: &str) -> Self {
        Self {
            hops: path.split('.').map(PathHop::new).collect(),
        }
    }
}

impl fmt::Display for ModelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dirty_path())
    }
}

#[derive(Clone)]
pub struct PropertyDeclaration {
    name: String,
    handle: Arc<dyn PropertyHandle>,
    extractors: ContainerExtractorPath,
    value_type: Option<TypeName>,
    inverse_side: Option<ModelPath>,
    derived_from: Vec<ModelPath>,
}

impl PropertyDeclaration {
    pub fn new(handle: Arc<dyn PropertyHandle>) -> Self {
        Self {
            name: handle.name().to_string(),
            handle,
            extractors: ContainerExtractorPath::none(),
            value_type: None,
            inverse_side: None,
            derived_from: Vec::new(),
        }
    }

    /// Default extractor chain used when traversing this property.
    pub fn with_extractors(mut self, extractors: ContainerExtractorPath) -> Self {
        self.extractors = extractors;
        self
    }

    /// Mapped type of the values reached after extraction.
    pub fn value_type(mut self, type_name: impl Into<TypeName>) -> Self {
        self.value_type = Some(type_name.into());
        self
    }

    /// Path on the value type leading back to the entity declaring this property.
    pub fn inverse_side(mut self, path: impl Into<ModelPath>) -> Self {
        self.inverse_side = Some(path.into());
        self
    }

    pub fn derived_from(mut self, path: impl Into<ModelPath>) -> Self {
        self.derived_from.push(path.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> &Arc<dyn PropertyHandle> {
        &self.handle
    }

    pub fn extractors(&self) -> &ContainerExtractorPath {
        &self.extractors
    }

    pub fn value_type_name(&self) -> Option<&TypeName> {
        self.value_type.as_ref()
    }

    pub fn inverse_side_path(&self) -> Option<&ModelPath> {
        self.inverse_side.as_ref()
    }

    pub fn derived_from_paths(&self) -> &[ModelPath] {
        &self.derived_from
    }
}

impl fmt::Debug for PropertyDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDeclaration")
            .field("name", &self.name)
            .field("extractors", &self.extractors)
            .field("value_type", &self.value_type)
            .field("inverse_side", &self.inverse_side)
            .field("derived_from", &self.derived_from)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct TypeDeclaration {
    name: TypeName,
    runtime_type: Option<TypeId>,
    supertypes: Vec<TypeName>,
    entity: bool,
    indexed: bool,
    properties: Vec<PropertyDeclaration>,
    dependencies: Vec<ModelPath>,
}

impl TypeDeclaration {
    /// Entity type backed by the Rust type `T`.
    pub fn entity<T: Any>(name: impl Into<TypeName>) -> Self {
        Self::new(name.into(), Some(TypeId::of::<T>()), true)
    }

    /// Embeddable type backed by `T`: dirty paths through it are reported
    /// against the entity that owns it.
    pub fn embeddable<T: Any>(name: impl Into<TypeName>) -> Self {
        Self::new(name.into(), Some(TypeId::of::<T>()), false)
    }

    /// Entity type with no runtime representation of its own, only subtypes.
    pub fn abstract_entity(name: impl Into<TypeName>) -> Self {
        Self::new(name.into(), None, true)
    }

    fn new(name: TypeName, runtime_type: Option<TypeId>, entity: bool) -> Self {
        Self {
            name,
            runtime_type,
            supertypes: Vec::new(),
            entity,
            indexed: false,
            properties: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn extends(mut self, supertype: impl Into<TypeName>) -> Self {
        self.supertypes.push(supertype.into());
        self
    }

    pub fn property(mut self, property: PropertyDeclaration) -> Self {
        self.properties.push(property);
        self
    }

    /// Path read by this type's document; changes along it trigger reindexing.
    pub fn depends_on(mut self, path: impl Into<ModelPath>) -> Self {
        self.dependencies.push(path.into());
        self
    }

    pub fn name(&self) -> &TypeName {
        &self.name
    }

    pub fn runtime_type(&self) -> Option<TypeId> {
        self.runtime_type
    }

    pub fn supertypes(&self) -> &[TypeName] {
        &self.supertypes
    }

    pub fn is_entity(&self) -> bool {
        self.entity
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    pub fn properties(&self) -> &[PropertyDeclaration] {
        &self.properties
    }

    pub fn dependencies(&self) -> &[ModelPath] {
        &self.dependencies
    }

    pub fn own_property(&self, name: &str) -> Option<&PropertyDeclaration> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Every mapped type, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct MappingDeclarations {
    types: Vec<TypeDeclaration>,
    by_name: HashMap<TypeName, usize>,
    duplicates: Vec<TypeName>,
}

impl MappingDeclarations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, declaration: TypeDeclaration) -> Self {
        self.add_type(declaration);
        self
    }

    pub fn add_type(&mut self, declaration: TypeDeclaration) {
        if self.by_name.contains_key(declaration.name()) {
            self.duplicates.push(declaration.name().clone());
            return;
        }
        self.by_name
            .insert(declaration.name().clone(), self.types.len());
        self.types.push(declaration);
    }

    pub fn get(&self, name: &TypeName) -> Option<&TypeDeclaration> {
        self.by_name.get(name).map(|&i| &self.types[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDeclaration> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Check structural consistency: no duplicates, known supertypes.
    pub(crate) fn validate(&self) -> Result<(), ConfigurationError> {
        if let Some(duplicate) = self.duplicates.first() {
            return Err(ConfigurationError::DuplicateType(duplicate.clone()));
        }
        for declaration in &self.types {
            for supertype in declaration.supertypes() {
                if !self.by_name.contains_key(supertype) {
                    return Err(ConfigurationError::UnknownType {
                        type_name: supertype.clone(),
                        path: format!("supertype of {}", declaration.name()),
                    });
                }
            }
        }
        Ok(())
    }

    /// `name` followed by its supertypes, breadth first, without repeats.
    pub fn ancestors_or_self(&self, name: &TypeName) -> Vec<TypeName> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([name.clone()]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(declaration) = self.get(&current) {
                queue.extend(declaration.supertypes().iter().cloned());
            }
            order.push(current);
        }
        order
    }

    pub fn is_subtype_of(&self, candidate: &TypeName, parent: &TypeName) -> bool {
        candidate == parent || self.ancestors_or_self(candidate).contains(parent)
    }

    /// Property declared on `type_name` or inherited from a supertype.
    pub fn find_property(&self, type_name: &TypeName, property: &str) -> Option<&PropertyDeclaration> {
        self.ancestors_or_self(type_name)
            .iter()
            .filter_map(|t| self.get(t))
            .find_map(|declaration| declaration.own_property(property))
    }

    /// All dependency paths of `type_name`, including inherited ones.
    pub fn dependencies_of(&self, type_name: &TypeName) -> Vec<ModelPath> {
        self.ancestors_or_self(type_name)
            .iter()
            .filter_map(|t| self.get(t))
            .flat_map(|declaration| declaration.dependencies().iter().cloned())
            .collect()
    }
}
