use crate::declarations::MappingDeclarations;
use indexsync_core::{PojoRef, RuntimeIntrospector, TypeName};
use std::any::TypeId;
use std::collections::{HashMap, HashSet};

/// Introspector answering from the declared type hierarchy: runtime types
/// are recognised by their `TypeId`, subtyping follows `extends` clauses.
#[derive(Debug, Clone, Default)]
pub struct DeclaredTypeIntrospector {
    by_runtime_type: HashMap<TypeId, TypeName>,
    ancestors: HashMap<TypeName, HashSet<TypeName>>,
}

impl DeclaredTypeIntrospector {
    pub fn new(declarations: &MappingDeclarations) -> Self {
        let mut by_runtime_type = HashMap::new();
        let mut ancestors = HashMap::new();
        for declaration in declarations.iter() {
            if let Some(runtime_type) = declaration.runtime_type() {
                by_runtime_type.insert(runtime_type, declaration.name().clone());
            }
            ancestors.insert(
                declaration.name().clone(),
                declarations
                    .ancestors_or_self(declaration.name())
                    .into_iter()
                    .collect(),
            );
        }
        Self {
            by_runtime_type,
            ancestors,
        }
    }
}

impl RuntimeIntrospector for DeclaredTypeIntrospector {
    fn type_of(&self, object: &PojoRef) -> Option<TypeName> {
        self.by_runtime_type.get(&object.runtime_type_id()).cloned()
    }

    fn is_subtype_of(&self, candidate: &TypeName, parent: &TypeName) -> bool {
        candidate == parent
            || self
                .ancestors
                .get(candidate)
                .is_some_and(|ancestors| ancestors.contains(parent))
    }
}
