use indexsync_core::{IndexSyncError, ObjectIdentity, PojoRef, Result, RuntimeIntrospector, TypeName};
use rustc_hash::{FxHashMap, FxHashSet};

/// Accumulates the entities marked for reindexing during one resolution pass.
///
/// Each instance is recorded at most once, keyed by object identity, so a
/// cyclic object graph never yields the same entity twice. Marked entities
/// come back in marking order.
#[derive(Debug, Default)]
pub struct ReindexingCollector {
    seen: FxHashMap<TypeName, FxHashSet<ObjectIdentity>>,
    marked: Vec<(TypeName, PojoRef)>,
}

impl ReindexingCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `entity` under its runtime type. Returns `false` when it was
    /// already marked in this pass.
    pub fn mark_for_reindexing(
        &mut self,
        introspector: &dyn RuntimeIntrospector,
        entity: &PojoRef,
    ) -> Result<bool> {
        let type_name = introspector
            .type_of(entity)
            .ok_or_else(|| IndexSyncError::UnknownEntityType(format!("{:?}", entity)))?;
        let identity = introspector.identity(entity);
        let newly_marked = self
            .seen
            .entry(type_name.clone())
            .or_default()
            .insert(identity);
        if newly_marked {
            self.marked.push((type_name, entity.clone()));
        }
        Ok(newly_marked)
    }

    pub fn contains(&self, type_name: &TypeName, identity: ObjectIdentity) -> bool {
        self.seen
            .get(type_name)
            .is_some_and(|identities| identities.contains(&identity))
    }

    pub fn len(&self) -> usize {
        self.marked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marked.is_empty()
    }

    pub fn into_marked(self) -> Vec<(TypeName, PojoRef)> {
        self.marked
    }
}
