//! Per-type coalescing of entity operations within one changeset.
//!
//! Each entity identifier gets one entry whose flags evolve with every
//! add/update/delete call. The net backend operation is only decided when
//! the changeset is flushed:
//!
//! | add | delete | sent                                       |
//! |-----|--------|--------------------------------------------|
//! | yes | no     | add                                        |
//! | yes | yes    | update, if anything the document reads changed |
//! | no  | yes    | delete                                     |
//! | no  | no     | nothing                                    |

use super::type_manager::{EntityIdentifier, TypeManager};
use super::ChangesetReport;
use crate::dirtiness::{DirtyState, ReindexingCollector};
use async_trait::async_trait;
use indexsync_core::{ChangesetIndexWorker, PojoRef, Result, RuntimeIntrospector, TypeName};
use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use tracing::trace;

/// Accumulated state for one entity.
#[derive(Debug, Clone)]
pub(crate) struct DocumentWorkPlan {
    entity: PojoRef,
    add: bool,
    delete: bool,
    should_resolve: bool,
    consider_all_dirty: bool,
    dirty_paths: BTreeSet<String>,
    /// Set when a contained entity's change requires this document to be rebuilt
    contained_update: bool,
}

impl DocumentWorkPlan {
    fn new(entity: PojoRef) -> Self {
        Self {
            entity,
            add: false,
            delete: false,
            should_resolve: false,
            consider_all_dirty: false,
            dirty_paths: BTreeSet::new(),
            contained_update: false,
        }
    }

    fn add(&mut self, entity: PojoRef) {
        self.entity = entity;
        self.add = true;
        self.should_resolve = true;
        self.consider_all_dirty = true;
        self.dirty_paths.clear();
    }

    /// `None` means every path is dirty.
    fn update(&mut self, entity: PojoRef, dirty_paths: Option<BTreeSet<String>>) {
        self.entity = entity;
        self.mark_replaced();
        self.should_resolve = true;
        match dirty_paths {
            None => {
                self.consider_all_dirty = true;
                self.dirty_paths.clear();
            }
            Some(paths) if !self.consider_all_dirty => self.dirty_paths.extend(paths),
            Some(_) => {}
        }
    }

    fn delete(&mut self, entity: PojoRef) {
        self.entity = entity;
        if self.add && !self.delete {
            // Added then deleted in the same changeset: nothing to send.
            self.add = false;
            self.should_resolve = false;
            self.consider_all_dirty = false;
            self.dirty_paths.clear();
            self.contained_update = false;
        } else {
            self.add = false;
            self.delete = true;
        }
    }

    fn update_because_of_contained(&mut self, entity: PojoRef) {
        self.entity = entity;
        self.mark_replaced();
        self.contained_update = true;
    }

    fn mark_replaced(&mut self) {
        if !self.add {
            self.add = true;
            self.delete = true;
        }
    }

    fn is_replace(&self) -> bool {
        self.add && self.delete
    }

    fn net_operation(&self, requires_self_reindexing: impl Fn(&BTreeSet<String>) -> bool) -> NetOperation {
        match (self.add, self.delete) {
            (true, false) => NetOperation::Add,
            (true, true)
                if self.consider_all_dirty
                    || self.contained_update
                    || requires_self_reindexing(&self.dirty_paths) =>
            {
                NetOperation::Update
            }
            (false, true) => NetOperation::Delete,
            _ => NetOperation::Skip,
        }
    }

    fn dirty_state(&self) -> DirtyState {
        if self.consider_all_dirty || self.dirty_paths.is_empty() {
            DirtyState::AllDirty
        } else {
            DirtyState::SomePaths(self.dirty_paths.clone())
        }
    }
}

/// Net operation decided for one entry at flush time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NetOperation {
    Add,
    Update,
    Delete,
    Skip,
}

/// Work plan of one type, erased over its identifier type.
#[async_trait]
pub(crate) trait TypeWorkPlan: Send {
    fn type_name(&self) -> &TypeName;

    fn add(&mut self, provided_id: Option<&dyn Any>, entity: PojoRef) -> Result<()>;

    fn update(
        &mut self,
        provided_id: Option<&dyn Any>,
        entity: PojoRef,
        dirty_paths: Option<BTreeSet<String>>,
    ) -> Result<()>;

    fn delete(&mut self, provided_id: Option<&dyn Any>, entity: PojoRef) -> Result<()>;

    /// Reindex `entity` because something it embeds changed.
    fn update_because_of_contained(&mut self, entity: PojoRef) -> Result<()>;

    /// Entities awaiting dependency resolution, with what changed on them.
    /// Clears the pending flag on every returned entry.
    fn take_pending_resolutions(&mut self) -> Vec<(PojoRef, DirtyState)>;

    fn resolve_entities_to_reindex(
        &self,
        collector: &mut ReindexingCollector,
        introspector: &dyn RuntimeIntrospector,
        entity: &PojoRef,
        dirty: &DirtyState,
    ) -> Result<()>;

    /// Hand every entry's net operation to the index worker and forget the entries.
    fn send_to_worker(&mut self, report: &mut ChangesetReport);

    fn prepare(&mut self) -> Result<()>;

    async fn execute(&mut self) -> Result<()>;
}

pub(crate) struct WorkPlan<I> {
    manager: TypeManager<I>,
    worker: Option<Box<dyn ChangesetIndexWorker>>,
    positions: HashMap<I, usize>,
    entries: Vec<(I, DocumentWorkPlan)>,
}

impl<I: EntityIdentifier> WorkPlan<I> {
    pub(crate) fn new(manager: TypeManager<I>) -> Self {
        let worker = manager
            .index()
            .map(|index| index.manager.create_changeset_worker());
        Self {
            manager,
            worker,
            positions: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn entry(&mut self, identifier: I, entity: &PojoRef) -> &mut DocumentWorkPlan {
        let index = match self.positions.get(&identifier) {
            Some(&index) => index,
            None => {
                let index = self.entries.len();
                self.positions.insert(identifier.clone(), index);
                self.entries
                    .push((identifier, DocumentWorkPlan::new(entity.clone())));
                index
            }
        };
        &mut self.entries[index].1
    }
}

#[async_trait]
impl<I: EntityIdentifier> TypeWorkPlan for WorkPlan<I> {
    fn type_name(&self) -> &TypeName {
        self.manager.type_name()
    }

    fn add(&mut self, provided_id: Option<&dyn Any>, entity: PojoRef) -> Result<()> {
        let identifier = self.manager.identifier(provided_id, &entity)?;
        trace!(type_name = %self.manager.type_name(), ?identifier, "add");
        self.entry(identifier, &entity).add(entity);
        Ok(())
    }

    fn update(
        &mut self,
        provided_id: Option<&dyn Any>,
        entity: PojoRef,
        dirty_paths: Option<BTreeSet<String>>,
    ) -> Result<()> {
        let identifier = self.manager.identifier(provided_id, &entity)?;
        trace!(type_name = %self.manager.type_name(), ?identifier, ?dirty_paths, "update");
        self.entry(identifier, &entity).update(entity, dirty_paths);
        Ok(())
    }

    fn delete(&mut self, provided_id: Option<&dyn Any>, entity: PojoRef) -> Result<()> {
        let identifier = self.manager.identifier(provided_id, &entity)?;
        trace!(type_name = %self.manager.type_name(), ?identifier, "delete");
        self.entry(identifier, &entity).delete(entity);
        Ok(())
    }

    fn update_because_of_contained(&mut self, entity: PojoRef) -> Result<()> {
        let identifier = self.manager.identifier(None, &entity)?;
        match self.positions.get(&identifier) {
            None => {
                trace!(type_name = %self.manager.type_name(), ?identifier, "update because of contained");
                self.entry(identifier, &entity)
                    .update_because_of_contained(entity);
            }
            Some(&index) => {
                let plan = &mut self.entries[index].1;
                // Pending adds, deletes and cancelled entries already settle
                // the document; only a replace needs the contained flag.
                if plan.is_replace() {
                    plan.contained_update = true;
                }
            }
        }
        Ok(())
    }

    fn take_pending_resolutions(&mut self) -> Vec<(PojoRef, DirtyState)> {
        self.entries
            .iter_mut()
            .filter(|(_, plan)| plan.should_resolve)
            .map(|(_, plan)| {
                plan.should_resolve = false;
                (plan.entity.clone(), plan.dirty_state())
            })
            .collect()
    }

    fn resolve_entities_to_reindex(
        &self,
        collector: &mut ReindexingCollector,
        introspector: &dyn RuntimeIntrospector,
        entity: &PojoRef,
        dirty: &DirtyState,
    ) -> Result<()> {
        self.manager
            .resolve_entities_to_reindex(collector, introspector, entity, dirty)
    }

    fn send_to_worker(&mut self, report: &mut ChangesetReport) {
        let entries = std::mem::take(&mut self.entries);
        self.positions.clear();

        let (Some(worker), Some(index)) = (self.worker.as_mut(), self.manager.index()) else {
            return;
        };
        for (identifier, plan) in entries {
            let operation =
                plan.net_operation(|paths| self.manager.requires_self_reindexing(paths));
            let reference = self.manager.document_reference(index, &identifier);
            trace!(%reference, ?operation, "sending to index worker");
            match operation {
                NetOperation::Add => {
                    worker.add(reference, self.manager.contributor(index, plan.entity));
                    report.adds += 1;
                }
                NetOperation::Update => {
                    worker.update(reference, self.manager.contributor(index, plan.entity));
                    report.updates += 1;
                }
                NetOperation::Delete => {
                    worker.delete(reference);
                    report.deletes += 1;
                }
                NetOperation::Skip => report.skipped += 1,
            }
        }
    }

    fn prepare(&mut self) -> Result<()> {
        match self.worker.as_mut() {
            Some(worker) => worker.prepare(),
            None => Ok(()),
        }
    }

    async fn execute(&mut self) -> Result<()> {
        match self.worker.as_mut() {
            Some(worker) => worker.execute().await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(values: &[&str]) -> Option<BTreeSet<String>> {
        Some(values.iter().map(|v| v.to_string()).collect())
    }

    fn plan() -> DocumentWorkPlan {
        DocumentWorkPlan::new(PojoRef::new(()))
    }

    fn never(_: &BTreeSet<String>) -> bool {
        false
    }

    #[test]
    fn add_then_delete_cancels_out() {
        let mut plan = plan();
        plan.add(PojoRef::new(()));
        plan.delete(PojoRef::new(()));
        assert_eq!(plan.net_operation(never), NetOperation::Skip);
        assert!(!plan.should_resolve);
    }

    #[test]
    fn delete_then_add_becomes_update() {
        let mut plan = plan();
        plan.delete(PojoRef::new(()));
        plan.add(PojoRef::new(()));
        assert!(plan.is_replace());
        assert_eq!(plan.net_operation(never), NetOperation::Update);
        assert!(plan.dirty_state().is_all_dirty());
    }

    #[test]
    fn replace_then_delete_is_a_delete() {
        let mut plan = plan();
        plan.update(PojoRef::new(()), None);
        plan.delete(PojoRef::new(()));
        assert_eq!(plan.net_operation(never), NetOperation::Delete);
    }

    #[test]
    fn update_after_add_keeps_the_add() {
        let mut plan = plan();
        plan.add(PojoRef::new(()));
        plan.update(PojoRef::new(()), paths(&["title"]));
        assert_eq!(plan.net_operation(never), NetOperation::Add);
    }

    #[test]
    fn all_dirty_is_sticky() {
        let mut plan = plan();
        plan.update(PojoRef::new(()), None);
        plan.update(PojoRef::new(()), paths(&["title"]));
        assert!(plan.dirty_state().is_all_dirty());
        assert!(plan.dirty_paths.is_empty());
    }

    #[test]
    fn path_updates_accumulate_and_need_a_self_path() {
        let mut plan = plan();
        plan.update(PojoRef::new(()), paths(&["title"]));
        plan.update(PojoRef::new(()), paths(&["summary"]));
        assert_eq!(
            plan.dirty_state(),
            DirtyState::SomePaths(paths(&["summary", "title"]).unwrap())
        );
        assert_eq!(plan.net_operation(never), NetOperation::Skip);
        assert_eq!(
            plan.net_operation(|p| p.contains("title")),
            NetOperation::Update
        );
    }

    #[test]
    fn contained_update_forces_a_rebuild() {
        let mut plan = plan();
        plan.update_because_of_contained(PojoRef::new(()));
        assert!(!plan.should_resolve);
        assert_eq!(plan.net_operation(never), NetOperation::Update);
    }
}
