use super::work_plan::TypeWorkPlan;
use super::SearchMapping;
use crate::dirtiness::ReindexingCollector;
use futures::future::try_join_all;
use indexsync_core::{IndexSyncError, PojoRef, Result, TypeName, UnknownTypePolicy};
use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Counts of what a changeset sent to the backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangesetReport {
    pub adds: usize,
    pub updates: usize,
    pub deletes: usize,
    /// Entries whose calls netted out to nothing
    pub skipped: usize,
    /// Containing entities marked for reindexing by dependency resolution
    pub resolved_containers: usize,
}

impl ChangesetReport {
    pub fn total_operations(&self) -> usize {
        self.adds + self.updates + self.deletes
    }
}

/// Unit of work grouping entity changes into one batch of index operations.
///
/// Calls are coalesced per entity; dependency resolution and document
/// building are deferred to [`Changeset::prepare`] or [`Changeset::execute`].
pub struct Changeset {
    mapping: Arc<SearchMapping>,
    /// Work plans in first-touched order
    plans: Vec<Box<dyn TypeWorkPlan>>,
    plan_positions: HashMap<TypeName, usize>,
    report: ChangesetReport,
    /// Set once a flush fails; pending work may be half resolved from then on
    failed: bool,
}

enum Operation {
    Add,
    Update(Option<BTreeSet<String>>),
    Delete,
}

impl Changeset {
    pub(crate) fn new(mapping: Arc<SearchMapping>) -> Self {
        Self {
            mapping,
            plans: Vec::new(),
            plan_positions: HashMap::new(),
            report: ChangesetReport::default(),
            failed: false,
        }
    }

    pub fn add(&mut self, entity: PojoRef) -> Result<()> {
        self.submit(None, entity, Operation::Add)
    }

    pub fn add_with_id(&mut self, id: &dyn Any, entity: PojoRef) -> Result<()> {
        self.submit(Some(id), entity, Operation::Add)
    }

    /// Update with every path considered dirty.
    pub fn update(&mut self, entity: PojoRef) -> Result<()> {
        self.submit(None, entity, Operation::Update(None))
    }

    pub fn update_with_id(&mut self, id: &dyn Any, entity: PojoRef) -> Result<()> {
        self.submit(Some(id), entity, Operation::Update(None))
    }

    /// Update limited to `dirty_paths`. An empty list means everything changed.
    pub fn update_paths<P, S>(&mut self, entity: PojoRef, dirty_paths: P) -> Result<()>
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths: BTreeSet<String> = dirty_paths.into_iter().map(Into::into).collect();
        let paths = (!paths.is_empty()).then_some(paths);
        self.submit(None, entity, Operation::Update(paths))
    }

    pub fn delete(&mut self, entity: PojoRef) -> Result<()> {
        self.submit(None, entity, Operation::Delete)
    }

    pub fn delete_with_id(&mut self, id: &dyn Any, entity: PojoRef) -> Result<()> {
        self.submit(Some(id), entity, Operation::Delete)
    }

    /// Resolve dependencies, hand net operations to the index workers and let
    /// them build documents. More changes may still be submitted afterwards.
    ///
    /// Any error leaves the changeset unusable: later calls fail with
    /// `InvalidOperation` instead of sending partially resolved work.
    pub fn prepare(&mut self) -> Result<()> {
        self.ensure_usable()?;
        let result = self.flush().and_then(|()| {
            self.plans.iter_mut().try_for_each(|plan| plan.prepare())
        });
        self.fail_on_error(result)
    }

    /// Flush remaining work and apply every index worker's operations.
    pub async fn execute(mut self) -> Result<ChangesetReport> {
        self.ensure_usable()?;
        let flushed = self.flush();
        self.fail_on_error(flushed)?;
        try_join_all(self.plans.iter_mut().map(|plan| plan.execute())).await?;
        info!(
            "Changeset executed: {} add(s), {} update(s), {} delete(s), {} container(s) reindexed",
            self.report.adds,
            self.report.updates,
            self.report.deletes,
            self.report.resolved_containers
        );
        Ok(self.report)
    }

    /// Report of the work flushed so far.
    pub fn report(&self) -> &ChangesetReport {
        &self.report
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.failed {
            return Err(IndexSyncError::InvalidOperation(
                "changeset failed to flush earlier and can no longer be used".to_string(),
            ));
        }
        Ok(())
    }

    fn fail_on_error(&mut self, result: Result<()>) -> Result<()> {
        if let Err(ref e) = result {
            warn!("Changeset flush failed, discarding pending work: {}", e);
            self.failed = true;
        }
        result
    }

    fn submit(&mut self, provided_id: Option<&dyn Any>, entity: PojoRef, operation: Operation) -> Result<()> {
        self.ensure_usable()?;
        let Some(index) = self.plan_for_entity(&entity)? else {
            return Ok(());
        };
        let plan = &mut self.plans[index];
        match operation {
            Operation::Add => plan.add(provided_id, entity),
            Operation::Update(paths) => plan.update(provided_id, entity, paths),
            Operation::Delete => plan.delete(provided_id, entity),
        }
    }

    fn plan_for_entity(&mut self, entity: &PojoRef) -> Result<Option<usize>> {
        let type_name = self
            .mapping
            .introspector()
            .type_of(entity)
            .filter(|type_name| self.mapping.type_manager(type_name).is_some());
        match type_name {
            Some(type_name) => self.plan_for(&type_name).map(Some),
            None => match self.mapping.config().unknown_types {
                UnknownTypePolicy::Ignore => {
                    debug!("Ignoring change on unmapped entity {:?}", entity);
                    Ok(None)
                }
                UnknownTypePolicy::Fail => {
                    Err(IndexSyncError::UnknownEntityType(format!("{:?}", entity)))
                }
            },
        }
    }

    fn plan_for(&mut self, type_name: &TypeName) -> Result<usize> {
        if let Some(&index) = self.plan_positions.get(type_name) {
            return Ok(index);
        }
        let manager = self
            .mapping
            .type_manager(type_name)
            .ok_or_else(|| IndexSyncError::UnknownEntityType(type_name.to_string()))?;
        let index = self.plans.len();
        self.plans.push(manager.create_work_plan());
        self.plan_positions.insert(type_name.clone(), index);
        Ok(index)
    }

    fn flush(&mut self) -> Result<()> {
        if self.mapping.config().resolve_dependencies {
            self.resolve_dependencies()?;
        } else {
            for plan in &mut self.plans {
                plan.take_pending_resolutions();
            }
        }
        for plan in &mut self.plans {
            plan.send_to_worker(&mut self.report);
        }
        Ok(())
    }

    /// Resolve each pending entity once, folding marked containers back into
    /// their own work plans. Plans created here only hold contained updates,
    /// which never resolve further.
    fn resolve_dependencies(&mut self) -> Result<()> {
        let mapping = self.mapping.clone();
        let mut index = 0;
        while index < self.plans.len() {
            let pending = self.plans[index].take_pending_resolutions();
            for (entity, dirty) in pending {
                let mut collector = ReindexingCollector::new();
                self.plans[index].resolve_entities_to_reindex(
                    &mut collector,
                    mapping.introspector(),
                    &entity,
                    &dirty,
                )?;
                if !collector.is_empty() {
                    debug!(
                        "{} on {} marks {} containing entit(ies)",
                        dirty,
                        self.plans[index].type_name(),
                        collector.len()
                    );
                }
                for (type_name, container) in collector.into_marked() {
                    let target = self.plan_for(&type_name)?;
                    self.plans[target].update_because_of_contained(container)?;
                    self.report.resolved_containers += 1;
                }
            }
            index += 1;
        }
        Ok(())
    }
}
