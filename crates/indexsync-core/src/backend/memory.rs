use super::{IndexOperation, IndexOperationKind};
use crate::traits::{
    ChangesetIndexWorker, Document, DocumentContributor, DocumentReference, IndexManager,
};
use crate::{IndexSyncError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace};

/// Index held in memory. Documents are visible once a changeset worker executes.
#[derive(Clone)]
pub struct InMemoryIndexManager {
    index_name: String,
    documents: Arc<DashMap<String, Document>>,
    /// Applied operations, in execution order
    log: Arc<Mutex<Vec<IndexOperation>>>,
}

impl InMemoryIndexManager {
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            documents: Arc::new(DashMap::new()),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn document(&self, document_id: &str) -> Option<Document> {
        self.documents.get(document_id).map(|d| d.value().clone())
    }

    pub fn contains(&self, document_id: &str) -> bool {
        self.documents.contains_key(document_id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn operation_log(&self) -> Vec<IndexOperation> {
        self.log.lock().clone()
    }

    pub fn clear_operation_log(&self) {
        self.log.lock().clear();
    }
}

impl IndexManager for InMemoryIndexManager {
    fn index_name(&self) -> &str {
        &self.index_name
    }

    fn create_changeset_worker(&self) -> Box<dyn ChangesetIndexWorker> {
        Box::new(InMemoryChangesetWorker {
            index_name: self.index_name.clone(),
            documents: self.documents.clone(),
            log: self.log.clone(),
            pending: Vec::new(),
            prepared: Vec::new(),
        })
    }
}

enum PendingWork {
    Add(DocumentReference, DocumentContributor),
    Update(DocumentReference, DocumentContributor),
    Delete(DocumentReference),
}

struct PreparedWork {
    operation: IndexOperation,
    document: Option<Document>,
}

/// Buffers operations, builds documents on `prepare` and applies them on `execute`.
struct InMemoryChangesetWorker {
    index_name: String,
    documents: Arc<DashMap<String, Document>>,
    log: Arc<Mutex<Vec<IndexOperation>>>,
    pending: Vec<PendingWork>,
    prepared: Vec<PreparedWork>,
}

impl InMemoryChangesetWorker {
    fn prepare_pending(&mut self) -> Result<()> {
        for work in std::mem::take(&mut self.pending) {
            let prepared = match work {
                PendingWork::Add(reference, contributor) => PreparedWork {
                    document: Some(self.build(&reference, &contributor)?),
                    operation: IndexOperation::new(IndexOperationKind::Add, reference),
                },
                PendingWork::Update(reference, contributor) => PreparedWork {
                    document: Some(self.build(&reference, &contributor)?),
                    operation: IndexOperation::new(IndexOperationKind::Update, reference),
                },
                PendingWork::Delete(reference) => {
                    self.check_target(&reference)?;
                    PreparedWork {
                        document: None,
                        operation: IndexOperation::new(IndexOperationKind::Delete, reference),
                    }
                }
            };
            self.prepared.push(prepared);
        }
        Ok(())
    }

    fn build(&self, reference: &DocumentReference, contributor: &DocumentContributor) -> Result<Document> {
        self.check_target(reference)?;
        contributor
            .build()
            .map_err(|e| IndexSyncError::DocumentPopulation {
                document_id: reference.document_id.clone(),
                reason: e.to_string(),
            })
    }

    fn check_target(&self, reference: &DocumentReference) -> Result<()> {
        if reference.index_name != self.index_name {
            return Err(IndexSyncError::Backend(format!(
                "document {} does not belong to index '{}'",
                reference, self.index_name
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ChangesetIndexWorker for InMemoryChangesetWorker {
    fn add(&mut self, reference: DocumentReference, contributor: DocumentContributor) {
        self.pending.push(PendingWork::Add(reference, contributor));
    }

    fn update(&mut self, reference: DocumentReference, contributor: DocumentContributor) {
        self.pending.push(PendingWork::Update(reference, contributor));
    }

    fn delete(&mut self, reference: DocumentReference) {
        self.pending.push(PendingWork::Delete(reference));
    }

    fn prepare(&mut self) -> Result<()> {
        self.prepare_pending()
    }

    async fn execute(&mut self) -> Result<()> {
        self.prepare_pending()?;
        let prepared = std::mem::take(&mut self.prepared);
        debug!(
            "Applying {} operation(s) to in-memory index '{}'",
            prepared.len(),
            self.index_name
        );
        let mut log = self.log.lock();
        for work in prepared {
            let document_id = work.operation.reference.document_id.clone();
            match work.document {
                Some(document) => {
                    trace!("{} {}", work.operation.kind, work.operation.reference);
                    self.documents.insert(document_id, document);
                }
                None => {
                    trace!("delete {}", work.operation.reference);
                    self.documents.remove(&document_id);
                }
            }
            log.push(work.operation);
        }
        Ok(())
    }
}
