//! Reference backends implementing the document operation boundary.

pub mod memory;

pub use memory::*;

use crate::traits::DocumentReference;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexOperationKind {
    Add,
    Update,
    Delete,
}

impl fmt::Display for IndexOperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexOperationKind::Add => f.write_str("add"),
            IndexOperationKind::Update => f.write_str("update"),
            IndexOperationKind::Delete => f.write_str("delete"),
        }
    }
}

/// One document operation as applied by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexOperation {
    pub kind: IndexOperationKind,
    pub reference: DocumentReference,
}

impl IndexOperation {
    pub fn new(kind: IndexOperationKind, reference: DocumentReference) -> Self {
        Self { kind, reference }
    }
}
