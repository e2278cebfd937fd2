//! Dirtiness propagation: which containing entities must be reindexed when
//! a contained entity changes.

pub mod builder;
pub mod collector;
pub mod node;

pub use builder::{ResolverGraph, ResolverGraphBuilder};
pub use collector::ReindexingCollector;
pub use node::{
    CastedTypeNode, ContainerValueNode, MarkingNode, OriginalTypeNode, PropertyNode, ResolverNode,
};

use std::collections::BTreeSet;
use std::fmt;

/// Which parts of an entity changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirtyState {
    /// Every path is considered changed.
    AllDirty,
    /// Exactly these dotted property paths changed.
    SomePaths(BTreeSet<String>),
}

impl DirtyState {
    /// Build from reported paths; an empty report means everything changed.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths: BTreeSet<String> = paths.into_iter().map(Into::into).collect();
        if paths.is_empty() {
            DirtyState::AllDirty
        } else {
            DirtyState::SomePaths(paths)
        }
    }

    pub fn is_all_dirty(&self) -> bool {
        matches!(self, DirtyState::AllDirty)
    }

    /// Whether any of `paths` is dirty. Matching is exact string membership.
    pub fn is_any_dirty(&self, paths: &BTreeSet<String>) -> bool {
        match self {
            DirtyState::AllDirty => true,
            DirtyState::SomePaths(dirty) => paths.iter().any(|path| dirty.contains(path)),
        }
    }
}

impl fmt::Display for DirtyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirtyState::AllDirty => f.write_str("<all>"),
            DirtyState::SomePaths(paths) => {
                let joined: Vec<&str> = paths.iter().map(String::as_str).collect();
                write!(f, "[{}]", joined.join(", "))
            }
        }
    }
}
