//! Immutable resolver graph nodes.
//!
//! A resolver graph is rooted at a type node for the type of a changed
//! entity and walks from that entity towards the entities containing it,
//! marking those whose documents depend on a dirty path.

use super::{DirtyState, ReindexingCollector};
use indexsync_core::{
    ContainerExtractorPath, IndexSyncError, PojoRef, PropertyHandle, PropertyValue, Result,
    RuntimeIntrospector, TypeName,
};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Everything a resolution pass threads through the graph.
pub struct ResolutionContext<'a> {
    pub introspector: &'a dyn RuntimeIntrospector,
    pub dirty: &'a DirtyState,
    pub collector: &'a mut ReindexingCollector,
}

#[derive(Debug)]
pub enum ResolverNode {
    OriginalType(OriginalTypeNode),
    CastedType(CastedTypeNode),
    Property(PropertyNode),
    ContainerValue(ContainerValueNode),
    Marking(MarkingNode),
}

impl ResolverNode {
    /// Resolve with `subject` as the current object.
    pub fn resolve(&self, ctx: &mut ResolutionContext<'_>, subject: &PojoRef) -> Result<()> {
        match self {
            ResolverNode::OriginalType(node) => node.resolve(ctx, subject),
            ResolverNode::CastedType(node) => node.resolve(ctx, subject),
            ResolverNode::Property(node) => node.resolve(ctx, subject),
            ResolverNode::ContainerValue(node) => {
                node.resolve_value(ctx, PropertyValue::Object(subject.clone()))
            }
            ResolverNode::Marking(node) => node.resolve(ctx, subject),
        }
    }

    /// Resolve with an extracted property value as the current subject.
    fn resolve_value(&self, ctx: &mut ResolutionContext<'_>, value: PropertyValue) -> Result<()> {
        if let ResolverNode::ContainerValue(node) = self {
            return node.resolve_value(ctx, value);
        }
        match value {
            PropertyValue::Null => Ok(()),
            PropertyValue::Object(object) => self.resolve(ctx, &object),
            other => Err(IndexSyncError::UnexpectedValue {
                context: self.label(),
                found: other.kind().to_string(),
            }),
        }
    }

    pub fn nested(&self) -> &[Arc<ResolverNode>] {
        match self {
            ResolverNode::OriginalType(node) => &node.nested,
            ResolverNode::CastedType(node) => &node.nested,
            ResolverNode::Property(node) => &node.nested,
            ResolverNode::ContainerValue(node) => &node.nested,
            ResolverNode::Marking(_) => &[],
        }
    }

    fn label(&self) -> String {
        match self {
            ResolverNode::OriginalType(node) => format!("OriginalTypeNode({})", node.type_name),
            ResolverNode::CastedType(node) => format!("CastedTypeNode({})", node.target),
            ResolverNode::Property(node) => {
                if node.extractors.is_empty() {
                    format!("PropertyNode({})", node.handle.name())
                } else {
                    format!("PropertyNode({} {})", node.handle.name(), node.extractors)
                }
            }
            ResolverNode::ContainerValue(node) => format!("ContainerValueNode({})", node.extractors),
            ResolverNode::Marking(node) => {
                let paths: Vec<&str> = node.dirty_paths.iter().map(String::as_str).collect();
                format!("MarkingNode[{}]", paths.join(", "))
            }
        }
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}{}", "", self.label(), indent = depth * 2)?;
        for child in self.nested() {
            child.write_tree(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ResolverNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f, 0)
    }
}

fn resolve_all(
    nested: &[Arc<ResolverNode>],
    ctx: &mut ResolutionContext<'_>,
    subject: &PojoRef,
) -> Result<()> {
    for node in nested {
        node.resolve(ctx, subject)?;
    }
    Ok(())
}

fn resolve_elements(
    nested: &[Arc<ResolverNode>],
    ctx: &mut ResolutionContext<'_>,
    elements: Vec<PropertyValue>,
) -> Result<()> {
    for element in elements {
        for node in nested {
            node.resolve_value(ctx, element.clone())?;
        }
    }
    Ok(())
}

/// Applies nested nodes to the subject as-is.
#[derive(Debug)]
pub struct OriginalTypeNode {
    type_name: TypeName,
    nested: Vec<Arc<ResolverNode>>,
}

impl OriginalTypeNode {
    pub fn new(type_name: TypeName, nested: Vec<Arc<ResolverNode>>) -> Self {
        Self { type_name, nested }
    }

    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    fn resolve(&self, ctx: &mut ResolutionContext<'_>, subject: &PojoRef) -> Result<()> {
        resolve_all(&self.nested, ctx, subject)
    }
}

/// Applies nested nodes only when the subject is an instance of `target`.
#[derive(Debug)]
pub struct CastedTypeNode {
    target: TypeName,
    nested: Vec<Arc<ResolverNode>>,
}

impl CastedTypeNode {
    pub fn new(target: TypeName, nested: Vec<Arc<ResolverNode>>) -> Self {
        Self { target, nested }
    }

    pub fn target(&self) -> &TypeName {
        &self.target
    }

    fn resolve(&self, ctx: &mut ResolutionContext<'_>, subject: &PojoRef) -> Result<()> {
        match ctx.introspector.cast(subject, &self.target) {
            Some(narrowed) => resolve_all(&self.nested, ctx, &narrowed),
            None => Ok(()),
        }
    }
}

/// Reads one property and hands each extracted element to nested nodes.
#[derive(Debug)]
pub struct PropertyNode {
    handle: Arc<dyn PropertyHandle>,
    extractors: ContainerExtractorPath,
    nested: Vec<Arc<ResolverNode>>,
}

impl PropertyNode {
    pub fn new(
        handle: Arc<dyn PropertyHandle>,
        extractors: ContainerExtractorPath,
        nested: Vec<Arc<ResolverNode>>,
    ) -> Self {
        Self {
            handle,
            extractors,
            nested,
        }
    }

    pub fn property_name(&self) -> &str {
        self.handle.name()
    }

    fn resolve(&self, ctx: &mut ResolutionContext<'_>, subject: &PojoRef) -> Result<()> {
        let value = self.handle.get(subject)?;
        let elements = self.extractors.extract(value)?;
        resolve_elements(&self.nested, ctx, elements)
    }
}

/// Extracts container elements from a raw property value.
///
/// Used under a [`PropertyNode`] when the same property is traversed through
/// several extractor chains.
#[derive(Debug)]
pub struct ContainerValueNode {
    extractors: ContainerExtractorPath,
    nested: Vec<Arc<ResolverNode>>,
}

impl ContainerValueNode {
    pub fn new(extractors: ContainerExtractorPath, nested: Vec<Arc<ResolverNode>>) -> Self {
        Self { extractors, nested }
    }

    fn resolve_value(&self, ctx: &mut ResolutionContext<'_>, value: PropertyValue) -> Result<()> {
        let elements = self.extractors.extract(value)?;
        resolve_elements(&self.nested, ctx, elements)
    }
}

/// Marks the subject for reindexing when one of its trigger paths is dirty.
#[derive(Debug)]
pub struct MarkingNode {
    dirty_paths: BTreeSet<String>,
}

impl MarkingNode {
    pub fn new(dirty_paths: BTreeSet<String>) -> Self {
        Self { dirty_paths }
    }

    pub fn dirty_paths(&self) -> &BTreeSet<String> {
        &self.dirty_paths
    }

    fn resolve(&self, ctx: &mut ResolutionContext<'_>, subject: &PojoRef) -> Result<()> {
        if ctx.dirty.is_any_dirty(&self.dirty_paths) {
            let newly_marked = ctx.collector.mark_for_reindexing(ctx.introspector, subject)?;
            trace!(
                entity = %subject.identity(),
                newly_marked,
                "marked containing entity for reindexing"
            );
        }
        Ok(())
    }
}
