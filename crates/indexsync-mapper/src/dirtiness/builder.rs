//! Bootstrap-time construction of resolver graphs from mapping declarations.
//!
//! For each indexed type, every dependency path is walked forward from the
//! indexed type. Each property crossed into another entity contributes the
//! inverse path leading back, so that a change on the far entity can be
//! traced back to the documents embedding it. The collected backward paths
//! are then merged into one immutable tree per entity type.

use super::node::{
    CastedTypeNode, ContainerValueNode, MarkingNode, OriginalTypeNode, PropertyNode, ResolverNode,
};
use crate::declarations::{MappingDeclarations, ModelPath, PropertyDeclaration};
use indexsync_core::{ConfigurationError, ContainerExtractorPath, PropertyHandle, TypeName};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

type BuildResult<T> = std::result::Result<T, ConfigurationError>;

/// Resolver roots and self-dependency paths for a whole mapping.
#[derive(Debug, Default)]
pub struct ResolverGraph {
    roots: HashMap<TypeName, Arc<ResolverNode>>,
    self_paths: HashMap<TypeName, BTreeSet<String>>,
}

impl ResolverGraph {
    /// Root resolver for entities of `type_name`, if anything depends on them.
    pub fn resolver_for(&self, type_name: &TypeName) -> Option<&Arc<ResolverNode>> {
        self.roots.get(type_name)
    }

    /// Paths on the indexed type itself that its document reads.
    pub fn self_paths(&self, type_name: &TypeName) -> Option<&BTreeSet<String>> {
        self.self_paths.get(type_name)
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }
}

/// One step from a contained entity back towards a containing entity.
#[derive(Clone)]
struct BackwardHop {
    handle: Arc<dyn PropertyHandle>,
    extractors: ContainerExtractorPath,
    landing: TypeName,
    /// Narrow to `landing` when the declared value type is a supertype
    cast: bool,
}

#[derive(Clone)]
struct WalkState {
    /// Indexed type whose document declares the dependency
    root: TypeName,
    /// Entity the current relative path is reported against
    entity: TypeName,
    /// Owner of the next property: `entity` or an embeddable inside it
    current: TypeName,
    prefix: Vec<String>,
    /// Hops from `entity` back to `root`, outermost last
    chain: Vec<BackwardHop>,
}

impl WalkState {
    fn at_root(root: &TypeName) -> Self {
        Self {
            root: root.clone(),
            entity: root.clone(),
            current: root.clone(),
            prefix: Vec::new(),
            chain: Vec::new(),
        }
    }
}

/// Derived property being expanded, with the chain depth it was entered at.
struct DerivedFrame {
    type_name: TypeName,
    property: String,
    depth: usize,
}

struct TypeNodeBuilder {
    type_name: TypeName,
    cast: bool,
    markings: BTreeSet<String>,
    properties: Vec<PropertyNodeBuilder>,
}

struct PropertyNodeBuilder {
    handle: Arc<dyn PropertyHandle>,
    values: Vec<ValueNodeBuilder>,
}

struct ValueNodeBuilder {
    extractors: ContainerExtractorPath,
    types: Vec<TypeNodeBuilder>,
}

impl TypeNodeBuilder {
    fn new(type_name: TypeName, cast: bool) -> Self {
        Self {
            type_name,
            cast,
            markings: BTreeSet::new(),
            properties: Vec::new(),
        }
    }

    fn insert(&mut self, hops: &[BackwardHop], path: String) {
        let Some((hop, rest)) = hops.split_first() else {
            self.markings.insert(path);
            return;
        };

        let property = match self
            .properties
            .iter()
            .position(|p| p.handle.name() == hop.handle.name())
        {
            Some(i) => &mut self.properties[i],
            None => {
                self.properties.push(PropertyNodeBuilder {
                    handle: hop.handle.clone(),
                    values: Vec::new(),
                });
                let last = self.properties.len() - 1;
                &mut self.properties[last]
            }
        };

        let key = hop.extractors.key();
        let value = match property.values.iter().position(|v| v.extractors.key() == key) {
            Some(i) => &mut property.values[i],
            None => {
                property.values.push(ValueNodeBuilder {
                    extractors: hop.extractors.clone(),
                    types: Vec::new(),
                });
                let last = property.values.len() - 1;
                &mut property.values[last]
            }
        };

        let type_node = match value
            .types
            .iter()
            .position(|t| t.type_name == hop.landing && t.cast == hop.cast)
        {
            Some(i) => &mut value.types[i],
            None => {
                value
                    .types
                    .push(TypeNodeBuilder::new(hop.landing.clone(), hop.cast));
                let last = value.types.len() - 1;
                &mut value.types[last]
            }
        };

        type_node.insert(rest, path);
    }

    fn build_nested(self) -> Vec<Arc<ResolverNode>> {
        let mut nested = Vec::with_capacity(self.properties.len() + 1);
        if !self.markings.is_empty() {
            nested.push(Arc::new(ResolverNode::Marking(MarkingNode::new(self.markings))));
        }
        nested.extend(self.properties.into_iter().map(PropertyNodeBuilder::build));
        nested
    }

    fn build(self) -> Arc<ResolverNode> {
        let type_name = self.type_name.clone();
        let node = if self.cast {
            ResolverNode::CastedType(CastedTypeNode::new(type_name, self.build_nested()))
        } else {
            ResolverNode::OriginalType(OriginalTypeNode::new(type_name, self.build_nested()))
        };
        Arc::new(node)
    }
}

impl PropertyNodeBuilder {
    fn build(self) -> Arc<ResolverNode> {
        let PropertyNodeBuilder { handle, mut values } = self;
        let node = if values.len() == 1 {
            let value = values.remove(0);
            let nested = value.types.into_iter().map(TypeNodeBuilder::build).collect();
            PropertyNode::new(handle, value.extractors, nested)
        } else {
            let nested = values
                .into_iter()
                .map(|value| {
                    let types = value.types.into_iter().map(TypeNodeBuilder::build).collect();
                    Arc::new(ResolverNode::ContainerValue(ContainerValueNode::new(
                        value.extractors,
                        types,
                    )))
                })
                .collect();
            PropertyNode::new(handle, ContainerExtractorPath::none(), nested)
        };
        Arc::new(ResolverNode::Property(node))
    }
}

pub struct ResolverGraphBuilder<'a> {
    declarations: &'a MappingDeclarations,
    self_paths: HashMap<TypeName, BTreeSet<String>>,
    /// Backward paths grouped by the entity type they start from
    triggers: HashMap<TypeName, TypeNodeBuilder>,
}

impl<'a> ResolverGraphBuilder<'a> {
    pub fn new(declarations: &'a MappingDeclarations) -> Self {
        Self {
            declarations,
            self_paths: HashMap::new(),
            triggers: HashMap::new(),
        }
    }

    pub fn build(mut self) -> BuildResult<ResolverGraph> {
        self.declarations.validate()?;
        self.check_derived_cycles()?;

        let indexed: Vec<TypeName> = self
            .declarations
            .iter()
            .filter(|d| d.is_entity() && d.is_indexed())
            .map(|d| d.name().clone())
            .collect();

        for type_name in &indexed {
            self.self_paths.entry(type_name.clone()).or_default();
            for dependency in self.declarations.dependencies_of(type_name) {
                self.walk(WalkState::at_root(type_name), &dependency, &mut Vec::new())?;
            }
        }

        let own_nested: HashMap<TypeName, Vec<Arc<ResolverNode>>> = self
            .triggers
            .into_iter()
            .map(|(type_name, builder)| (type_name, builder.build_nested()))
            .collect();

        let mut roots = HashMap::new();
        for declaration in self.declarations.iter().filter(|d| d.is_entity()) {
            let nested: Vec<Arc<ResolverNode>> = self
                .declarations
                .ancestors_or_self(declaration.name())
                .iter()
                .filter_map(|t| own_nested.get(t))
                .flatten()
                .cloned()
                .collect();
            if nested.is_empty() {
                continue;
            }
            let root = Arc::new(ResolverNode::OriginalType(OriginalTypeNode::new(
                declaration.name().clone(),
                nested,
            )));
            debug!("Resolver for {}:\n{}", declaration.name(), root);
            roots.insert(declaration.name().clone(), root);
        }

        info!(
            "Built resolver graph: {} indexed type(s), {} resolver root(s)",
            indexed.len(),
            roots.len()
        );

        Ok(ResolverGraph {
            roots,
            self_paths: self.self_paths,
        })
    }

    fn walk(
        &mut self,
        mut state: WalkState,
        path: &ModelPath,
        derived_stack: &mut Vec<DerivedFrame>,
    ) -> BuildResult<()> {
        path.validate()?;
        let declarations = self.declarations;
        let hops = path.hops();

        for (index, hop) in hops.iter().enumerate() {
            let property = declarations
                .find_property(&state.current, &hop.property)
                .ok_or_else(|| ConfigurationError::UnknownProperty {
                    type_name: state.current.clone(),
                    property: hop.property.clone(),
                    path: path.dirty_path(),
                })?;

            let mut relative = state.prefix.clone();
            relative.push(hop.property.clone());
            let relative_path = relative.join(".");
            self.register(&state, relative_path.clone());

            if index + 1 == hops.len() {
                if !property.derived_from_paths().is_empty() {
                    self.expand_derived(&state, property, derived_stack)?;
                }
                break;
            }

            let value_type = property
                .value_type_name()
                .ok_or_else(|| ConfigurationError::InvalidPath {
                    path: path.dirty_path(),
                    reason: format!(
                        "property '{}' of '{}' has no mapped value type",
                        hop.property, state.current
                    ),
                })?
                .clone();
            let value_declaration =
                declarations
                    .get(&value_type)
                    .ok_or_else(|| ConfigurationError::UnknownType {
                        type_name: value_type.clone(),
                        path: path.dirty_path(),
                    })?;

            if value_declaration.is_entity() {
                let mut chain = self.backward_hops(&state, property, &relative_path, &value_type)?;
                chain.extend(state.chain);
                state = WalkState {
                    root: state.root,
                    entity: value_type.clone(),
                    current: value_type,
                    prefix: Vec::new(),
                    chain,
                };
            } else {
                state.current = value_type;
                state.prefix = relative;
            }
        }
        Ok(())
    }

    /// Record `path` as read by the root document, on the current entity.
    fn register(&mut self, state: &WalkState, path: String) {
        if state.chain.is_empty() {
            self.self_paths
                .entry(state.root.clone())
                .or_default()
                .insert(path);
        } else {
            self.triggers
                .entry(state.entity.clone())
                .or_insert_with(|| TypeNodeBuilder::new(state.entity.clone(), false))
                .insert(&state.chain, path);
        }
    }

    /// Hops following the inverse side of `property` back to `state.entity`.
    fn backward_hops(
        &self,
        state: &WalkState,
        property: &PropertyDeclaration,
        relative_path: &str,
        value_type: &TypeName,
    ) -> BuildResult<Vec<BackwardHop>> {
        let inverse = property
            .inverse_side_path()
            .ok_or_else(|| ConfigurationError::MissingInverseSide {
                type_name: state.current.clone(),
                path: relative_path.to_string(),
            })?;
        let unresolvable = |reason: String| ConfigurationError::UnresolvableInversePath {
            type_name: state.current.clone(),
            path: relative_path.to_string(),
            inverse_path: inverse.dirty_path(),
            reason,
        };
        inverse
            .validate()
            .map_err(|e| unresolvable(e.to_string()))?;

        let mut hops = Vec::with_capacity(inverse.hops().len());
        let mut current = value_type.clone();
        for inverse_hop in inverse.hops() {
            let declared = self
                .declarations
                .find_property(&current, &inverse_hop.property)
                .ok_or_else(|| {
                    unresolvable(format!(
                        "type '{}' has no property '{}'",
                        current, inverse_hop.property
                    ))
                })?;
            let landing = declared.value_type_name().cloned().ok_or_else(|| {
                unresolvable(format!(
                    "property '{}' of '{}' has no mapped value type",
                    inverse_hop.property, current
                ))
            })?;
            if self.declarations.get(&landing).is_none() {
                return Err(unresolvable(format!("type '{}' is not mapped", landing)));
            }
            hops.push(BackwardHop {
                handle: declared.handle().clone(),
                extractors: inverse_hop
                    .extractors
                    .clone()
                    .unwrap_or_else(|| declared.extractors().clone()),
                landing: landing.clone(),
                cast: false,
            });
            current = landing;
        }

        let container = &state.entity;
        if !self.declarations.is_subtype_of(&current, container) {
            if !self.declarations.is_subtype_of(container, &current) {
                return Err(ConfigurationError::IncompatibleInverseSide {
                    type_name: state.current.clone(),
                    path: relative_path.to_string(),
                    inverse_path: inverse.dirty_path(),
                    inverse_type: current,
                });
            }
            if let Some(last) = hops.last_mut() {
                last.landing = container.clone();
                last.cast = true;
            }
        }
        Ok(hops)
    }

    /// Reject derived properties that depend on themselves within one entity,
    /// whether or not any indexed document reads them.
    fn check_derived_cycles(&self) -> BuildResult<()> {
        for declaration in self.declarations.iter() {
            for property in declaration.properties() {
                if !property.derived_from_paths().is_empty() {
                    self.check_derived(declaration.name(), property, &mut Vec::new())?;
                }
            }
        }
        Ok(())
    }

    fn check_derived(
        &self,
        owner: &TypeName,
        property: &PropertyDeclaration,
        stack: &mut Vec<(TypeName, String)>,
    ) -> BuildResult<()> {
        if let Some(start) = stack
            .iter()
            .position(|(type_name, name)| type_name == owner && name == property.name())
        {
            let mut cycle: Vec<String> = stack[start..]
                .iter()
                .map(|(type_name, name)| format!("{}.{}", type_name, name))
                .collect();
            cycle.push(format!("{}.{}", owner, property.name()));
            return Err(ConfigurationError::CyclicDerivedDependency {
                type_name: owner.clone(),
                cycle: cycle.join(" -> "),
            });
        }

        stack.push((owner.clone(), property.name().to_string()));
        for path in property.derived_from_paths() {
            path.validate()?;
            let hops = path.hops();
            let mut current = owner.clone();
            for (index, hop) in hops.iter().enumerate() {
                let source = self
                    .declarations
                    .find_property(&current, &hop.property)
                    .ok_or_else(|| ConfigurationError::UnknownProperty {
                        type_name: current.clone(),
                        property: hop.property.clone(),
                        path: path.dirty_path(),
                    })?;
                if index + 1 == hops.len() {
                    if !source.derived_from_paths().is_empty() {
                        self.check_derived(&current, source, stack)?;
                    }
                    break;
                }
                // Only embeddables stay within the entity.
                match source
                    .value_type_name()
                    .and_then(|value_type| self.declarations.get(value_type))
                {
                    Some(embedded) if !embedded.is_entity() => current = embedded.name().clone(),
                    _ => break,
                }
            }
        }
        stack.pop();
        Ok(())
    }

    fn expand_derived(
        &mut self,
        state: &WalkState,
        property: &PropertyDeclaration,
        derived_stack: &mut Vec<DerivedFrame>,
    ) -> BuildResult<()> {
        let depth = state.chain.len();
        if let Some(start) = derived_stack
            .iter()
            .position(|f| f.type_name == state.current && f.property == property.name())
        {
            if derived_stack[start].depth == depth {
                let mut cycle: Vec<String> = derived_stack[start..]
                    .iter()
                    .map(|f| format!("{}.{}", f.type_name, f.property))
                    .collect();
                cycle.push(format!("{}.{}", state.current, property.name()));
                return Err(ConfigurationError::CyclicDerivedDependency {
                    type_name: state.current.clone(),
                    cycle: cycle.join(" -> "),
                });
            }
            // Revisited across an entity boundary: the association already
            // contributes its triggers, stop expanding.
            return Ok(());
        }

        derived_stack.push(DerivedFrame {
            type_name: state.current.clone(),
            property: property.name().to_string(),
            depth,
        });
        for derived in property.derived_from_paths() {
            self.walk(state.clone(), derived, derived_stack)?;
        }
        derived_stack.pop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declarations::{PropertyDeclaration, TypeDeclaration};
    use indexsync_core::extractors::{COLLECTION, MAP_KEY, MAP_VALUE};
    use indexsync_core::{FnPropertyHandle, PropertyValue};

    struct Book;
    struct Author;
    struct Address;
    struct Profile;
    struct Home;
    struct Magazine;

    fn handle<T: Send + Sync + 'static>(name: &str) -> Arc<dyn PropertyHandle> {
        FnPropertyHandle::shared(name.to_string(), |_: &T| PropertyValue::Null)
    }

    fn collection() -> ContainerExtractorPath {
        ContainerExtractorPath::builtin(&[COLLECTION]).unwrap()
    }

    fn library(book_dependencies: &[&str]) -> MappingDeclarations {
        let mut book = TypeDeclaration::entity::<Book>("Book")
            .indexed()
            .property(PropertyDeclaration::new(handle::<Book>("title")))
            .property(
                PropertyDeclaration::new(handle::<Book>("author"))
                    .value_type("Author")
                    .inverse_side("books"),
            );
        for dependency in book_dependencies {
            book = book.depends_on(*dependency);
        }
        MappingDeclarations::new()
            .with_type(book)
            .with_type(
                TypeDeclaration::entity::<Author>("Author")
                    .property(PropertyDeclaration::new(handle::<Author>("name")))
                    .property(PropertyDeclaration::new(handle::<Author>("address")).value_type("Address"))
                    .property(
                        PropertyDeclaration::new(handle::<Author>("books"))
                            .with_extractors(collection())
                            .value_type("Book")
                            .inverse_side("author"),
                    ),
            )
            .with_type(
                TypeDeclaration::embeddable::<Address>("Address")
                    .property(PropertyDeclaration::new(handle::<Address>("city"))),
            )
    }

    #[test]
    fn one_hop_dependency_builds_backward_tree() {
        let declarations = library(&["title", "author.name"]);
        let graph = ResolverGraphBuilder::new(&declarations).build().unwrap();

        let book = TypeName::new("Book");
        let self_paths = graph.self_paths(&book).unwrap();
        assert!(self_paths.contains("title"));
        assert!(self_paths.contains("author"));
        assert!(!self_paths.contains("author.name"));

        let root = graph.resolver_for(&TypeName::new("Author")).unwrap();
        let rendered = root.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(
            lines,
            vec![
                "OriginalTypeNode(Author)",
                "  PropertyNode(books collection)",
                "    OriginalTypeNode(Book)",
                "      MarkingNode[name]",
            ]
        );
        assert!(graph.resolver_for(&book).is_none());
    }

    #[test]
    fn embeddable_paths_are_reported_against_the_owning_entity() {
        let declarations = library(&["author.address.city"]);
        let graph = ResolverGraphBuilder::new(&declarations).build().unwrap();
        let root = graph.resolver_for(&TypeName::new("Author")).unwrap();
        assert!(root
            .to_string()
            .contains("MarkingNode[address, address.city]"));
    }

    #[test]
    fn crossing_without_inverse_side_fails() {
        let declarations = MappingDeclarations::new()
            .with_type(
                TypeDeclaration::entity::<Book>("Book")
                    .indexed()
                    .property(PropertyDeclaration::new(handle::<Book>("author")).value_type("Author"))
                    .depends_on("author.name"),
            )
            .with_type(
                TypeDeclaration::entity::<Author>("Author")
                    .property(PropertyDeclaration::new(handle::<Author>("name"))),
            );
        let err = ResolverGraphBuilder::new(&declarations).build().unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingInverseSide { .. }));
    }

    #[test]
    fn unknown_properties_fail() {
        let declarations = library(&["author.nickname"]);
        let err = ResolverGraphBuilder::new(&declarations).build().unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::UnknownProperty { ref property, .. } if property == "nickname"
        ));
    }

    #[test]
    fn inverse_side_must_lead_back_to_the_container() {
        let declarations = MappingDeclarations::new()
            .with_type(
                TypeDeclaration::entity::<Book>("Book")
                    .indexed()
                    .property(
                        PropertyDeclaration::new(handle::<Book>("author"))
                            .value_type("Author")
                            .inverse_side("address"),
                    )
                    .depends_on("author.name"),
            )
            .with_type(
                TypeDeclaration::entity::<Author>("Author")
                    .property(PropertyDeclaration::new(handle::<Author>("name")))
                    .property(PropertyDeclaration::new(handle::<Author>("address")).value_type("Address")),
            )
            .with_type(TypeDeclaration::embeddable::<Address>("Address"));
        let err = ResolverGraphBuilder::new(&declarations).build().unwrap_err();
        assert!(matches!(err, ConfigurationError::IncompatibleInverseSide { .. }));
    }

    #[test]
    fn derived_cycle_within_one_entity_fails() {
        let declarations = MappingDeclarations::new().with_type(
            TypeDeclaration::entity::<Book>("Book")
                .indexed()
                .property(PropertyDeclaration::new(handle::<Book>("a")).derived_from("b"))
                .property(PropertyDeclaration::new(handle::<Book>("b")).derived_from("a"))
                .depends_on("a"),
        );
        let err = ResolverGraphBuilder::new(&declarations).build().unwrap_err();
        match err {
            ConfigurationError::CyclicDerivedDependency { cycle, .. } => {
                assert_eq!(cycle, "Book.a -> Book.b -> Book.a")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn derived_cycle_is_rejected_even_when_no_document_reads_it() {
        let declarations = MappingDeclarations::new().with_type(
            TypeDeclaration::entity::<Book>("Book")
                .indexed()
                .property(PropertyDeclaration::new(handle::<Book>("title")))
                .property(PropertyDeclaration::new(handle::<Book>("a")).derived_from("b"))
                .property(PropertyDeclaration::new(handle::<Book>("b")).derived_from("a"))
                .depends_on("title"),
        );
        let err = ResolverGraphBuilder::new(&declarations).build().unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::CyclicDerivedDependency { ref cycle, .. } if cycle == "Book.a -> Book.b -> Book.a"
        ));
    }

    #[test]
    fn derived_cycle_through_an_embeddable_is_rejected() {
        let declarations = library(&["title"])
            .with_type(
                TypeDeclaration::entity::<Profile>("Profile")
                    .property(
                        PropertyDeclaration::new(handle::<Profile>("summary"))
                            .derived_from("home.label"),
                    )
                    .property(PropertyDeclaration::new(handle::<Profile>("home")).value_type("Home")),
            )
            .with_type(
                TypeDeclaration::embeddable::<Home>("Home").property(
                    PropertyDeclaration::new(handle::<Home>("label")).derived_from("label"),
                ),
            );
        let err = ResolverGraphBuilder::new(&declarations).build().unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::CyclicDerivedDependency { ref cycle, .. } if cycle == "Home.label -> Home.label"
        ));
    }

    #[test]
    fn one_property_through_two_extractor_chains_splits_into_container_values() {
        let declarations = MappingDeclarations::new()
            .with_type(TypeDeclaration::abstract_entity("Publication"))
            .with_type(
                TypeDeclaration::entity::<Book>("Book")
                    .extends("Publication")
                    .indexed()
                    .property(
                        PropertyDeclaration::new(handle::<Book>("author"))
                            .value_type("Author")
                            .inverse_side(ModelPath::property("works").with_extractors(
                                ContainerExtractorPath::builtin(&[MAP_KEY]).unwrap(),
                            )),
                    )
                    .depends_on("author.name"),
            )
            .with_type(
                TypeDeclaration::entity::<Magazine>("Magazine")
                    .extends("Publication")
                    .indexed()
                    .property(
                        PropertyDeclaration::new(handle::<Magazine>("editor"))
                            .value_type("Author")
                            .inverse_side(ModelPath::property("works").with_extractors(
                                ContainerExtractorPath::builtin(&[MAP_VALUE]).unwrap(),
                            )),
                    )
                    .depends_on("editor.name"),
            )
            .with_type(
                TypeDeclaration::entity::<Author>("Author")
                    .property(PropertyDeclaration::new(handle::<Author>("name")))
                    .property(PropertyDeclaration::new(handle::<Author>("works")).value_type("Publication")),
            );
        let graph = ResolverGraphBuilder::new(&declarations).build().unwrap();
        let rendered = graph.resolver_for(&TypeName::new("Author")).unwrap().to_string();
        assert_eq!(
            rendered.lines().collect::<Vec<_>>(),
            vec![
                "OriginalTypeNode(Author)",
                "  PropertyNode(works)",
                "    ContainerValueNode(map-key)",
                "      CastedTypeNode(Book)",
                "        MarkingNode[name]",
                "    ContainerValueNode(map-value)",
                "      CastedTypeNode(Magazine)",
                "        MarkingNode[name]",
            ]
        );
    }

    #[test]
    fn derived_properties_expand_to_their_sources() {
        let declarations = MappingDeclarations::new()
            .with_type(
                TypeDeclaration::entity::<Book>("Book")
                    .indexed()
                    .property(
                        PropertyDeclaration::new(handle::<Book>("author"))
                            .value_type("Author")
                            .inverse_side("books"),
                    )
                    .property(PropertyDeclaration::new(handle::<Book>("byline")).derived_from("author.name"))
                    .depends_on("byline"),
            )
            .with_type(
                TypeDeclaration::entity::<Author>("Author")
                    .property(PropertyDeclaration::new(handle::<Author>("name")))
                    .property(
                        PropertyDeclaration::new(handle::<Author>("books"))
                            .with_extractors(collection())
                            .value_type("Book")
                            .inverse_side("author"),
                    ),
            );
        let graph = ResolverGraphBuilder::new(&declarations).build().unwrap();
        let self_paths = graph.self_paths(&TypeName::new("Book")).unwrap();
        assert!(self_paths.contains("byline"));
        assert!(self_paths.contains("author"));
        assert!(graph
            .resolver_for(&TypeName::new("Author"))
            .unwrap()
            .to_string()
            .contains("MarkingNode[name]"));
    }
}
