//! The single finalization pass run once every operation has been built.
//!
//! Builds the root types from the accepted operations, prunes types nothing reachable refers to,
//! checks that every name slot of what remains resolves, settles the covariant registry, and
//! merges both namespaces into the one type table of the published [`TypeGraph`].

use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use apollo_compiler::ast::FieldDefinition;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::collections::IndexSet;
use apollo_compiler::schema::Component;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::ObjectType;
#[cfg(feature = "snapshot_tracing")]
use itertools::Itertools;
use petgraph::graph::DiGraph;
use petgraph::prelude::NodeIndex;
use petgraph::visit::Dfs;
use strum::IntoEnumIterator;
use tracing::debug;
use tracing::warn;

use crate::bail;
use crate::builder::TypeGraphBuilder;
use crate::config::TypeGraphConfig;
use crate::error::MultipleTypeGraphErrors;
use crate::error::SingleTypeGraphError;
use crate::error::TypeGraphError;
use crate::error::TypeOrigin;
use crate::graph::BuiltOperation;
use crate::graph::TypeGraph;
use crate::graph::TypeGraphParts;
use crate::operation::OperationKind;
use crate::registry::CovariantRegistry;
use crate::registry::MappedSlot;
use crate::registry::Namespace;
use crate::registry::RegistryEntry;
use crate::source::TypeDescriptor;
use crate::utils::logging::snapshot;

type SlotKey = (Namespace, Name);

/// A name slot of a schema type, and a readable path to it for diagnostics.
struct Reference {
    target: SlotKey,
    referrer: String,
}

fn push_field_references(
    references: &mut Vec<Reference>,
    type_name: &Name,
    fields: &IndexMap<Name, Component<FieldDefinition>>,
) {
    for (field_name, field) in fields {
        references.push(Reference {
            target: (Namespace::Output, field.ty.inner_named_type().clone()),
            referrer: format!("{type_name}.{field_name}"),
        });
        for argument in &field.arguments {
            references.push(Reference {
                target: (Namespace::Input, argument.ty.inner_named_type().clone()),
                referrer: format!("{type_name}.{field_name}({}:)", argument.name),
            });
        }
    }
}

fn references(ty: &ExtendedType) -> Vec<Reference> {
    let mut references = Vec::new();
    let type_name = ty.name();
    match ty {
        ExtendedType::Object(object) => {
            push_field_references(&mut references, type_name, &object.fields);
            references.extend(object.implements_interfaces.iter().map(|interface| Reference {
                target: (Namespace::Output, interface.name.clone()),
                referrer: type_name.to_string(),
            }));
        }
        ExtendedType::Interface(interface) => {
            push_field_references(&mut references, type_name, &interface.fields);
            references.extend(interface.implements_interfaces.iter().map(|interface| {
                Reference {
                    target: (Namespace::Output, interface.name.clone()),
                    referrer: type_name.to_string(),
                }
            }));
        }
        ExtendedType::Union(union) => {
            references.extend(union.members.iter().map(|member| Reference {
                target: (Namespace::Output, member.name.clone()),
                referrer: type_name.to_string(),
            }));
        }
        ExtendedType::InputObject(input) => {
            references.extend(input.fields.iter().map(|(field_name, field)| Reference {
                target: (Namespace::Input, field.ty.inner_named_type().clone()),
                referrer: format!("{type_name}.{field_name}"),
            }));
        }
        ExtendedType::Enum(_) | ExtendedType::Scalar(_) => {}
    }
    references
}

/// The type-level reference graph, one node per (namespace, name).
#[derive(Default)]
struct ReferenceGraph {
    graph: DiGraph<SlotKey, ()>,
    nodes: IndexMap<SlotKey, NodeIndex>,
}

impl ReferenceGraph {
    fn node(&mut self, key: &SlotKey) -> NodeIndex {
        if let Some(index) = self.nodes.get(key) {
            return *index;
        }
        let index = self.graph.add_node(key.clone());
        self.nodes.insert(key.clone(), index);
        index
    }

    fn add_edge(&mut self, from: &SlotKey, to: &SlotKey) {
        let from = self.node(from);
        let to = self.node(to);
        self.graph.update_edge(from, to, ());
    }

    fn reachable_from<'a>(&self, starts: impl IntoIterator<Item = &'a SlotKey>) -> IndexSet<SlotKey> {
        let mut reachable = IndexSet::default();
        let mut dfs = Dfs::empty(&self.graph);
        for start in starts {
            let Some(index) = self.nodes.get(start) else {
                continue;
            };
            dfs.move_to(*index);
            while let Some(node) = dfs.next(&self.graph) {
                reachable.insert(self.graph[node].clone());
            }
        }
        reachable
    }
}

struct ResolvedTables {
    output: IndexMap<Name, ExtendedType>,
    input: IndexMap<Name, ExtendedType>,
    origins: IndexMap<SlotKey, TypeOrigin>,
    roots: Vec<SlotKey>,
    seeded: IndexSet<SlotKey>,
}

impl ResolvedTables {
    fn table(&self, namespace: Namespace) -> &IndexMap<Name, ExtendedType> {
        match namespace {
            Namespace::Output => &self.output,
            Namespace::Input => &self.input,
        }
    }

    fn origin(&self, namespace: Namespace, name: &Name) -> TypeOrigin {
        self.origins
            .get(&(namespace, name.clone()))
            .cloned()
            .unwrap_or_else(|| TypeOrigin(name.to_string()))
    }
}

fn root_type_name(config: &TypeGraphConfig, kind: OperationKind) -> &Name {
    match kind {
        OperationKind::Query => &config.query_type_name,
        OperationKind::Mutation => &config.mutation_type_name,
        OperationKind::Subscription => &config.subscription_type_name,
    }
}

/// Root object types, built from the accepted operations on top of any seeded root type of the
/// same name.
fn root_types(
    config: &TypeGraphConfig,
    operations: &[BuiltOperation],
    output: &IndexMap<Name, RegistryEntry>,
) -> Result<IndexMap<OperationKind, ObjectType>, TypeGraphError> {
    let mut roots: IndexMap<OperationKind, ObjectType> = IndexMap::default();
    for operation in operations {
        let kind = operation.operation.kind;
        let root_name = root_type_name(config, kind);
        if !roots.contains_key(&kind) {
            let root = match output.get(root_name) {
                Some(entry) => match entry.resolved() {
                    Some(ExtendedType::Object(seeded)) if entry.is_seeded() => {
                        (**seeded).clone()
                    }
                    _ => {
                        return Err(SingleTypeGraphError::NameCollision {
                            name: root_name.clone(),
                            namespace: Namespace::Output,
                            first: entry.origin.clone(),
                            second: TypeOrigin(format!("{kind} root type")),
                        }
                        .into());
                    }
                },
                None => ObjectType {
                    description: None,
                    name: root_name.clone(),
                    implements_interfaces: Default::default(),
                    directives: Default::default(),
                    fields: Default::default(),
                },
            };
            roots.insert(kind, root);
        }
        let Some(root) = roots.get_mut(&kind) else {
            bail!("Root type for {kind} operations is missing");
        };
        if root.fields.contains_key(&operation.field.name) {
            return Err(SingleTypeGraphError::DuplicateOperation {
                name: operation.field.name.clone(),
                kind: kind.to_string(),
            }
            .into());
        }
        root.fields.insert(
            operation.field.name.clone(),
            Component::new(operation.field.clone()),
        );
    }
    Ok(roots)
}

fn resolved_tables(
    output: IndexMap<Name, RegistryEntry>,
    input: IndexMap<Name, RegistryEntry>,
    roots: &IndexMap<OperationKind, ObjectType>,
    descriptors: &mut IndexMap<Name, TypeDescriptor>,
) -> Result<ResolvedTables, TypeGraphError> {
    let mut tables = ResolvedTables {
        output: IndexMap::default(),
        input: IndexMap::default(),
        origins: IndexMap::default(),
        roots: Vec::new(),
        seeded: IndexSet::default(),
    };
    for (kind, root) in roots {
        tables.roots.push((Namespace::Output, root.name.clone()));
        tables.origins.insert(
            (Namespace::Output, root.name.clone()),
            TypeOrigin(format!("{kind} root type")),
        );
        tables.output.insert(
            root.name.clone(),
            ExtendedType::Object(Node::new(root.clone())),
        );
    }
    for (namespace, entries) in [(Namespace::Output, output), (Namespace::Input, input)] {
        for (name, entry) in entries {
            let key = (namespace, name.clone());
            if namespace == Namespace::Output && tables.output.contains_key(&name) {
                // Already merged into a root type.
                tables.seeded.insert(key);
                continue;
            }
            let Some(ty) = entry.resolved().cloned() else {
                bail!("Type `{name}` in the {namespace} namespace was never completed");
            };
            if entry.is_seeded() {
                tables.seeded.insert(key.clone());
            }
            if let (Namespace::Output, Some(shape)) = (namespace, &entry.shape) {
                descriptors.insert(name.clone(), shape.clone());
            }
            tables.origins.insert(key, entry.origin);
            match namespace {
                Namespace::Output => tables.output.insert(name, ty),
                Namespace::Input => tables.input.insert(name, ty),
            };
        }
    }
    Ok(tables)
}

/// Drops every type not reachable from a root or a seeded type. Implementations registered under
/// a reachable interface or union count as reachable.
fn prune(tables: &mut ResolvedTables, covariant: &CovariantRegistry) {
    let mut graph = ReferenceGraph::default();
    for namespace in [Namespace::Output, Namespace::Input] {
        for (name, ty) in tables.table(namespace) {
            let key = (namespace, name.clone());
            graph.node(&key);
            for reference in references(ty) {
                graph.add_edge(&key, &reference.target);
            }
        }
    }
    for (composite, concretes) in covariant.iter() {
        for concrete in concretes.keys() {
            graph.add_edge(
                &(Namespace::Output, composite.clone()),
                &(Namespace::Output, concrete.clone()),
            );
        }
    }

    let reachable = graph.reachable_from(tables.roots.iter().chain(&tables.seeded));

    for namespace in [Namespace::Output, Namespace::Input] {
        let table = match namespace {
            Namespace::Output => &mut tables.output,
            Namespace::Input => &mut tables.input,
        };
        table.retain(|name, _| {
            let keep = reachable.contains(&(namespace, name.clone()));
            if !keep {
                debug!("Pruning unreachable type `{name}` from the {namespace} namespace");
            }
            keep
        });
    }
}

/// Every name slot of every remaining type must resolve.
fn check_references(tables: &ResolvedTables) -> Result<(), TypeGraphError> {
    let built_ins = Schema::new().types.keys().cloned().collect::<IndexSet<_>>();
    let mut errors = MultipleTypeGraphErrors::new();
    for namespace in [Namespace::Output, Namespace::Input] {
        for ty in tables.table(namespace).values() {
            for Reference { target, referrer } in references(ty) {
                let (target_namespace, target_name) = target;
                if tables.table(target_namespace).contains_key(&target_name)
                    || built_ins.contains(&target_name)
                {
                    continue;
                }
                errors.push(
                    SingleTypeGraphError::MissingReference {
                        referrer,
                        referenced: target_name,
                    }
                    .into(),
                );
            }
        }
    }
    errors.into_result()
}

/// Upgrades every covariant slot to the final type, dropping entries whose composite or concrete
/// type did not make it into the graph.
fn settle_covariant(covariant: &mut CovariantRegistry, output: &IndexMap<Name, ExtendedType>) {
    for (composite, concretes) in covariant.entries_mut().iter_mut() {
        let composite_kept = output.contains_key(composite);
        concretes.retain(|concrete, entry| {
            match output.get(concrete) {
                Some(ty) if composite_kept => {
                    entry.slot = MappedSlot::Resolved(ty.clone());
                    true
                }
                _ => {
                    warn!(
                        "Dropping covariant registration of `{concrete}` under `{composite}`: type is not part of the schema"
                    );
                    false
                }
            }
        });
    }
    covariant
        .entries_mut()
        .retain(|_, concretes| !concretes.is_empty());
}

/// Merges the input namespace into the output one. Enums and scalars built for both namespaces
/// must be identical.
fn merge(tables: ResolvedTables) -> Result<IndexMap<Name, ExtendedType>, TypeGraphError> {
    let mut types = tables.output.clone();
    for (name, ty) in &tables.input {
        match types.get(name) {
            None => {
                types.insert(name.clone(), ty.clone());
            }
            Some(existing) if same_leaf_type(existing, ty) => {}
            Some(_) => {
                return Err(SingleTypeGraphError::NameCollision {
                    name: name.clone(),
                    namespace: Namespace::Input,
                    first: tables.origin(Namespace::Output, name),
                    second: tables.origin(Namespace::Input, name),
                }
                .into());
            }
        }
    }
    Ok(types)
}

fn same_leaf_type(output: &ExtendedType, input: &ExtendedType) -> bool {
    matches!(
        (output, input),
        (ExtendedType::Enum(_), ExtendedType::Enum(_))
            | (ExtendedType::Scalar(_), ExtendedType::Scalar(_))
    ) && output == input
}

#[cfg_attr(feature = "snapshot_tracing", tracing::instrument(skip_all))]
pub(crate) fn finalize(
    builder: TypeGraphBuilder,
    operations: Vec<BuiltOperation>,
) -> Result<TypeGraph, TypeGraphError> {
    let parts = builder.into_parts();
    if let Some((namespace, name)) = parts.registry.pending().first() {
        bail!("Type `{name}` in the {namespace} namespace is still pending after the build");
    }

    let (accepted, excluded): (Vec<_>, Vec<_>) =
        operations
            .into_iter()
            .partition(|operation| match &parts.field_filter {
                Some(filter) => filter(&operation.operation, &operation.field),
                None => true,
            });
    for operation in &excluded {
        debug!(
            "Excluding {} operation `{}` from the schema",
            operation.operation.kind, operation.operation.name
        );
    }

    let (output, input, mut covariant) = parts.registry.into_parts();
    let roots = root_types(&parts.config, &accepted, &output)?;
    let mut descriptors = IndexMap::default();
    let mut tables = resolved_tables(output, input, &roots, &mut descriptors)?;
    prune(&mut tables, &covariant);
    snapshot!(
        "ReachableTypes",
        tables.output.keys().chain(tables.input.keys()).join(", "),
        "types left after pruning"
    );
    check_references(&tables)?;
    settle_covariant(&mut covariant, &tables.output);
    descriptors.retain(|name, _| tables.output.contains_key(name));
    let mut root_names: IndexMap<OperationKind, Name> = roots
        .into_iter()
        .map(|(kind, root)| (kind, root.name))
        .collect();
    for kind in OperationKind::iter() {
        let name = root_type_name(&parts.config, kind);
        let seeded_root = tables.seeded.contains(&(Namespace::Output, name.clone()))
            && matches!(tables.output.get(name), Some(ExtendedType::Object(_)));
        if seeded_root && !root_names.contains_key(&kind) {
            root_names.insert(kind, name.clone());
        }
    }
    let types = merge(tables)?;
    snapshot!(
        "CovariantRegistry",
        covariant
            .iter()
            .map(|(composite, concretes)| format!("{composite}: [{}]", concretes.keys().join(", ")))
            .join("; "),
        "settled covariant registry"
    );

    let capabilities = parts
        .catalog
        .declarations()
        .map(|declaration| {
            (
                declaration.name.clone(),
                Arc::new(parts.catalog.capabilities(&declaration.name)),
            )
        })
        .collect();

    Ok(TypeGraph::new(TypeGraphParts {
        types,
        roots: root_names,
        operations: accepted,
        covariant,
        descriptors,
        capabilities,
        catalog: parts.catalog,
        config: parts.config,
        naming: parts.naming,
    }))
}
