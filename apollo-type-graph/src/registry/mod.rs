//! The name-indexed type registry: the single mutable source of truth while a graph is built.
//!
//! Schema types are stored in two flat tables (one per [`Namespace`]) keyed by schema name. Every
//! structural slot of a stored type (a field type, an implemented interface, a union member) is a
//! name into these tables, so a type under construction can be referenced before it exists
//! without any back-pointer.

use apollo_compiler::Name;
use apollo_compiler::Schema;
use apollo_compiler::ast;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::collections::IndexSet;
use apollo_compiler::schema::ExtendedType;
use tracing::trace;

use crate::error::SingleTypeGraphError;
use crate::error::TypeGraphError;
use crate::error::TypeOrigin;
use crate::internal_error;
use crate::source::TypeDescriptor;

pub(crate) mod covariant;

pub use covariant::CovariantEntry;
pub use covariant::CovariantRegistry;

/// Input and output schema types are named independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Namespace {
    Output,
    Input,
}

/// A type as handed out by the builder: either the resolved schema type itself, or a name standing
/// in for a type that is still under construction.
#[derive(Debug, Clone)]
pub enum MappedSlot {
    Resolved(ExtendedType),
    Forward(Name),
}

impl MappedSlot {
    pub fn name(&self) -> &Name {
        match self {
            MappedSlot::Resolved(ty) => ty.name(),
            MappedSlot::Forward(name) => name,
        }
    }

    pub fn is_forward(&self) -> bool {
        matches!(self, MappedSlot::Forward(_))
    }

    pub fn as_resolved(&self) -> Option<&ExtendedType> {
        match self {
            MappedSlot::Resolved(ty) => Some(ty),
            MappedSlot::Forward(_) => None,
        }
    }
}

/// A possibly wrapped reference to a named type.
#[derive(Debug, Clone)]
pub enum TypeReference {
    Named(MappedSlot),
    List(Box<TypeReference>),
    NonNull(Box<TypeReference>),
}

impl TypeReference {
    pub fn non_null(self) -> Self {
        match self {
            TypeReference::NonNull(_) => self,
            other => TypeReference::NonNull(Box::new(other)),
        }
    }

    pub fn nullable(self) -> Self {
        match self {
            TypeReference::NonNull(inner) => *inner,
            other => other,
        }
    }

    pub fn list(self) -> Self {
        TypeReference::List(Box::new(self))
    }

    /// The named type at the bottom of any wrapping.
    pub fn named_slot(&self) -> &MappedSlot {
        match self {
            TypeReference::Named(slot) => slot,
            TypeReference::List(inner) | TypeReference::NonNull(inner) => inner.named_slot(),
        }
    }

    pub fn to_ast_type(&self) -> ast::Type {
        match self {
            TypeReference::Named(slot) => ast::Type::Named(slot.name().clone()),
            TypeReference::List(inner) => inner.to_ast_type().list(),
            TypeReference::NonNull(inner) => inner.to_ast_type().non_null(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum EntryStatus {
    Pending,
    Resolved(ExtendedType),
}

#[derive(Debug, Clone)]
pub(crate) struct RegistryEntry {
    /// `None` for entries seeded from a published schema.
    pub(crate) shape: Option<TypeDescriptor>,
    pub(crate) origin: TypeOrigin,
    pub(crate) status: EntryStatus,
    /// Abstract descriptors found while this entry was being mapped.
    pub(crate) abstract_types: IndexSet<TypeDescriptor>,
    /// Named types this entry's mapping referred to, forward references included.
    pub(crate) references: IndexSet<(Namespace, Name)>,
}

impl RegistryEntry {
    pub(crate) fn resolved(&self) -> Option<&ExtendedType> {
        match &self.status {
            EntryStatus::Resolved(ty) => Some(ty),
            EntryStatus::Pending => None,
        }
    }

    pub(crate) fn is_seeded(&self) -> bool {
        self.shape.is_none()
    }
}

#[derive(Debug, Clone)]
pub enum SlotStatus {
    Resolved(ExtendedType),
    Pending,
    Absent,
}

/// The result of a lookup that may legitimately find nothing, or too much.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    Ambiguous(Vec<T>),
}

impl<T> Lookup<T> {
    pub(crate) fn from_candidates(mut candidates: Vec<T>) -> Self {
        match candidates.len() {
            0 => Lookup::NotFound,
            1 => match candidates.pop() {
                Some(candidate) => Lookup::Found(candidate),
                None => Lookup::NotFound,
            },
            _ => Lookup::Ambiguous(candidates),
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    output: IndexMap<Name, RegistryEntry>,
    input: IndexMap<Name, RegistryEntry>,
    covariant: CovariantRegistry,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every non-built-in type of `schema` as already resolved. Output types land in the
    /// output namespace, input objects in the input namespace, enums and scalars in both.
    pub fn seed(&mut self, schema: &Schema) {
        for (name, ty) in &schema.types {
            if ty.is_built_in() {
                continue;
            }
            let entry = RegistryEntry {
                shape: None,
                origin: TypeOrigin(format!("seeded type `{name}`")),
                status: EntryStatus::Resolved(ty.clone()),
                abstract_types: Default::default(),
                references: Default::default(),
            };
            match ty {
                ExtendedType::Object(_) | ExtendedType::Interface(_) | ExtendedType::Union(_) => {
                    self.output.insert(name.clone(), entry);
                }
                ExtendedType::InputObject(_) => {
                    self.input.insert(name.clone(), entry);
                }
                ExtendedType::Enum(_) | ExtendedType::Scalar(_) => {
                    self.output.insert(name.clone(), entry.clone());
                    self.input.insert(name.clone(), entry);
                }
            }
            trace!("Seeded `{name}`");
        }
    }

    pub fn status(&self, namespace: Namespace, name: &Name) -> SlotStatus {
        match self.table(namespace).get(name).map(|entry| &entry.status) {
            Some(EntryStatus::Resolved(ty)) => SlotStatus::Resolved(ty.clone()),
            Some(EntryStatus::Pending) => SlotStatus::Pending,
            None => SlotStatus::Absent,
        }
    }

    pub fn covariant(&self) -> &CovariantRegistry {
        &self.covariant
    }

    pub(crate) fn covariant_mut(&mut self) -> &mut CovariantRegistry {
        &mut self.covariant
    }

    pub(crate) fn table(&self, namespace: Namespace) -> &IndexMap<Name, RegistryEntry> {
        match namespace {
            Namespace::Output => &self.output,
            Namespace::Input => &self.input,
        }
    }

    fn table_mut(&mut self, namespace: Namespace) -> &mut IndexMap<Name, RegistryEntry> {
        match namespace {
            Namespace::Output => &mut self.output,
            Namespace::Input => &mut self.input,
        }
    }

    /// Fails with a name collision when `name` is already taken by a descriptor of a different
    /// shape. Seeded entries accept any shape.
    pub(crate) fn check_shape(
        &self,
        namespace: Namespace,
        name: &Name,
        shape: &TypeDescriptor,
        origin: &TypeDescriptor,
    ) -> Result<(), TypeGraphError> {
        let Some(entry) = self.table(namespace).get(name) else {
            return Ok(());
        };
        match &entry.shape {
            Some(existing) if existing != shape => Err(SingleTypeGraphError::NameCollision {
                name: name.clone(),
                namespace,
                first: entry.origin.clone(),
                second: TypeOrigin(origin.to_string()),
            }
            .into()),
            _ => Ok(()),
        }
    }

    /// Marks `name` as under construction.
    pub(crate) fn reserve(
        &mut self,
        namespace: Namespace,
        name: Name,
        shape: TypeDescriptor,
        origin: &TypeDescriptor,
    ) {
        self.table_mut(namespace).insert(
            name,
            RegistryEntry {
                shape: Some(shape),
                origin: TypeOrigin(origin.to_string()),
                status: EntryStatus::Pending,
                abstract_types: Default::default(),
                references: Default::default(),
            },
        );
    }

    pub(crate) fn complete(
        &mut self,
        namespace: Namespace,
        name: &Name,
        ty: ExtendedType,
        abstract_types: IndexSet<TypeDescriptor>,
        references: IndexSet<(Namespace, Name)>,
    ) -> Result<(), TypeGraphError> {
        let entry = self
            .table_mut(namespace)
            .get_mut(name)
            .ok_or_else(|| internal_error!("Completed type `{name}` was never reserved"))?;
        if !matches!(entry.status, EntryStatus::Pending) {
            return Err(internal_error!(
                "Type `{name}` in the {namespace} namespace was completed twice"
            ));
        }
        entry.status = EntryStatus::Resolved(ty);
        entry.abstract_types = abstract_types;
        entry.references = references;
        Ok(())
    }

    /// Drops a reservation whose descriptor was substituted by another type.
    pub(crate) fn release(&mut self, namespace: Namespace, name: &Name) {
        if let Some(entry) = self.table(namespace).get(name) {
            if matches!(entry.status, EntryStatus::Pending) {
                self.table_mut(namespace).shift_remove(name);
            }
        }
    }

    /// Every abstract descriptor recorded under the entries reachable from `roots`.
    pub(crate) fn reachable_abstract_types<'a>(
        &self,
        roots: impl IntoIterator<Item = &'a (Namespace, Name)>,
    ) -> IndexSet<TypeDescriptor> {
        let mut visited: IndexSet<(Namespace, Name)> = Default::default();
        let mut stack: Vec<(Namespace, Name)> = roots.into_iter().cloned().collect();
        let mut abstract_types = IndexSet::default();
        while let Some(key) = stack.pop() {
            if !visited.insert(key.clone()) {
                continue;
            }
            let Some(entry) = self.table(key.0).get(&key.1) else {
                continue;
            };
            abstract_types.extend(entry.abstract_types.iter().cloned());
            stack.extend(
                entry
                    .references
                    .iter()
                    .filter(|reference| !visited.contains(*reference))
                    .cloned(),
            );
        }
        abstract_types
    }

    pub(crate) fn pending(&self) -> Vec<(Namespace, Name)> {
        [(Namespace::Output, &self.output), (Namespace::Input, &self.input)]
            .into_iter()
            .flat_map(|(namespace, table)| {
                table
                    .iter()
                    .filter(|(_, entry)| matches!(entry.status, EntryStatus::Pending))
                    .map(move |(name, _)| (namespace, name.clone()))
            })
            .collect()
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        IndexMap<Name, RegistryEntry>,
        IndexMap<Name, RegistryEntry>,
        CovariantRegistry,
    ) {
        (self.output, self.input, self.covariant)
    }
}
