use std::fmt;
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::Schema;
use apollo_compiler::ast::FieldDefinition;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::collections::IndexSet;
use apollo_compiler::schema::ComponentName;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::validation::Valid;

use crate::config::TypeGraphConfig;
use crate::error::TypeGraphError;
use crate::naming::NamingStrategy;
use crate::operation::Operation;
use crate::operation::OperationKind;
use crate::registry::CovariantEntry;
use crate::registry::CovariantRegistry;
use crate::registry::Lookup;
use crate::source::Normalizer;
use crate::source::SourceType;
use crate::source::TypeCatalog;
use crate::source::TypeDescriptor;
use crate::source::TypeKind;
use crate::value_mapper::ValueMapper;

/// An operation as it ended up in the graph.
#[derive(Debug, Clone)]
pub struct BuiltOperation {
    pub operation: Operation,
    /// The field on the operation's root type.
    pub field: FieldDefinition,
    /// Abstract descriptors found anywhere underneath the operation's return and argument types.
    pub abstract_types: IndexSet<TypeDescriptor>,
    pub value_mapper: Arc<dyn ValueMapper>,
}

pub(crate) struct TypeGraphParts {
    pub(crate) types: IndexMap<Name, ExtendedType>,
    pub(crate) roots: IndexMap<OperationKind, Name>,
    pub(crate) operations: Vec<BuiltOperation>,
    pub(crate) covariant: CovariantRegistry,
    pub(crate) descriptors: IndexMap<Name, TypeDescriptor>,
    pub(crate) capabilities: IndexMap<Name, Arc<IndexSet<Name>>>,
    pub(crate) catalog: Arc<TypeCatalog>,
    pub(crate) config: TypeGraphConfig,
    pub(crate) naming: Arc<dyn NamingStrategy>,
}

/// The finished, immutable type graph. Cheap to clone and safe to share between threads.
#[derive(Clone)]
pub struct TypeGraph {
    inner: Arc<TypeGraphParts>,
}

impl fmt::Debug for TypeGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeGraph")
            .field("types", &self.inner.types.keys().collect::<Vec<_>>())
            .field("roots", &self.inner.roots)
            .finish_non_exhaustive()
    }
}

impl TypeGraph {
    pub(crate) fn new(parts: TypeGraphParts) -> Self {
        Self {
            inner: Arc::new(parts),
        }
    }

    pub fn get_type(&self, name: &str) -> Option<&ExtendedType> {
        self.inner.types.get(name)
    }

    /// Every type in the graph, root types first.
    pub fn types(&self) -> impl Iterator<Item = (&Name, &ExtendedType)> {
        self.inner.types.iter()
    }

    pub fn root_type_name(&self, kind: OperationKind) -> Option<&Name> {
        self.inner.roots.get(&kind)
    }

    /// Operations accepted into the schema, in build order.
    pub fn operations(&self) -> &[BuiltOperation] {
        &self.inner.operations
    }

    pub fn operation(&self, kind: OperationKind, name: &str) -> Option<&BuiltOperation> {
        self.inner
            .operations
            .iter()
            .find(|built| built.operation.kind == kind && built.operation.name.as_str() == name)
    }

    pub fn covariant(&self) -> &CovariantRegistry {
        &self.inner.covariant
    }

    pub fn covariant_entries(&self, composite: &Name) -> Option<&IndexMap<Name, CovariantEntry>> {
        self.inner.covariant.get(composite)
    }

    /// Covariant entries under `composite` that a value of the source type `runtime_type` is
    /// assignable to.
    pub fn candidates(&self, composite: &Name, runtime_type: &Name) -> Lookup<&CovariantEntry> {
        match self.inner.capabilities.get(runtime_type) {
            Some(capabilities) => self.inner.covariant.candidates(composite, capabilities),
            None => self
                .inner
                .covariant
                .candidates(composite, &IndexSet::from_iter([runtime_type.clone()])),
        }
    }

    /// The runtime type's own name plus every transitive supertype name.
    pub fn capabilities(&self, source_type: &Name) -> Option<&IndexSet<Name>> {
        self.inner
            .capabilities
            .get(source_type)
            .map(|capabilities| capabilities.as_ref())
    }

    /// The source descriptor an output type was built from. Seeded types have none.
    pub fn source_descriptor(&self, name: &Name) -> Option<&TypeDescriptor> {
        self.inner.descriptors.get(name)
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.inner.catalog
    }

    pub fn config(&self) -> &TypeGraphConfig {
        &self.inner.config
    }

    /// The output type name the naming strategy derives for `descriptor`.
    pub fn output_name(&self, descriptor: &TypeDescriptor) -> Result<Name, TypeGraphError> {
        let normalized =
            Normalizer::new(&self.inner.catalog, &self.inner.config).normalize(descriptor)?;
        match normalized.kind() {
            TypeKind::Id | TypeKind::Scalar => {
                self.inner.naming.scalar_name(&normalized)
            }
            _ => self.inner.naming.output_name(&normalized),
        }
    }

    pub fn exact_subtype(
        &self,
        declared: &SourceType,
        concrete: &Name,
    ) -> Option<SourceType> {
        Normalizer::new(&self.inner.catalog, &self.inner.config).exact_subtype(declared, concrete)
    }

    /// Assembles and validates the GraphQL schema.
    pub fn to_schema(&self) -> Result<Valid<Schema>, TypeGraphError> {
        let mut schema = Schema::new();
        for (kind, name) in &self.inner.roots {
            let root = Some(ComponentName::from(name.clone()));
            let definition = schema.schema_definition.make_mut();
            match kind {
                OperationKind::Query => definition.query = root,
                OperationKind::Mutation => definition.mutation = root,
                OperationKind::Subscription => definition.subscription = root,
            }
        }
        for (name, ty) in &self.inner.types {
            if schema.types.contains_key(name) {
                continue;
            }
            schema.types.insert(name.clone(), ty.clone());
        }
        Ok(schema.validate()?)
    }
}
