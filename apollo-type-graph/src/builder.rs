//! Recursive, memoizing construction of the schema type graph.
//!
//! Every named type is keyed by its schema name in the [`TypeRegistry`]. Before a type is mapped
//! its name is reserved as pending; any reference to it from underneath (a self-referential field,
//! a mutually recursive pair) gets a [`MappedSlot::Forward`] instead of recursing again. Once the
//! mapper returns, the entry is resolved and later references share the resolved type.

use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use apollo_compiler::ast;
use apollo_compiler::ast::FieldDefinition;
use apollo_compiler::ast::InputValueDefinition;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::collections::IndexSet;
use apollo_compiler::schema::ExtendedType;
use tracing::debug;
use tracing::trace;

use crate::bail;
use crate::config::TypeGraphConfig;
use crate::error::SingleTypeGraphError;
use crate::error::TypeGraphError;
use crate::graph::BuiltOperation;
use crate::graph::TypeGraph;
use crate::internal_error;
use crate::mapper::MapperChain;
use crate::mapper::Mapping;
use crate::mapper::TypeMapper;
use crate::naming::DefaultNamingStrategy;
use crate::naming::ID_TYPE;
use crate::naming::NamingStrategy;
use crate::operation::ArgumentDescriptor;
use crate::operation::Operation;
use crate::operation::OperationKind;
use crate::registry::MappedSlot;
use crate::registry::Namespace;
use crate::registry::SlotStatus;
use crate::registry::TypeReference;
use crate::registry::TypeRegistry;
use crate::resolve;
use crate::source::NormalizedType;
use crate::source::Normalizer;
use crate::source::SourceType;
use crate::source::TypeCatalog;
use crate::source::TypeDeclaration;
use crate::source::TypeDescriptor;
use crate::source::TypeKind;
use crate::utils::logging::snapshot;
use crate::value_mapper::JsonValueMapperFactory;
use crate::value_mapper::ValueMapperFactory;

/// Decides whether a built root field ends up in the published schema.
pub type FieldFilter = dyn Fn(&Operation, &FieldDefinition) -> bool + Send + Sync;

pub struct TypeGraphBuilder {
    catalog: Arc<TypeCatalog>,
    config: TypeGraphConfig,
    naming: Arc<dyn NamingStrategy>,
    chain: Arc<MapperChain>,
    value_mappers: Arc<dyn ValueMapperFactory>,
    field_filter: Option<Arc<FieldFilter>>,
    registry: TypeRegistry,
    /// One scope per type (or operation) under construction, innermost last.
    abstract_scopes: Vec<AbstractScope>,
}

/// Abstract descriptors met directly while mapping a type, plus the named types it refers to.
/// Referenced entries may still be pending when the scope closes, so their abstract types are
/// collected by walking the references once the operation is built.
#[derive(Default)]
struct AbstractScope {
    types: IndexSet<TypeDescriptor>,
    references: IndexSet<(Namespace, Name)>,
}

impl AbstractScope {
    fn absorb(&mut self, other: AbstractScope) {
        self.types.extend(other.types);
        self.references.extend(other.references);
    }
}

impl TypeGraphBuilder {
    pub fn new(catalog: impl Into<Arc<TypeCatalog>>) -> Self {
        Self {
            catalog: catalog.into(),
            config: Default::default(),
            naming: Arc::new(DefaultNamingStrategy),
            chain: Arc::new(MapperChain::new()),
            value_mappers: Arc::new(JsonValueMapperFactory),
            field_filter: None,
            registry: TypeRegistry::new(),
            abstract_scopes: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: TypeGraphConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_naming_strategy(mut self, naming: impl NamingStrategy + 'static) -> Self {
        self.naming = Arc::new(naming);
        self
    }

    /// Adds a mapper ahead of every mapper already in the chain.
    pub fn with_mapper(mut self, mapper: impl TypeMapper + 'static) -> Self {
        Arc::make_mut(&mut self.chain).prepend(Arc::new(mapper));
        self
    }

    pub fn with_value_mapper_factory(
        mut self,
        factory: impl ValueMapperFactory + 'static,
    ) -> Self {
        self.value_mappers = Arc::new(factory);
        self
    }

    pub fn with_field_filter(
        mut self,
        filter: impl Fn(&Operation, &FieldDefinition) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.field_filter = Some(Arc::new(filter));
        self
    }

    /// Extends a previously published schema: its types are registered as resolved and kept in
    /// the result whether or not any operation reaches them.
    pub fn with_seed(mut self, schema: &Schema) -> Self {
        self.registry.seed(schema);
        self
    }

    pub fn catalog(&self) -> &Arc<TypeCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &TypeGraphConfig {
        &self.config
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn declaration(&self, name: &Name) -> Result<&TypeDeclaration, TypeGraphError> {
        self.catalog.get(name).ok_or_else(|| {
            SingleTypeGraphError::UnknownSourceType {
                type_name: name.to_string(),
            }
            .into()
        })
    }

    pub fn normalize(&self, descriptor: &TypeDescriptor) -> Result<NormalizedType, TypeGraphError> {
        Normalizer::new(&self.catalog, &self.config).normalize(descriptor)
    }

    pub fn resolve_member(&self, owner: &NormalizedType, member: &TypeDescriptor) -> TypeDescriptor {
        Normalizer::new(&self.catalog, &self.config).resolve_member(owner, member)
    }

    pub fn supertype_instances(&self, ty: &NormalizedType) -> Vec<SourceType> {
        Normalizer::new(&self.catalog, &self.config).supertype_instances(ty)
    }

    pub fn exact_subtype(&self, declared: &SourceType, concrete: &Name) -> Option<SourceType> {
        Normalizer::new(&self.catalog, &self.config).exact_subtype(declared, concrete)
    }

    /// Records that `slot` satisfies the composite type `composite` for the source type `source`.
    pub fn register_covariant(&mut self, composite: Name, source: TypeDescriptor, slot: MappedSlot) {
        self.registry
            .covariant_mut()
            .register(composite, source, slot);
    }

    pub fn to_output_type(
        &mut self,
        descriptor: &TypeDescriptor,
    ) -> Result<TypeReference, TypeGraphError> {
        self.to_type(descriptor, Namespace::Output)
    }

    pub fn to_input_type(
        &mut self,
        descriptor: &TypeDescriptor,
    ) -> Result<TypeReference, TypeGraphError> {
        self.to_type(descriptor, Namespace::Input)
    }

    #[cfg_attr(
        feature = "snapshot_tracing",
        tracing::instrument(skip_all, level = "trace", fields(descriptor = %descriptor, namespace = %namespace))
    )]
    pub fn to_type(
        &mut self,
        descriptor: &TypeDescriptor,
        namespace: Namespace,
    ) -> Result<TypeReference, TypeGraphError> {
        let normalized = self.normalize(descriptor)?;
        if normalized.is_abstract() {
            if let Some(scope) = self.abstract_scopes.last_mut() {
                scope.types.insert(normalized.descriptor().shape());
            }
        }

        let reference = if normalized.kind().is_named() {
            self.named_type(&normalized, namespace)?
        } else {
            match self.dispatch(&normalized, namespace)? {
                Mapping::Reference(reference) => reference,
                Mapping::Named(ty) => bail!(
                    "Wrapper type `{normalized}` was mapped to named type `{}`",
                    ty.name()
                ),
            }
        };

        // `Optional<T>` stays nullable even when annotated otherwise.
        Ok(if normalized.annotations().non_null && normalized.kind() != TypeKind::Optional {
            reference.non_null()
        } else {
            reference
        })
    }

    /// The schema name `ty` is registered under in `namespace`.
    pub fn type_name(
        &self,
        ty: &NormalizedType,
        namespace: Namespace,
    ) -> Result<Name, TypeGraphError> {
        match (ty.kind(), namespace) {
            (TypeKind::Id | TypeKind::Scalar, _) => self.naming.scalar_name(ty),
            (_, Namespace::Output) => self.naming.output_name(ty),
            (_, Namespace::Input) => self.naming.input_name(ty),
        }
    }

    fn named_type(
        &mut self,
        normalized: &NormalizedType,
        namespace: Namespace,
    ) -> Result<TypeReference, TypeGraphError> {
        let name = self.type_name(normalized, namespace)?;
        let shape = shape_of(normalized);
        match self.registry.status(namespace, &name) {
            SlotStatus::Resolved(ty) => {
                self.registry
                    .check_shape(namespace, &name, &shape, normalized.descriptor())?;
                self.record_reference(namespace, &name);
                return Ok(TypeReference::Named(MappedSlot::Resolved(ty)));
            }
            SlotStatus::Pending => {
                self.registry
                    .check_shape(namespace, &name, &shape, normalized.descriptor())?;
                trace!("Forward reference to `{name}` in the {namespace} namespace");
                self.record_reference(namespace, &name);
                return Ok(TypeReference::Named(MappedSlot::Forward(name)));
            }
            SlotStatus::Absent => {}
        }

        debug!("Mapping `{normalized}` to `{name}` in the {namespace} namespace");
        self.registry
            .reserve(namespace, name.clone(), shape, normalized.descriptor());
        self.abstract_scopes.push(Default::default());
        let mapping = self.dispatch(normalized, namespace);
        let scope = self.abstract_scopes.pop().unwrap_or_default();

        match mapping? {
            Mapping::Named(ty) => {
                if *ty.name() != name {
                    bail!(
                        "Type `{normalized}` was registered as `{name}` but mapped to `{}`",
                        ty.name()
                    );
                }
                self.registry.complete(
                    namespace,
                    &name,
                    ty.clone(),
                    scope.types,
                    scope.references,
                )?;
                self.record_reference(namespace, &name);
                if let (ExtendedType::Object(object), Namespace::Output) = (&ty, namespace) {
                    for interface in &object.implements_interfaces {
                        self.register_covariant(
                            interface.name.clone(),
                            normalized.descriptor().clone(),
                            MappedSlot::Resolved(ty.clone()),
                        );
                    }
                }
                Ok(TypeReference::Named(MappedSlot::Resolved(ty)))
            }
            Mapping::Reference(reference) => {
                // The descriptor was substituted by another type, so its own name stays unused.
                self.registry.release(namespace, &name);
                if let Some(parent) = self.abstract_scopes.last_mut() {
                    parent.absorb(scope);
                }
                Ok(reference)
            }
        }
    }

    fn record_reference(&mut self, namespace: Namespace, name: &Name) {
        if let Some(scope) = self.abstract_scopes.last_mut() {
            scope.references.insert((namespace, name.clone()));
        }
    }

    fn dispatch(
        &mut self,
        normalized: &NormalizedType,
        namespace: Namespace,
    ) -> Result<Mapping, TypeGraphError> {
        let chain = Arc::clone(&self.chain);
        let mapper = chain.select(normalized, namespace)?;
        mapper.map(normalized, namespace, self)
    }

    /// Builds the schema definition of a (non-injected) argument, resolving its type in the
    /// generic context of `owner`.
    pub fn argument_definition(
        &mut self,
        owner: Option<&NormalizedType>,
        argument: &ArgumentDescriptor,
    ) -> Result<Node<InputValueDefinition>, TypeGraphError> {
        let descriptor = match owner {
            Some(owner) => self.resolve_member(owner, &argument.ty),
            None => argument.ty.clone(),
        };
        let ty = self.to_input_type(&descriptor)?;
        let is_enum = self.normalize(&descriptor)?.kind() == TypeKind::Enum;
        Ok(Node::new(InputValueDefinition {
            description: argument.description.as_ref().map(|s| s.into()),
            name: argument.name.clone(),
            ty: Node::new(ty.to_ast_type()),
            default_value: argument
                .default_value
                .as_ref()
                .map(|value| Node::new(graphql_value(value, is_enum))),
            directives: Default::default(),
        }))
    }

    /// Builds every operation, then resolves the graph.
    #[cfg_attr(feature = "snapshot_tracing", tracing::instrument(skip_all))]
    pub fn build(
        mut self,
        operations: impl IntoIterator<Item = Operation>,
    ) -> Result<TypeGraph, TypeGraphError> {
        snapshot!(self.config, "type graph config");
        let mut built: IndexMap<(OperationKind, Name), BuiltOperation> = Default::default();
        for operation in operations {
            let key = (operation.kind, operation.name.clone());
            if built.contains_key(&key) {
                return Err(SingleTypeGraphError::DuplicateOperation {
                    name: operation.name,
                    kind: operation.kind.to_string(),
                }
                .into());
            }
            let operation = self.build_operation(operation)?;
            built.insert(key, operation);
        }
        resolve::finalize(self, built.into_values().collect())
    }

    fn build_operation(&mut self, operation: Operation) -> Result<BuiltOperation, TypeGraphError> {
        debug!("Building {} operation `{}`", operation.kind, operation.name);
        self.abstract_scopes.push(Default::default());
        let field = self.operation_field(&operation);
        let scope = self
            .abstract_scopes
            .pop()
            .ok_or_else(|| internal_error!("Abstract type scope stack is unbalanced"))?;
        let field = field?;
        let mut abstract_types = scope.types;
        abstract_types.extend(self.registry.reachable_abstract_types(&scope.references));
        let value_mapper = self
            .value_mappers
            .value_mapper(&abstract_types, &self.catalog);
        Ok(BuiltOperation {
            operation,
            field,
            abstract_types,
            value_mapper,
        })
    }

    fn operation_field(&mut self, operation: &Operation) -> Result<FieldDefinition, TypeGraphError> {
        let owner = operation
            .owner
            .as_ref()
            .map(|owner| self.normalize(owner))
            .transpose()?;
        let return_type = match &owner {
            Some(owner) => self.resolve_member(owner, &operation.return_type),
            None => operation.return_type.clone(),
        };
        let ty = self.to_output_type(&return_type)?;
        let arguments = operation
            .schema_arguments()
            .map(|argument| self.argument_definition(owner.as_ref(), argument))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FieldDefinition {
            description: operation.description.as_ref().map(|s| s.into()),
            name: operation.name.clone(),
            arguments,
            ty: ty.to_ast_type(),
            directives: Default::default(),
        })
    }

    pub(crate) fn into_parts(self) -> BuilderParts {
        BuilderParts {
            catalog: self.catalog,
            config: self.config,
            naming: self.naming,
            field_filter: self.field_filter,
            registry: self.registry,
        }
    }
}

pub(crate) struct BuilderParts {
    pub(crate) catalog: Arc<TypeCatalog>,
    pub(crate) config: TypeGraphConfig,
    pub(crate) naming: Arc<dyn NamingStrategy>,
    pub(crate) field_filter: Option<Arc<FieldFilter>>,
    pub(crate) registry: TypeRegistry,
}

/// Identifier types all share the `ID` scalar, whatever their underlying source type.
fn shape_of(ty: &NormalizedType) -> TypeDescriptor {
    match ty.kind() {
        TypeKind::Id => TypeDescriptor::named(ID_TYPE).id(),
        _ => ty.descriptor().shape(),
    }
}

/// Converts a JSON default value to a GraphQL literal. Strings become enum values when the
/// argument is an enum.
fn graphql_value(value: &serde_json::Value, is_enum: bool) -> ast::Value {
    match value {
        serde_json::Value::Null => ast::Value::Null,
        serde_json::Value::Bool(value) => ast::Value::Boolean(*value),
        serde_json::Value::Number(number) => {
            if number.is_f64() {
                let float = number.as_f64().unwrap_or_default();
                ast::Value::Float(ast::FloatValue::new_parsed(&format!("{float:?}")))
            } else {
                ast::Value::Int(ast::IntValue::new_parsed(&number.to_string()))
            }
        }
        serde_json::Value::String(value) if is_enum => match Name::new(value) {
            Ok(name) => ast::Value::Enum(name),
            Err(_) => ast::Value::String(value.clone()),
        },
        serde_json::Value::String(value) => ast::Value::String(value.clone()),
        serde_json::Value::Array(items) => ast::Value::List(
            items
                .iter()
                .map(|item| Node::new(graphql_value(item, is_enum)))
                .collect(),
        ),
        serde_json::Value::Object(fields) => ast::Value::Object(
            fields
                .iter()
                .filter_map(|(key, value)| {
                    Some((Name::new(key).ok()?, Node::new(graphql_value(value, false))))
                })
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::name;
    use serde_json::json;

    use super::*;
    use crate::source::FieldDeclaration;
    use crate::source::STRING_TYPE;

    fn catalog() -> TypeCatalog {
        TypeCatalog::new().with(
            TypeDeclaration::object(name!("Node"))
                .with_field(FieldDeclaration::new(
                    name!("id"),
                    TypeDescriptor::named(STRING_TYPE).id().non_null(),
                ))
                .with_field(FieldDeclaration::new(
                    name!("children"),
                    TypeDescriptor::list_of(TypeDescriptor::named(name!("Node"))),
                )),
        )
    }

    #[test]
    fn self_reference_is_a_forward_slot() {
        let mut builder = TypeGraphBuilder::new(catalog());
        let reference = builder
            .to_output_type(&TypeDescriptor::named(name!("Node")).non_null())
            .unwrap();
        assert_eq!(reference.to_ast_type().to_string(), "Node!");
        let MappedSlot::Resolved(ExtendedType::Object(node)) = reference.named_slot() else {
            panic!("expected a resolved object");
        };
        assert_eq!(node.fields["children"].ty.to_string(), "[Node]");
        assert!(builder.registry().pending().is_empty());
    }

    #[test]
    fn cache_hits_share_the_resolved_type() {
        let mut builder = TypeGraphBuilder::new(catalog());
        let first = builder
            .to_output_type(&TypeDescriptor::named(name!("Node")))
            .unwrap();
        let second = builder
            .to_output_type(&TypeDescriptor::named(name!("Node")).with_description("again"))
            .unwrap();
        let (
            MappedSlot::Resolved(ExtendedType::Object(first)),
            MappedSlot::Resolved(ExtendedType::Object(second)),
        ) = (first.named_slot(), second.named_slot())
        else {
            panic!("expected resolved objects");
        };
        assert!(first.ptr_eq(second));
    }

    #[test]
    fn default_values_are_converted() {
        assert_eq!(graphql_value(&json!(3), false).to_string(), "3");
        assert_eq!(graphql_value(&json!(1.0), false).to_string(), "1.0");
        assert_eq!(graphql_value(&json!("RED"), true).to_string(), "RED");
        assert_eq!(graphql_value(&json!("RED"), false).to_string(), r#""RED""#);
        assert!(matches!(
            graphql_value(&json!({"limit": 1, "not a name": 2}), false),
            ast::Value::Object(fields) if fields.len() == 1
        ));
    }
}
