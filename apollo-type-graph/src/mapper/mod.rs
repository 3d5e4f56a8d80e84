//! The mapper chain: an ordered list of strategies turning one normalized descriptor into a schema
//! type, or into another descriptor to map instead.
//!
//! Selection is first match wins and only looks at the precomputed kind tag and the namespace.
//! Mappers recurse into the builder for nested types, never into each other.

use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast::FieldDefinition;
use apollo_compiler::ast::InputValueDefinition;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::schema::Component;
use apollo_compiler::schema::ExtendedType;

use crate::builder::TypeGraphBuilder;
use crate::error::SingleTypeGraphError;
use crate::error::TypeGraphError;
use crate::registry::Namespace;
use crate::registry::TypeReference;
use crate::source::FieldDeclaration;
use crate::source::NormalizedType;
use crate::source::TypeCatalog;
use crate::source::TypeDeclaration;
use crate::source::TypeDescriptor;

mod composite;
mod object;
mod scalar;
mod wrapper;

pub use composite::InterfaceMapper;
pub use composite::UnionMapper;
pub use object::InputObjectMapper;
pub use object::ObjectMapper;
pub use scalar::EnumMapper;
pub use scalar::IdMapper;
pub use scalar::ScalarMapper;
pub use wrapper::ListMapper;
pub use wrapper::MapAdapter;
pub use wrapper::OptionalAdapter;

/// What a mapper produced.
#[derive(Debug, Clone, derive_more::From)]
pub enum Mapping {
    /// A schema type, owned by the registry under the descriptor's computed name.
    Named(ExtendedType),
    /// A reference to some other type, for wrappers and adapters that substitute a different
    /// descriptor.
    Reference(TypeReference),
}

pub trait TypeMapper: Send + Sync {
    fn supports(&self, ty: &NormalizedType, namespace: Namespace) -> bool;

    fn map(
        &self,
        ty: &NormalizedType,
        namespace: Namespace,
        builder: &mut TypeGraphBuilder,
    ) -> Result<Mapping, TypeGraphError>;
}

#[derive(Clone)]
pub struct MapperChain {
    mappers: Vec<Arc<dyn TypeMapper>>,
}

impl Default for MapperChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MapperChain {
    /// The default strategies, in order.
    pub fn new() -> Self {
        Self {
            mappers: vec![
                Arc::new(IdMapper),
                Arc::new(ScalarMapper),
                Arc::new(EnumMapper),
                Arc::new(OptionalAdapter),
                Arc::new(MapAdapter),
                Arc::new(ListMapper),
                Arc::new(UnionMapper),
                Arc::new(InterfaceMapper),
                Arc::new(ObjectMapper),
                Arc::new(InputObjectMapper),
            ],
        }
    }

    pub fn prepend(&mut self, mapper: Arc<dyn TypeMapper>) {
        self.mappers.insert(0, mapper);
    }

    pub fn select(
        &self,
        ty: &NormalizedType,
        namespace: Namespace,
    ) -> Result<&Arc<dyn TypeMapper>, TypeGraphError> {
        self.mappers
            .iter()
            .find(|mapper| mapper.supports(ty, namespace))
            .ok_or_else(|| {
                SingleTypeGraphError::NoMapperFound {
                    source_type: ty.to_string(),
                    namespace,
                }
                .into()
            })
    }
}

fn declaration_of<'a>(
    catalog: &'a TypeCatalog,
    ty: &NormalizedType,
) -> Result<&'a TypeDeclaration, TypeGraphError> {
    catalog.get(ty.declared_name()).ok_or_else(|| {
        SingleTypeGraphError::UnknownSourceType {
            type_name: ty.declared_name().to_string(),
        }
        .into()
    })
}

/// Every field of `ty`, its own first, then those inherited from its supertypes in order. Each
/// field is resolved in the generic context of the type that declares it. An inherited field is
/// skipped when a nearer type already declares a field with the same name.
fn declared_fields(
    ty: &NormalizedType,
    builder: &TypeGraphBuilder,
) -> Result<Vec<(FieldDeclaration, TypeDescriptor, NormalizedType)>, TypeGraphError> {
    let catalog = Arc::clone(builder.catalog());
    let mut owners = vec![ty.clone()];
    for supertype in builder.supertype_instances(ty) {
        owners.push(builder.normalize(&TypeDescriptor::new(supertype))?);
    }

    let mut fields: IndexMap<Name, (FieldDeclaration, TypeDescriptor, NormalizedType)> =
        IndexMap::default();
    for owner in owners {
        let declaration = declaration_of(&catalog, &owner)?;
        for field in &declaration.fields {
            if fields.contains_key(&field.name) {
                continue;
            }
            let field_type = builder.resolve_member(&owner, &field.ty);
            fields.insert(
                field.name.clone(),
                (field.clone(), field_type, owner.clone()),
            );
        }
    }
    Ok(fields.into_values().collect())
}

pub(crate) fn output_fields(
    ty: &NormalizedType,
    builder: &mut TypeGraphBuilder,
) -> Result<IndexMap<Name, Component<FieldDefinition>>, TypeGraphError> {
    let mut fields = IndexMap::default();
    for (field, field_type, owner) in declared_fields(ty, builder)? {
        let reference = builder.to_output_type(&field_type)?;
        let arguments = field
            .arguments
            .iter()
            .filter(|argument| !argument.is_injected())
            .map(|argument| builder.argument_definition(Some(&owner), argument))
            .collect::<Result<Vec<_>, _>>()?;
        fields.insert(
            field.name.clone(),
            Component::new(FieldDefinition {
                description: field.description.as_ref().map(|s| s.into()),
                name: field.name.clone(),
                arguments,
                ty: reference.to_ast_type(),
                directives: Default::default(),
            }),
        );
    }
    Ok(fields)
}

pub(crate) fn input_fields(
    ty: &NormalizedType,
    builder: &mut TypeGraphBuilder,
) -> Result<IndexMap<Name, Component<InputValueDefinition>>, TypeGraphError> {
    let mut fields = IndexMap::default();
    for (field, field_type, _) in declared_fields(ty, builder)? {
        let reference = builder.to_input_type(&field_type)?;
        fields.insert(
            field.name.clone(),
            Component::new(InputValueDefinition {
                description: field.description.as_ref().map(|s| s.into()),
                name: field.name.clone(),
                ty: Node::new(reference.to_ast_type()),
                default_value: None,
                directives: Default::default(),
            }),
        );
    }
    Ok(fields)
}

fn type_description(declaration: &TypeDeclaration) -> Option<Node<str>> {
    declaration.description.as_ref().map(|s| s.into())
}

#[cfg(test)]
mod tests {
    use apollo_compiler::name;

    use super::*;
    use crate::config::TypeGraphConfig;
    use crate::source::Normalizer;

    fn normalized(descriptor: TypeDescriptor) -> NormalizedType {
        let catalog = TypeCatalog::new().with(TypeDeclaration::interface(name!("Pet")));
        Normalizer::new(&catalog, &TypeGraphConfig::default())
            .normalize(&descriptor)
            .unwrap()
    }

    #[test]
    fn composites_have_no_input_mapper() {
        let chain = MapperChain::new();
        let pet = normalized(TypeDescriptor::named(name!("Pet")));
        assert!(chain.select(&pet, Namespace::Output).is_ok());
        let Err(error) = chain.select(&pet, Namespace::Input) else {
            panic!("interfaces cannot be input types");
        };
        insta::assert_snapshot!(error, @"No type mapper found for type `Pet` in the input namespace");
    }
}
