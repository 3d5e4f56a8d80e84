use std::sync::Arc;

use apollo_compiler::Node;
use apollo_compiler::schema::Component;
use apollo_compiler::schema::EnumType;
use apollo_compiler::schema::EnumValueDefinition;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::ScalarType;

use super::Mapping;
use super::TypeMapper;
use super::declaration_of;
use super::type_description;
use crate::builder::TypeGraphBuilder;
use crate::error::TypeGraphError;
use crate::internal_error;
use crate::registry::Namespace;
use crate::source::DeclarationKind;
use crate::source::NormalizedType;
use crate::source::TypeKind;

/// Identifier-annotated values, whatever their source type, map to the built-in `ID` scalar.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdMapper;

impl TypeMapper for IdMapper {
    fn supports(&self, ty: &NormalizedType, _namespace: Namespace) -> bool {
        ty.kind() == TypeKind::Id
    }

    fn map(
        &self,
        ty: &NormalizedType,
        namespace: Namespace,
        builder: &mut TypeGraphBuilder,
    ) -> Result<Mapping, TypeGraphError> {
        Ok(Mapping::Named(ExtendedType::Scalar(Node::new(ScalarType {
            description: None,
            name: builder.type_name(ty, namespace)?,
            directives: Default::default(),
        }))))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarMapper;

impl TypeMapper for ScalarMapper {
    fn supports(&self, ty: &NormalizedType, _namespace: Namespace) -> bool {
        ty.kind() == TypeKind::Scalar
    }

    fn map(
        &self,
        ty: &NormalizedType,
        namespace: Namespace,
        builder: &mut TypeGraphBuilder,
    ) -> Result<Mapping, TypeGraphError> {
        let catalog = Arc::clone(builder.catalog());
        let declaration = declaration_of(&catalog, ty)?;
        Ok(Mapping::Named(ExtendedType::Scalar(Node::new(ScalarType {
            description: type_description(declaration),
            name: builder.type_name(ty, namespace)?,
            directives: Default::default(),
        }))))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EnumMapper;

impl TypeMapper for EnumMapper {
    fn supports(&self, ty: &NormalizedType, _namespace: Namespace) -> bool {
        ty.kind() == TypeKind::Enum
    }

    fn map(
        &self,
        ty: &NormalizedType,
        namespace: Namespace,
        builder: &mut TypeGraphBuilder,
    ) -> Result<Mapping, TypeGraphError> {
        let catalog = Arc::clone(builder.catalog());
        let declaration = declaration_of(&catalog, ty)?;
        let DeclarationKind::Enum { values } = &declaration.kind else {
            return Err(internal_error!(
                "Type `{ty}` was tagged as an enum but is declared as {:?}",
                declaration.kind
            ));
        };
        Ok(Mapping::Named(ExtendedType::Enum(Node::new(EnumType {
            description: type_description(declaration),
            name: builder.type_name(ty, namespace)?,
            directives: Default::default(),
            values: values
                .iter()
                .map(|value| {
                    (
                        value.clone(),
                        Component::new(EnumValueDefinition {
                            description: None,
                            value: value.clone(),
                            directives: Default::default(),
                        }),
                    )
                })
                .collect(),
        }))))
    }
}
