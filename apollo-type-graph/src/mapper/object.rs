use std::sync::Arc;

use apollo_compiler::Node;
use apollo_compiler::collections::IndexSet;
use apollo_compiler::schema::ComponentName;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::InputObjectType;
use apollo_compiler::schema::ObjectType;

use super::Mapping;
use super::TypeMapper;
use super::declaration_of;
use super::input_fields;
use super::output_fields;
use super::type_description;
use crate::builder::TypeGraphBuilder;
use crate::error::TypeGraphError;
use crate::registry::Namespace;
use crate::source::NormalizedType;
use crate::source::TypeDescriptor;
use crate::source::TypeKind;

/// Maps every transitive supertype of `ty` that is exposed as an interface, returning their
/// names.
pub(super) fn interface_names(
    ty: &NormalizedType,
    builder: &mut TypeGraphBuilder,
) -> Result<IndexSet<ComponentName>, TypeGraphError> {
    let mut interfaces = IndexSet::default();
    for supertype in builder.supertype_instances(ty) {
        let descriptor = TypeDescriptor::new(supertype);
        if builder.normalize(&descriptor)?.kind() != TypeKind::Interface {
            continue;
        }
        let reference = builder.to_output_type(&descriptor)?;
        interfaces.insert(ComponentName::from(reference.named_slot().name().clone()));
    }
    Ok(interfaces)
}

/// Concrete (and abstract-as-object) types in the output namespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectMapper;

impl TypeMapper for ObjectMapper {
    fn supports(&self, ty: &NormalizedType, namespace: Namespace) -> bool {
        ty.kind() == TypeKind::Object && namespace == Namespace::Output
    }

    fn map(
        &self,
        ty: &NormalizedType,
        namespace: Namespace,
        builder: &mut TypeGraphBuilder,
    ) -> Result<Mapping, TypeGraphError> {
        let catalog = Arc::clone(builder.catalog());
        let declaration = declaration_of(&catalog, ty)?;
        let name = builder.type_name(ty, namespace)?;
        let fields = output_fields(ty, builder)?;
        let implements_interfaces = interface_names(ty, builder)?;
        Ok(Mapping::Named(ExtendedType::Object(Node::new(ObjectType {
            description: type_description(declaration),
            name,
            implements_interfaces,
            directives: Default::default(),
            fields,
        }))))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputObjectMapper;

impl TypeMapper for InputObjectMapper {
    fn supports(&self, ty: &NormalizedType, namespace: Namespace) -> bool {
        ty.kind() == TypeKind::Object && namespace == Namespace::Input
    }

    fn map(
        &self,
        ty: &NormalizedType,
        namespace: Namespace,
        builder: &mut TypeGraphBuilder,
    ) -> Result<Mapping, TypeGraphError> {
        let catalog = Arc::clone(builder.catalog());
        let declaration = declaration_of(&catalog, ty)?;
        let name = builder.type_name(ty, namespace)?;
        let fields = input_fields(ty, builder)?;
        Ok(Mapping::Named(ExtendedType::InputObject(Node::new(
            InputObjectType {
                description: type_description(declaration),
                name,
                directives: Default::default(),
                fields,
            },
        ))))
    }
}
