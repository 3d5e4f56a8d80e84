use std::sync::Arc;

use apollo_compiler::Node;
use apollo_compiler::collections::IndexSet;
use apollo_compiler::schema::ComponentName;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::InterfaceType;
use apollo_compiler::schema::UnionType;
use tracing::debug;

use super::Mapping;
use super::TypeMapper;
use super::declaration_of;
use super::object::interface_names;
use super::output_fields;
use super::type_description;
use crate::builder::TypeGraphBuilder;
use crate::error::TypeGraphError;
use crate::internal_error;
use crate::registry::Namespace;
use crate::source::NormalizedType;
use crate::source::TypeDescriptor;
use crate::source::TypeKind;

/// Unions built from a union hint. Every member is registered as satisfying the union.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnionMapper;

impl TypeMapper for UnionMapper {
    fn supports(&self, ty: &NormalizedType, namespace: Namespace) -> bool {
        ty.kind() == TypeKind::Union && namespace == Namespace::Output
    }

    fn map(
        &self,
        ty: &NormalizedType,
        namespace: Namespace,
        builder: &mut TypeGraphBuilder,
    ) -> Result<Mapping, TypeGraphError> {
        let hint = ty
            .annotations()
            .union
            .clone()
            .ok_or_else(|| internal_error!("Union type `{ty}` carries no union members"))?;
        let name = builder.type_name(ty, namespace)?;
        let mut members = IndexSet::default();
        for member in hint.members {
            let descriptor = builder.normalize(&TypeDescriptor::new(member))?;
            let reference = builder.to_output_type(descriptor.descriptor())?;
            let slot = reference.named_slot().clone();
            members.insert(ComponentName::from(slot.name().clone()));
            builder.register_covariant(name.clone(), descriptor.descriptor().clone(), slot);
        }
        Ok(Mapping::Named(ExtendedType::Union(Node::new(UnionType {
            description: ty.annotations().description.as_ref().map(|s| s.into()),
            name,
            directives: Default::default(),
            members,
        }))))
    }
}

/// Interfaces, with their fields and super-interfaces. With
/// [`discover_implementations`](crate::config::TypeGraphConfig::discover_implementations) on,
/// every concrete catalog subtype is mapped and registered as an implementation as well.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterfaceMapper;

impl TypeMapper for InterfaceMapper {
    fn supports(&self, ty: &NormalizedType, namespace: Namespace) -> bool {
        ty.kind() == TypeKind::Interface && namespace == Namespace::Output
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

        if builder.config().discover_implementations {
            for subtype in catalog.concrete_subtypes(ty.declared_name()) {
                let Some(exact) = builder.exact_subtype(&ty.descriptor().ty, &subtype.name) else {
                    debug!(
                        "`{}` does not implement `{ty}` for these type arguments",
                        subtype.name
                    );
                    continue;
                };
                let descriptor = builder.normalize(&TypeDescriptor::new(exact))?;
                let reference = builder.to_output_type(descriptor.descriptor())?;
                builder.register_covariant(
                    name.clone(),
                    descriptor.descriptor().clone(),
                    reference.named_slot().clone(),
                );
            }
        }

        Ok(Mapping::Named(ExtendedType::Interface(Node::new(
            InterfaceType {
                description: type_description(declaration),
                name,
                implements_interfaces,
                directives: Default::default(),
                fields,
            },
        ))))
    }
}
