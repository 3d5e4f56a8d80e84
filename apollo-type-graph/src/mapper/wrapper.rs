use super::Mapping;
use super::TypeMapper;
use crate::builder::TypeGraphBuilder;
use crate::error::TypeGraphError;
use crate::internal_error;
use crate::registry::Namespace;
use crate::source::MAP_ENTRY_TYPE;
use crate::source::NormalizedType;
use crate::source::TypeDescriptor;
use crate::source::TypeKind;

fn type_argument(ty: &NormalizedType, index: usize) -> Result<&TypeDescriptor, TypeGraphError> {
    ty.arguments()
        .get(index)
        .ok_or_else(|| internal_error!("Normalized type `{ty}` is missing type argument {index}"))
}

/// `Optional<T>` is `T`, always nullable.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionalAdapter;

impl TypeMapper for OptionalAdapter {
    fn supports(&self, ty: &NormalizedType, _namespace: Namespace) -> bool {
        ty.kind() == TypeKind::Optional
    }

    fn map(
        &self,
        ty: &NormalizedType,
        namespace: Namespace,
        builder: &mut TypeGraphBuilder,
    ) -> Result<Mapping, TypeGraphError> {
        let payload = type_argument(ty, 0)?;
        Ok(builder.to_type(payload, namespace)?.nullable().into())
    }
}

/// `Map<K, V>` is exposed as a list of `MapEntry<K, V>` key/value objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapAdapter;

impl TypeMapper for MapAdapter {
    fn supports(&self, ty: &NormalizedType, _namespace: Namespace) -> bool {
        ty.kind() == TypeKind::Map
    }

    fn map(
        &self,
        ty: &NormalizedType,
        namespace: Namespace,
        builder: &mut TypeGraphBuilder,
    ) -> Result<Mapping, TypeGraphError> {
        let entries = TypeDescriptor::list_of(TypeDescriptor::generic(
            MAP_ENTRY_TYPE,
            [type_argument(ty, 0)?.clone(), type_argument(ty, 1)?.clone()],
        ));
        Ok(builder.to_type(&entries, namespace)?.into())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListMapper;

impl TypeMapper for ListMapper {
    fn supports(&self, ty: &NormalizedType, _namespace: Namespace) -> bool {
        ty.kind() == TypeKind::List
    }

    fn map(
        &self,
        ty: &NormalizedType,
        namespace: Namespace,
        builder: &mut TypeGraphBuilder,
    ) -> Result<Mapping, TypeGraphError> {
        let element = type_argument(ty, 0)?;
        Ok(builder.to_type(element, namespace)?.list().into())
    }
}
