//! The seam to value (de)serialization. An execution engine needs to know, per operation, which
//! abstract types can show up in its results so it can record runtime type information for them.

use std::fmt::Debug;
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::collections::IndexSet;

use crate::source::TypeCatalog;
use crate::source::TypeDescriptor;

pub trait ValueMapper: Send + Sync + Debug {
    /// Abstract source types this mapper was configured for, each with the concrete types values
    /// of it may have.
    fn polymorphic_types(&self) -> &IndexMap<Name, IndexSet<Name>>;
}

pub trait ValueMapperFactory: Send + Sync {
    fn value_mapper(
        &self,
        abstract_types: &IndexSet<TypeDescriptor>,
        catalog: &TypeCatalog,
    ) -> Arc<dyn ValueMapper>;
}

#[derive(Debug, Clone, Default)]
pub struct JsonValueMapperFactory;

impl ValueMapperFactory for JsonValueMapperFactory {
    fn value_mapper(
        &self,
        abstract_types: &IndexSet<TypeDescriptor>,
        catalog: &TypeCatalog,
    ) -> Arc<dyn ValueMapper> {
        let mut polymorphic_types = IndexMap::default();
        for descriptor in abstract_types {
            let concretes = match &descriptor.annotations.union {
                Some(union) => union
                    .members
                    .iter()
                    .filter_map(|member| member.declared_name().cloned())
                    .collect::<IndexSet<_>>(),
                None => match descriptor.ty.declared_name() {
                    Some(name) => catalog
                        .concrete_subtypes(name)
                        .map(|declaration| declaration.name.clone())
                        .collect(),
                    None => continue,
                },
            };
            let key = descriptor
                .annotations
                .union
                .as_ref()
                .map(|union| &union.name)
                .or(descriptor.ty.declared_name());
            if let Some(key) = key {
                polymorphic_types.insert(key.clone(), concretes);
            }
        }
        Arc::new(JsonValueMapper { polymorphic_types })
    }
}

/// Records, for every abstract type an operation can return, the concrete catalog types its
/// values may have.
#[derive(Debug, Clone, Default)]
pub struct JsonValueMapper {
    polymorphic_types: IndexMap<Name, IndexSet<Name>>,
}

impl ValueMapper for JsonValueMapper {
    fn polymorphic_types(&self) -> &IndexMap<Name, IndexSet<Name>> {
        &self.polymorphic_types
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::name;

    use super::*;
    use crate::source::SourceType;
    use crate::source::TypeDeclaration;

    #[test]
    fn records_concrete_types_of_abstract_types() {
        let catalog = TypeCatalog::new()
            .with(TypeDeclaration::interface(name!("Pet")))
            .with(
                TypeDeclaration::object(name!("Dog"))
                    .with_supertype(SourceType::declared(name!("Pet"))),
            )
            .with(
                TypeDeclaration::object(name!("Cat"))
                    .with_supertype(SourceType::declared(name!("Pet"))),
            );
        let abstract_types = IndexSet::from_iter([
            TypeDescriptor::named(name!("Pet")),
            TypeDescriptor::named(name!("Pet")).as_union(
                name!("Canine"),
                [SourceType::declared(name!("Dog"))],
            ),
        ]);
        let mapper = JsonValueMapperFactory.value_mapper(&abstract_types, &catalog);
        let polymorphic = mapper.polymorphic_types();
        assert_eq!(
            polymorphic["Pet"].iter().collect::<Vec<_>>(),
            [&name!("Dog"), &name!("Cat")]
        );
        assert_eq!(
            polymorphic["Canine"].iter().collect::<Vec<_>>(),
            [&name!("Dog")]
        );
    }
}
