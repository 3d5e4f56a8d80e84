//! Deterministic schema names for normalized descriptors.

use apollo_compiler::Name;
use apollo_compiler::name;
use itertools::Itertools;

use crate::error::TypeGraphError;
use crate::source::NormalizedType;
use crate::source::SourceType;
use crate::source::TypeDescriptor;
use crate::source::TypeKind;

pub const ID_TYPE: Name = name!("ID");
pub const INPUT_SUFFIX: &str = "Input";

/// Derives schema type names. Implementations must be deterministic: equal shapes must always
/// yield equal names.
pub trait NamingStrategy: Send + Sync {
    fn output_name(&self, ty: &NormalizedType) -> Result<Name, TypeGraphError>;

    fn input_name(&self, ty: &NormalizedType) -> Result<Name, TypeGraphError>;

    /// Names the scalar an `Id` or `Scalar` kind maps to. Scalars share one name across both
    /// namespaces.
    fn scalar_name(&self, ty: &NormalizedType) -> Result<Name, TypeGraphError>;
}

/// Uses the explicit name annotation when there is one, the union hint's name for unions, and the
/// declared name otherwise. Generic arguments are appended with `_` separators, so `Box<String>`
/// becomes `Box_String`.
#[derive(Debug, Clone, Default)]
pub struct DefaultNamingStrategy;

impl DefaultNamingStrategy {
    fn base_name(&self, ty: &NormalizedType) -> String {
        let annotations = ty.annotations();
        if let Some(name) = &annotations.name {
            return name.to_string();
        }
        if let Some(union) = &annotations.union {
            return union.name.to_string();
        }
        descriptor_name(ty.descriptor())
    }
}

fn descriptor_name(descriptor: &TypeDescriptor) -> String {
    if let Some(name) = &descriptor.annotations.name {
        return name.to_string();
    }
    match &descriptor.ty {
        SourceType::Declared { name, arguments } if arguments.is_empty() => name.to_string(),
        SourceType::Declared { name, arguments } => {
            format!("{name}_{}", arguments.iter().map(descriptor_name).join("_"))
        }
        SourceType::Array(element) => format!("{}Array", descriptor_name(element)),
        SourceType::Variable { name, .. } => name.to_string(),
        SourceType::Wildcard { .. } => "Any".to_owned(),
    }
}

impl NamingStrategy for DefaultNamingStrategy {
    fn output_name(&self, ty: &NormalizedType) -> Result<Name, TypeGraphError> {
        let name = self.base_name(ty);
        Name::new(&name).map_err(|error| TypeGraphError::invalid_name(ty, error))
    }

    fn input_name(&self, ty: &NormalizedType) -> Result<Name, TypeGraphError> {
        let mut name = self.base_name(ty);
        if !matches!(ty.kind(), TypeKind::Enum | TypeKind::Scalar | TypeKind::Id) {
            name.push_str(INPUT_SUFFIX);
        }
        Name::new(&name).map_err(|error| TypeGraphError::invalid_name(ty, error))
    }

    fn scalar_name(&self, ty: &NormalizedType) -> Result<Name, TypeGraphError> {
        if ty.kind() == TypeKind::Id {
            return Ok(ID_TYPE);
        }
        self.output_name(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TypeGraphConfig;
    use crate::source::Normalizer;
    use crate::source::STRING_TYPE;
    use crate::source::TypeCatalog;
    use crate::source::TypeDeclaration;
    use crate::source::TypeParameter;

    fn normalized(descriptor: TypeDescriptor) -> NormalizedType {
        let catalog = TypeCatalog::new()
            .with(
                TypeDeclaration::object(name!("Box"))
                    .with_type_parameter(TypeParameter::new(name!("T"))),
            )
            .with(TypeDeclaration::enumeration(
                name!("Color"),
                [name!("RED"), name!("GREEN")],
            ));
        let config = TypeGraphConfig::default();
        Normalizer::new(&catalog, &config)
            .normalize(&descriptor)
            .unwrap()
    }

    #[test]
    fn generic_arguments_are_part_of_the_name() {
        let strategy = DefaultNamingStrategy;
        let boxed = normalized(TypeDescriptor::generic(
            name!("Box"),
            [TypeDescriptor::list_of(TypeDescriptor::named(STRING_TYPE))],
        ));
        assert_eq!(strategy.output_name(&boxed).unwrap().as_str(), "Box_List_String");
        assert_eq!(strategy.input_name(&boxed).unwrap().as_str(), "Box_List_StringInput");
    }

    #[test]
    fn annotations_override_derived_names() {
        let strategy = DefaultNamingStrategy;
        let renamed = normalized(
            TypeDescriptor::generic(name!("Box"), [TypeDescriptor::named(STRING_TYPE)])
                .with_name(name!("StringBox")),
        );
        assert_eq!(strategy.output_name(&renamed).unwrap().as_str(), "StringBox");

        let id = normalized(TypeDescriptor::named(STRING_TYPE).id());
        assert_eq!(strategy.scalar_name(&id).unwrap().as_str(), "ID");
    }

    #[test]
    fn enums_keep_their_name_as_input() {
        let strategy = DefaultNamingStrategy;
        let color = normalized(TypeDescriptor::named(name!("Color")));
        assert_eq!(strategy.input_name(&color).unwrap().as_str(), "Color");
    }
}
