//! The source side of the type graph: the declared domain types operations are written against,
//! and the descriptors that reference them.
//!
//! Nothing in here knows about GraphQL schema types. A [`TypeCatalog`] is filled in by whatever
//! discovers operations in the calling codebase, and the builder only ever reads it.

use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;

use apollo_compiler::Name;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::collections::IndexSet;
use apollo_compiler::name;
use itertools::Itertools;

use crate::operation::ArgumentDescriptor;

pub(crate) mod normalize;

pub use normalize::NormalizedType;
pub use normalize::Normalizer;
pub use normalize::TypeKind;

pub const STRING_TYPE: Name = name!("String");
pub const INT_TYPE: Name = name!("Int");
pub const FLOAT_TYPE: Name = name!("Float");
pub const BOOLEAN_TYPE: Name = name!("Boolean");
pub const JSON_TYPE: Name = name!("JSON");
pub const LIST_TYPE: Name = name!("List");
pub const OPTIONAL_TYPE: Name = name!("Optional");
pub const MAP_TYPE: Name = name!("Map");
pub const MAP_ENTRY_TYPE: Name = name!("MapEntry");

/// A reference to a domain type, before any normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceType {
    /// A type declared in the catalog, with its generic arguments (possibly none, possibly fewer
    /// than the declaration has parameters).
    Declared {
        name: Name,
        arguments: Vec<TypeDescriptor>,
    },
    /// An array of the element type.
    Array(Box<TypeDescriptor>),
    /// A type variable, with its upper bounds.
    Variable { name: Name, bounds: Vec<SourceType> },
    /// A bounded placeholder (`? super lower`, `? extends upper`).
    Wildcard {
        lower: Vec<SourceType>,
        upper: Vec<SourceType>,
    },
}

impl SourceType {
    pub fn declared(name: Name) -> Self {
        SourceType::Declared {
            name,
            arguments: Vec::new(),
        }
    }

    pub fn generic(name: Name, arguments: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        SourceType::Declared {
            name,
            arguments: arguments.into_iter().collect(),
        }
    }

    pub fn variable(name: Name) -> Self {
        SourceType::Variable {
            name,
            bounds: Vec::new(),
        }
    }

    /// The declared name, if this is a declared type.
    pub fn declared_name(&self) -> Option<&Name> {
        match self {
            SourceType::Declared { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn arguments(&self) -> &[TypeDescriptor] {
        match self {
            SourceType::Declared { arguments, .. } => arguments,
            _ => &[],
        }
    }

    /// Replaces type variables named in `parameters` by the matching `arguments`.
    pub(crate) fn substitute(&self, parameters: &[Name], arguments: &[TypeDescriptor]) -> Self {
        match self {
            SourceType::Declared { name, arguments: args } => SourceType::Declared {
                name: name.clone(),
                arguments: args
                    .iter()
                    .map(|arg| arg.substitute(parameters, arguments))
                    .collect(),
            },
            SourceType::Array(element) => {
                SourceType::Array(Box::new(element.substitute(parameters, arguments)))
            }
            SourceType::Variable { name, .. } => {
                match parameters.iter().position(|parameter| parameter == name) {
                    Some(index) if index < arguments.len() => arguments[index].ty.clone(),
                    _ => self.clone(),
                }
            }
            SourceType::Wildcard { lower, upper } => SourceType::Wildcard {
                lower: lower
                    .iter()
                    .map(|bound| bound.substitute(parameters, arguments))
                    .collect(),
                upper: upper
                    .iter()
                    .map(|bound| bound.substitute(parameters, arguments))
                    .collect(),
            },
        }
    }
}

impl Display for SourceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Declared { name, arguments } if arguments.is_empty() => write!(f, "{name}"),
            SourceType::Declared { name, arguments } => {
                write!(f, "{name}<{}>", arguments.iter().join(", "))
            }
            SourceType::Array(element) => write!(f, "{element}[]"),
            SourceType::Variable { name, .. } => write!(f, "{name}"),
            SourceType::Wildcard { lower, upper } => {
                f.write_str("?")?;
                if !lower.is_empty() {
                    write!(f, " super {}", lower.iter().join(" & "))?;
                }
                if !upper.is_empty() {
                    write!(f, " extends {}", upper.iter().join(" & "))?;
                }
                Ok(())
            }
        }
    }
}

/// An explicit union of member types, used in place of a declared abstract type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnionHint {
    pub name: Name,
    pub members: Vec<SourceType>,
}

/// Semantic annotations carried alongside a source type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Annotations {
    pub non_null: bool,
    /// The value is an identifier and maps to the `ID` scalar.
    pub id: bool,
    /// The type is exposed as an opaque scalar whatever its declaration says.
    pub scalar: bool,
    /// An abstract type is exposed as an interface.
    pub interface: bool,
    pub union: Option<UnionHint>,
    /// Explicit schema name, overriding the naming strategy's derived name.
    pub name: Option<Name>,
    pub description: Option<String>,
}

impl Annotations {
    /// `self` on top of `base`: flags are combined, explicit values in `self` win.
    pub(crate) fn overlay(&self, base: &Annotations) -> Annotations {
        Annotations {
            non_null: self.non_null || base.non_null,
            id: self.id || base.id,
            scalar: self.scalar || base.scalar,
            interface: self.interface || base.interface,
            union: self.union.clone().or_else(|| base.union.clone()),
            name: self.name.clone().or_else(|| base.name.clone()),
            description: self
                .description
                .clone()
                .or_else(|| base.description.clone()),
        }
    }

    fn shape(&self) -> Annotations {
        Annotations {
            non_null: false,
            description: None,
            ..self.clone()
        }
    }
}

/// A source type plus its annotations. This is the unit every builder operation takes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    pub ty: SourceType,
    pub annotations: Annotations,
}

impl TypeDescriptor {
    pub fn new(ty: SourceType) -> Self {
        Self {
            ty,
            annotations: Default::default(),
        }
    }

    pub fn named(name: Name) -> Self {
        Self::new(SourceType::declared(name))
    }

    pub fn generic(name: Name, arguments: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        Self::new(SourceType::generic(name, arguments))
    }

    pub fn list_of(element: TypeDescriptor) -> Self {
        Self::generic(LIST_TYPE, [element])
    }

    pub fn optional_of(payload: TypeDescriptor) -> Self {
        Self::generic(OPTIONAL_TYPE, [payload])
    }

    pub fn map_of(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        Self::generic(MAP_TYPE, [key, value])
    }

    pub fn array_of(element: TypeDescriptor) -> Self {
        Self::new(SourceType::Array(Box::new(element)))
    }

    pub fn variable(name: Name) -> Self {
        Self::new(SourceType::variable(name))
    }

    pub fn non_null(mut self) -> Self {
        self.annotations.non_null = true;
        self
    }

    pub fn id(mut self) -> Self {
        self.annotations.id = true;
        self
    }

    pub fn as_scalar(mut self) -> Self {
        self.annotations.scalar = true;
        self
    }

    pub fn as_interface(mut self) -> Self {
        self.annotations.interface = true;
        self
    }

    pub fn as_union(mut self, name: Name, members: impl IntoIterator<Item = SourceType>) -> Self {
        self.annotations.union = Some(UnionHint {
            name,
            members: members.into_iter().collect(),
        });
        self
    }

    pub fn with_name(mut self, name: Name) -> Self {
        self.annotations.name = Some(name);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.annotations.description = Some(description.into());
        self
    }

    /// The descriptor with its own nullability and description stripped. Descriptors with equal
    /// shapes map to the same schema type. Annotations on type arguments are kept, since they
    /// change the fields of the generated type.
    pub fn shape(&self) -> TypeDescriptor {
        TypeDescriptor {
            ty: self.ty.clone(),
            annotations: self.annotations.shape(),
        }
    }

    pub(crate) fn substitute(&self, parameters: &[Name], arguments: &[TypeDescriptor]) -> Self {
        if let SourceType::Variable { name, .. } = &self.ty {
            if let Some(argument) = parameters
                .iter()
                .position(|parameter| parameter == name)
                .and_then(|index| arguments.get(index))
            {
                return TypeDescriptor {
                    ty: argument.ty.clone(),
                    annotations: self.annotations.overlay(&argument.annotations),
                };
            }
        }
        TypeDescriptor {
            ty: self.ty.substitute(parameters, arguments),
            annotations: self.annotations.clone(),
        }
    }
}

impl Display for TypeDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.annotations.id {
            f.write_str("@Id ")?;
        }
        if self.annotations.scalar {
            f.write_str("@Scalar ")?;
        }
        if let Some(name) = &self.annotations.name {
            write!(f, "@Name({name}) ")?;
        }
        if let Some(union) = &self.annotations.union {
            write!(f, "@Union({}) ", union.name)?;
        }
        self.ty.fmt(f)?;
        if self.annotations.non_null {
            f.write_str("!")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    List,
    Optional,
    Map,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclarationKind {
    Scalar,
    Enum { values: Vec<Name> },
    /// A concrete type with fields.
    Object,
    /// A type with more than one possible concrete shape that is not itself an interface.
    Abstract,
    Interface,
    Container(ContainerKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParameter {
    pub name: Name,
    pub bounds: Vec<SourceType>,
}

impl TypeParameter {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            bounds: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDeclaration {
    pub name: Name,
    pub ty: TypeDescriptor,
    pub description: Option<String>,
    pub arguments: Vec<ArgumentDescriptor>,
}

impl FieldDeclaration {
    pub fn new(name: Name, ty: TypeDescriptor) -> Self {
        Self {
            name,
            ty,
            description: None,
            arguments: Vec::new(),
        }
    }

    pub fn with_argument(mut self, argument: ArgumentDescriptor) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDeclaration {
    pub name: Name,
    pub kind: DeclarationKind,
    pub type_parameters: Vec<TypeParameter>,
    /// Direct supertypes, expressed over this declaration's type parameters.
    pub supertypes: Vec<SourceType>,
    pub fields: Vec<FieldDeclaration>,
    pub description: Option<String>,
}

impl TypeDeclaration {
    pub fn new(name: Name, kind: DeclarationKind) -> Self {
        Self {
            name,
            kind,
            type_parameters: Vec::new(),
            supertypes: Vec::new(),
            fields: Vec::new(),
            description: None,
        }
    }

    pub fn object(name: Name) -> Self {
        Self::new(name, DeclarationKind::Object)
    }

    pub fn interface(name: Name) -> Self {
        Self::new(name, DeclarationKind::Interface)
    }

    pub fn abstract_type(name: Name) -> Self {
        Self::new(name, DeclarationKind::Abstract)
    }

    pub fn scalar(name: Name) -> Self {
        Self::new(name, DeclarationKind::Scalar)
    }

    pub fn enumeration(name: Name, values: impl IntoIterator<Item = Name>) -> Self {
        Self::new(
            name,
            DeclarationKind::Enum {
                values: values.into_iter().collect(),
            },
        )
    }

    pub fn with_type_parameter(mut self, parameter: TypeParameter) -> Self {
        self.type_parameters.push(parameter);
        self
    }

    pub fn with_supertype(mut self, supertype: SourceType) -> Self {
        self.supertypes.push(supertype);
        self
    }

    pub fn with_field(mut self, field: FieldDeclaration) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn parameter_names(&self) -> Vec<Name> {
        self.type_parameters
            .iter()
            .map(|parameter| parameter.name.clone())
            .collect()
    }

    /// Whether instances of this declaration can be the runtime type of a value.
    pub fn is_concrete(&self) -> bool {
        matches!(self.kind, DeclarationKind::Object)
    }
}

/// Every domain type operations may refer to, by name.
#[derive(Debug, Clone)]
pub struct TypeCatalog {
    declarations: IndexMap<Name, TypeDeclaration>,
}

impl Default for TypeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeCatalog {
    /// A catalog holding only the built-in scalars and containers.
    pub fn new() -> Self {
        let mut catalog = Self {
            declarations: Default::default(),
        };
        for scalar in [STRING_TYPE, INT_TYPE, FLOAT_TYPE, BOOLEAN_TYPE, JSON_TYPE] {
            catalog.declare(TypeDeclaration::scalar(scalar));
        }
        let t = name!("T");
        let k = name!("K");
        let v = name!("V");
        catalog.declare(
            TypeDeclaration::new(LIST_TYPE, DeclarationKind::Container(ContainerKind::List))
                .with_type_parameter(TypeParameter::new(t.clone())),
        );
        catalog.declare(
            TypeDeclaration::new(
                OPTIONAL_TYPE,
                DeclarationKind::Container(ContainerKind::Optional),
            )
            .with_type_parameter(TypeParameter::new(t)),
        );
        catalog.declare(
            TypeDeclaration::new(MAP_TYPE, DeclarationKind::Container(ContainerKind::Map))
                .with_type_parameter(TypeParameter::new(k.clone()))
                .with_type_parameter(TypeParameter::new(v.clone())),
        );
        catalog.declare(
            TypeDeclaration::object(MAP_ENTRY_TYPE)
                .with_type_parameter(TypeParameter::new(k.clone()))
                .with_type_parameter(TypeParameter::new(v.clone()))
                .with_field(FieldDeclaration::new(
                    name!("key"),
                    TypeDescriptor::variable(k).non_null(),
                ))
                .with_field(FieldDeclaration::new(
                    name!("value"),
                    TypeDescriptor::variable(v),
                )),
        );
        catalog
    }

    /// Adds or replaces a declaration.
    pub fn declare(&mut self, declaration: TypeDeclaration) -> &mut Self {
        self.declarations
            .insert(declaration.name.clone(), declaration);
        self
    }

    pub fn with(mut self, declaration: TypeDeclaration) -> Self {
        self.declare(declaration);
        self
    }

    pub fn get(&self, name: &str) -> Option<&TypeDeclaration> {
        self.declarations.get(name)
    }

    pub fn declarations(&self) -> impl Iterator<Item = &TypeDeclaration> {
        self.declarations.values()
    }

    /// The name itself plus every transitive supertype name, in discovery order. Unknown names
    /// yield only themselves.
    pub fn capabilities(&self, name: &Name) -> IndexSet<Name> {
        let mut seen = IndexSet::default();
        let mut stack = vec![name.clone()];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(declaration) = self.declarations.get(&current) {
                // Reverse so that the first declared supertype is visited first.
                for supertype in declaration.supertypes.iter().rev() {
                    if let Some(supertype_name) = supertype.declared_name() {
                        stack.push(supertype_name.clone());
                    }
                }
            }
        }
        seen
    }

    /// Concrete declarations that are subtypes of `name` (excluding `name` itself).
    pub fn concrete_subtypes(&self, name: &Name) -> impl Iterator<Item = &TypeDeclaration> {
        self.declarations.values().filter(move |declaration| {
            declaration.is_concrete()
                && declaration.name != *name
                && self.capabilities(&declaration.name).contains(name)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pets() -> TypeCatalog {
        TypeCatalog::new()
            .with(TypeDeclaration::interface(name!("Pet")))
            .with(
                TypeDeclaration::abstract_type(name!("Mammal"))
                    .with_supertype(SourceType::declared(name!("Pet"))),
            )
            .with(
                TypeDeclaration::object(name!("Dog"))
                    .with_supertype(SourceType::declared(name!("Mammal"))),
            )
            .with(
                TypeDeclaration::object(name!("Fish"))
                    .with_supertype(SourceType::declared(name!("Pet"))),
            )
    }

    #[test]
    fn capabilities_are_transitive() {
        let catalog = pets();
        let capabilities = catalog.capabilities(&name!("Dog"));
        assert_eq!(
            capabilities.into_iter().collect::<Vec<_>>(),
            vec![name!("Dog"), name!("Mammal"), name!("Pet")]
        );
        assert_eq!(
            catalog.capabilities(&name!("Unknown")).len(),
            1,
            "unknown names are only compatible with themselves"
        );
    }

    #[test]
    fn concrete_subtypes_skip_abstract_declarations() {
        let catalog = pets();
        let subtypes = catalog
            .concrete_subtypes(&name!("Pet"))
            .map(|declaration| declaration.name.clone())
            .collect::<Vec<_>>();
        assert_eq!(subtypes, vec![name!("Dog"), name!("Fish")]);
    }

    #[test]
    fn shape_ignores_presentation_annotations() {
        let plain = TypeDescriptor::list_of(TypeDescriptor::named(STRING_TYPE));
        let decorated = TypeDescriptor::list_of(TypeDescriptor::named(STRING_TYPE))
            .with_description("some strings")
            .non_null();
        assert_eq!(plain.shape(), decorated.shape());
        assert_ne!(
            plain.shape(),
            TypeDescriptor::list_of(TypeDescriptor::named(STRING_TYPE).id()).shape()
        );
        assert_ne!(
            plain.shape(),
            TypeDescriptor::list_of(TypeDescriptor::named(STRING_TYPE).non_null()).shape()
        );
    }

    #[test]
    fn substitution_overlays_member_annotations() {
        let member = TypeDescriptor::variable(name!("T")).non_null();
        let argument = TypeDescriptor::named(STRING_TYPE).with_description("payload");
        let substituted = member.substitute(&[name!("T")], &[argument]);
        assert_eq!(substituted.ty, SourceType::declared(STRING_TYPE));
        assert!(substituted.annotations.non_null);
        assert_eq!(
            substituted.annotations.description.as_deref(),
            Some("payload")
        );
    }

    #[test]
    fn source_type_display() {
        let ty = TypeDescriptor::map_of(
            TypeDescriptor::named(STRING_TYPE),
            TypeDescriptor::array_of(TypeDescriptor::named(INT_TYPE).non_null()),
        );
        assert_eq!(ty.to_string(), "Map<String, Int![]>");
    }
}
