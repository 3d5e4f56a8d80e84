use std::collections::VecDeque;
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::collections::IndexSet;
use tracing::debug;

use super::Annotations;
use super::ContainerKind;
use super::DeclarationKind;
use super::LIST_TYPE;
use super::SourceType;
use super::TypeCatalog;
use super::TypeDeclaration;
use super::TypeDescriptor;
use crate::config::TypeGraphConfig;
use crate::error::SingleTypeGraphError;
use crate::error::TypeGraphError;
use crate::internal_error;

/// The shape tag a normalized type is dispatched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum TypeKind {
    Id,
    Scalar,
    Enum,
    Object,
    Interface,
    Union,
    List,
    Optional,
    Map,
}

impl TypeKind {
    /// Wrapper kinds are never registered under a name of their own.
    pub fn is_named(self) -> bool {
        !matches!(self, TypeKind::List | TypeKind::Optional | TypeKind::Map)
    }
}

/// A descriptor in canonical form: a declared type whose generic arguments are all concrete,
/// with its kind and capability set computed once.
#[derive(Debug, Clone)]
pub struct NormalizedType {
    descriptor: TypeDescriptor,
    declared_name: Name,
    kind: TypeKind,
    is_abstract: bool,
    capabilities: Arc<IndexSet<Name>>,
}

impl NormalizedType {
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn annotations(&self) -> &Annotations {
        &self.descriptor.annotations
    }

    pub fn declared_name(&self) -> &Name {
        &self.declared_name
    }

    pub fn arguments(&self) -> &[TypeDescriptor] {
        self.descriptor.ty.arguments()
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Whether values of this type may have more than one concrete runtime shape.
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// The declared name and every transitive supertype name.
    pub fn capabilities(&self) -> &IndexSet<Name> {
        &self.capabilities
    }
}

impl Display for NormalizedType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.descriptor.fmt(f)
    }
}

/// Canonicalizes descriptors against a catalog. Has no side effects and never consults the
/// registry.
pub struct Normalizer<'a> {
    catalog: &'a TypeCatalog,
    config: &'a TypeGraphConfig,
}

impl<'a> Normalizer<'a> {
    pub fn new(catalog: &'a TypeCatalog, config: &'a TypeGraphConfig) -> Self {
        Self { catalog, config }
    }

    pub fn normalize(&self, descriptor: &TypeDescriptor) -> Result<NormalizedType, TypeGraphError> {
        let ty = self.canonical(&descriptor.ty, &mut Vec::new())?;
        let SourceType::Declared { name, .. } = &ty else {
            return Err(internal_error!(
                "Canonical form of `{descriptor}` is not a declared type"
            ));
        };
        let declaration = self.declaration(name)?;
        let (kind, is_abstract) = self.kind_of(declaration, &descriptor.annotations);
        let declared_name = name.clone();
        let capabilities = Arc::new(self.catalog.capabilities(&declared_name));
        Ok(NormalizedType {
            descriptor: TypeDescriptor {
                ty,
                annotations: descriptor.annotations.clone(),
            },
            declared_name,
            kind,
            is_abstract,
            capabilities,
        })
    }

    /// Substitutes the owner's generic arguments into a member declared against the owner's type
    /// parameters.
    pub fn resolve_member(&self, owner: &NormalizedType, member: &TypeDescriptor) -> TypeDescriptor {
        match self.catalog.get(owner.declared_name()) {
            Some(declaration) => {
                member.substitute(&declaration.parameter_names(), owner.arguments())
            }
            None => member.clone(),
        }
    }

    /// Every transitive supertype of `ty`, with generic arguments substituted, nearest first.
    pub fn supertype_instances(&self, ty: &NormalizedType) -> Vec<SourceType> {
        let mut instances = Vec::new();
        let mut seen = IndexSet::default();
        let mut queue = VecDeque::from([(ty.declared_name().clone(), ty.arguments().to_vec())]);
        while let Some((name, arguments)) = queue.pop_front() {
            let Some(declaration) = self.catalog.get(&name) else {
                continue;
            };
            let parameters = declaration.parameter_names();
            for supertype in &declaration.supertypes {
                let instance = supertype.substitute(&parameters, &arguments);
                if let SourceType::Declared {
                    name: supertype_name,
                    arguments: supertype_arguments,
                } = &instance
                {
                    if seen.insert(supertype_name.clone()) {
                        queue.push_back((supertype_name.clone(), supertype_arguments.clone()));
                        instances.push(instance);
                    }
                }
            }
        }
        instances
    }

    /// Narrows `declared` to the concrete declared type `concrete`, binding the concrete type's
    /// parameters from the declared arguments along its supertype path.
    ///
    /// Returns `None` when `concrete` is not a subtype of `declared`, or when some parameter of
    /// `concrete` is left unbound.
    pub fn exact_subtype(&self, declared: &SourceType, concrete: &Name) -> Option<SourceType> {
        let SourceType::Declared {
            name: declared_name,
            arguments: declared_arguments,
        } = declared
        else {
            return None;
        };
        let concrete_declaration = self.catalog.get(concrete)?;
        if concrete == declared_name {
            return Some(declared.clone());
        }
        let parameters = concrete_declaration.parameter_names();
        let identity = parameters
            .iter()
            .map(|parameter| TypeDescriptor::variable(parameter.clone()))
            .collect::<Vec<_>>();

        let mut seen = IndexSet::default();
        let mut queue = VecDeque::from([(concrete.clone(), identity)]);
        while let Some((name, arguments)) = queue.pop_front() {
            let Some(declaration) = self.catalog.get(&name) else {
                continue;
            };
            let declaration_parameters = declaration.parameter_names();
            for supertype in &declaration.supertypes {
                let SourceType::Declared {
                    name: supertype_name,
                    arguments: supertype_arguments,
                } = supertype.substitute(&declaration_parameters, &arguments)
                else {
                    continue;
                };
                if supertype_name == *declared_name {
                    let mut bindings = IndexMap::default();
                    if !unify(
                        &supertype_arguments,
                        declared_arguments,
                        &parameters,
                        &mut bindings,
                    ) {
                        continue;
                    }
                    let arguments = parameters
                        .iter()
                        .map(|parameter| bindings.get(parameter).cloned())
                        .collect::<Option<Vec<_>>>()?;
                    return Some(SourceType::Declared {
                        name: concrete.clone(),
                        arguments,
                    });
                }
                if seen.insert(supertype_name.clone()) {
                    queue.push_back((supertype_name, supertype_arguments));
                }
            }
        }
        None
    }

    fn declaration(&self, name: &Name) -> Result<&'a TypeDeclaration, TypeGraphError> {
        self.catalog.get(name).ok_or_else(|| {
            SingleTypeGraphError::UnknownSourceType {
                type_name: name.to_string(),
            }
            .into()
        })
    }

    fn kind_of(&self, declaration: &TypeDeclaration, annotations: &Annotations) -> (TypeKind, bool) {
        if annotations.id {
            return (TypeKind::Id, false);
        }
        if annotations.scalar {
            return (TypeKind::Scalar, false);
        }
        if annotations.union.is_some() {
            return (TypeKind::Union, true);
        }
        match &declaration.kind {
            DeclarationKind::Scalar => (TypeKind::Scalar, false),
            DeclarationKind::Enum { .. } => (TypeKind::Enum, false),
            DeclarationKind::Container(ContainerKind::List) => (TypeKind::List, false),
            DeclarationKind::Container(ContainerKind::Optional) => (TypeKind::Optional, false),
            DeclarationKind::Container(ContainerKind::Map) => (TypeKind::Map, false),
            DeclarationKind::Interface => (TypeKind::Interface, true),
            DeclarationKind::Abstract
                if annotations.interface || self.config.abstract_types_as_interfaces =>
            {
                (TypeKind::Interface, true)
            }
            DeclarationKind::Abstract => (TypeKind::Object, true),
            DeclarationKind::Object if annotations.interface => (TypeKind::Interface, true),
            DeclarationKind::Object => (TypeKind::Object, false),
        }
    }

    fn canonical_descriptor(
        &self,
        descriptor: &TypeDescriptor,
        resolving: &mut Vec<Name>,
    ) -> Result<TypeDescriptor, TypeGraphError> {
        Ok(TypeDescriptor {
            ty: self.canonical(&descriptor.ty, resolving)?,
            annotations: descriptor.annotations.clone(),
        })
    }

    fn canonical(
        &self,
        ty: &SourceType,
        resolving: &mut Vec<Name>,
    ) -> Result<SourceType, TypeGraphError> {
        match ty {
            SourceType::Array(element) => Ok(SourceType::Declared {
                name: LIST_TYPE,
                arguments: vec![self.canonical_descriptor(element, resolving)?],
            }),
            SourceType::Variable { name, bounds } => {
                // A bound that mentions the variable itself (`T extends Comparable<T>`) would
                // otherwise never bottom out.
                if resolving.contains(name) {
                    return self.unbounded(ty);
                }
                match bounds.first() {
                    Some(bound) => {
                        resolving.push(name.clone());
                        let canonical = self.canonical(bound, resolving);
                        resolving.pop();
                        canonical
                    }
                    None => self.unbounded(ty),
                }
            }
            SourceType::Wildcard { lower, upper } => match lower.first().or(upper.first()) {
                Some(bound) => self.canonical(bound, resolving),
                None => self.unbounded(ty),
            },
            SourceType::Declared { name, arguments } => {
                let declaration = self.declaration(name)?;
                let parameter_count = declaration.type_parameters.len();
                if arguments.len() > parameter_count {
                    return Err(SingleTypeGraphError::UnresolvableGenericType {
                        type_name: ty.to_string(),
                        message: format!(
                            "`{name}` declares {parameter_count} type parameter(s) but {} were given",
                            arguments.len()
                        ),
                    }
                    .into());
                }
                let mut canonical_arguments = arguments
                    .iter()
                    .map(|argument| self.canonical_descriptor(argument, resolving))
                    .collect::<Result<Vec<_>, _>>()?;
                if canonical_arguments.len() < parameter_count {
                    if !self.config.allow_raw_replacement {
                        return Err(SingleTypeGraphError::UnresolvableGenericType {
                            type_name: ty.to_string(),
                            message: "raw or incomplete generic types are not allowed".to_owned(),
                        }
                        .into());
                    }
                    debug!(
                        "Filling {} missing type argument(s) of `{ty}` with `{}`",
                        parameter_count - canonical_arguments.len(),
                        self.config.filler_type
                    );
                    canonical_arguments.resize(
                        parameter_count,
                        TypeDescriptor::named(self.config.filler_type.clone()),
                    );
                }
                Ok(SourceType::Declared {
                    name: name.clone(),
                    arguments: canonical_arguments,
                })
            }
        }
    }

    fn unbounded(&self, ty: &SourceType) -> Result<SourceType, TypeGraphError> {
        if !self.config.allow_unbounded_replacement {
            return Err(SingleTypeGraphError::UnresolvableGenericType {
                type_name: ty.to_string(),
                message: "unbounded type variables and wildcards are not allowed".to_owned(),
            }
            .into());
        }
        debug!("Replacing unbounded `{ty}` with `{}`", self.config.filler_type);
        self.declaration(&self.config.filler_type)?;
        Ok(SourceType::declared(self.config.filler_type.clone()))
    }
}

fn unify(
    pattern: &[TypeDescriptor],
    actual: &[TypeDescriptor],
    parameters: &[Name],
    bindings: &mut IndexMap<Name, TypeDescriptor>,
) -> bool {
    if pattern.is_empty() {
        // A raw supertype reference carries no information to bind from.
        return true;
    }
    if pattern.len() != actual.len() {
        return false;
    }
    pattern.iter().zip(actual).all(|(pattern, actual)| match &pattern.ty {
        SourceType::Variable { name, .. } if parameters.contains(name) => {
            match bindings.get(name) {
                Some(bound) => bound.shape() == actual.shape(),
                None => {
                    bindings.insert(name.clone(), actual.clone());
                    true
                }
            }
        }
        SourceType::Declared {
            name: pattern_name,
            arguments: pattern_arguments,
        } => match &actual.ty {
            SourceType::Declared {
                name: actual_name,
                arguments: actual_arguments,
            } if pattern_name == actual_name => {
                unify(pattern_arguments, actual_arguments, parameters, bindings)
            }
            _ => false,
        },
        other => *other == actual.ty,
    })
}

#[cfg(test)]
mod tests {
    use apollo_compiler::name;

    use super::*;
    use crate::source::FieldDeclaration;
    use crate::source::INT_TYPE;
    use crate::source::JSON_TYPE;
    use crate::source::STRING_TYPE;
    use crate::source::TypeParameter;

    fn catalog() -> TypeCatalog {
        TypeCatalog::new()
            .with(
                TypeDeclaration::interface(name!("Pet"))
                    .with_type_parameter(TypeParameter::new(name!("T"))),
            )
            .with(
                TypeDeclaration::object(name!("Dog"))
                    .with_type_parameter(TypeParameter::new(name!("U")))
                    .with_supertype(SourceType::generic(
                        name!("Pet"),
                        [TypeDescriptor::variable(name!("U"))],
                    )),
            )
            .with(
                TypeDeclaration::object(name!("Puppy"))
                    .with_supertype(SourceType::generic(
                        name!("Dog"),
                        [TypeDescriptor::named(INT_TYPE)],
                    )),
            )
            .with(TypeDeclaration::abstract_type(name!("Shape")))
            .with(
                TypeDeclaration::object(name!("Page"))
                    .with_type_parameter(TypeParameter::new(name!("T")))
                    .with_field(FieldDeclaration::new(
                        name!("items"),
                        TypeDescriptor::list_of(TypeDescriptor::variable(name!("T"))),
                    )),
            )
    }

    fn normalize_with(
        config: &TypeGraphConfig,
        descriptor: &TypeDescriptor,
    ) -> Result<NormalizedType, TypeGraphError> {
        let catalog = catalog();
        Normalizer::new(&catalog, config).normalize(descriptor)
    }

    #[test]
    fn arrays_become_lists() {
        let normalized = normalize_with(
            &TypeGraphConfig::default(),
            &TypeDescriptor::array_of(TypeDescriptor::named(STRING_TYPE)),
        )
        .unwrap();
        assert_eq!(normalized.kind(), TypeKind::List);
        assert_eq!(
            normalized.descriptor().ty,
            SourceType::generic(LIST_TYPE, [TypeDescriptor::named(STRING_TYPE)])
        );
    }

    #[test]
    fn bounded_placeholders_use_their_first_bound() {
        let config = TypeGraphConfig::default();
        let wildcard = TypeDescriptor::list_of(TypeDescriptor::new(SourceType::Wildcard {
            lower: vec![SourceType::declared(INT_TYPE)],
            upper: vec![SourceType::declared(STRING_TYPE)],
        }));
        let normalized = normalize_with(&config, &wildcard).unwrap();
        assert_eq!(
            normalized.arguments()[0].ty,
            SourceType::declared(INT_TYPE),
            "lower bounds win over upper bounds"
        );

        let variable = TypeDescriptor::new(SourceType::Variable {
            name: name!("T"),
            bounds: vec![SourceType::declared(STRING_TYPE), SourceType::declared(INT_TYPE)],
        });
        let normalized = normalize_with(&config, &variable).unwrap();
        assert_eq!(normalized.declared_name(), &STRING_TYPE);
    }

    #[test]
    fn self_referencing_bounds_terminate() {
        let variable = TypeDescriptor::new(SourceType::Variable {
            name: name!("T"),
            bounds: vec![SourceType::generic(
                name!("Page"),
                [TypeDescriptor::variable(name!("T"))],
            )],
        });
        let normalized = normalize_with(&TypeGraphConfig::default(), &variable).unwrap();
        assert_eq!(
            normalized.descriptor().ty,
            SourceType::generic(name!("Page"), [TypeDescriptor::named(JSON_TYPE)])
        );
    }

    #[test]
    fn gaps_are_filled_or_rejected_by_policy() {
        let raw = TypeDescriptor::named(name!("Page"));
        let normalized = normalize_with(&TypeGraphConfig::default(), &raw).unwrap();
        assert_eq!(
            normalized.arguments(),
            &[TypeDescriptor::named(JSON_TYPE)]
        );

        let strict = TypeGraphConfig {
            allow_raw_replacement: false,
            allow_unbounded_replacement: false,
            ..Default::default()
        };
        let error = normalize_with(&strict, &raw).unwrap_err();
        insta::assert_snapshot!(error, @"Type `Page` cannot be resolved: raw or incomplete generic types are not allowed");

        let unbounded = TypeDescriptor::list_of(TypeDescriptor::variable(name!("T")));
        let error = normalize_with(&strict, &unbounded).unwrap_err();
        insta::assert_snapshot!(error, @"Type `T` cannot be resolved: unbounded type variables and wildcards are not allowed");
    }

    #[test]
    fn too_many_arguments_are_rejected() {
        let descriptor = TypeDescriptor::generic(
            name!("Page"),
            [TypeDescriptor::named(INT_TYPE), TypeDescriptor::named(INT_TYPE)],
        );
        let error = normalize_with(&TypeGraphConfig::default(), &descriptor).unwrap_err();
        assert!(matches!(
            error.errors()[0],
            SingleTypeGraphError::UnresolvableGenericType { .. }
        ));
    }

    #[test]
    fn unknown_types_are_rejected() {
        let error = normalize_with(
            &TypeGraphConfig::default(),
            &TypeDescriptor::named(name!("Nope")),
        )
        .unwrap_err();
        insta::assert_snapshot!(error, @"Source type `Nope` is not declared in the type catalog");
    }

    #[test]
    fn kind_tags() {
        let config = TypeGraphConfig::default();
        let kind = |descriptor: TypeDescriptor| normalize_with(&config, &descriptor).unwrap().kind();
        assert_eq!(kind(TypeDescriptor::named(STRING_TYPE).id()), TypeKind::Id);
        assert_eq!(kind(TypeDescriptor::named(name!("Dog")).as_scalar()), TypeKind::Scalar);
        assert_eq!(kind(TypeDescriptor::named(name!("Shape"))), TypeKind::Object);
        assert_eq!(
            kind(TypeDescriptor::named(name!("Shape")).as_interface()),
            TypeKind::Interface
        );
        assert_eq!(
            kind(TypeDescriptor::named(name!("Shape")).as_union(name!("AnyShape"), [])),
            TypeKind::Union
        );

        let interfaces = TypeGraphConfig {
            abstract_types_as_interfaces: true,
            ..Default::default()
        };
        let shape = normalize_with(&interfaces, &TypeDescriptor::named(name!("Shape"))).unwrap();
        assert_eq!(shape.kind(), TypeKind::Interface);
        assert!(shape.is_abstract());
    }

    #[test]
    fn members_are_resolved_in_the_owner_context() {
        let catalog = catalog();
        let config = TypeGraphConfig::default();
        let normalizer = Normalizer::new(&catalog, &config);
        let owner = normalizer
            .normalize(&TypeDescriptor::generic(
                name!("Page"),
                [TypeDescriptor::named(INT_TYPE).non_null()],
            ))
            .unwrap();
        let items = &catalog.get("Page").unwrap().fields[0];
        let member = normalizer.resolve_member(&owner, &items.ty);
        assert_eq!(
            member,
            TypeDescriptor::list_of(TypeDescriptor::named(INT_TYPE).non_null())
        );
    }

    #[test]
    fn supertype_instances_are_substituted() {
        let catalog = catalog();
        let config = TypeGraphConfig::default();
        let normalizer = Normalizer::new(&catalog, &config);
        let puppy = normalizer
            .normalize(&TypeDescriptor::named(name!("Puppy")))
            .unwrap();
        assert_eq!(
            normalizer.supertype_instances(&puppy),
            vec![
                SourceType::generic(name!("Dog"), [TypeDescriptor::named(INT_TYPE)]),
                SourceType::generic(name!("Pet"), [TypeDescriptor::named(INT_TYPE)]),
            ]
        );
    }

    #[test]
    fn exact_subtype_binds_parameters() {
        let catalog = catalog();
        let config = TypeGraphConfig::default();
        let normalizer = Normalizer::new(&catalog, &config);
        let declared = SourceType::generic(name!("Pet"), [TypeDescriptor::named(STRING_TYPE)]);

        assert_eq!(
            normalizer.exact_subtype(&declared, &name!("Dog")),
            Some(SourceType::generic(
                name!("Dog"),
                [TypeDescriptor::named(STRING_TYPE)]
            ))
        );
        assert_eq!(
            normalizer.exact_subtype(&declared, &name!("Puppy")),
            None,
            "a Puppy is only a Pet<Int>"
        );
        assert_eq!(
            normalizer.exact_subtype(
                &SourceType::generic(name!("Pet"), [TypeDescriptor::named(INT_TYPE)]),
                &name!("Puppy")
            ),
            Some(SourceType::declared(name!("Puppy")))
        );
        assert_eq!(normalizer.exact_subtype(&declared, &name!("Page")), None);
    }
}
