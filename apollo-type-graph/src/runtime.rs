//! Execution-time resolution of the concrete schema type of a value returned for a field of
//! interface or union type.

use std::fmt;
use std::fmt::Display;
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::schema::ExtendedType;
use tracing::trace;

use crate::error::TypeResolutionError;
use crate::graph::TypeGraph;
use crate::registry::CovariantEntry;
use crate::registry::Lookup;
use crate::source::SourceType;
use crate::source::TypeDescriptor;

/// A `Type.field` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldCoordinate {
    pub type_name: Name,
    pub field_name: Name,
}

impl FieldCoordinate {
    pub fn new(type_name: Name, field_name: Name) -> Self {
        Self {
            type_name,
            field_name,
        }
    }
}

impl Display for FieldCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.field_name)
    }
}

/// One value to resolve.
#[derive(Debug, Clone, Copy)]
pub struct TypeResolutionRequest<'a> {
    /// The interface or union the field is declared with.
    pub declared: &'a Name,
    /// The source type of the value, as reported by the value mapper.
    pub runtime_type: &'a Name,
    pub field: Option<&'a FieldCoordinate>,
    pub value: &'a serde_json::Value,
}

/// What a [`TypeResolutionHint`] gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct TypeResolutionEnvironment<'a> {
    pub request: &'a TypeResolutionRequest<'a>,
    pub candidates: &'a [&'a CovariantEntry],
    pub graph: &'a TypeGraph,
}

/// Picks a schema type name when more than one is compatible with a value.
pub trait TypeResolutionHint: Send + Sync {
    fn resolve(&self, environment: &TypeResolutionEnvironment<'_>) -> Option<Name>;
}

impl<F> TypeResolutionHint for F
where
    F: Fn(&TypeResolutionEnvironment<'_>) -> Option<Name> + Send + Sync,
{
    fn resolve(&self, environment: &TypeResolutionEnvironment<'_>) -> Option<Name> {
        self(environment)
    }
}

/// Read-only over a published [`TypeGraph`]; safe to share and call from any number of threads.
#[derive(Clone)]
pub struct RuntimeTypeResolver {
    graph: TypeGraph,
    type_hints: IndexMap<Name, Arc<dyn TypeResolutionHint>>,
    field_hints: IndexMap<FieldCoordinate, Arc<dyn TypeResolutionHint>>,
}

impl RuntimeTypeResolver {
    pub fn new(graph: TypeGraph) -> Self {
        Self {
            graph,
            type_hints: Default::default(),
            field_hints: Default::default(),
        }
    }

    /// A hint consulted for ambiguous values whose runtime source type, or whose declared
    /// composite type, is `type_name`.
    pub fn with_type_hint(
        mut self,
        type_name: Name,
        hint: impl TypeResolutionHint + 'static,
    ) -> Self {
        self.type_hints.insert(type_name, Arc::new(hint));
        self
    }

    pub fn with_field_hint(
        mut self,
        field: FieldCoordinate,
        hint: impl TypeResolutionHint + 'static,
    ) -> Self {
        self.field_hints.insert(field, Arc::new(hint));
        self
    }

    pub fn graph(&self) -> &TypeGraph {
        &self.graph
    }

    pub fn resolve_type(
        &self,
        request: &TypeResolutionRequest<'_>,
    ) -> Result<&ExtendedType, TypeResolutionError> {
        let candidates = match self
            .graph
            .candidates(request.declared, request.runtime_type)
        {
            Lookup::Found(entry) => {
                if let Some(ty) = self.entry_type(entry) {
                    return Ok(ty);
                }
                return Err(self.unresolvable(request));
            }
            Lookup::NotFound => {
                return self
                    .own_type(request.runtime_type)
                    .ok_or_else(|| self.unresolvable(request));
            }
            Lookup::Ambiguous(candidates) => candidates,
        };
        trace!(
            "{} candidates for `{}` as `{}`",
            candidates.len(),
            request.runtime_type,
            request.declared
        );

        let environment = TypeResolutionEnvironment {
            request,
            candidates: &candidates,
            graph: &self.graph,
        };
        let hints = request
            .field
            .and_then(|field| self.field_hints.get(field))
            .into_iter()
            .chain(self.type_hints.get(request.runtime_type))
            .chain(self.type_hints.get(request.declared));
        for hint in hints {
            if let Some(ty) = hint
                .resolve(&environment)
                .and_then(|name| self.object_type(&name))
            {
                return Ok(ty);
            }
        }

        self.exact_type(request)
            .ok_or_else(|| self.unresolvable(request))
    }

    fn entry_type(&self, entry: &CovariantEntry) -> Option<&ExtendedType> {
        match entry.slot.as_resolved() {
            Some(_) => self.object_type(entry.name()),
            None => None,
        }
    }

    fn object_type(&self, name: &str) -> Option<&ExtendedType> {
        self.graph
            .get_type(name)
            .filter(|ty| matches!(ty, ExtendedType::Object(_)))
    }

    /// The type generated for the runtime type on its own.
    fn own_type(&self, runtime_type: &Name) -> Option<&ExtendedType> {
        let name = self
            .graph
            .output_name(&TypeDescriptor::named(runtime_type.clone()))
            .ok()?;
        self.object_type(&name)
    }

    /// Narrows the declared type's source descriptor to the runtime type, keeping its generic
    /// arguments, and looks up the type generated for exactly that.
    fn exact_type(&self, request: &TypeResolutionRequest<'_>) -> Option<&ExtendedType> {
        let descriptor = self.graph.source_descriptor(request.declared)?;
        let SourceType::Declared { .. } = &descriptor.ty else {
            return None;
        };
        let exact = self
            .graph
            .exact_subtype(&descriptor.ty, request.runtime_type)?;
        let name = self.graph.output_name(&TypeDescriptor::new(exact)).ok()?;
        self.object_type(&name)
    }

    fn unresolvable(&self, request: &TypeResolutionRequest<'_>) -> TypeResolutionError {
        TypeResolutionError::UnresolvableType {
            declared: request.declared.clone(),
            value: request.value.clone(),
        }
    }
}
