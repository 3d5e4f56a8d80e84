//! Operation descriptors, as handed over by whatever discovers operations in the calling
//! codebase.

use apollo_compiler::Name;

use crate::source::TypeDescriptor;

/// Which root type an operation is exposed on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::EnumIter,
)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

/// Where the execution engine supplies an argument's value from, instead of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Injection {
    /// The per-request execution context.
    ExecutionContext,
    /// The field's resolution environment.
    Environment,
    /// The parent value a nested operation is resolved against.
    Source,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentDescriptor {
    pub name: Name,
    pub ty: TypeDescriptor,
    pub default_value: Option<serde_json::Value>,
    /// Injected arguments never appear in the schema.
    pub injection: Option<Injection>,
    pub description: Option<String>,
}

impl ArgumentDescriptor {
    pub fn new(name: Name, ty: TypeDescriptor) -> Self {
        Self {
            name,
            ty,
            default_value: None,
            injection: None,
            description: None,
        }
    }

    pub fn with_default_value(mut self, value: serde_json::Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn injected(mut self, injection: Injection) -> Self {
        self.injection = Some(injection);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_injected(&self) -> bool {
        self.injection.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub name: Name,
    pub kind: OperationKind,
    pub return_type: TypeDescriptor,
    /// The declaring type, whose type parameters the return and argument types may mention.
    pub owner: Option<TypeDescriptor>,
    pub arguments: Vec<ArgumentDescriptor>,
    pub description: Option<String>,
}

impl Operation {
    pub fn new(name: Name, kind: OperationKind, return_type: TypeDescriptor) -> Self {
        Self {
            name,
            kind,
            return_type,
            owner: None,
            arguments: Vec::new(),
            description: None,
        }
    }

    pub fn query(name: Name, return_type: TypeDescriptor) -> Self {
        Self::new(name, OperationKind::Query, return_type)
    }

    pub fn mutation(name: Name, return_type: TypeDescriptor) -> Self {
        Self::new(name, OperationKind::Mutation, return_type)
    }

    pub fn subscription(name: Name, return_type: TypeDescriptor) -> Self {
        Self::new(name, OperationKind::Subscription, return_type)
    }

    pub fn with_owner(mut self, owner: TypeDescriptor) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_argument(mut self, argument: ArgumentDescriptor) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The arguments exposed in the schema.
    pub fn schema_arguments(&self) -> impl Iterator<Item = &ArgumentDescriptor> {
        self.arguments
            .iter()
            .filter(|argument| !argument.is_injected())
    }
}
