use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Write;

use apollo_compiler::InvalidNameError;
use apollo_compiler::Name;
use apollo_compiler::Schema;
use apollo_compiler::validation::WithErrors;

use crate::registry::Namespace;

/// Create an internal error.
///
/// # Example
/// ```rust
/// use apollo_type_graph::internal_error;
/// use apollo_type_graph::error::TypeGraphError;
/// # fn may_be_none() -> Option<()> { None }
///
/// const NAME: &str = "the thing";
/// let result: Result<(), TypeGraphError> = may_be_none()
///     .ok_or_else(|| internal_error!("Expected {NAME} to be Some"));
/// ```
#[macro_export]
macro_rules! internal_error {
    ( $( $arg:tt )+ ) => {
        $crate::error::TypeGraphError::internal(format!( $( $arg )+ ))
    }
}

/// Break out of the current function, returning an internal error.
///
/// # Example
/// ```rust
/// use apollo_type_graph::bail;
/// use apollo_type_graph::error::TypeGraphError;
/// # fn may_be_none() -> Option<()> { None }
///
/// fn example() -> Result<(), TypeGraphError> {
///     bail!("Something went horribly wrong");
///     unreachable!()
/// }
/// #
/// # _ = example();
/// ```
#[macro_export]
macro_rules! bail {
    ( $( $arg:tt )+ ) => {
        return Err($crate::internal_error!( $( $arg )+ ).into())
    }
}

/// Where a schema type name was computed from, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeOrigin(pub String);

impl Display for TypeOrigin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SingleTypeGraphError {
    #[error(
        "An internal error has occurred, please report this bug to Apollo.\n\nDetails: {message}"
    )]
    Internal { message: String },
    #[error("Type `{type_name}` cannot be resolved: {message}")]
    UnresolvableGenericType { type_name: String, message: String },
    #[error("No type mapper found for type `{source_type}` in the {namespace} namespace")]
    NoMapperFound {
        source_type: String,
        namespace: Namespace,
    },
    #[error(
        "Type name `{name}` in the {namespace} namespace is computed for two structurally different types: `{first}` and `{second}`"
    )]
    NameCollision {
        name: Name,
        namespace: Namespace,
        first: TypeOrigin,
        second: TypeOrigin,
    },
    #[error("Type `{referenced}` referenced from `{referrer}` was never resolved")]
    MissingReference { referrer: String, referenced: Name },
    #[error("Source type `{type_name}` is not declared in the type catalog")]
    UnknownSourceType { type_name: String },
    #[error("Computed schema name for `{source_type}` is invalid: {message}")]
    InvalidName { source_type: String, message: String },
    #[error("Operation `{name}` is declared more than once on the {kind} root type")]
    DuplicateOperation { name: Name, kind: String },
    #[error("The assembled schema is invalid:\n{message}")]
    InvalidSchema { message: String },
}

impl SingleTypeGraphError {
    pub fn code(&self) -> &'static str {
        match self {
            SingleTypeGraphError::Internal { .. } => "INTERNAL",
            SingleTypeGraphError::UnresolvableGenericType { .. } => "UNRESOLVABLE_GENERIC_TYPE",
            SingleTypeGraphError::NoMapperFound { .. } => "NO_MAPPER_FOUND",
            SingleTypeGraphError::NameCollision { .. } => "NAME_COLLISION",
            SingleTypeGraphError::MissingReference { .. } => "MISSING_REFERENCE",
            SingleTypeGraphError::UnknownSourceType { .. } => "UNKNOWN_SOURCE_TYPE",
            SingleTypeGraphError::InvalidName { .. } => "INVALID_NAME",
            SingleTypeGraphError::DuplicateOperation { .. } => "DUPLICATE_OPERATION",
            SingleTypeGraphError::InvalidSchema { .. } => "INVALID_SCHEMA",
        }
    }
}

impl From<WithErrors<Schema>> for SingleTypeGraphError {
    fn from(value: WithErrors<Schema>) -> Self {
        SingleTypeGraphError::InvalidSchema {
            message: value.errors.to_string(),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub struct MultipleTypeGraphErrors {
    pub errors: Vec<SingleTypeGraphError>,
}

impl MultipleTypeGraphErrors {
    pub fn new() -> Self {
        Self { errors: vec![] }
    }

    pub fn push(&mut self, error: TypeGraphError) {
        match error {
            TypeGraphError::SingleTypeGraphError(error) => {
                self.errors.push(error);
            }
            TypeGraphError::MultipleTypeGraphErrors(errors) => {
                self.errors.extend(errors.errors);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Converts into `Result<(), TypeGraphError>`.
    /// - The return value can be either Ok, SingleTypeGraphError or MultipleTypeGraphErrors
    ///   depending on the number of errors.
    pub fn into_result(self) -> Result<(), TypeGraphError> {
        match self.errors.len().cmp(&1) {
            std::cmp::Ordering::Less => Ok(()),
            std::cmp::Ordering::Equal => Err(self.errors[0].clone().into()),
            std::cmp::Ordering::Greater => Err(self.into()),
        }
    }
}

impl Default for MultipleTypeGraphErrors {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for MultipleTypeGraphErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "The following errors occurred:")?;
        for error in &self.errors {
            write!(f, "\n  - ")?;
            for c in error.to_string().chars() {
                if c == '\n' {
                    write!(f, "\n    ")?;
                } else {
                    f.write_char(c)?;
                }
            }
        }
        Ok(())
    }
}

impl FromIterator<SingleTypeGraphError> for MultipleTypeGraphErrors {
    fn from_iter<T: IntoIterator<Item = SingleTypeGraphError>>(iter: T) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

#[derive(Clone, thiserror::Error)]
pub enum TypeGraphError {
    #[error(transparent)]
    SingleTypeGraphError(#[from] SingleTypeGraphError),
    #[error(transparent)]
    MultipleTypeGraphErrors(#[from] MultipleTypeGraphErrors),
}

impl std::fmt::Debug for TypeGraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SingleTypeGraphError(inner) => std::fmt::Debug::fmt(inner, f),
            Self::MultipleTypeGraphErrors(inner) => std::fmt::Debug::fmt(inner, f),
        }
    }
}

impl From<WithErrors<Schema>> for TypeGraphError {
    fn from(value: WithErrors<Schema>) -> Self {
        SingleTypeGraphError::from(value).into()
    }
}

impl TypeGraphError {
    pub fn internal(message: impl Into<String>) -> Self {
        SingleTypeGraphError::Internal {
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn invalid_name(source_type: impl Display, error: InvalidNameError) -> Self {
        SingleTypeGraphError::InvalidName {
            source_type: source_type.to_string(),
            message: error.to_string(),
        }
        .into()
    }

    /// The individual errors, in the order they were raised.
    pub fn errors(&self) -> Vec<&SingleTypeGraphError> {
        match self {
            TypeGraphError::SingleTypeGraphError(error) => vec![error],
            TypeGraphError::MultipleTypeGraphErrors(errors) => errors.errors.iter().collect(),
        }
    }
}

/// Raised at execution time when a polymorphic result cannot be mapped back to a concrete schema
/// type. The execution engine turns it into a field error; it never aborts the rest of a response.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TypeResolutionError {
    #[error("Concrete type of value {value} for abstract type `{declared}` cannot be resolved")]
    UnresolvableType {
        declared: Name,
        value: serde_json::Value,
    },
}
