//! ## Usage
//!
//! Builds a linked GraphQL schema from typed operation descriptors.
//!
//! A [`TypeGraphBuilder`] takes a [`TypeCatalog`] of declared domain types and a set of
//! [`Operation`]s, maps every type they reach to a schema type (recursively, memoizing by schema
//! name, so that self- and mutually-referential types terminate), and returns an immutable
//! [`TypeGraph`]. The graph also records which concrete types satisfy which interfaces and unions;
//! a [`RuntimeTypeResolver`] uses that at execution time to pick the concrete schema type of a
//! polymorphic result value.
//!
//! ```
//! use apollo_compiler::name;
//! use apollo_type_graph::Operation;
//! use apollo_type_graph::TypeCatalog;
//! use apollo_type_graph::TypeGraphBuilder;
//! use apollo_type_graph::source::FieldDeclaration;
//! use apollo_type_graph::source::STRING_TYPE;
//! use apollo_type_graph::source::TypeDeclaration;
//! use apollo_type_graph::source::TypeDescriptor;
//!
//! let catalog = TypeCatalog::new().with(
//!     TypeDeclaration::object(name!("Book")).with_field(FieldDeclaration::new(
//!         name!("title"),
//!         TypeDescriptor::named(STRING_TYPE).non_null(),
//!     )),
//! );
//! let graph = TypeGraphBuilder::new(catalog)
//!     .build([Operation::query(
//!         name!("books"),
//!         TypeDescriptor::list_of(TypeDescriptor::named(name!("Book")).non_null()),
//!     )])
//!     .unwrap();
//! let schema = graph.to_schema().unwrap();
//! assert!(schema.types.contains_key("Book"));
//! ```

#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_pub,
    unreachable_patterns,
    unused,
    unused_qualifications,
    dead_code,
    while_true,
    unconditional_panic,
    clippy::all
)]

pub mod builder;
pub mod config;
pub mod error;
pub mod graph;
pub mod mapper;
pub mod naming;
pub mod operation;
pub mod registry;
mod resolve;
pub mod runtime;
pub mod source;
pub(crate) mod utils;
pub mod value_mapper;

pub use crate::builder::TypeGraphBuilder;
pub use crate::config::TypeGraphConfig;
pub use crate::error::TypeGraphError;
pub use crate::error::TypeResolutionError;
pub use crate::graph::TypeGraph;
pub use crate::operation::Operation;
pub use crate::operation::OperationKind;
pub use crate::runtime::RuntimeTypeResolver;
pub use crate::source::TypeCatalog;
pub use crate::source::TypeDescriptor;
