use apollo_compiler::Name;
use apollo_compiler::name;
use serde::Deserialize;
use serde::Serialize;

use crate::source::JSON_TYPE;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct TypeGraphConfig {
    /// Whether a type variable or wildcard without any bound may be replaced by
    /// [`filler_type`](Self::filler_type). When `false`, such a descriptor is a build error.
    ///
    /// Defaults to true.
    pub allow_unbounded_replacement: bool,

    /// Whether a raw generic type, or one with fewer arguments than its declaration has type
    /// parameters, may have the missing arguments filled in with
    /// [`filler_type`](Self::filler_type).
    ///
    /// Defaults to true.
    pub allow_raw_replacement: bool,

    /// The catalog type substituted for unbound generic gaps. Defaults to `JSON`.
    pub filler_type: Name,

    /// Whether the interface mapper also maps every concrete catalog subtype of an interface, so
    /// that implementations not otherwise reachable from an operation are still known to the
    /// runtime type resolver.
    ///
    /// Defaults to false.
    pub discover_implementations: bool,

    /// Expose abstract declarations as interfaces instead of objects.
    pub abstract_types_as_interfaces: bool,

    pub query_type_name: Name,
    pub mutation_type_name: Name,
    pub subscription_type_name: Name,
}

impl Default for TypeGraphConfig {
    fn default() -> Self {
        Self {
            allow_unbounded_replacement: true,
            allow_raw_replacement: true,
            filler_type: JSON_TYPE,
            discover_implementations: false,
            abstract_types_as_interfaces: false,
            query_type_name: name!("Query"),
            mutation_type_name: name!("Mutation"),
            subscription_type_name: name!("Subscription"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_partial_config() {
        let config: TypeGraphConfig = serde_json::from_value(serde_json::json!({
            "allow_raw_replacement": false,
            "query_type_name": "RootQuery",
        }))
        .unwrap();
        assert_eq!(
            config,
            TypeGraphConfig {
                allow_raw_replacement: false,
                query_type_name: name!("RootQuery"),
                ..Default::default()
            }
        );
    }
}
