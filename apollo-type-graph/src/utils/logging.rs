/// Wraps `tracing::trace!` to tag a log line with a serialized copy of a build-time data
/// structure, so that the registry and the final type table can be followed through a build. This
/// is unrelated to insta snapshot testing, and compiles to nothing without the `snapshot_tracing`
/// feature.
///
/// Pass the value itself to serialize it with serde_json and tag it with its type name:
/// ```ignore
/// snapshot!(config, "type graph config");
/// // trace!(snapshot = "apollo_type_graph::config::TypeGraphConfig", data = "{ .. }", "type graph config");
/// ```
/// Or pass a tag and an already rendered value:
/// ```ignore
/// snapshot!("TypeTable", types.keys().join(", "), "merged type table");
/// ```
macro_rules! snapshot {
    ($value:expr, $msg:literal) => {
        #[cfg(feature = "snapshot_tracing")]
        tracing::trace!(
            snapshot = std::any::type_name_of_val(&$value),
            data = serde_json::to_string(&$value).unwrap_or_default(),
            $msg
        );
    };
    ($name:literal, $value:expr, $msg:literal) => {
        #[cfg(feature = "snapshot_tracing")]
        tracing::trace!(snapshot = $name, data = $value, $msg);
    };
}

pub(crate) use snapshot;
