/// Emits a `tracing::trace!` event carrying a serialized intermediate value, tagged so that log
/// tooling can follow how resolved paths and selection trees are assembled for a request. Only
/// compiled with the `snapshot_tracing` feature; unrelated to `insta` snapshot tests.
///
/// The tag is the value's type name and the data is its JSON rendering:
/// ```ignore
/// snapshot!(resolved_paths, "resolved return fields");
/// // trace!(snapshot = "Vec<ResolvedPath>", data = "[..]", "resolved return fields");
/// ```
macro_rules! snapshot {
    ($value:expr, $msg:literal) => {
        #[cfg(feature = "snapshot_tracing")]
        tracing::trace!(
            snapshot = std::any::type_name_of_val(&$value),
            data = serde_json::to_string(&$value)
                .unwrap_or_else(|err| format!("<unserializable: {err}>")),
            $msg
        );
    };
}

pub(crate) use snapshot;
