//! Physical key construction.

/// Separator between namespace and logical key
pub const NAMESPACE_SEPARATOR: char = ':';

/// Maps a logical key to the key used against the storage backend.
pub fn build_key(namespace: Option<&str>, key: &str) -> String {
    match namespace {
        Some(ns) => format!("{ns}{NAMESPACE_SEPARATOR}{key}"),
        None => key.to_string(),
    }
}

/// Recovers the logical key, or `None` when `physical` is outside `namespace`.
pub fn strip_namespace<'a>(namespace: Option<&str>, physical: &'a str) -> Option<&'a str> {
    match namespace {
        Some(ns) => physical
            .strip_prefix(ns)
            .and_then(|rest| rest.strip_prefix(NAMESPACE_SEPARATOR)),
        None => Some(physical),
    }
}
