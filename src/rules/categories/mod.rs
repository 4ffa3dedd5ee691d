//! Rule categories

pub mod api;
pub mod auth;
pub mod container;
pub mod firewall;
pub mod ssh;
pub mod storage;

/// Render an optional directive for evidence: the value, or `not set (default X)`
pub(crate) fn setting(value: Option<&str>, default: &str) -> String {
    match value {
        Some(v) => v.to_string(),
        None => format!("not set (default {default})"),
    }
}

/// Join evidence items, e.g. offending ids
pub(crate) fn join(items: &[String]) -> String {
    items.join(", ")
}
