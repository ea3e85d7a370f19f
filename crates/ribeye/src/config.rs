//! Environment overrides for runtime configuration.

use std::str::FromStr;

/// Read and parse an environment variable. Missing or unparseable values
/// yield `None` so callers fall back to their defaults.
pub(crate) fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}
