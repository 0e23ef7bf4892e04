//! Environment-variable loading helpers shared by both binaries.
//!
//! Centralizes the alias-chain / default-value / boolean-parsing logic so
//! business code never repeats `std::env::var(..).or_else(..)` chains.
//! Grounded in the teacher's `config::loader` module.

use std::env;

/// Read `primary`, falling back to `aliases` in order, then `default()`.
pub fn env_or<F>(primary: &str, aliases: &[&str], default: F) -> String
where
    F: FnOnce() -> String,
{
    env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(default)
}

/// Read `primary`/`aliases`, treating an empty string as unset.
pub fn env_optional(primary: &str, aliases: &[&str]) -> Option<String> {
    env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse a boolean env var: `1`/`true`/`yes` (case-insensitive) is true,
/// anything else present is false, absence falls back to `default`.
pub fn env_bool(primary: &str, aliases: &[&str], default: bool) -> bool {
    let v = env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()));
    match v.as_deref() {
        Some(s) => matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes"),
        None => default,
    }
}

/// Parse a `u64` env var with a default.
pub fn env_u64(primary: &str, aliases: &[&str], default: u64) -> u64 {
    env_optional(primary, aliases)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
