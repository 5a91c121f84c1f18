//! Environment configuration helpers.
//!
//! Both services load their configuration from `LADLE_*` environment
//! variables at startup. Whitespace-only values read as unset; a value
//! that is present but malformed is fatal, never silently defaulted.

use std::fmt::Display;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Reads a trimmed, non-empty string variable.
#[must_use]
pub fn env_string(name: &str) -> Option<String> {
    let value = std::env::var(name).ok()?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn env_parse<T>(name: &str, expected: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = env_string(name) else {
        return Ok(None);
    };
    raw.parse()
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("{name}: expected {expected}, got {raw:?} ({e})")))
}

/// Reads a `u16` variable (ports and the like).
///
/// # Errors
///
/// Returns an error if the variable is present but not a valid `u16`.
pub fn env_u16(name: &str) -> Result<Option<u16>> {
    env_parse(name, "a 16-bit unsigned integer")
}

/// Reads a `u64` variable.
///
/// # Errors
///
/// Returns an error if the variable is present but not a valid `u64`.
pub fn env_u64(name: &str) -> Result<Option<u64>> {
    env_parse(name, "an unsigned integer")
}

/// Parses a boolean. Only `true`/`false` and `1`/`0` are accepted;
/// anything fuzzier is rejected so a typo can't flip a flag.
///
/// # Errors
///
/// Returns an error for any other value.
pub fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(Error::InvalidInput(format!(
            "{name}: expected true/false or 1/0, got {other:?}"
        ))),
    }
}

/// Reads a boolean variable.
///
/// # Errors
///
/// Returns an error if the variable is present but not a valid boolean.
pub fn env_bool(name: &str) -> Result<Option<bool>> {
    let Some(raw) = env_string(name) else {
        return Ok(None);
    };
    parse_bool(name, &raw).map(Some)
}
