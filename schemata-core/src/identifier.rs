//! Identifier validation.
//!
//! Namespace names cannot be sent as bound parameters, so every name that
//! ends up in `CREATE SCHEMA`, `DROP SCHEMA` or `SET search_path` is checked
//! here first.

use crate::error::{SchemaError, SchemaResult};
use once_cell::sync::Lazy;
use regex::Regex;

/// Placeholder resolving to the namespace named after the session user.
pub const USER_PLACEHOLDER: &str = "$user";

static SAFE_IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").expect("identifier pattern is a valid regex")
});

/// Whether `name` may be interpolated literally into DDL.
pub fn is_safe(name: &str) -> bool {
    name == USER_PLACEHOLDER || SAFE_IDENTIFIER.is_match(name)
}

/// Reject anything other than an ASCII letter followed by ASCII letters or
/// digits, or the literal `$user` placeholder.
///
/// # Examples
///
/// ```
/// use schemata_core::identifier::assert_safe;
///
/// assert!(assert_safe("acme2").is_ok());
/// assert!(assert_safe("$user").is_ok());
/// assert!(assert_safe("acme; DROP SCHEMA public").is_err());
/// ```
pub fn assert_safe(name: &str) -> SchemaResult<()> {
    if is_safe(name) {
        Ok(())
    } else {
        Err(SchemaError::InjectionRisk(name.to_string()))
    }
}
