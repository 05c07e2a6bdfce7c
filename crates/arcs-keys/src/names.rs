//! Validation for the pieces a storage key is built from.
//!
//! Path components:
//! - Must be non-empty
//! - Must not contain `/` (that is the separator)
//! - Must not contain whitespace or control characters
//! - Must not be `.` or `..`
//!
//! Protocols are lowercase ASCII letters, digits, and `-`, starting with a
//! letter.

use crate::error::{KeyError, KeyResult};

fn invalid(component: &str, reason: impl Into<String>) -> KeyError {
    KeyError::InvalidComponent {
        component: component.to_string(),
        reason: reason.into(),
    }
}

/// Validate a single path component (an arc id or one path segment).
///
/// # Examples
///
/// ```
/// use arcs_keys::names::validate_component;
///
/// assert!(validate_component("entities").is_ok());
/// assert!(validate_component("").is_err());
/// assert!(validate_component("a/b").is_err());
/// ```
pub fn validate_component(component: &str) -> KeyResult<()> {
    if component.is_empty() {
        return Err(invalid(component, "must not be empty"));
    }
    if component.contains('/') {
        return Err(invalid(component, "must not contain '/'"));
    }
    if let Some(ch) = component
        .chars()
        .find(|c| c.is_whitespace() || c.is_control())
    {
        return Err(invalid(component, format!("contains forbidden character: {ch:?}")));
    }
    if component == "." || component == ".." {
        return Err(invalid(component, "relative components are not allowed"));
    }
    Ok(())
}

/// Validate a protocol name.
pub fn validate_protocol(protocol: &str) -> KeyResult<()> {
    let mut chars = protocol.chars();
    match chars.next() {
        None => return Err(invalid(protocol, "protocol must not be empty")),
        Some(first) if !first.is_ascii_lowercase() => {
            return Err(invalid(protocol, "protocol must start with a lowercase letter"));
        }
        Some(_) => {}
    }
    if let Some(ch) = chars.find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')) {
        return Err(invalid(protocol, format!("protocol contains {ch:?}")));
    }
    Ok(())
}
