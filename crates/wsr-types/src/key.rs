//! World-state key and namespace rules.
//!
//! Valid keys:
//! - Must be non-empty
//! - Must not contain the NUL character (it separates namespace and key in
//!   the stored form)
//! - Must be at most [`MAX_KEY_BYTES`] bytes of UTF-8
//!
//! Valid namespaces are short identifiers: ASCII alphanumerics, `-` and `_`.

use crate::error::TypeError;

/// Upper bound on the encoded length of a key.
pub const MAX_KEY_BYTES: usize = 1024;

const MAX_NAMESPACE_BYTES: usize = 64;

/// Validate a record key, returning `Ok(())` if valid.
///
/// ```
/// use wsr_types::validate_key;
///
/// assert!(validate_key("loan1").is_ok());
/// assert!(validate_key("").is_err());
/// assert!(validate_key("a\0b").is_err());
/// ```
pub fn validate_key(key: &str) -> Result<(), TypeError> {
    if key.is_empty() {
        return Err(TypeError::InvalidKey {
            key: key.to_string(),
            reason: "key must not be empty".into(),
        });
    }

    if key.contains('\0') {
        return Err(TypeError::InvalidKey {
            key: key.to_string(),
            reason: "key must not contain NUL".into(),
        });
    }

    if key.len() > MAX_KEY_BYTES {
        return Err(TypeError::InvalidKey {
            key: display_prefix(key, 32).to_string(),
            reason: format!("key is {} bytes, limit is {MAX_KEY_BYTES}", key.len()),
        });
    }

    Ok(())
}

/// Validate a namespace name.
pub fn validate_namespace(name: &str) -> Result<(), TypeError> {
    if name.is_empty() {
        return Err(TypeError::InvalidNamespace {
            name: name.to_string(),
            reason: "namespace must not be empty".into(),
        });
    }

    if name.len() > MAX_NAMESPACE_BYTES {
        return Err(TypeError::InvalidNamespace {
            name: name.to_string(),
            reason: format!("namespace longer than {MAX_NAMESPACE_BYTES} bytes"),
        });
    }

    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(TypeError::InvalidNamespace {
            name: name.to_string(),
            reason: format!("contains forbidden character: {ch:?}"),
        });
    }

    Ok(())
}

fn display_prefix(key: &str, max: usize) -> &str {
    let mut end = max.min(key.len());
    while !key.is_char_boundary(end) {
        end -= 1;
    }
    &key[..end]
}
