//! Peer name validation
//!
//! A peer name doubles as the registry key and as the identity carried by
//! the marker comment in the gateway configuration, so it must stay inside a
//! charset that is safe in both places.
//!
//! # Rules
//!
//! - 1-50 characters
//! - ASCII letters, digits, `_` and `-` only
//!
//! ```
//! use peersync::validation::validate_peer_name;
//!
//! assert!(validate_peer_name("laptop-01").is_ok());
//! assert!(validate_peer_name("").is_err());
//! ```

use thiserror::Error;

/// Minimum peer name length
pub const MIN_NAME_LENGTH: usize = 1;

/// Maximum peer name length
pub const MAX_NAME_LENGTH: usize = 50;

/// Validation error types
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NameError {
    /// Name is empty or too long
    #[error("name must be {MIN_NAME_LENGTH}-{MAX_NAME_LENGTH} characters, got {length}")]
    InvalidLength {
        /// Length of the rejected name in characters
        length: usize,
    },

    /// Name contains a character outside `[A-Za-z0-9_-]`
    #[error("name contains invalid character {found:?}, only letters, digits, '_' and '-' are allowed")]
    InvalidCharset {
        /// First offending character
        found: char,
    },
}

/// Validate a peer name.
pub fn validate_peer_name(name: &str) -> Result<(), NameError> {
    let length = name.chars().count();
    if !(MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&length) {
        return Err(NameError::InvalidLength { length });
    }

    if let Some(found) = name
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '_' && *c != '-')
    {
        return Err(NameError::InvalidCharset { found });
    }

    Ok(())
}
