/// Input validation for artifact names and deployed addresses

use thiserror::Error;

pub const MAX_ARTIFACT_NAME_LEN: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Input too long: max {max} characters, got {actual}")]
    InputTooLong { max: usize, actual: usize },

    #[error("Invalid characters detected")]
    InvalidCharacters,

    #[error("Empty input not allowed")]
    EmptyInput,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Validate free-form input: non-empty, bounded, no control characters
pub fn validate_input(input: &str, max_length: usize) -> Result<(), ValidationError> {
    if input.is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    if input.len() > max_length {
        return Err(ValidationError::InputTooLong {
            max: max_length,
            actual: input.len(),
        });
    }

    if input.contains('\0') {
        return Err(ValidationError::InvalidCharacters);
    }

    if input.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidCharacters);
    }

    Ok(())
}

/// Artifact names are identifiers: ASCII alphanumerics, `_` and `-`
pub fn validate_artifact_name(name: &str) -> Result<(), ValidationError> {
    validate_input(name, MAX_ARTIFACT_NAME_LEN)?;

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(ValidationError::InvalidFormat(format!(
            "artifact name '{}' must contain only letters, digits, '_' or '-'",
            name
        )));
    }

    Ok(())
}

/// Addresses are `0x` followed by 40 hex digits (checksum casing is accepted)
pub fn validate_address(address: &str) -> Result<(), ValidationError> {
    validate_input(address, 42)?;

    let hex = address.strip_prefix("0x").ok_or_else(|| {
        ValidationError::InvalidFormat(format!("address '{}' must start with 0x", address))
    })?;

    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidFormat(format!(
            "address '{}' must have 40 hex digits",
            address
        )));
    }

    Ok(())
}
