use crate::errors::AppError;

/// Request payloads that check their own fields before touching the database.
pub trait Validate {
    /// Every problem found, in field order. Empty means valid.
    fn validation_errors(&self) -> Vec<String>;

    fn validate(&self) -> Result<(), AppError> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::from_field_errors(errors))
        }
    }
}

/// Validate a required text field with a max length.
pub fn validate_required(value: &str, field_name: &str, max_len: usize) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(format!("{field_name} is required"));
    }
    if trimmed.chars().count() > max_len {
        return Some(format!("{field_name} must be at most {max_len} characters"));
    }
    None
}

/// Same as [`validate_required`] for fields that may be absent from the payload.
pub fn validate_present(value: Option<&str>, field_name: &str, max_len: usize) -> Option<String> {
    validate_required(value.unwrap_or_default(), field_name, max_len)
}

/// Validate an optional text field with a max length (empty is OK).
pub fn validate_optional(value: Option<&str>, field_name: &str, max_len: usize) -> Option<String> {
    let trimmed = value.unwrap_or_default().trim();
    if trimmed.chars().count() > max_len {
        return Some(format!("{field_name} must be at most {max_len} characters"));
    }
    None
}

/// Validate that a value is one of a closed set.
pub fn validate_one_of(value: Option<&str>, field_name: &str, allowed: &[&str]) -> Option<String> {
    match value {
        Some(v) if allowed.contains(&v) => None,
        _ => Some(format!("{field_name} must be one of: {}", allowed.join(", "))),
    }
}

/// Trim and drop empty strings, so blank inputs are stored as NULL.
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
