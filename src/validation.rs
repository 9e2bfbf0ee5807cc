//! Field validation
//!
//! Required-field validation for [`UserInformation`] plus small text
//! validators used for inline form feedback.

use thiserror::Error;

use crate::types::{UserField, UserInformation};

/// A required field is missing.
///
/// Validation failures are data: they surface as `UserState::validation_message`
/// and through `FormController::submit`, never as a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{} is required", .0.label())]
    MissingField(UserField),
}

impl ValidationError {
    pub fn field(&self) -> UserField {
        match self {
            ValidationError::MissingField(field) => *field,
        }
    }
}

/// First field, in validation order, that is blank after trimming
pub fn first_missing_field(info: &UserInformation) -> Option<UserField> {
    UserField::ALL
        .into_iter()
        .find(|field| info.field(*field).trim().is_empty())
}

/// Check that all five fields are non-empty after trimming
pub fn validate_required(info: &UserInformation) -> Result<(), ValidationError> {
    match first_missing_field(info) {
        Some(field) => Err(ValidationError::MissingField(field)),
        None => Ok(()),
    }
}

/// Outcome of a single-value validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(String),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Invalid(message) => Some(message),
        }
    }
}

/// Invalid when the text is blank after trimming
pub fn validate_not_empty(text: &str, error_message: &str) -> ValidationResult {
    if text.trim().is_empty() {
        ValidationResult::Invalid(error_message.to_string())
    } else {
        ValidationResult::Valid
    }
}

/// Invalid when the character count falls outside `min..=max`
pub fn validate_length(text: &str, min: usize, max: usize, error_message: &str) -> ValidationResult {
    let length = text.chars().count();
    if length < min || length > max {
        ValidationResult::Invalid(error_message.to_string())
    } else {
        ValidationResult::Valid
    }
}
