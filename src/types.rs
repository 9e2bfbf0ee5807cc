//! Core types for the onboarding store
//!
//! This module defines the user record collected by the onboarding form, the
//! closed set of editable fields, and the validated state snapshot handed to
//! subscribers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::bmi::{self, BmiCategory};
use crate::error::OnboardError;
use crate::validation::{self, ValidationError};

/// Editable base field of [`UserInformation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserField {
    FirstName,
    LastName,
    Weight,
    Height,
    Gender,
}

impl UserField {
    /// All fields in validation order
    pub const ALL: [UserField; 5] = [
        UserField::FirstName,
        UserField::LastName,
        UserField::Weight,
        UserField::Height,
        UserField::Gender,
    ];

    /// Wire name, identical to the persisted JSON key
    pub fn as_str(&self) -> &'static str {
        match self {
            UserField::FirstName => "firstName",
            UserField::LastName => "lastName",
            UserField::Weight => "weight",
            UserField::Height => "height",
            UserField::Gender => "gender",
        }
    }

    /// Human-readable label used in validation messages
    pub fn label(&self) -> &'static str {
        match self {
            UserField::FirstName => "First name",
            UserField::LastName => "Last name",
            UserField::Weight => "Weight",
            UserField::Height => "Height",
            UserField::Gender => "Gender",
        }
    }

    /// Whether edits to this field come from free-text input
    pub fn is_text(&self) -> bool {
        !matches!(self, UserField::Gender)
    }
}

impl fmt::Display for UserField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserField {
    type Err = OnboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| OnboardError::UnknownField(s.to_string()))
    }
}

/// Personal information collected during onboarding.
///
/// All fields are free text; weight is kilograms and height is centimetres,
/// both kept as typed so partially entered values survive a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInformation {
    pub first_name: String,
    pub last_name: String,
    pub weight: String,
    pub height: String,
    pub gender: String,
}

impl UserInformation {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        weight: impl Into<String>,
        height: impl Into<String>,
        gender: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            weight: weight.into(),
            height: height.into(),
            gender: gender.into(),
        }
    }

    /// Read a base field by name
    pub fn field(&self, field: UserField) -> &str {
        match field {
            UserField::FirstName => &self.first_name,
            UserField::LastName => &self.last_name,
            UserField::Weight => &self.weight,
            UserField::Height => &self.height,
            UserField::Gender => &self.gender,
        }
    }

    /// Overwrite a base field in place
    pub fn set_field(&mut self, field: UserField, value: impl Into<String>) {
        let slot = match field {
            UserField::FirstName => &mut self.first_name,
            UserField::LastName => &mut self.last_name,
            UserField::Weight => &mut self.weight,
            UserField::Height => &mut self.height,
            UserField::Gender => &mut self.gender,
        };
        *slot = value.into();
    }

    /// Copy of this record with one field replaced
    pub fn with_field(&self, field: UserField, value: impl Into<String>) -> Self {
        let mut updated = self.clone();
        updated.set_field(field, value);
        updated
    }

    /// True when every base field is the empty string
    pub fn is_empty(&self) -> bool {
        UserField::ALL.iter().all(|f| self.field(*f).is_empty())
    }

    /// First and last name joined by a space, trimmed
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Unrounded BMI, if weight and height are positive decimals
    pub fn bmi(&self) -> Option<f64> {
        bmi::compute_bmi(&self.weight, &self.height)
    }

    /// BMI formatted to one decimal, or "N/A"
    pub fn bmi_value(&self) -> String {
        bmi::format_bmi(self.bmi())
    }

    /// Classification of the formatted BMI
    pub fn bmi_category(&self) -> BmiCategory {
        BmiCategory::from_bmi_value(&self.bmi_value())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Check that all required fields are filled in
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_required(self)
    }

    /// Requirement text for the first missing field, if any
    pub fn validation_message(&self) -> Option<String> {
        self.validate().err().map(|e| e.to_string())
    }
}

/// Validated snapshot of the store.
///
/// Validity and the message are derived once from the record when the state
/// is built; there is no way to change them independently.
#[derive(Debug, Clone, PartialEq)]
pub struct UserState {
    user_information: UserInformation,
    is_valid: bool,
    validation_message: Option<String>,
}

impl Default for UserState {
    fn default() -> Self {
        Self::from_information(UserInformation::default())
    }
}

impl UserState {
    /// Build a state, deriving validity from the record
    pub fn from_information(user_information: UserInformation) -> Self {
        let validation_message = user_information.validation_message();
        Self {
            is_valid: validation_message.is_none(),
            validation_message,
            user_information,
        }
    }

    pub fn user_information(&self) -> &UserInformation {
        &self.user_information
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn validation_message(&self) -> Option<&str> {
        self.validation_message.as_deref()
    }

    /// Serializable view including every derived field
    pub fn to_snapshot(&self) -> StateSnapshot {
        let info = &self.user_information;
        StateSnapshot {
            user_information: info.clone(),
            full_name: info.full_name(),
            bmi_value: info.bmi_value(),
            bmi_category: info.bmi_category(),
            is_valid: self.is_valid,
            validation_message: self.validation_message.clone(),
        }
    }
}

/// Wire form of a [`UserState`] handed to hosts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub user_information: UserInformation,
    pub full_name: String,
    pub bmi_value: String,
    pub bmi_category: BmiCategory,
    pub is_valid: bool,
    pub validation_message: Option<String>,
}

impl StateSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
