//! Body-Mass-Index derivation
//!
//! BMI is derived from the textual weight (kg) and height (cm) fields:
//! - Parse both as positive, finite decimals
//! - bmi = weight / (height / 100)^2
//! - Format to one decimal, or "N/A" when either input is unusable
//!
//! The category is always banded on the formatted value so the label shown
//! next to a BMI never disagrees with the number shown.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder shown when BMI cannot be computed
pub const BMI_NOT_AVAILABLE: &str = "N/A";

/// Lower bound of the normal band
pub const NORMAL_LOWER_BOUND: f64 = 18.5;
/// Lower bound of the overweight band
pub const OVERWEIGHT_LOWER_BOUND: f64 = 25.0;
/// Lower bound of the obese band
pub const OBESE_LOWER_BOUND: f64 = 30.0;

/// BMI classification band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
    #[serde(rename = "N/A")]
    NotAvailable,
}

impl BmiCategory {
    /// Classify a numeric BMI
    pub fn from_bmi(bmi: f64) -> Self {
        if !bmi.is_finite() {
            return BmiCategory::NotAvailable;
        }
        if bmi < NORMAL_LOWER_BOUND {
            BmiCategory::Underweight
        } else if bmi < OVERWEIGHT_LOWER_BOUND {
            BmiCategory::Normal
        } else if bmi < OBESE_LOWER_BOUND {
            BmiCategory::Overweight
        } else {
            BmiCategory::Obese
        }
    }

    /// Classify a formatted BMI string ("22.9", "N/A", ...)
    pub fn from_bmi_value(value: &str) -> Self {
        match value.parse::<f64>() {
            Ok(bmi) => Self::from_bmi(bmi),
            Err(_) => BmiCategory::NotAvailable,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BmiCategory::Underweight => "Underweight",
            BmiCategory::Normal => "Normal",
            BmiCategory::Overweight => "Overweight",
            BmiCategory::Obese => "Obese",
            BmiCategory::NotAvailable => BMI_NOT_AVAILABLE,
        }
    }
}

impl fmt::Display for BmiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a user-entered measurement; only finite values > 0 are accepted
pub fn parse_positive_decimal(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// Compute BMI from weight in kilograms and height in centimetres
pub fn compute_bmi(weight_kg: &str, height_cm: &str) -> Option<f64> {
    let weight = parse_positive_decimal(weight_kg)?;
    let height_m = parse_positive_decimal(height_cm)? / 100.0;

    let bmi = weight / (height_m * height_m);
    bmi.is_finite().then_some(bmi)
}

/// Format BMI to one decimal place
pub fn format_bmi(bmi: Option<f64>) -> String {
    match bmi {
        Some(value) => format!("{value:.1}"),
        None => BMI_NOT_AVAILABLE.to_string(),
    }
}
