// 📐 Form Validation - range checks before a record is built
// Enumerated fields are already enforced by the types; only numbers are checked here.

use crate::record::HealthInput;
use serde::Serialize;
use std::ops::RangeInclusive;

pub const AGE_RANGE: RangeInclusive<u32> = 1..=120;
pub const WEIGHT_RANGE: RangeInclusive<f64> = 20.0..=300.0;
pub const HEIGHT_RANGE: RangeInclusive<f64> = 0.5..=2.5;

/// Message shown under an empty form field.
pub const REQUIRED_MESSAGE: &str = "Preenchimento obrigatório.";

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn required(field: &str) -> Self {
        Self::new(field, REQUIRED_MESSAGE)
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), Vec<ValidationError>>;

// ============================================================================
// VALIDATOR
// ============================================================================

/// Check every numeric field and report all violations at once.
pub fn validate_input(input: &HealthInput) -> ValidationResult {
    let mut errors = Vec::new();

    if !AGE_RANGE.contains(&input.age) {
        errors.push(ValidationError::new(
            "idade",
            format!(
                "Must be between {} and {}, got {}",
                AGE_RANGE.start(),
                AGE_RANGE.end(),
                input.age
            ),
        ));
    }

    check_real(&mut errors, "peso", input.weight, &WEIGHT_RANGE);
    check_real(&mut errors, "altura", input.height, &HEIGHT_RANGE);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_real(
    errors: &mut Vec<ValidationError>,
    field: &str,
    value: f64,
    range: &RangeInclusive<f64>,
) {
    // NaN fails `contains`, but say so explicitly
    if !value.is_finite() {
        errors.push(ValidationError::new(field, "Must be a finite number"));
    } else if !range.contains(&value) {
        errors.push(ValidationError::new(
            field,
            format!(
                "Must be between {} and {}, got {}",
                range.start(),
                range.end(),
                value
            ),
        ));
    }
}

/// Join errors into one line for logs and CLI output.
pub fn describe(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
