//! Validation helper functions for configuration types.

use crate::core::errors::{OutlierError, Result};

/// Validate that a usize value is greater than zero.
pub fn validate_positive_usize(value: usize, field: &str) -> Result<()> {
    if value == 0 {
        return Err(OutlierError::invalid_value(
            format!("{field} must be greater than 0"),
            field,
            value,
        ));
    }
    Ok(())
}

/// Validate that an f64 value is finite and greater than zero.
pub fn validate_positive_f64(value: f64, field: &str) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(OutlierError::invalid_value(
            format!("{field} must be a finite number greater than 0.0"),
            field,
            value,
        ));
    }
    Ok(())
}

/// Validate that an f64 value is finite.
pub fn validate_finite(value: f64, field: &str) -> Result<()> {
    if !value.is_finite() {
        return Err(OutlierError::invalid_value(
            format!("{field} must be a finite number"),
            field,
            value,
        ));
    }
    Ok(())
}

/// Validate that an f64 value lies strictly inside (min, max).
pub fn validate_open_range(value: f64, min: f64, max: f64, field: &str) -> Result<()> {
    if !(value > min && value < max) {
        return Err(OutlierError::invalid_value(
            format!("{field} must be strictly between {min} and {max}"),
            field,
            value,
        ));
    }
    Ok(())
}

/// Validate that `low` does not exceed `high`.
pub fn validate_ordered_usize(low: usize, high: usize, low_field: &str, high_field: &str) -> Result<()> {
    if low > high {
        return Err(OutlierError::invalid_value(
            format!("{low_field} ({low}) must not exceed {high_field} ({high})"),
            low_field,
            low,
        ));
    }
    Ok(())
}
