// Валидация числовых параметров

use crate::utils::error::{QlinkError, Result};

/// Smallest value a rate or time parameter is clamped up to.
pub const MIN_POSITIVE: f64 = 1e-9;

fn ensure_finite(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(QlinkError::Validation(format!(
            "{} must be a finite number, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Clamp a ratio-valued parameter into `[0, 1]`.
pub fn clamp_ratio(name: &str, value: f64) -> Result<f64> {
    ensure_finite(name, value)?;
    Ok(value.clamp(0.0, 1.0))
}

/// Clamp a rate or time parameter to be strictly positive.
pub fn clamp_positive(name: &str, value: f64) -> Result<f64> {
    ensure_finite(name, value)?;
    Ok(value.max(MIN_POSITIVE))
}

pub fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}
