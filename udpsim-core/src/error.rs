use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{name} must be within [0.0, 1.0], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
}

/// Rejects probabilities outside `[0, 1]` (NaN included) instead of clamping them.
pub(crate) fn check_probability(name: &'static str, value: f64) -> Result<f64, CoreError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(CoreError::InvalidProbability { name, value })
    }
}
