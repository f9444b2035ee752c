//! Error types for the traffic simulation engine

use thiserror::Error;

/// Errors raised while building sensors, stores and the store registry.
///
/// Traffic queries themselves never fail: closed and faulty readings are
/// encoded in the returned count (see [`crate::domain::types::VisitReading`]).
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    /// A numeric parameter is NaN, infinite or out of its allowed range
    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    /// Two stores were configured with the same name
    #[error("Duplicate store name: {0}")]
    DuplicateStore(String),
}

impl SimError {
    /// Creates an invalid parameter error.
    pub fn invalid(name: &'static str, value: f64) -> Self {
        Self::InvalidParameter { name, value }
    }
}

/// Reject NaN and infinities
pub(crate) fn require_finite(name: &'static str, value: f64) -> Result<f64, SimError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SimError::invalid(name, value))
    }
}

/// Truncate toward zero, rejecting values outside the i64 range
pub(crate) fn require_count(name: &'static str, value: f64) -> Result<i64, SimError> {
    let truncated = require_finite(name, value)?.trunc();
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    if truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
        Ok(truncated as i64)
    } else {
        Err(SimError::invalid(name, value))
    }
}

/// Fault rates are probabilities in principle; values above 1 are kept
/// because they are the documented way to force a fault.
pub(crate) fn require_rate(name: &'static str, value: f64) -> Result<f64, SimError> {
    if value.is_nan() || value < 0.0 {
        Err(SimError::invalid(name, value))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_finite() {
        assert_eq!(require_finite("avg_visit", 12.5), Ok(12.5));
        assert!(require_finite("avg_visit", f64::NAN).is_err());
        assert_eq!(
            require_finite("std_visit", f64::INFINITY),
            Err(SimError::invalid("std_visit", f64::INFINITY))
        );
    }

    #[test]
    fn test_require_count() {
        assert_eq!(require_count("avg_visit", 84.9), Ok(84));
        assert_eq!(require_count("avg_visit", -3.7), Ok(-3));
        assert_eq!(require_count("avg_visit", 9.0e18), Ok(9_000_000_000_000_000_000));
        assert_eq!(require_count("avg_visit", 1.0e19), Err(SimError::invalid("avg_visit", 1.0e19)));
        assert!(require_count("avg_visit", -1.0e19).is_err());
        assert!(require_count("avg_visit", f64::NAN).is_err());
    }

    #[test]
    fn test_require_rate() {
        assert_eq!(require_rate("perc_break", 0.0), Ok(0.0));
        assert_eq!(require_rate("perc_break", 15.0), Ok(15.0));
        assert!(require_rate("perc_break", -0.1).is_err());
        assert!(require_rate("perc_break", f64::NAN).is_err());
    }

    #[test]
    fn test_error_display() {
        let err = SimError::invalid("perc_malfunction", -1.0);
        assert_eq!(err.to_string(), "Invalid parameter perc_malfunction: -1");
        assert_eq!(SimError::DuplicateStore("Lille".into()).to_string(), "Duplicate store name: Lille");
    }
}
