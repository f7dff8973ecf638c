//! Boundary validation errors.
//!
//! Steady-state operation never fails: stale ids and missing style variants
//! degrade silently. These errors only come out of constructing the state
//! context or handing it bad parameters.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("view scale must be a finite positive number, got {0}")]
    InvalidScale(f64),

    #[error("edge configuration `{field}` must be a finite non-negative number, got {value}")]
    InvalidEdgeConfig { field: &'static str, value: f64 },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Accept only scales a line offset can be divided by.
pub fn validate_scale(scale: f64) -> Result<f64> {
    if scale.is_finite() && scale > 0.0 {
        Ok(scale)
    } else {
        Err(Error::InvalidScale(scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_scales() {
        assert_eq!(validate_scale(1.5), Ok(1.5));
        assert_eq!(validate_scale(0.0), Err(Error::InvalidScale(0.0)));
        assert_eq!(validate_scale(-2.0), Err(Error::InvalidScale(-2.0)));
        assert!(validate_scale(f64::NAN).is_err());
        assert!(validate_scale(f64::INFINITY).is_err());
    }

    #[test]
    fn messages_name_the_offending_value() {
        let err = Error::InvalidEdgeConfig {
            field: "gap",
            value: -1.0,
        };
        assert_eq!(
            err.to_string(),
            "edge configuration `gap` must be a finite non-negative number, got -1"
        );
    }
}
