//! Point-delta validation bounds.

/// Largest point change a single call may apply, in either direction.
pub const MAX_POINT_DELTA: i64 = 10_000;

/// Errors produced by domain-level validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// A point delta exceeded the accepted magnitude.
    #[error("point delta {delta} exceeds the permitted magnitude of {MAX_POINT_DELTA}")]
    DeltaOutOfRange {
        /// The rejected delta.
        delta: i64,
    },
}

/// Validate that a point delta is within the accepted magnitude.
///
/// Rejected deltas cause no partial effect: the storage layer checks
/// the bound before touching any connection.
///
/// # Errors
///
/// Returns [`DomainError::DeltaOutOfRange`] when `|delta|` exceeds
/// [`MAX_POINT_DELTA`] (including `i64::MIN`, whose magnitude is not
/// representable).
pub const fn validate_delta(delta: i64) -> Result<(), DomainError> {
    match delta.checked_abs() {
        Some(magnitude) if magnitude <= MAX_POINT_DELTA => Ok(()),
        _ => Err(DomainError::DeltaOutOfRange { delta }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn accepts_deltas_within_bound() {
        assert_eq!(validate_delta(0), Ok(()));
        assert_eq!(validate_delta(10_000), Ok(()));
        assert_eq!(validate_delta(-10_000), Ok(()));
    }

    #[test]
    fn rejects_deltas_beyond_bound() {
        assert!(validate_delta(10_001).is_err());
        assert!(validate_delta(-10_001).is_err());
        assert!(validate_delta(i64::MIN).is_err());
    }
}
