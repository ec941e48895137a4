//! Domain error types.
//!
//! These errors represent validation failures in the domain layer. They are
//! distinct from configuration and query errors raised by the planner.

/// Domain-level errors for validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// Latitude or longitude outside the valid range
    #[error("invalid coordinate ({lat}, {lon}): {reason}")]
    InvalidCoordinate {
        lat: f64,
        lon: f64,
        reason: &'static str,
    },

    /// Time of day could not be parsed
    #[error("invalid time: {0}")]
    InvalidTime(&'static str),

    /// Consecutive segments don't share an endpoint
    #[error("segments are not connected: {0} does not lead to {1}")]
    PlacesNotConnected(String, String),

    /// Journey has no segments
    #[error("journey must have at least one segment")]
    EmptyJourney,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DomainError::InvalidCoordinate {
            lat: 91.0,
            lon: 0.0,
            reason: "latitude must be within [-90, 90]",
        };
        assert_eq!(
            err.to_string(),
            "invalid coordinate (91, 0): latitude must be within [-90, 90]"
        );

        let err = DomainError::InvalidTime("expected HH:MM format");
        assert_eq!(err.to_string(), "invalid time: expected HH:MM format");

        let err = DomainError::PlacesNotConnected("Gangnam".into(), "Yeoksam".into());
        assert_eq!(
            err.to_string(),
            "segments are not connected: Gangnam does not lead to Yeoksam"
        );

        let err = DomainError::EmptyJourney;
        assert_eq!(err.to_string(), "journey must have at least one segment");
    }
}
