use thiserror::Error;

use feedforge_core::DomainError;

/// Failures that abort a formulation call.
///
/// Not reaching a feasible blend is *not* an error: it is reported through
/// `FormulationResult::feasible` and its violations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulationError {
    /// Malformed ingredient, target or state (including unknown ingredient ids).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The inclusion bounds admit no blend summing to 100%.
    #[error(
        "infeasible inclusion bounds: minimums sum to {min_total:.4}%, maximums sum to {max_total:.4}%"
    )]
    InfeasibleBounds { min_total: f64, max_total: f64 },
}

impl FormulationError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<FormulationError> for DomainError {
    fn from(err: FormulationError) -> Self {
        match err {
            FormulationError::Validation(msg) => DomainError::Validation(msg),
            e @ FormulationError::InfeasibleBounds { .. } => DomainError::invariant(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_domain_validation() {
        let err: DomainError = FormulationError::validation("bad target").into();
        assert_eq!(err, DomainError::Validation("bad target".to_string()));
    }

    #[test]
    fn infeasible_bounds_maps_to_invariant_with_totals() {
        let err: DomainError = FormulationError::InfeasibleBounds {
            min_total: 101.0,
            max_total: 150.0,
        }
        .into();
        match err {
            DomainError::InvariantViolation(msg) => {
                assert!(msg.contains("101.0000"));
                assert!(msg.contains("150.0000"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
