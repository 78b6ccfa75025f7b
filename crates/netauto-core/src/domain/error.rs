//! Domain-level error taxonomy for netauto.

use super::verdict::ValidationVerdict;

/// Fixed user-visible message for unclassified faults.
///
/// Anything that is not one of the classified [`AutomationError`] variants
/// is flattened to this text before it reaches a caller, so internal detail
/// never leaks through the failure surface.
pub const UNEXPECTED_ERROR_MESSAGE: &str =
    "An unexpected error occurred during the automation flow.";

/// netauto domain errors.
///
/// Variants are `Clone` so a [`crate::pipeline::PipelineResult`] can carry
/// the failure alongside the artifacts produced before it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AutomationError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("authentication failed after {attempts} attempt(s)")]
    Auth { attempts: u32 },

    #[error("command generation failed: {0}")]
    Generation(String),

    #[error("command generation backend unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("validation backend unavailable: {0}")]
    ValidationUnavailable(String),

    #[error("commands rejected by validation: {}", .0.summary())]
    ValidationRejected(ValidationVerdict),

    #[error("An unexpected error occurred during the automation flow.")]
    Unexpected,
}

impl AutomationError {
    /// Whether the orchestrator may retry the failed operation.
    ///
    /// Transport and session faults are retryable at the orchestrator's
    /// discretion; everything else is fatal for the attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AutomationError::Connection(_)
                | AutomationError::Timeout(_)
                | AutomationError::Auth { .. }
        )
    }
}

/// Result type for netauto domain operations.
pub type Result<T> = std::result::Result<T, AutomationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::verdict::{ImpactAssessment, SecurityAssessment};

    #[test]
    fn test_error_display() {
        let err = AutomationError::DeviceNotFound("Dummy-RT9".to_string());
        assert!(err.to_string().contains("device not found"));
        assert!(err.to_string().contains("Dummy-RT9"));

        let err = AutomationError::Auth { attempts: 3 };
        assert!(err.to_string().contains("3 attempt"));
    }

    #[test]
    fn test_unexpected_message_is_exact() {
        assert_eq!(
            AutomationError::Unexpected.to_string(),
            "An unexpected error occurred during the automation flow."
        );
    }

    #[test]
    fn test_rejected_carries_verdict() {
        let verdict = ValidationVerdict {
            syntax_valid: false,
            device_compatible: true,
            security: SecurityAssessment::Pass,
            impact: ImpactAssessment::LowRisk,
        };
        let err = AutomationError::ValidationRejected(verdict);
        assert!(err.to_string().contains("rejected by validation"));
        match err {
            AutomationError::ValidationRejected(v) => assert!(!v.syntax_valid),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_retryability() {
        assert!(AutomationError::Connection("refused".into()).is_retryable());
        assert!(AutomationError::Timeout("prompt '>'".into()).is_retryable());
        assert!(!AutomationError::DeviceNotFound("x".into()).is_retryable());
        assert!(!AutomationError::Unexpected.is_retryable());
    }
}
