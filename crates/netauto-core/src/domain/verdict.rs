//! Validation verdicts gating deployment.

use serde::{Deserialize, Serialize};

/// Security screening outcome for a command set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityAssessment {
    Pass,
    Warn,
    Fail,
}

/// Estimated blast radius of applying a command set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImpactAssessment {
    LowRisk,
    MediumRisk,
    HighRisk,
}

/// Structured safety/compatibility judgment for one deployment attempt.
///
/// Created once per attempt by the validation collaborator; immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    /// Whether every line parses as valid device syntax.
    pub syntax_valid: bool,

    /// Whether the commands are supported by the target device class.
    pub device_compatible: bool,

    /// Security screening outcome.
    pub security: SecurityAssessment,

    /// Impact estimate.
    pub impact: ImpactAssessment,
}

impl ValidationVerdict {
    /// Verdict that clears every gate.
    pub fn pass() -> Self {
        Self {
            syntax_valid: true,
            device_compatible: true,
            security: SecurityAssessment::Pass,
            impact: ImpactAssessment::LowRisk,
        }
    }

    /// Whether deployment may proceed.
    ///
    /// Invalid syntax, an incompatible device class, or a security FAIL
    /// all block the session state machine from ever seeing the commands.
    pub fn approved(&self) -> bool {
        self.syntax_valid && self.device_compatible && self.security != SecurityAssessment::Fail
    }

    /// One-line summary for error messages and logs.
    pub fn summary(&self) -> String {
        format!(
            "syntax_valid={}, device_compatible={}, security={:?}, impact={:?}",
            self.syntax_valid, self.device_compatible, self.security, self.impact
        )
    }
}
