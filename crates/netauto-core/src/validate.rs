//! Command validation collaborator.
//!
//! The pipeline depends on the [`CommandValidator`] trait; the shipped
//! [`RuleValidator`] is a deterministic screen standing in for an
//! autonomous validation agent, using the same verdict shape.

use crate::domain::{
    AutomationError, CommandSet, DeviceClass, ImpactAssessment, Result, SecurityAssessment,
    ValidationVerdict,
};
use async_trait::async_trait;

/// Judges a command set for syntax, compatibility, and safety.
#[async_trait]
pub trait CommandValidator: Send + Sync {
    async fn validate(
        &self,
        commands: &CommandSet,
        device_class: DeviceClass,
    ) -> Result<ValidationVerdict>;
}

/// Leading keywords accepted as IOS configuration syntax.
const KNOWN_KEYWORDS: &[&str] = &[
    "interface",
    "description",
    "ip",
    "no",
    "hostname",
    "router",
    "network",
    "exit",
    "end",
    "shutdown",
    "line",
    "login",
    "password",
    "duplex",
    "speed",
    "bandwidth",
    "mtu",
    "encapsulation",
    "access-list",
    "service",
    "clock",
    "ntp",
    "snmp-server",
    "banner",
];

/// Commands that must never reach a device through this pipeline.
const DESTRUCTIVE_FRAGMENTS: &[&str] = &["erase", "reload", "format", "write erase", "delete flash"];

/// Interface families per device class; referencing an unsupported family
/// marks the set incompatible.
const UNSUPPORTED_INTERFACES: &[(DeviceClass, &str)] = &[
    (DeviceClass::Cisco3725, "gigabitethernet"),
    (DeviceClass::Cisco7200, "tengigabitethernet"),
];

/// Deterministic rule-based validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleValidator;

impl RuleValidator {
    pub fn new() -> Self {
        Self
    }

    fn syntax_valid(commands: &CommandSet) -> bool {
        !commands.is_empty()
            && commands.lines().iter().all(|line| {
                let first = line
                    .split_whitespace()
                    .next()
                    .unwrap_or("")
                    .to_ascii_lowercase();
                KNOWN_KEYWORDS.contains(&first.as_str())
            })
    }

    fn device_compatible(commands: &CommandSet, device_class: DeviceClass) -> bool {
        UNSUPPORTED_INTERFACES
            .iter()
            .filter(|(class, _)| *class == device_class)
            .all(|(_, family)| !commands.contains(family))
    }

    fn security(commands: &CommandSet) -> SecurityAssessment {
        let destructive = DESTRUCTIVE_FRAGMENTS
            .iter()
            .any(|fragment| commands.contains(fragment));
        if destructive {
            return SecurityAssessment::Fail;
        }

        // A bare `shutdown` takes an interface down; flag it, don't block.
        let disruptive = commands
            .lines()
            .iter()
            .any(|line| line.trim().eq_ignore_ascii_case("shutdown"));
        if disruptive {
            SecurityAssessment::Warn
        } else {
            SecurityAssessment::Pass
        }
    }

    fn impact(security: SecurityAssessment) -> ImpactAssessment {
        match security {
            SecurityAssessment::Pass => ImpactAssessment::LowRisk,
            SecurityAssessment::Warn => ImpactAssessment::MediumRisk,
            SecurityAssessment::Fail => ImpactAssessment::HighRisk,
        }
    }
}

#[async_trait]
impl CommandValidator for RuleValidator {
    async fn validate(
        &self,
        commands: &CommandSet,
        device_class: DeviceClass,
    ) -> Result<ValidationVerdict> {
        if commands.is_empty() {
            return Err(AutomationError::Generation(
                "cannot validate an empty command set".to_string(),
            ));
        }

        let security = Self::security(commands);
        Ok(ValidationVerdict {
            syntax_valid: Self::syntax_valid(commands),
            device_compatible: Self::device_compatible(commands, device_class),
            security,
            impact: Self::impact(security),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn verdict_for(raw: &str) -> ValidationVerdict {
        RuleValidator::new()
            .validate(&CommandSet::parse(raw), DeviceClass::Cisco3725)
            .await
            .expect("validate")
    }

    #[tokio::test]
    async fn test_clean_interface_config_passes() {
        let verdict =
            verdict_for("interface fastethernet0/0\ndescription NEW-INT\nno shutdown").await;
        assert!(verdict.syntax_valid);
        assert!(verdict.device_compatible);
        assert_eq!(verdict.security, SecurityAssessment::Pass);
        assert_eq!(verdict.impact, ImpactAssessment::LowRisk);
        assert!(verdict.approved());
    }

    #[tokio::test]
    async fn test_destructive_command_fails_security() {
        let verdict = verdict_for("interface fastethernet0/0\nreload").await;
        assert_eq!(verdict.security, SecurityAssessment::Fail);
        assert_eq!(verdict.impact, ImpactAssessment::HighRisk);
        assert!(!verdict.approved());
    }

    #[tokio::test]
    async fn test_bare_shutdown_warns_but_passes_gate() {
        let verdict = verdict_for("interface fastethernet0/0\nshutdown").await;
        assert_eq!(verdict.security, SecurityAssessment::Warn);
        assert_eq!(verdict.impact, ImpactAssessment::MediumRisk);
        assert!(verdict.approved());
    }

    #[tokio::test]
    async fn test_unknown_keyword_invalidates_syntax() {
        let verdict = verdict_for("frobnicate the uplink").await;
        assert!(!verdict.syntax_valid);
        assert!(!verdict.approved());
    }

    #[tokio::test]
    async fn test_unsupported_interface_family_incompatible() {
        let verdict = verdict_for("interface gigabitethernet0/0\nno shutdown").await;
        assert!(!verdict.device_compatible);
        assert!(!verdict.approved());
    }

    #[tokio::test]
    async fn test_gigabit_fine_on_7200() {
        let verdict = RuleValidator::new()
            .validate(
                &CommandSet::parse("interface gigabitethernet0/0\nno shutdown"),
                DeviceClass::Cisco7200,
            )
            .await
            .expect("validate");
        assert!(verdict.device_compatible);
    }

    #[tokio::test]
    async fn test_empty_set_is_a_generation_error() {
        let err = RuleValidator::new()
            .validate(&CommandSet::parse(""), DeviceClass::Cisco3725)
            .await
            .unwrap_err();
        assert!(matches!(err, AutomationError::Generation(_)));
    }
}
