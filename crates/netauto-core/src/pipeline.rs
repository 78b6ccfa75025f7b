//! End-to-end automation pipeline: generate, validate, deploy.
//!
//! The orchestrator owns all policy the session state machine refuses to:
//! the validation gate, connect retry with backoff, and the fail-closed
//! catch-all that turns unclassified faults into a reported failure
//! instead of a crash.

use crate::domain::{
    AutomationError, CommandSet, DeviceDescriptor, ValidationVerdict, UNEXPECTED_ERROR_MESSAGE,
};
use crate::generate::CommandGenerator;
use crate::registry::DeviceRegistry;
use crate::session::{DeviceSession, SessionTimeouts};
use crate::steplog::{SessionLogEntry, StepLogger};
use crate::transport::SessionTransport;
use crate::validate::CommandValidator;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Orchestrator policy knobs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Connect attempts before the run fails (replay itself is never
    /// retried; it is not idempotent).
    pub connect_attempts: u32,

    /// Base delay for exponential backoff between connect attempts.
    pub backoff_base: Duration,

    /// Backoff ceiling.
    pub backoff_cap: Duration,

    /// Session-level deadlines.
    pub session: SessionTimeouts,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            connect_attempts: 3,
            backoff_base: Duration::from_millis(250),
            backoff_cap: Duration::from_secs(2),
            session: SessionTimeouts::default(),
        }
    }
}

/// Session operation to run once privileged mode is reached.
enum SessionOp {
    Deploy(CommandSet),
    Retrieve,
}

/// Terminal artifact of one deployment attempt.
#[derive(Debug, Clone)]
pub struct DeploymentResult {
    /// Whether the commands were applied.
    pub success: bool,

    /// Concatenated device output, banner first. Empty if deployment was
    /// never reached.
    pub output: String,

    /// Failure message, if any.
    pub error: Option<String>,
}

impl DeploymentResult {
    fn succeeded(output: String) -> Self {
        Self {
            success: true,
            output,
            error: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(message.into()),
        }
    }
}

/// Aggregated artifacts of one end-to-end run.
///
/// Returned to the caller regardless of where the pipeline stopped; the
/// orchestrator retains nothing after handing it over.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub run_id: Uuid,

    /// Resolved target device, if lookup succeeded.
    pub device: Option<DeviceDescriptor>,

    /// Generated commands, if generation succeeded.
    pub commands: Option<CommandSet>,

    /// Validation verdict, if validation completed.
    pub verdict: Option<ValidationVerdict>,

    /// Deployment outcome. Always present; failures before deployment
    /// surface here with `success=false`.
    pub deployment: DeploymentResult,

    /// Full ordered step trail for the run.
    pub steps: Vec<SessionLogEntry>,

    /// Classified failure, when there was one. `None` on success.
    pub failure: Option<AutomationError>,
}

impl PipelineResult {
    pub fn success(&self) -> bool {
        self.deployment.success
    }
}

/// Sequences generation, validation, and deployment for one intent.
#[derive(Clone)]
pub struct AutomationPipeline {
    registry: Arc<DeviceRegistry>,
    generator: Arc<dyn CommandGenerator>,
    validator: Arc<dyn CommandValidator>,
    transport: Arc<dyn SessionTransport>,
    config: PipelineConfig,
}

impl AutomationPipeline {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        generator: Arc<dyn CommandGenerator>,
        validator: Arc<dyn CommandValidator>,
        transport: Arc<dyn SessionTransport>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            registry,
            generator,
            validator,
            transport,
            config,
        }
    }

    /// Run the full generate → validate → deploy flow.
    ///
    /// Infallible surface: every failure path, classified or not, comes
    /// back as a well-formed result with `success=false`. The flow is
    /// shielded by `catch_unwind`, so even a panicking collaborator
    /// degrades to the fixed catch-all message; cancelling the returned
    /// future drops the session and with it any open transport.
    pub async fn run(&self, intent: &str, device_name: &str) -> PipelineResult {
        let run_id = Uuid::new_v4();
        info!(%run_id, device = %device_name, "starting automation run");

        let log = StepLogger::new();
        let flow = AssertUnwindSafe(self.deploy_flow(run_id, intent, device_name, &log));
        match flow.catch_unwind().await {
            Ok(result) => result,
            Err(_panic) => {
                error!(%run_id, "automation flow aborted by unclassified fault");
                Self::unexpected_failure(run_id, &log)
            }
        }
    }

    /// Retrieve the running configuration from a device.
    ///
    /// Same session and error policy as [`run`](Self::run), without the
    /// generation and validation stages.
    pub async fn retrieve(&self, device_name: &str) -> PipelineResult {
        let run_id = Uuid::new_v4();
        info!(%run_id, device = %device_name, "starting retrieval run");

        let log = StepLogger::new();
        let flow = AssertUnwindSafe(self.retrieve_flow(run_id, device_name, &log));
        match flow.catch_unwind().await {
            Ok(result) => result,
            Err(_panic) => {
                error!(%run_id, "retrieval flow aborted by unclassified fault");
                Self::unexpected_failure(run_id, &log)
            }
        }
    }

    async fn deploy_flow(
        &self,
        run_id: Uuid,
        intent: &str,
        device_name: &str,
        log: &StepLogger,
    ) -> PipelineResult {
        // 1. Resolve the device. Fatal if unknown, never retried.
        let device = match self.registry.lookup(device_name) {
            Ok(device) => device.clone(),
            Err(e) => return Self::classified_failure(run_id, None, None, None, log, e),
        };

        // 2. Generate commands.
        log.record("Generating configuration commands from intent...");
        let commands = match self.generator.generate(intent, &device).await {
            Ok(commands) => commands,
            Err(e) => {
                warn!(%run_id, error = %e, "command generation failed");
                return Self::classified_failure(run_id, Some(device), None, None, log, e);
            }
        };
        info!(%run_id, count = commands.len(), "commands generated");

        // 3. Validate. An unapproved verdict is an unconditional gate: the
        // session state machine never sees these commands.
        log.record("Validating generated commands...");
        let verdict = match self.validator.validate(&commands, device.device_class).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(%run_id, error = %e, "validation backend failed");
                return Self::classified_failure(run_id, Some(device), Some(commands), None, log, e);
            }
        };
        if !verdict.approved() {
            warn!(%run_id, verdict = %verdict.summary(), "commands rejected by validation");
            let err = AutomationError::ValidationRejected(verdict.clone());
            return Self::classified_failure(
                run_id,
                Some(device),
                Some(commands),
                Some(verdict),
                log,
                err,
            );
        }

        // 4. Deploy over an interactive session.
        let output = match self
            .run_session(&device, log, SessionOp::Deploy(commands.clone()))
            .await
        {
            Ok(output) => output,
            Err(e) => {
                return Self::classified_failure(
                    run_id,
                    Some(device),
                    Some(commands),
                    Some(verdict),
                    log,
                    e,
                )
            }
        };

        info!(%run_id, "automation run completed");
        PipelineResult {
            run_id,
            device: Some(device),
            commands: Some(commands),
            verdict: Some(verdict),
            deployment: DeploymentResult::succeeded(output),
            steps: log.entries(),
            failure: None,
        }
    }

    async fn retrieve_flow(
        &self,
        run_id: Uuid,
        device_name: &str,
        log: &StepLogger,
    ) -> PipelineResult {
        let device = match self.registry.lookup(device_name) {
            Ok(device) => device.clone(),
            Err(e) => return Self::classified_failure(run_id, None, None, None, log, e),
        };

        let output = match self.run_session(&device, log, SessionOp::Retrieve).await {
            Ok(output) => output,
            Err(e) => {
                return Self::classified_failure(run_id, Some(device), None, None, log, e)
            }
        };

        info!(%run_id, "retrieval run completed");
        PipelineResult {
            run_id,
            device: Some(device),
            commands: None,
            verdict: None,
            deployment: DeploymentResult::succeeded(output),
            steps: log.entries(),
            failure: None,
        }
    }

    /// Connect (with bounded backoff), escalate, run `op`, close.
    ///
    /// The session guarantees the transport is released on every path;
    /// only the connect phase is retried, since command replay is not
    /// idempotent.
    async fn run_session(
        &self,
        device: &DeviceDescriptor,
        log: &StepLogger,
        op: SessionOp,
    ) -> crate::domain::Result<String> {
        let mut session = self.connect_with_backoff(device, log).await?;

        let result = match session.enter_privileged().await {
            Ok(()) => match &op {
                SessionOp::Deploy(commands) => session.deploy(commands).await,
                SessionOp::Retrieve => session.retrieve_config().await,
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(output) => {
                session.close().await?;
                Ok(output)
            }
            Err(e) => {
                // Session already transitioned to Failed and released the
                // stream; close is a no-op safety net.
                let _ = session.close().await;
                Err(e)
            }
        }
    }

    async fn connect_with_backoff<'a>(
        &self,
        device: &'a DeviceDescriptor,
        log: &'a StepLogger,
    ) -> crate::domain::Result<DeviceSession<'a>> {
        let attempts = self.config.connect_attempts.max(1);
        let mut last_err = AutomationError::Unexpected;

        for attempt in 1..=attempts {
            let mut session = DeviceSession::new(device, log, self.config.session.clone());
            match session.connect(self.transport.as_ref()).await {
                Ok(()) => return Ok(session),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        device = %device.name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "connect failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    last_err = e;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err)
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = self
            .config
            .backoff_base
            .saturating_mul(1u32 << (attempt - 1).min(16));
        exp.min(self.config.backoff_cap)
    }

    fn classified_failure(
        run_id: Uuid,
        device: Option<DeviceDescriptor>,
        commands: Option<CommandSet>,
        verdict: Option<ValidationVerdict>,
        log: &StepLogger,
        err: AutomationError,
    ) -> PipelineResult {
        log.record(format!("Run failed: {err}"));
        PipelineResult {
            run_id,
            device,
            commands,
            verdict,
            deployment: DeploymentResult::failed(err.to_string()),
            steps: log.entries(),
            failure: Some(err),
        }
    }

    fn unexpected_failure(run_id: Uuid, log: &StepLogger) -> PipelineResult {
        log.record(UNEXPECTED_ERROR_MESSAGE);
        PipelineResult {
            run_id,
            device: None,
            commands: None,
            verdict: None,
            deployment: DeploymentResult::failed(UNEXPECTED_ERROR_MESSAGE),
            steps: log.entries(),
            failure: Some(AutomationError::Unexpected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_is_bounded() {
        let pipeline_config = PipelineConfig::default();
        let pipeline = AutomationPipeline::new(
            Arc::new(crate::registry::DeviceRegistry::builtin()),
            Arc::new(crate::fakes::StaticGenerator::interface_description()),
            Arc::new(crate::fakes::StaticValidator::passing()),
            Arc::new(crate::transport::SimulatedTransport::new()),
            pipeline_config,
        );

        assert_eq!(pipeline.backoff_delay(1), Duration::from_millis(250));
        assert_eq!(pipeline.backoff_delay(2), Duration::from_millis(500));
        assert_eq!(pipeline.backoff_delay(3), Duration::from_secs(1));
        assert_eq!(pipeline.backoff_delay(4), Duration::from_secs(2));
        assert_eq!(pipeline.backoff_delay(10), Duration::from_secs(2));
    }

    #[test]
    fn test_deployment_result_constructors() {
        let ok = DeploymentResult::succeeded("output".to_string());
        assert!(ok.success);
        assert!(ok.error.is_none());

        let bad = DeploymentResult::failed("boom");
        assert!(!bad.success);
        assert_eq!(bad.error.as_deref(), Some("boom"));
        assert!(bad.output.is_empty());
    }
}
