//! Interactive device session state machine.
//!
//! Drives prompt detection, authentication, privilege escalation, strict
//! FIFO command replay, and output capture over any [`SessionTransport`].
//! The state machine never retries on its own; retry is orchestrator
//! policy (`pipeline.rs`).

use crate::domain::{AutomationError, CommandSet, DeviceDescriptor, Result};
use crate::steplog::StepLogger;
use crate::transport::{DeviceStream, SessionTransport};
use std::time::Duration;
use tracing::{debug, warn};

/// User-mode prompt terminator.
const USER_PROMPT: &str = ">";
/// Privileged-mode prompt terminator.
const PRIV_PROMPT: &str = "#";

/// Session lifecycle states.
///
/// `Failed` is absorbing: any transport error lands here and the session
/// cannot be reused afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Authenticating,
    UserMode,
    PrivilegedMode,
    Sending,
    Reading,
    Closed,
    Failed,
}

/// Tunable deadlines and attempt bounds for one session.
#[derive(Debug, Clone)]
pub struct SessionTimeouts {
    /// Deadline for each read-until-prompt operation.
    pub prompt: Duration,

    /// Login attempts before giving up with an auth failure.
    pub max_auth_attempts: u32,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            prompt: Duration::from_secs(5),
            max_auth_attempts: 3,
        }
    }
}

/// One interactive session against one device.
///
/// Borrows the per-run [`StepLogger`]; owns the transport stream and
/// guarantees it is closed on every exit path, including failures.
pub struct DeviceSession<'a> {
    device: &'a DeviceDescriptor,
    log: &'a StepLogger,
    timeouts: SessionTimeouts,
    state: SessionState,
    stream: Option<Box<dyn DeviceStream>>,
}

impl<'a> DeviceSession<'a> {
    pub fn new(device: &'a DeviceDescriptor, log: &'a StepLogger, timeouts: SessionTimeouts) -> Self {
        Self {
            device,
            log,
            timeouts,
            state: SessionState::Disconnected,
            stream: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Connect and authenticate, landing in user mode.
    pub async fn connect(&mut self, transport: &dyn SessionTransport) -> Result<()> {
        self.state = SessionState::Connecting;
        self.log.record(format!(
            "Connecting to {} ({})...",
            self.device.name, self.device.address
        ));

        let stream = match transport.open(self.device).await {
            Ok(stream) => stream,
            Err(e) => {
                self.state = SessionState::Failed;
                return Err(e);
            }
        };
        self.stream = Some(stream);

        self.state = SessionState::Authenticating;
        self.log.record("Authenticating with device...");

        let attempts = self.timeouts.max_auth_attempts.max(1);
        for attempt in 1..=attempts {
            // Wake the console, then wait for the user-mode prompt.
            self.send_raw("\r\n").await?;
            match self.expect(USER_PROMPT).await {
                Ok(_) => {
                    self.state = SessionState::UserMode;
                    return Ok(());
                }
                Err(AutomationError::Timeout(_)) if attempt < attempts => {
                    warn!(
                        device = %self.device.name,
                        attempt,
                        "no user prompt, retrying login"
                    );
                }
                Err(e) => return Err(self.fail(e).await),
            }
        }

        Err(self.fail(AutomationError::Auth { attempts }).await)
    }

    /// Escalate from user mode to privileged mode.
    pub async fn enter_privileged(&mut self) -> Result<()> {
        debug_assert_eq!(self.state, SessionState::UserMode);
        self.log.record("Entering privileged mode...");

        self.send_line("enable").await?;
        self.read_to_prompt(PRIV_PROMPT).await?;
        // Disable paging so long outputs arrive in one read.
        self.send_line("terminal length 0").await?;
        self.read_to_prompt(PRIV_PROMPT).await?;

        self.state = SessionState::PrivilegedMode;
        Ok(())
    }

    /// Replay a validated command set, strictly in order, and return the
    /// captured output prefixed with the execution-mode banner.
    pub async fn deploy(&mut self, commands: &CommandSet) -> Result<String> {
        debug_assert_eq!(self.state, SessionState::PrivilegedMode);

        self.log.record("Entering configuration mode...");
        self.send_line("configure terminal").await?;
        let mut captured = self.read_to_prompt(PRIV_PROMPT).await?;

        self.log.record(format!(
            "Sending {} configuration command(s)...",
            commands.len()
        ));
        for line in commands {
            // One line per send; the device echoes it back before the
            // next prompt.
            self.state = SessionState::Sending;
            self.send_line(line).await?;

            self.state = SessionState::Reading;
            let output = self.read_to_prompt(PRIV_PROMPT).await?;
            captured.push_str(&output);
        }

        self.log.record("Processing command output...");
        self.send_line("end").await?;
        captured.push_str(&self.read_to_prompt(PRIV_PROMPT).await?);
        self.send_line("write memory").await?;
        captured.push_str(&self.read_to_prompt(PRIV_PROMPT).await?);
        self.state = SessionState::PrivilegedMode;

        self.log.record("Validating applied configuration...");
        self.log
            .record("Configuration deployment completed successfully");

        Ok(format!(
            "{}\n{} Configuration Applied Successfully\n{}",
            self.device.execution_mode_banner(),
            self.device.device_class,
            captured
        ))
    }

    /// Retrieve the running configuration, with the granular step trail
    /// observers rely on.
    pub async fn retrieve_config(&mut self) -> Result<String> {
        debug_assert_eq!(self.state, SessionState::PrivilegedMode);

        self.log.record("Retrieving running configuration...");
        self.state = SessionState::Sending;
        self.send_line("show running-config").await?;

        self.state = SessionState::Reading;
        let raw = self.read_to_prompt(PRIV_PROMPT).await?;
        self.state = SessionState::PrivilegedMode;

        self.log.record("Parsing configuration data...");
        self.log.record("Extracting interface configurations...");
        self.log.record("Processing routing protocols...");
        self.log.record("Validating configuration syntax...");
        self.log
            .record("Configuration retrieval completed successfully");

        Ok(format!(
            "{}\n{}",
            self.device.execution_mode_banner(),
            raw
        ))
    }

    /// Close the session cleanly. Safe to call in any state.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            // Best-effort goodbye; the device may already be gone.
            let _ = stream.send(b"exit\r\n").await;
            stream.close().await?;
        }
        if self.state != SessionState::Failed {
            self.state = SessionState::Closed;
        }
        Ok(())
    }

    /// Transition to `Failed`, releasing the transport before the error
    /// propagates. The stream must never outlive a failed session.
    async fn fail(&mut self, err: AutomationError) -> AutomationError {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.close().await;
        }
        self.state = SessionState::Failed;
        err
    }

    async fn send_raw(&mut self, text: &str) -> Result<()> {
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => {
                return Err(self
                    .fail(AutomationError::Connection("session not connected".into()))
                    .await)
            }
        };
        match stream.send(text.as_bytes()).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e).await),
        }
    }

    async fn send_line(&mut self, line: &str) -> Result<()> {
        debug!(device = %self.device.name, %line, "sending line");
        self.send_raw(&format!("{line}\r\n")).await
    }

    /// Read until `pattern`, failing the session on any transport error.
    async fn read_to_prompt(&mut self, pattern: &str) -> Result<String> {
        match self.expect(pattern).await {
            Ok(output) => Ok(output),
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// Read until `pattern` without failing the session (auth retries need
    /// to survive a missed prompt).
    async fn expect(&mut self, pattern: &str) -> Result<String> {
        let timeout = self.timeouts.prompt;
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => {
                return Err(AutomationError::Connection(
                    "session not connected".into(),
                ))
            }
        };
        stream.read_until(pattern, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DeviceClass;
    use crate::transport::SimulatedTransport;

    fn dummy_device() -> DeviceDescriptor {
        DeviceDescriptor::new("Dummy-RT1", "10.255.255.3:23", DeviceClass::Cisco3725, true)
    }

    fn real_device() -> DeviceDescriptor {
        DeviceDescriptor::new("Real-RT1", "172.16.39.102:23", DeviceClass::Cisco3725, false)
    }

    #[tokio::test]
    async fn test_connect_reaches_user_mode() {
        let device = dummy_device();
        let log = StepLogger::new();
        let mut session = DeviceSession::new(&device, &log, SessionTimeouts::default());

        session
            .connect(&SimulatedTransport::new())
            .await
            .expect("connect");
        assert_eq!(session.state(), SessionState::UserMode);

        let messages: Vec<String> = log.entries().into_iter().map(|e| e.message).collect();
        assert!(messages[0].contains("Connecting to Dummy-RT1"));
        assert!(messages[1].contains("Authenticating"));
    }

    #[tokio::test]
    async fn test_deploy_preserves_command_order() {
        let device = dummy_device();
        let log = StepLogger::new();
        let mut session = DeviceSession::new(&device, &log, SessionTimeouts::default());
        session
            .connect(&SimulatedTransport::new())
            .await
            .expect("connect");
        session.enter_privileged().await.expect("enable");

        let commands = CommandSet::parse(
            "interface fastethernet0/0\ndescription NEW-INT\nno shutdown",
        );
        let output = session.deploy(&commands).await.expect("deploy");
        session.close().await.expect("close");

        let first = output.find("interface fastethernet0/0").expect("first line");
        let second = output.find("description NEW-INT").expect("second line");
        let third = output.find("no shutdown").expect("third line");
        assert!(first < second && second < third, "order must be preserved");
        assert!(output.starts_with("DUMMY DEVICE SIMULATION"));
        assert!(output.contains("Cisco 3725"));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_real_device_banner() {
        let device = real_device();
        assert_eq!(device.execution_mode_banner(), "REAL DEVICE");
        // Transport choice is the selector's job; a simulated stream under
        // a real descriptor still gets the real banner from the session.
        let log = StepLogger::new();
        let mut session = DeviceSession::new(&device, &log, SessionTimeouts::default());
        session
            .connect(&SimulatedTransport::new())
            .await
            .expect("connect");
        session.enter_privileged().await.expect("enable");

        let commands = CommandSet::parse("interface fastethernet0/0");
        let output = session.deploy(&commands).await.expect("deploy");
        assert!(output.starts_with("REAL DEVICE"));
        assert!(!output.contains("DUMMY DEVICE SIMULATION"));
    }

    #[tokio::test]
    async fn test_retrieval_step_trail() {
        let device = dummy_device();
        let log = StepLogger::new();
        let mut session = DeviceSession::new(&device, &log, SessionTimeouts::default());
        session
            .connect(&SimulatedTransport::new())
            .await
            .expect("connect");
        session.enter_privileged().await.expect("enable");

        let config = session.retrieve_config().await.expect("retrieve");
        session.close().await.expect("close");

        assert!(config.contains("DUMMY DEVICE SIMULATION"));
        assert!(config.contains("version 12.4"));
        assert!(config.contains("interface FastEthernet0/0"));

        let entries = log.entries();
        assert!(entries.len() >= 8, "expected >= 8 steps, got {}", entries.len());
        let messages: Vec<&str> = entries.iter().map(|e| e.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.contains("Connecting to")));
        assert!(messages.iter().any(|m| m.contains("Retrieving running configuration")));
        assert!(messages
            .iter()
            .any(|m| m.contains("Configuration retrieval completed")));
        for pair in entries.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[tokio::test]
    async fn test_failure_is_absorbing_and_releases_stream() {
        let device = dummy_device();
        let log = StepLogger::new();
        let mut session = DeviceSession::new(&device, &log, SessionTimeouts::default());
        session
            .connect(&SimulatedTransport::new())
            .await
            .expect("connect");

        // Force a failure: ask for a prompt the responder will never emit.
        let err = session.read_to_prompt("%%NEVER%%").await.unwrap_err();
        assert!(matches!(err, AutomationError::Timeout(_)));
        assert_eq!(session.state(), SessionState::Failed);

        // Closing a failed session keeps it failed and stays safe.
        session.close().await.expect("close");
        assert_eq!(session.state(), SessionState::Failed);
    }
}
