//! netauto core library
//!
//! Orchestrates GenAI-driven network configuration changes: a
//! natural-language intent is turned into IOS-style commands by a
//! generation collaborator, screened by a validation collaborator, and
//! replayed over an interactive device session (real telnet console or
//! in-process simulator), with a per-run audit trail of every step.

pub mod domain;
pub mod fakes;
pub mod generate;
pub mod pipeline;
pub mod registry;
pub mod session;
pub mod steplog;
pub mod transport;
pub mod validate;

pub use domain::{
    AutomationError, CommandSet, DeviceClass, DeviceDescriptor, ImpactAssessment, Result,
    SecurityAssessment, ValidationVerdict, UNEXPECTED_ERROR_MESSAGE,
};

pub use generate::{CommandGenerator, OllamaConfig, OllamaGenerator};
pub use pipeline::{AutomationPipeline, DeploymentResult, PipelineConfig, PipelineResult};
pub use registry::DeviceRegistry;
pub use session::{DeviceSession, SessionState, SessionTimeouts};
pub use steplog::{SessionLogEntry, StepLogger};
pub use transport::{
    DeviceStream, SessionTransport, SimulatedTransport, TelnetTransport, TransportSelector,
};
pub use validate::{CommandValidator, RuleValidator};
