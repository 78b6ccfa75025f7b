//! Domain types shared across the netauto pipeline.

pub mod commands;
pub mod device;
pub mod error;
pub mod verdict;

pub use commands::CommandSet;
pub use device::{DeviceClass, DeviceDescriptor};
pub use error::{AutomationError, Result, UNEXPECTED_ERROR_MESSAGE};
pub use verdict::{ImpactAssessment, SecurityAssessment, ValidationVerdict};
