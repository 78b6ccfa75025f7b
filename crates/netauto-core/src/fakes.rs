//! In-memory fakes for exercising the pipeline without real backends.
//!
//! Shipped as a normal module (not test-only) so integration tests and
//! downstream consumers can rehearse flows against deterministic
//! collaborators.

use crate::domain::{
    AutomationError, CommandSet, DeviceClass, DeviceDescriptor, Result, ValidationVerdict,
};
use crate::generate::CommandGenerator;
use crate::transport::{DeviceStream, SessionTransport};
use crate::validate::CommandValidator;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Generator that always returns the same command set.
#[derive(Debug, Clone)]
pub struct StaticGenerator {
    commands: CommandSet,
}

impl StaticGenerator {
    pub fn new(commands: CommandSet) -> Self {
        Self { commands }
    }

    /// The canonical lab fixture: interface description change plus
    /// `no shutdown`.
    pub fn interface_description() -> Self {
        Self::new(CommandSet::parse(
            "interface fastethernet0/0\ndescription NEW-INT\nno shutdown",
        ))
    }
}

#[async_trait]
impl CommandGenerator for StaticGenerator {
    async fn generate(&self, _intent: &str, _device: &DeviceDescriptor) -> Result<CommandSet> {
        Ok(self.commands.clone())
    }
}

/// Generator whose backend is down.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableGenerator;

#[async_trait]
impl CommandGenerator for UnavailableGenerator {
    async fn generate(&self, _intent: &str, _device: &DeviceDescriptor) -> Result<CommandSet> {
        Err(AutomationError::GenerationUnavailable(
            "backend offline".to_string(),
        ))
    }
}

/// Generator that panics, for exercising the fail-closed catch-all.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanickingGenerator;

#[async_trait]
impl CommandGenerator for PanickingGenerator {
    async fn generate(&self, _intent: &str, _device: &DeviceDescriptor) -> Result<CommandSet> {
        panic!("injected fault");
    }
}

/// Validator that always returns the same verdict.
#[derive(Debug, Clone)]
pub struct StaticValidator {
    verdict: ValidationVerdict,
}

impl StaticValidator {
    pub fn new(verdict: ValidationVerdict) -> Self {
        Self { verdict }
    }

    pub fn passing() -> Self {
        Self::new(ValidationVerdict::pass())
    }
}

#[async_trait]
impl CommandValidator for StaticValidator {
    async fn validate(
        &self,
        _commands: &CommandSet,
        _device_class: DeviceClass,
    ) -> Result<ValidationVerdict> {
        Ok(self.verdict.clone())
    }
}

/// Validator whose backend is down.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableValidator;

#[async_trait]
impl CommandValidator for UnavailableValidator {
    async fn validate(
        &self,
        _commands: &CommandSet,
        _device_class: DeviceClass,
    ) -> Result<ValidationVerdict> {
        Err(AutomationError::ValidationUnavailable(
            "agent backend offline".to_string(),
        ))
    }
}

/// Transport wrapper that counts `open` calls.
///
/// The validation gate is observable through this: a rejected command set
/// must leave the count at zero.
pub struct CountingTransport {
    inner: Arc<dyn SessionTransport>,
    opens: AtomicUsize,
}

impl CountingTransport {
    pub fn new(inner: Arc<dyn SessionTransport>) -> Self {
        Self {
            inner,
            opens: AtomicUsize::new(0),
        }
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionTransport for CountingTransport {
    async fn open(&self, device: &DeviceDescriptor) -> Result<Box<dyn DeviceStream>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.open(device).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::SimulatedTransport;

    fn dummy_device() -> DeviceDescriptor {
        DeviceDescriptor::new("Dummy-RT1", "10.255.255.3:23", DeviceClass::Cisco3725, true)
    }

    #[tokio::test]
    async fn test_static_generator_fixture() {
        let commands = StaticGenerator::interface_description()
            .generate("whatever", &dummy_device())
            .await
            .expect("generate");
        assert_eq!(commands.len(), 3);
        assert!(commands.contains("description NEW-INT"));
    }

    #[tokio::test]
    async fn test_counting_transport_counts() {
        let transport = CountingTransport::new(Arc::new(SimulatedTransport::new()));
        assert_eq!(transport.opens(), 0);
        let _ = transport.open(&dummy_device()).await.expect("open");
        let _ = transport.open(&dummy_device()).await.expect("open");
        assert_eq!(transport.opens(), 2);
    }
}
