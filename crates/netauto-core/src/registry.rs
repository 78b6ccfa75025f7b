//! Static device catalog with pure name lookup.

use crate::domain::{AutomationError, DeviceClass, DeviceDescriptor, Result};
use std::collections::BTreeMap;

/// Read-only catalog of known devices.
///
/// Loaded once, then shared (`Arc`) across concurrent pipeline runs. Pure
/// lookup, no mutation, no side effects.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    devices: BTreeMap<String, DeviceDescriptor>,
}

impl DeviceRegistry {
    pub fn new(devices: Vec<DeviceDescriptor>) -> Self {
        let devices = devices
            .into_iter()
            .map(|d| (d.name.clone(), d))
            .collect();
        Self { devices }
    }

    /// Load a catalog from a JSON array of descriptors.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let devices: Vec<DeviceDescriptor> = serde_json::from_str(json)?;
        Ok(Self::new(devices))
    }

    /// The default lab catalog: two simulated and two real Cisco 3725
    /// routers on the standard GNS3 console addresses.
    pub fn builtin() -> Self {
        Self::new(vec![
            DeviceDescriptor::new("Dummy-RT1", "10.255.255.3:23", DeviceClass::Cisco3725, true),
            DeviceDescriptor::new("Dummy-RT2", "10.255.255.4:23", DeviceClass::Cisco3725, true),
            DeviceDescriptor::new(
                "Real-RT1",
                "172.16.39.102:23",
                DeviceClass::Cisco3725,
                false,
            ),
            DeviceDescriptor::new(
                "Real-RT2",
                "172.16.39.103:23",
                DeviceClass::Cisco3725,
                false,
            ),
        ])
    }

    /// Resolve a device by name.
    pub fn lookup(&self, name: &str) -> Result<&DeviceDescriptor> {
        self.devices
            .get(name)
            .ok_or_else(|| AutomationError::DeviceNotFound(name.to_string()))
    }

    /// All descriptors, ordered by name.
    pub fn devices(&self) -> impl Iterator<Item = &DeviceDescriptor> {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let registry = DeviceRegistry::builtin();
        assert_eq!(registry.len(), 4);

        let dummy = registry.lookup("Dummy-RT1").expect("lookup");
        assert!(dummy.simulated);
        assert_eq!(dummy.address, "10.255.255.3:23");

        let real = registry.lookup("Real-RT1").expect("lookup");
        assert!(!real.simulated);
        assert_eq!(real.device_class, DeviceClass::Cisco3725);
    }

    #[test]
    fn test_lookup_unknown_fails() {
        let registry = DeviceRegistry::builtin();
        let err = registry.lookup("Ghost-RT9").unwrap_err();
        assert!(matches!(err, AutomationError::DeviceNotFound(name) if name == "Ghost-RT9"));
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            {
                "name": "Lab-RT1",
                "address": "192.0.2.1:23",
                "device_class": "cisco_7200",
                "simulated": true
            }
        ]"#;
        let registry = DeviceRegistry::from_json(json).expect("load");
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.lookup("Lab-RT1").unwrap().device_class,
            DeviceClass::Cisco7200
        );
    }

    #[test]
    fn test_devices_iterates_in_name_order() {
        let registry = DeviceRegistry::builtin();
        let names: Vec<&str> = registry.devices().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Dummy-RT1", "Dummy-RT2", "Real-RT1", "Real-RT2"]);
    }
}
