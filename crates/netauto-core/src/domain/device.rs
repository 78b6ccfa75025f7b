//! Device descriptors and the device-class catalog.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hardware/software class of a managed device.
///
/// Determines the command dialect the validator screens against and the
/// label printed in session banners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceClass {
    #[serde(rename = "cisco_3725")]
    Cisco3725,
    #[serde(rename = "cisco_7200")]
    Cisco7200,
}

impl DeviceClass {
    /// Human-readable label, as it appears in device output banners.
    pub fn label(&self) -> &'static str {
        match self {
            DeviceClass::Cisco3725 => "Cisco 3725",
            DeviceClass::Cisco7200 => "Cisco 7200",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Immutable descriptor of one network device.
///
/// Owned by the [`crate::registry::DeviceRegistry`]; the pipeline and the
/// session state machine hold references or cheap clones, never mutate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Unique device name, e.g. `Dummy-RT1`.
    pub name: String,

    /// Console address as `host:port`.
    pub address: String,

    /// Device class.
    pub device_class: DeviceClass,

    /// Whether this is an in-process simulated device.
    ///
    /// Simulated devices are served by a canned responder and never touch
    /// the network; real devices get a TCP console session.
    pub simulated: bool,
}

impl DeviceDescriptor {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        device_class: DeviceClass,
        simulated: bool,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            device_class,
            simulated,
        }
    }

    /// Banner line distinguishing simulated from real execution.
    ///
    /// This marker is a hard contract: callers branch on its presence in
    /// deployment output, so the two strings are mutually exclusive.
    pub fn execution_mode_banner(&self) -> &'static str {
        if self.simulated {
            "DUMMY DEVICE SIMULATION"
        } else {
            "REAL DEVICE"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_class_label() {
        assert_eq!(DeviceClass::Cisco3725.label(), "Cisco 3725");
        assert_eq!(DeviceClass::Cisco3725.to_string(), "Cisco 3725");
    }

    #[test]
    fn test_execution_mode_banner_exclusive() {
        let dummy =
            DeviceDescriptor::new("Dummy-RT1", "10.255.255.3:23", DeviceClass::Cisco3725, true);
        let real =
            DeviceDescriptor::new("Real-RT1", "172.16.39.102:23", DeviceClass::Cisco3725, false);

        assert_eq!(dummy.execution_mode_banner(), "DUMMY DEVICE SIMULATION");
        assert_eq!(real.execution_mode_banner(), "REAL DEVICE");
        assert_ne!(dummy.execution_mode_banner(), real.execution_mode_banner());
    }

    #[test]
    fn test_descriptor_serde_round_trip() {
        let json = r#"{
            "name": "Dummy-RT1",
            "address": "10.255.255.3:23",
            "device_class": "cisco_3725",
            "simulated": true
        }"#;
        let device: DeviceDescriptor = serde_json::from_str(json).expect("deserialize");
        assert_eq!(device.name, "Dummy-RT1");
        assert_eq!(device.device_class, DeviceClass::Cisco3725);
        assert!(device.simulated);
    }
}
