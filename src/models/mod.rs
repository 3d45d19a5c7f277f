use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Canonical inventory group tags
pub mod group {
    pub const IOS: &str = "ios_devices";
    pub const IOS_XE: &str = "iosXE_devices";

    /// Groups whose members are driven as IOS-XE devices in the test-bed
    pub const IOSXE_FAMILY: &[&str] = &[IOS_XE, IOS];
}

/// Canonical test-bed OS values
pub mod device_os {
    pub const IOSXE: &str = "iosxe";
}

/// A single row from the device CSV
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub name: String,
    pub address: String,
}

/// InventoryEntry describes how to reach one managed device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub hostname: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl InventoryEntry {
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

/// Inventory maps normalized device names to entries, in insertion order
pub type Inventory = IndexMap<String, InventoryEntry>;

/// Host is the runtime view of an inventory entry handed to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub name: String,
    pub address: String,
    pub groups: Vec<String>,
}

impl Host {
    pub fn from_entry(name: &str, entry: &InventoryEntry) -> Self {
        Self {
            name: name.to_string(),
            address: entry.hostname.clone(),
            groups: entry.groups.clone(),
        }
    }

    /// True for members of the IOS / IOS-XE groups the show commands target
    pub fn is_ios(&self) -> bool {
        self.groups.iter().any(|g| group::IOSXE_FAMILY.contains(&g.as_str()))
    }
}

/// Build the host list for an inventory, preserving order
pub fn hosts_from_inventory(inventory: &Inventory) -> Vec<Host> {
    inventory
        .iter()
        .map(|(name, entry)| Host::from_entry(name, entry))
        .collect()
}

/// CLI connection parameters of a test-bed device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConnection {
    pub ip: String,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connections {
    pub cli: CliConnection,
}

/// TestbedDevice is the per-device connection descriptor of the test-bed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestbedDevice {
    pub connections: Connections,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub os: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none", default)]
    pub device_type: Option<String>,
}

/// Testbed is the document written to the test-bed file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Testbed {
    pub devices: IndexMap<String, TestbedDevice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_group() {
        let entry = InventoryEntry {
            hostname: "10.0.0.1".into(),
            groups: vec![group::IOS.into()],
        };
        assert!(entry.in_group("ios_devices"));
        assert!(!entry.in_group("iosXE_devices"));
    }

    #[test]
    fn test_hosts_from_inventory_keeps_order() {
        let mut inv = Inventory::new();
        for (name, ip) in [("b-swn-1", "10.0.0.2"), ("a-swn-1", "10.0.0.1")] {
            inv.insert(
                name.into(),
                InventoryEntry { hostname: ip.into(), groups: vec![group::IOS.into()] },
            );
        }
        let hosts = hosts_from_inventory(&inv);
        assert_eq!(hosts[0].name, "b-swn-1");
        assert_eq!(hosts[1].address, "10.0.0.1");
    }

    #[test]
    fn test_host_is_ios() {
        let entry = InventoryEntry { hostname: "10.0.0.1".into(), groups: vec![group::IOS_XE.into()] };
        assert!(Host::from_entry("a-swn-1", &entry).is_ios());

        let other = InventoryEntry { hostname: "10.0.0.2".into(), groups: vec!["linux".into()] };
        assert!(!Host::from_entry("a-srv-1", &other).is_ios());
    }
}
