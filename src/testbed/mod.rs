use std::path::Path;

use crate::error::OpsError;
use crate::inventory::{self, DOCUMENT_MARKER};
use crate::models::{
    device_os, group, CliConnection, Connections, Inventory, InventoryEntry, Testbed,
    TestbedDevice,
};
use crate::utils;

/// Project one inventory entry into a test-bed device. OS and type are only
/// set when the entry belongs to one of the IOS-XE family groups.
pub fn testbed_device(entry: &InventoryEntry) -> TestbedDevice {
    let is_iosxe = group::IOSXE_FAMILY.iter().any(|g| entry.in_group(g));
    let os = is_iosxe.then(|| device_os::IOSXE.to_string());

    TestbedDevice {
        connections: Connections {
            cli: CliConnection {
                ip: entry.hostname.clone(),
                protocol: "ssh".to_string(),
            },
        },
        device_type: os.clone(),
        os,
    }
}

/// Build the test-bed for every inventory device, in inventory order
pub fn build_testbed(inventory: &Inventory) -> Testbed {
    Testbed {
        devices: inventory
            .iter()
            .map(|(name, entry)| (name.clone(), testbed_device(entry)))
            .collect(),
    }
}

pub fn serialize_testbed(testbed: &Testbed) -> Result<String, OpsError> {
    Ok(format!("{}{}", DOCUMENT_MARKER, serde_yaml::to_string(testbed)?))
}

/// Re-read the inventory file and write the test-bed file from it
pub fn build_testbed_file(inventory_path: &Path, testbed_path: &Path) -> Result<Testbed, OpsError> {
    let inventory = inventory::read_inventory(inventory_path)?;
    let testbed = build_testbed(&inventory);
    utils::write_atomic(testbed_path, &serialize_testbed(&testbed)?)?;
    tracing::info!(
        "Wrote test-bed with {} devices to {}",
        testbed.devices.len(),
        testbed_path.display()
    );
    Ok(testbed)
}
