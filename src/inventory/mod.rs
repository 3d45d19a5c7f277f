//! CSV device list to inventory conversion, and the inventory file format.
//!
//! The inventory file is a YAML document that starts with the `---` marker
//! followed by a blank line, then a mapping of device name to
//! `{hostname, groups}`.

use std::fs::File;
use std::path::Path;

use crate::config::Config;
use crate::error::OpsError;
use crate::models::{group, DeviceRecord, Inventory, InventoryEntry};
use crate::utils;

/// Document start marker shared by the inventory and test-bed files
pub const DOCUMENT_MARKER: &str = "---\n\n";

/// Settings that shape the CSV conversion
#[derive(Debug, Clone)]
pub struct InventoryOptions {
    /// Platform tokens that admit a row into the inventory
    pub platforms: Vec<String>,
    /// Domain suffixes removed from device names
    pub domain_names: Vec<String>,
    /// Group tag assigned to every converted device
    pub group: String,
}

impl InventoryOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            platforms: cfg.inventory_platforms.clone(),
            domain_names: cfg.domain_names.to_vec(),
            group: group::IOS.to_string(),
        }
    }
}

/// Read the device rows of a `;`-delimited CSV file, skipping the header
pub fn read_device_records(path: &Path) -> Result<Vec<DeviceRecord>, OpsError> {
    let file = File::open(path).map_err(|e| OpsError::from_io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut records = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        let row = row?;
        match (row.get(0), row.get(1)) {
            (Some(name), Some(address)) if !name.is_empty() => records.push(DeviceRecord {
                name: name.to_string(),
                address: address.to_string(),
            }),
            _ => {
                // +2: one for the header, one for 1-based line numbers
                tracing::warn!("Skipping CSV line {}: expected name;address", idx + 2);
            }
        }
    }
    Ok(records)
}

/// Normalize a device name into its inventory key: lower-cased, with the
/// configured domain names removed.
pub fn normalize_name(name: &str, domain_names: &[String]) -> String {
    let mut key = name.to_lowercase();
    for domain in domain_names.iter().filter(|d| !d.is_empty()) {
        key = key.replace(&domain.to_lowercase(), "");
    }
    key
}

/// Convert CSV rows into an inventory. Rows whose platform token is not in
/// `opts.platforms` are dropped. A repeated normalized name replaces the
/// earlier entry in place and logs a warning.
pub fn records_to_inventory(records: &[DeviceRecord], opts: &InventoryOptions) -> Inventory {
    let mut inventory = Inventory::new();

    for record in records {
        let lowered = record.name.to_lowercase();
        if !utils::has_platform(&lowered, &opts.platforms) {
            tracing::debug!("Skipping {}: platform not managed", record.name);
            continue;
        }

        let key = normalize_name(&record.name, &opts.domain_names);
        let entry = InventoryEntry {
            hostname: record.address.clone(),
            groups: vec![opts.group.clone()],
        };

        if let Some(previous) = inventory.insert(key.clone(), entry) {
            tracing::warn!(
                "Duplicate device name {}: {} replaced by {}",
                key,
                previous.hostname,
                record.address
            );
        }
    }

    inventory
}

/// Read a CSV file and convert it into an inventory
pub fn csv_to_inventory(path: &Path, opts: &InventoryOptions) -> Result<Inventory, OpsError> {
    let records = read_device_records(path)?;
    let inventory = records_to_inventory(&records, opts);
    tracing::info!(
        "Converted {} of {} CSV rows from {}",
        inventory.len(),
        records.len(),
        path.display()
    );
    Ok(inventory)
}

/// Render the inventory document, marker included
pub fn serialize_inventory(inventory: &Inventory) -> Result<String, OpsError> {
    Ok(format!("{}{}", DOCUMENT_MARKER, serde_yaml::to_string(inventory)?))
}

/// Parse an inventory document produced by `serialize_inventory`
pub fn parse_inventory(content: &str) -> Result<Inventory, OpsError> {
    if is_blank_document(content) {
        return Ok(Inventory::new());
    }
    Ok(serde_yaml::from_str(content)?)
}

/// Write the inventory file atomically
pub fn write_inventory(path: &Path, inventory: &Inventory) -> Result<(), OpsError> {
    let document = serialize_inventory(inventory)?;
    utils::write_atomic(path, &document)?;
    tracing::info!("Wrote {} devices to {}", inventory.len(), path.display());
    Ok(())
}

/// Load the inventory file
pub fn read_inventory(path: &Path) -> Result<Inventory, OpsError> {
    let content = utils::read_file(path)?;
    parse_inventory(&content)
}

/// A document holding nothing but the start marker
pub(crate) fn is_blank_document(content: &str) -> bool {
    let body = content.trim();
    body.is_empty() || body == "---"
}
