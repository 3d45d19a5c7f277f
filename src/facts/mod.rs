//! Structured device state used by the snooping evaluation.
//!
//! Facts come either from live command output (see [`parse`]) or from a
//! JSON/YAML file keyed by device name, for offline runs.

pub mod parse;

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::OpsError;
use crate::utils;

/// IOS show commands collected from each device
pub mod commands {
    pub const CDP_NEIGHBORS_DETAIL: &str = "show cdp neighbors detail";
    pub const VLAN: &str = "show vlan";
    pub const ETHERCHANNEL_SUMMARY: &str = "show etherchannel summary";
    pub const VERSION: &str = "show version";

    /// Commands needed to build `DeviceFacts`, in the order `from_outputs` expects
    pub const HARDENING: &[&str] = &[CDP_NEIGHBORS_DETAIL, VLAN, ETHERCHANNEL_SUMMARY];
}

/// Canonical VLAN state values
pub mod vlan_state {
    pub const ACTIVE: &str = "active";
    pub const SUSPEND: &str = "suspend";
    pub const SHUTDOWN: &str = "shutdown";
    pub const UNSUPPORT: &str = "unsupport";
}

/// One CDP neighbor as seen from the local device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdpNeighbor {
    pub device_id: String,
    pub local_interface: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub port_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub platform: Option<String>,
}

/// State of a port-channel member link
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberState {
    #[serde(default)]
    pub flags: String,
    #[serde(default)]
    pub bundled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortChannel {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub flags: Option<String>,
    /// Absent when the channel has no member ports configured
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub members: Option<IndexMap<String, MemberState>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vlan {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    pub state: String,
}

/// DeviceFacts holds the three tables the evaluator reads, keyed the way the
/// device reports them: neighbor index, channel name, VLAN id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFacts {
    #[serde(default)]
    pub cdp: IndexMap<String, CdpNeighbor>,
    #[serde(default)]
    pub port_channels: IndexMap<String, PortChannel>,
    #[serde(default)]
    pub vlans: IndexMap<String, Vlan>,
}

impl DeviceFacts {
    /// Build facts from the raw output of the `commands::HARDENING` commands
    pub fn from_outputs(cdp: &str, vlan: &str, etherchannel: &str) -> Self {
        Self {
            cdp: parse::parse_cdp_neighbors_detail(cdp),
            port_channels: parse::parse_etherchannel_summary(etherchannel),
            vlans: parse::parse_show_vlan(vlan),
        }
    }

    /// Build facts from outputs returned in `commands::HARDENING` order
    pub fn from_command_outputs(outputs: &[String]) -> Result<Self, OpsError> {
        match outputs {
            [cdp, vlan, etherchannel] => Ok(Self::from_outputs(cdp, vlan, etherchannel)),
            _ => Err(OpsError::Parse {
                what: "device facts".to_string(),
                reason: format!(
                    "expected {} command outputs, got {}",
                    commands::HARDENING.len(),
                    outputs.len()
                ),
            }),
        }
    }
}

/// Facts for several devices, in device order
pub type FactsByDevice = IndexMap<String, DeviceFacts>;

/// Load a facts file. `.json` files are read as JSON, anything else as YAML.
pub fn load_facts_file(path: &Path) -> Result<FactsByDevice, OpsError> {
    let content = utils::read_file(path)?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&content).map_err(|e| OpsError::Parse {
            what: path.display().to_string(),
            reason: e.to_string(),
        })
    } else if crate::inventory::is_blank_document(&content) {
        Ok(FactsByDevice::new())
    } else {
        Ok(serde_yaml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_json_facts_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facts.json");
        std::fs::write(
            &path,
            r#"{
                "hq-swn-01": {
                    "cdp": {"1": {"device_id": "dist-cs-02", "local_interface": "Gi1/0/1"}},
                    "port_channels": {"Port-channel1": {"members": {"Gi1/0/1": {"flags": "P", "bundled": true}}}},
                    "vlans": {"10": {"state": "active"}, "20": {"state": "inactive"}}
                },
                "hq-swn-02": {}
            }"#,
        )
        .unwrap();

        let facts = load_facts_file(&path).unwrap();
        assert_eq!(facts.len(), 2);
        let first = &facts["hq-swn-01"];
        assert_eq!(first.cdp["1"].device_id, "dist-cs-02");
        assert!(first.port_channels["Port-channel1"].members.is_some());
        assert_eq!(first.vlans["20"].state, "inactive");
        assert_eq!(facts["hq-swn-02"], DeviceFacts::default());
    }

    #[test]
    fn test_load_yaml_facts_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facts.yml");
        std::fs::write(
            &path,
            "---\nhq-swn-01:\n  vlans:\n    '10':\n      state: active\n  port_channels:\n    Port-channel2: {}\n",
        )
        .unwrap();

        let facts = load_facts_file(&path).unwrap();
        let device = &facts["hq-swn-01"];
        assert_eq!(device.vlans["10"].state, "active");
        assert!(device.port_channels["Port-channel2"].members.is_none());
        assert!(device.cdp.is_empty());
    }

    #[test]
    fn test_from_command_outputs_requires_three() {
        let err = DeviceFacts::from_command_outputs(&["".to_string()]).unwrap_err();
        assert!(matches!(err, OpsError::Parse { .. }));
    }
}
