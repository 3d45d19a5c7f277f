//! DHCP snooping trust candidates.
//!
//! An interface is a trust candidate when CDP shows a neighbor whose platform
//! token is in the configured set (uplinks to other switches and routers).
//! Port-channels qualify through their member ports, and every active VLAN
//! is included.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::facts::{vlan_state, DeviceFacts, FactsByDevice};
use crate::utils;

/// SnoopCandidate is the per-device render context for the snooping template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnoopCandidate {
    pub interfaces: IndexSet<String>,
    /// Port-channel name to qualifying member ports; never empty
    pub port_channels: IndexMap<String, Vec<String>>,
    pub vlans: Vec<String>,
}

impl SnoopCandidate {
    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty() && self.port_channels.is_empty() && self.vlans.is_empty()
    }
}

/// Evaluate one device. `platforms` holds the neighbor platform tokens that
/// mark an uplink; device ids are matched case-sensitively.
pub fn evaluate(facts: &DeviceFacts, platforms: &[String]) -> SnoopCandidate {
    let mut candidate = SnoopCandidate::default();

    for neighbor in facts.cdp.values() {
        if utils::has_platform(&neighbor.device_id, platforms) {
            candidate.interfaces.insert(neighbor.local_interface.clone());
        }
    }

    for (name, channel) in &facts.port_channels {
        let Some(members) = &channel.members else {
            continue;
        };
        let qualifying = members
            .keys()
            .filter(|member| candidate.interfaces.contains(*member))
            .cloned()
            .collect();
        candidate.port_channels.insert(name.clone(), qualifying);
    }

    // Only after every channel is filtered
    candidate.port_channels.retain(|_, members: &mut Vec<String>| !members.is_empty());

    candidate.vlans = facts
        .vlans
        .iter()
        .filter(|(_, vlan)| vlan.state == vlan_state::ACTIVE)
        .map(|(id, _)| id.clone())
        .collect();

    candidate
}

/// Evaluate every device, keeping device order
pub fn evaluate_all(facts: &FactsByDevice, platforms: &[String]) -> IndexMap<String, SnoopCandidate> {
    facts
        .iter()
        .map(|(device, device_facts)| {
            let candidate = evaluate(device_facts, platforms);
            if candidate.is_empty() {
                tracing::info!("{}: no DHCP snooping trust candidates", device);
            }
            tracing::debug!(
                "{}: {} trusted interfaces, {} port-channels, {} active VLANs",
                device,
                candidate.interfaces.len(),
                candidate.port_channels.len(),
                candidate.vlans.len()
            );
            (device.clone(), candidate)
        })
        .collect()
}
