//! Regex-based parsers for IOS show command output.
//!
//! Parsers skip anything they do not recognise, so banners, prompts and
//! legend text never cause a failure.

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex_lite::Regex;

use super::{vlan_state, CdpNeighbor, MemberState, PortChannel, Vlan};
use crate::utils::canonical_interface_name;

fn cached(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("parser pattern is valid"))
}

fn cdp_device_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"^Device ID:\s*(\S+)")
}

fn cdp_platform_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"^Platform:\s*([^,]+)")
}

fn cdp_interface_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"^Interface:\s*([^,\s]+)\s*,\s*Port ID \(outgoing port\):\s*(\S+)")
}

fn vlan_row_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(
        &RE,
        r"^(\d+)\s+(\S+)\s+(active|suspended|act/lshut|sus/lshut|act/ishut|sus/ishut|act/unsup)(?:\s|$)",
    )
}

fn etherchannel_group_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"^(\d+)\s+(Po\d+)\(([A-Za-z]+)\)\s+(\S+)(.*)$")
}

fn etherchannel_member_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"([A-Za-z][A-Za-z0-9/.:-]*)\(([A-Za-z]+)\)")
}

fn version_hostname_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"^(\S+)\s+uptime is\s")
}

/// Parse `show cdp neighbors detail`. Neighbors are indexed "1", "2", ... in
/// the order they appear; entries without a local interface are dropped.
pub fn parse_cdp_neighbors_detail(output: &str) -> IndexMap<String, CdpNeighbor> {
    fn flush(neighbor: Option<CdpNeighbor>, table: &mut IndexMap<String, CdpNeighbor>) {
        if let Some(n) = neighbor.filter(|n| !n.local_interface.is_empty()) {
            table.insert((table.len() + 1).to_string(), n);
        }
    }

    let mut neighbors = IndexMap::new();
    let mut current: Option<CdpNeighbor> = None;

    for line in output.lines() {
        let line = line.trim();

        if let Some(caps) = cdp_device_re().captures(line) {
            flush(current.take(), &mut neighbors);
            current = Some(CdpNeighbor {
                device_id: caps[1].to_string(),
                local_interface: String::new(),
                port_id: None,
                platform: None,
            });
            continue;
        }

        let Some(neighbor) = current.as_mut() else {
            continue;
        };

        if let Some(caps) = cdp_platform_re().captures(line) {
            neighbor.platform = Some(caps[1].trim().to_string());
        } else if let Some(caps) = cdp_interface_re().captures(line) {
            neighbor.local_interface = canonical_interface_name(&caps[1]);
            neighbor.port_id = Some(canonical_interface_name(&caps[2]));
        }
    }
    flush(current, &mut neighbors);

    neighbors
}

fn normalize_vlan_state(raw: &str) -> &'static str {
    match raw {
        "active" => vlan_state::ACTIVE,
        "suspended" => vlan_state::SUSPEND,
        "act/unsup" => vlan_state::UNSUPPORT,
        _ => vlan_state::SHUTDOWN,
    }
}

/// Parse the VLAN summary table of `show vlan`. The later per-type tables are
/// ignored.
pub fn parse_show_vlan(output: &str) -> IndexMap<String, Vlan> {
    let mut vlans = IndexMap::new();

    for line in output.lines() {
        if line.starts_with("VLAN Type") {
            break;
        }
        if let Some(caps) = vlan_row_re().captures(line) {
            vlans.insert(
                caps[1].to_string(),
                Vlan {
                    name: Some(caps[2].to_string()),
                    state: normalize_vlan_state(&caps[3]).to_string(),
                },
            );
        }
    }

    vlans
}

fn parse_members(text: &str, members: &mut IndexMap<String, MemberState>) {
    for caps in etherchannel_member_re().captures_iter(text) {
        let flags = caps[2].to_string();
        members.insert(
            canonical_interface_name(&caps[1]),
            MemberState {
                bundled: flags.contains('P'),
                flags,
            },
        );
    }
}

/// Parse `show etherchannel summary`. Member lists may wrap onto
/// continuation lines. Channels with no member ports have no `members`.
pub fn parse_etherchannel_summary(output: &str) -> IndexMap<String, PortChannel> {
    let mut channels: IndexMap<String, PortChannel> = IndexMap::new();
    let mut current: Option<String> = None;

    for line in output.lines() {
        if let Some(caps) = etherchannel_group_re().captures(line) {
            let name = canonical_interface_name(&caps[2]);
            let protocol = match &caps[4] {
                "-" => None,
                p => Some(p.to_string()),
            };
            let mut members = IndexMap::new();
            parse_members(&caps[5], &mut members);

            channels.insert(
                name.clone(),
                PortChannel {
                    protocol,
                    flags: Some(caps[3].to_string()),
                    members: (!members.is_empty()).then_some(members),
                },
            );
            current = Some(name);
            continue;
        }

        // Continuation lines are indented and carry only member ports
        if !line.starts_with(char::is_whitespace) {
            if !line.trim().is_empty() {
                current = None;
            }
            continue;
        }
        let Some(channel) = current.as_ref().and_then(|name| channels.get_mut(name)) else {
            continue;
        };
        let mut extra = IndexMap::new();
        parse_members(line, &mut extra);
        if !extra.is_empty() {
            channel.members.get_or_insert_with(IndexMap::new).extend(extra);
        }
    }

    channels
}

/// Extract the running hostname from `show version`
pub fn parse_show_version_hostname(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| version_hostname_re().captures(line.trim()))
        .map(|caps| caps[1].to_string())
}
