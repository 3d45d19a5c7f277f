use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex_lite::Regex;

use crate::error::OpsError;

/// Platform token convention: the letters after the first hyphen,
/// e.g. "site-swn-01" -> "swn". Only the first hyphen segment is inspected,
/// so "region-site-swn-01" yields "site". `\w` is ASCII-only in regex-lite:
/// a name like "zürich-swn-01" has no token and is treated as unmanaged.
const PLATFORM_PATTERN: &str = r"^\w+-([a-z]+|[A-Z]+)";

/// Looser variant used when reading device types out of running hostnames
const DEVICE_TYPE_PATTERN: &str = r"^\w+-(\w+)";

fn platform_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PLATFORM_PATTERN).expect("platform pattern is valid"))
}

fn device_type_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DEVICE_TYPE_PATTERN).expect("device type pattern is valid"))
}

/// Extract the platform token from a device name. Case is preserved, so
/// callers decide whether to lower-case first.
pub fn platform_token(name: &str) -> Option<&str> {
    platform_re()
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// True when the name's platform token is one of `allowed`
pub fn has_platform(name: &str, allowed: &[String]) -> bool {
    platform_token(name).is_some_and(|token| allowed.iter().any(|a| a == token))
}

/// Extract the device-type segment of a hostname, e.g. "bldg1-swn01" -> "swn01"
pub fn device_type_token(hostname: &str) -> Option<&str> {
    device_type_re()
        .captures(hostname)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Validate a hostname.
/// Allows alphanumeric, hyphens, dots, and underscores. No path separators or shell metacharacters.
pub fn is_valid_hostname(hostname: &str) -> bool {
    if hostname.is_empty() || hostname.len() > 253 {
        return false;
    }
    if hostname.starts_with('.') {
        return false;
    }
    hostname.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_')
}

/// Parse a boolean command-line value. Only "true" and "false" are accepted,
/// in any case.
pub fn parse_bool_flag(flag: &'static str, value: &str) -> Result<bool, OpsError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(OpsError::InvalidFlag {
            flag,
            value: value.to_string(),
        }),
    }
}

/// Write `contents` to `dest` through a sibling temp file and a rename.
/// Parent directories are created.
pub fn write_atomic(dest: &Path, contents: &str) -> Result<(), OpsError> {
    let write_err = |source| OpsError::Write {
        path: dest.to_path_buf(),
        source,
    };

    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(write_err)?;

    let file_name = dest
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("output");
    let tmp_path = parent.join(format!(".{}.tmp", file_name));

    fs::write(&tmp_path, contents).map_err(write_err)?;
    if let Err(e) = fs::rename(&tmp_path, dest) {
        let _ = fs::remove_file(&tmp_path);
        return Err(write_err(e));
    }
    Ok(())
}

/// Read a whole file, reporting a missing file as `MissingFile`
pub fn read_file(path: &Path) -> Result<String, OpsError> {
    fs::read_to_string(path).map_err(|e| OpsError::from_io(path, e))
}

/// IOS interface abbreviations, longest prefix first
const INTERFACE_PREFIXES: &[(&str, &str)] = &[
    ("HundredGigE", "HundredGigE"),
    ("Hu", "HundredGigE"),
    ("FortyGigabitEthernet", "FortyGigabitEthernet"),
    ("Fo", "FortyGigabitEthernet"),
    ("TwentyFiveGigE", "TwentyFiveGigE"),
    ("Twe", "TwentyFiveGigE"),
    ("TwoGigabitEthernet", "TwoGigabitEthernet"),
    ("Tw", "TwoGigabitEthernet"),
    ("TenGigabitEthernet", "TenGigabitEthernet"),
    ("Te", "TenGigabitEthernet"),
    ("GigabitEthernet", "GigabitEthernet"),
    ("Gi", "GigabitEthernet"),
    ("FastEthernet", "FastEthernet"),
    ("Fa", "FastEthernet"),
    ("Port-channel", "Port-channel"),
    ("Po", "Port-channel"),
    ("Ethernet", "Ethernet"),
    ("Eth", "Ethernet"),
    ("Et", "Ethernet"),
];

/// Expand an abbreviated IOS interface name ("Gi1/0/1") to its canonical
/// form ("GigabitEthernet1/0/1"). Unknown names are returned unchanged.
pub fn canonical_interface_name(name: &str) -> String {
    let name = name.trim();
    for (prefix, full) in INTERFACE_PREFIXES {
        if let Some(rest) = name.strip_prefix(prefix) {
            if rest.starts_with(|c: char| c.is_ascii_digit()) {
                return format!("{}{}", full, rest);
            }
        }
    }
    name.to_string()
}
