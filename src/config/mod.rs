use std::env;
use std::path::PathBuf;

/// Config holds all application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub csv_dir: PathBuf,
    pub inventory_file: PathBuf,
    pub testbed_file: PathBuf,
    pub templates_dir: PathBuf,
    pub configs_dir: PathBuf,
    pub snoop_template: String,
    /// Domain suffixes stripped from inventory names
    pub domain_names: [String; 2],
    /// Platform tokens kept when converting the CSV into an inventory
    pub inventory_platforms: Vec<String>,
    /// Neighbor platform tokens that qualify an interface for snooping trust
    pub snoop_platforms: Vec<String>,
    pub num_workers: usize,
    pub ssh_port: u16,
    pub ssh_timeout_secs: u64,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Config {
    /// Load configuration from environment variables with defaults.
    /// A `.env` file in the working directory is applied first.
    pub fn load() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!("Could not read .env file: {}", e);
            }
        }
        Self::from_env()
    }

    fn from_env() -> Self {
        Self {
            csv_dir: get_env("CSV_DIR", "csv_data").into(),
            inventory_file: get_env("INVENTORY_FILE", "inventory/hosts.yml").into(),
            testbed_file: get_env("TESTBED_FILE", "testbed.yml").into(),
            templates_dir: get_env("TEMPLATES_DIR", "templates").into(),
            configs_dir: get_env("CONFIGS_DIR", "sw_configs").into(),
            snoop_template: get_env("SNOOP_TEMPLATE", "dhcp_snooping.j2"),
            domain_names: [get_env("DOMAIN_NAME_1", ""), get_env("DOMAIN_NAME_2", "")],
            inventory_platforms: split_list(&get_env("INVENTORY_PLATFORMS", "swn,cs,as,switch")),
            snoop_platforms: split_list(&get_env("SNOOP_PLATFORMS", "swn,cs,as,edgertr")),
            num_workers: get_env("NUM_WORKERS", "20").parse().unwrap_or(20),
            ssh_port: get_env("SSH_PORT", "22").parse().unwrap_or(22),
            ssh_timeout_secs: get_env("SSH_TIMEOUT_SECS", "30").parse().unwrap_or(30),
            username: env::var("NET_USERNAME").ok().filter(|s| !s.is_empty()),
            password: env::var("NET_PASSWORD").ok().filter(|s| !s.is_empty()),
        }
    }

    /// Path of a CSV file given on the command line, relative to `csv_dir`
    /// unless it already points at an existing file.
    pub fn csv_path(&self, arg: &str) -> PathBuf {
        let direct = PathBuf::from(arg);
        if direct.is_file() {
            direct
        } else {
            self.csv_dir.join(arg)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            csv_dir: "csv_data".into(),
            inventory_file: "inventory/hosts.yml".into(),
            testbed_file: "testbed.yml".into(),
            templates_dir: "templates".into(),
            configs_dir: "sw_configs".into(),
            snoop_template: "dhcp_snooping.j2".to_string(),
            domain_names: [String::new(), String::new()],
            inventory_platforms: split_list("swn,cs,as,switch"),
            snoop_platforms: split_list("swn,cs,as,edgertr"),
            num_workers: 20,
            ssh_port: 22,
            ssh_timeout_secs: 30,
            username: None,
            password: None,
        }
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Split a comma-separated setting, dropping blanks
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("swn, cs,,as "), vec!["swn", "cs", "as"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_platform_lists_are_distinct() {
        let cfg = Config::default();
        assert!(cfg.inventory_platforms.contains(&"switch".to_string()));
        assert!(!cfg.snoop_platforms.contains(&"switch".to_string()));
        assert!(cfg.snoop_platforms.contains(&"edgertr".to_string()));
    }

    #[test]
    fn test_csv_path_falls_back_to_csv_dir() {
        let cfg = Config::default();
        assert_eq!(cfg.csv_path("no-such-file.csv"), PathBuf::from("csv_data/no-such-file.csv"));
    }
}
