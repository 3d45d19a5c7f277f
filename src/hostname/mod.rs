//! Align running hostnames with inventory names.

use std::sync::Arc;

use crate::config::Config;
use crate::credentials::{Credentials, CredentialsProvider};
use crate::error::OpsError;
use crate::facts::{commands, parse};
use crate::models::Host;
use crate::report::{RunReport, Stage};
use crate::transport::{run_on_hosts, DeviceTransport};
use crate::utils;

/// HostnamePlan pairs a device's running hostname with its inventory name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostnamePlan {
    pub host: String,
    pub current: String,
    pub desired: String,
    /// Device type token of the inventory name (`hq-swn-01` -> `swn`)
    pub platform: Option<String>,
}

impl HostnamePlan {
    pub fn needs_change(&self) -> bool {
        self.current != self.desired
    }

    pub fn config_lines(&self) -> Vec<String> {
        vec![format!("hostname {}", self.desired)]
    }
}

/// Plan for one device from its `show version` output
pub fn plan_for(host: &str, version_output: &str) -> Result<HostnamePlan, OpsError> {
    let current = parse::parse_show_version_hostname(version_output).ok_or_else(|| OpsError::Parse {
        what: format!("show version from {}", host),
        reason: "no hostname found".to_string(),
    })?;
    if !utils::is_valid_hostname(host) {
        return Err(OpsError::Parse {
            what: host.to_string(),
            reason: "inventory name is not a valid hostname".to_string(),
        });
    }

    Ok(HostnamePlan {
        host: host.to_string(),
        current,
        desired: host.to_string(),
        platform: utils::device_type_token(host).map(str::to_string),
    })
}

/// Hostname plans and per-device outcomes of one run
#[derive(Debug)]
pub struct HostnameOutcome {
    /// Devices whose running hostname differs from the inventory
    pub plans: Vec<HostnamePlan>,
    pub report: RunReport,
}

/// Collect `show version` from every host and plan the hostname changes
pub async fn collect_plans(
    hosts: &[Host],
    transport: &Arc<dyn DeviceTransport>,
    creds: &Credentials,
    workers: usize,
    report: &mut RunReport,
) -> Vec<HostnamePlan> {
    let results = run_on_hosts(hosts, workers, |host| {
        let transport = transport.clone();
        let creds = creds.clone();
        async move {
            let outputs = transport.send_commands(&host, &creds, &[commands::VERSION]).await?;
            let output = outputs.first().map(String::as_str).unwrap_or_default();
            plan_for(&host.name, output)
        }
    })
    .await;

    let mut plans = Vec::new();
    for (device, result) in results {
        match result {
            Ok(plan) => {
                report.record_ok(Stage::Collect, &device);
                if plan.needs_change() {
                    plans.push(plan);
                } else {
                    tracing::info!("{}: hostname already correct", device);
                }
            }
            Err(e) => report.record_failure(Stage::Collect, &device, e),
        }
    }
    plans
}

/// Run the hostname workflow. Declining `confirm` turns the run into a dry
/// run, as with hardening.
pub async fn run<F>(
    cfg: &Config,
    hosts: &[Host],
    transport: Arc<dyn DeviceTransport>,
    provider: &dyn CredentialsProvider,
    dry_run: bool,
    assume_yes: bool,
    confirm: F,
) -> Result<HostnameOutcome, OpsError>
where
    F: FnOnce(&[String]) -> bool,
{
    let mut report = RunReport::new(dry_run);
    let creds = provider.credentials()?;

    println!("Collecting show version from {} devices...", hosts.len());
    let plans = collect_plans(hosts, &transport, &creds, cfg.num_workers, &mut report).await;

    for plan in &plans {
        println!(
            "{}: {} -> {} (type {})",
            plan.host,
            plan.current,
            plan.desired,
            plan.platform.as_deref().unwrap_or("unknown")
        );
    }

    let mut dry_run = dry_run;
    if !dry_run && !plans.is_empty() && !assume_yes {
        let devices: Vec<String> = plans.iter().map(|p| p.host.clone()).collect();
        if !confirm(&devices) {
            println!("A dry run will be performed...");
            dry_run = true;
        }
    }
    report.dry_run = dry_run;

    if dry_run {
        for plan in &plans {
            report.plan(&plan.host, plan.config_lines());
        }
        return Ok(HostnameOutcome { plans, report });
    }

    let targets: Vec<Host> = hosts
        .iter()
        .filter(|h| plans.iter().any(|p| p.host == h.name))
        .cloned()
        .collect();
    let lines: Arc<Vec<HostnamePlan>> = Arc::new(plans.clone());

    let results = run_on_hosts(&targets, cfg.num_workers, |host| {
        let transport = transport.clone();
        let creds = creds.clone();
        let lines = lines.clone();
        async move {
            let config = lines
                .iter()
                .find(|p| p.host == host.name)
                .map(HostnamePlan::config_lines)
                .unwrap_or_default();
            transport.send_config(&host, &creds, &config).await
        }
    })
    .await;

    for (device, result) in results {
        match result {
            Ok(_) => report.record_ok(Stage::Deploy, &device),
            Err(e) => report.record_failure(Stage::Deploy, &device, e),
        }
    }

    Ok(HostnameOutcome { plans, report })
}
