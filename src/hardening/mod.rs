//! DHCP snooping hardening run: collect facts, evaluate trust candidates,
//! render per-device configs and deploy them (or report a dry run).

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::config::Config;
use crate::credentials::{Credentials, CredentialsProvider};
use crate::error::OpsError;
use crate::facts::{self, commands, DeviceFacts, FactsByDevice};
use crate::models::Host;
use crate::render::ConfigRenderer;
use crate::report::{RunReport, Stage};
use crate::snooping;
use crate::transport::{run_on_hosts, DeviceTransport};
use crate::utils;

#[derive(Debug, Clone, Default)]
pub struct HardenOptions {
    pub dry_run: bool,
    /// Offline facts instead of connecting to devices
    pub facts_file: Option<PathBuf>,
    /// Skip the deployment confirmation
    pub assume_yes: bool,
}

/// Resolves credentials on first use only, so offline dry runs never ask
struct Login<'a> {
    provider: &'a dyn CredentialsProvider,
    cached: Option<Credentials>,
}

impl<'a> Login<'a> {
    fn new(provider: &'a dyn CredentialsProvider) -> Self {
        Self { provider, cached: None }
    }

    fn get(&mut self) -> Result<Credentials, OpsError> {
        if let Some(creds) = &self.cached {
            return Ok(creds.clone());
        }
        let creds = self.provider.credentials()?;
        self.cached = Some(creds.clone());
        Ok(creds)
    }
}

/// Ask before changing devices. Only `y` or `yes` (any case) confirms;
/// anything else, including end of input, declines.
pub fn confirm_deploy<R: BufRead, W: Write>(input: &mut R, output: &mut W, devices: &[String]) -> bool {
    let _ = writeln!(
        output,
        "WARNING: You are about to deploy configurations to {} devices",
        devices.len()
    );
    let _ = write!(output, "Do you want to continue [y/n]? ");
    let _ = output.flush();

    let mut answer = String::new();
    if input.read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Collect CDP, VLAN and etherchannel facts from every host
pub async fn collect_facts(
    hosts: &[Host],
    transport: &Arc<dyn DeviceTransport>,
    creds: &Credentials,
    workers: usize,
    report: &mut RunReport,
) -> FactsByDevice {
    let results = run_on_hosts(hosts, workers, |host| {
        let transport = transport.clone();
        let creds = creds.clone();
        async move {
            let outputs = transport.send_commands(&host, &creds, commands::HARDENING).await?;
            DeviceFacts::from_command_outputs(&outputs)
        }
    })
    .await;

    let mut collected = FactsByDevice::new();
    for (device, result) in results {
        match result {
            Ok(device_facts) => {
                report.record_ok(Stage::Collect, &device);
                collected.insert(device, device_facts);
            }
            Err(e) => report.record_failure(Stage::Collect, &device, e),
        }
    }
    collected
}

/// Facts for the inventory hosts from an offline facts file. Hosts missing
/// from the file are collection failures; extra devices are ignored.
pub fn facts_from_file(path: &Path, hosts: &[Host], report: &mut RunReport) -> Result<FactsByDevice, OpsError> {
    let mut loaded = facts::load_facts_file(path)?;

    let mut selected = FactsByDevice::new();
    for host in hosts {
        match loaded.shift_remove(&host.name) {
            Some(device_facts) => {
                report.record_ok(Stage::Collect, &host.name);
                selected.insert(host.name.clone(), device_facts);
            }
            None => report.record_failure(
                Stage::Collect,
                &host.name,
                OpsError::Parse {
                    what: path.display().to_string(),
                    reason: format!("no facts for {}", host.name),
                },
            ),
        }
    }
    for device in loaded.keys() {
        tracing::warn!("Ignoring facts for {}: not in inventory", device);
    }
    Ok(selected)
}

/// Configuration lines of a rendered file; blank lines and `!` comments are
/// not sent
pub fn read_config_lines(path: &Path) -> Result<Vec<String>, OpsError> {
    let content = utils::read_file(path)?;
    Ok(content
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('!'))
        .map(str::to_string)
        .collect())
}

/// Push each device's planned lines
pub async fn deploy(
    hosts: &[Host],
    planned: IndexMap<String, Vec<String>>,
    transport: &Arc<dyn DeviceTransport>,
    creds: &Credentials,
    workers: usize,
    report: &mut RunReport,
) {
    let targets: Vec<Host> = hosts
        .iter()
        .filter(|host| planned.contains_key(&host.name))
        .cloned()
        .collect();
    let planned = Arc::new(planned);

    let results = run_on_hosts(&targets, workers, |host| {
        let transport = transport.clone();
        let creds = creds.clone();
        let planned = planned.clone();
        async move {
            let lines = planned.get(&host.name).cloned().unwrap_or_default();
            transport.send_config(&host, &creds, &lines).await
        }
    })
    .await;

    for (device, result) in results {
        match result {
            Ok(transcript) => {
                tracing::debug!("{} session output:\n{}", device, transcript);
                report.record_ok(Stage::Deploy, &device);
            }
            Err(e) => report.record_failure(Stage::Deploy, &device, e),
        }
    }
}

/// Run the whole hardening workflow over `hosts`. `confirm` is asked once
/// before a real deployment unless `assume_yes` is set; declining turns the
/// run into a dry run. Per-device failures land in the report; only a
/// missing facts file or unavailable credentials abort.
pub async fn run<F>(
    cfg: &Config,
    hosts: &[Host],
    transport: Arc<dyn DeviceTransport>,
    provider: &dyn CredentialsProvider,
    opts: &HardenOptions,
    confirm: F,
) -> Result<RunReport, OpsError>
where
    F: FnOnce(&[String]) -> bool,
{
    let mut report = RunReport::new(opts.dry_run);
    let mut login = Login::new(provider);

    let collected = match &opts.facts_file {
        Some(path) => {
            println!("Loading device facts from {}...", path.display());
            facts_from_file(path, hosts, &mut report)?
        }
        None => {
            let creds = login.get()?;
            println!("Collecting facts from {} devices...", hosts.len());
            collect_facts(hosts, &transport, &creds, cfg.num_workers, &mut report).await
        }
    };

    println!("Evaluating output...");
    let candidates = snooping::evaluate_all(&collected, &cfg.snoop_platforms);

    println!("Generating configuration files...");
    let mut renderer = ConfigRenderer::new(&cfg.templates_dir, &cfg.configs_dir);
    let outcome = renderer.render_all(&cfg.snoop_template, &candidates);
    for device in outcome.written.keys() {
        report.record_ok(Stage::Render, device);
    }
    for (device, error) in outcome.failures {
        report.record_failure(Stage::Render, &device, error);
    }

    let mut planned = IndexMap::new();
    for (device, path) in &outcome.written {
        match read_config_lines(path) {
            Ok(lines) => {
                planned.insert(device.clone(), lines);
            }
            Err(e) => report.record_failure(Stage::Deploy, device, e),
        }
    }

    let mut dry_run = opts.dry_run;
    if !dry_run && !planned.is_empty() && !opts.assume_yes {
        let devices: Vec<String> = planned.keys().cloned().collect();
        if !confirm(&devices) {
            println!("A dry run will be performed...");
            dry_run = true;
        }
    }
    report.dry_run = dry_run;

    if dry_run {
        for (device, lines) in planned {
            println!("{}: would send {} lines", device, lines.len());
            for line in &lines {
                println!("  {}", line);
            }
            report.plan(&device, lines);
        }
    } else if !planned.is_empty() {
        let creds = login.get()?;
        println!("Deploying configurations to {} devices...", planned.len());
        deploy(hosts, planned, &transport, &creds, cfg.num_workers, &mut report).await;
    }

    Ok(report)
}
