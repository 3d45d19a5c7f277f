mod config;
mod credentials;
mod error;
mod facts;
mod hardening;
mod hostname;
mod inventory;
mod models;
mod render;
mod report;
mod snooping;
mod testbed;
mod transport;
mod utils;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use error::OpsError;
use hardening::HardenOptions;
use inventory::InventoryOptions;
use report::RunReport;
use transport::{DeviceTransport, SshTransport};

#[derive(Parser, Debug)]
#[command(name = "forge-hardening")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Switch inventory and DHCP snooping hardening", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the inventory file from a CSV device list
    Inventory {
        /// CSV file, relative to CSV_DIR (e.g. switchInventory.csv)
        #[arg(short, long)]
        inventory: String,

        /// Also build the test-bed file
        #[arg(short, long)]
        testbed: bool,
    },

    /// Build the test-bed file from the inventory file
    Testbed,

    /// Collect facts, render DHCP snooping configs and deploy them
    Harden {
        /// Rebuild the inventory from this CSV file first
        #[arg(short, long)]
        inventory: Option<String>,

        /// Rebuild the test-bed file first
        #[arg(short, long)]
        testbed: bool,

        /// true to only report what would be sent, false to deploy
        #[arg(long)]
        dryrun: String,

        /// Read device facts from a JSON or YAML file instead of connecting
        #[arg(long)]
        facts: Option<PathBuf>,

        /// Deploy without asking for confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Set each device's hostname to its inventory name
    Hostname {
        /// true to only report the changes, false to apply them
        #[arg(long)]
        dryrun: String,

        /// Apply without asking for confirmation
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "forge_hardening=debug"
    } else {
        "forge_hardening=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cfg = Config::load();

    match run(cli.command, &cfg).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if let Some(OpsError::InvalidFlag { .. }) = e.downcast_ref::<OpsError>() {
                eprintln!("Use -h for help...");
            }
            let code = e.downcast_ref::<OpsError>().map_or(1, OpsError::exit_code);
            ExitCode::from(code)
        }
    }
}

/// Run one subcommand. `Ok(false)` means it finished but something failed.
async fn run(command: Commands, cfg: &Config) -> anyhow::Result<bool> {
    match command {
        Commands::Inventory { inventory, testbed } => {
            let mut clean = step(build_inventory(cfg, &inventory));
            if testbed {
                clean &= step(build_testbed(cfg));
            }
            Ok(clean)
        }
        Commands::Testbed => {
            build_testbed(cfg)?;
            Ok(true)
        }
        Commands::Harden {
            inventory,
            testbed,
            dryrun,
            facts,
            yes,
        } => {
            // Validated before anything touches files or devices
            let dry_run = utils::parse_bool_flag("dryrun", &dryrun)?;

            // Each file step stands alone; the run uses whatever inventory is on disk
            let mut clean = true;
            if let Some(csv) = inventory {
                clean &= step(build_inventory(cfg, &csv));
            }
            if testbed {
                clean &= step(build_testbed(cfg));
            }

            let hosts = load_hosts(cfg)?;
            let transport: Arc<dyn DeviceTransport> = Arc::new(SshTransport::from_config(cfg));
            let provider = credentials::default_provider(cfg);
            let opts = HardenOptions {
                dry_run,
                facts_file: facts,
                assume_yes: yes,
            };

            let report = hardening::run(cfg, &hosts, transport, provider.as_ref(), &opts, confirm_on_terminal)
                .await
                .context("hardening run aborted")?;
            Ok(finish(&report) && clean)
        }
        Commands::Hostname { dryrun, yes } => {
            let dry_run = utils::parse_bool_flag("dryrun", &dryrun)?;

            let hosts = load_hosts(cfg)?;
            let transport: Arc<dyn DeviceTransport> = Arc::new(SshTransport::from_config(cfg));
            let provider = credentials::default_provider(cfg);

            let outcome = hostname::run(cfg, &hosts, transport, provider.as_ref(), dry_run, yes, confirm_on_terminal)
                .await
                .context("hostname run aborted")?;
            if outcome.plans.is_empty() {
                println!("All hostnames already match the inventory");
            }
            Ok(finish(&outcome.report))
        }
    }
}

fn build_inventory(cfg: &Config, csv: &str) -> anyhow::Result<()> {
    let csv_path = cfg.csv_path(csv);
    println!("Building inventory from: {}...", csv_path.display());

    let opts = InventoryOptions::from_config(cfg);
    let inv = inventory::csv_to_inventory(&csv_path, &opts).map_err(|e| match e {
        OpsError::MissingFile { .. } => anyhow::Error::new(e).context("Inventory file not found"),
        other => anyhow::Error::new(other).context("could not read the device list"),
    })?;
    inventory::write_inventory(&cfg.inventory_file, &inv)?;

    println!(
        "Wrote {} devices to {}",
        inv.len(),
        cfg.inventory_file.display()
    );
    Ok(())
}

fn build_testbed(cfg: &Config) -> anyhow::Result<()> {
    println!("Building testbed file...");
    let testbed = testbed::build_testbed_file(&cfg.inventory_file, &cfg.testbed_file)
        .context("could not build the test-bed file")?;
    println!(
        "Wrote {} devices to {}",
        testbed.devices.len(),
        cfg.testbed_file.display()
    );
    Ok(())
}

fn load_hosts(cfg: &Config) -> anyhow::Result<Vec<models::Host>> {
    let inv = inventory::read_inventory(&cfg.inventory_file)
        .with_context(|| format!("could not load inventory {}", cfg.inventory_file.display()))?;
    if inv.is_empty() {
        tracing::warn!("Inventory {} has no devices", cfg.inventory_file.display());
    }
    let hosts = models::hosts_from_inventory(&inv);
    for host in hosts.iter().filter(|h| !h.is_ios()) {
        tracing::warn!("{} is not in an IOS group; show commands may fail", host.name);
    }
    Ok(hosts)
}

fn confirm_on_terminal(devices: &[String]) -> bool {
    hardening::confirm_deploy(&mut std::io::stdin().lock(), &mut std::io::stdout(), devices)
}

/// Report a failed file step and carry on with the rest of the command
fn step(result: anyhow::Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            false
        }
    }
}

fn finish(report: &RunReport) -> bool {
    print!("{}", report.summary());
    !report.has_failures()
}
