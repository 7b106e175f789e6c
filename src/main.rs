// src/main.rs

use std::{
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::{builder::BoolishValueParser, ArgAction, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use winboost::{
    backup::RestoreReport,
    config::Config,
    debloat::{clean_temp_files, KNOWN_BLOATWARE},
    drivers::DriverService,
    engine::Engine,
    hardware::HardwareInfo,
    logging,
    network::AutoTuningLevel,
    orchestrator::{TaskOrchestrator, TweakAction},
    tweaks::{DomainKind, TweakDomain},
    utils::services::StartupType,
};

/// Upper bound for one tweak task, registry writes plus read-back.
const TASK_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "winboost")]
#[command(version)]
#[command(about = "Windows performance and privacy tweaks with automatic backups")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv for more)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Registry tweaks (general, network, privacy)
    Tweaks {
        #[command(subcommand)]
        action: TweakCommand,
    },
    /// Apply tweaks, wait for Enter, then restore everything that was changed
    Try {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Windows services that are commonly safe to disable
    Services {
        #[command(subcommand)]
        action: ServiceCommand,
    },
    /// Power plans and hibernation
    Power {
        #[command(subcommand)]
        action: PowerCommand,
    },
    /// DNS servers and TCP auto-tuning
    Network {
        #[command(subcommand)]
        action: NetworkCommand,
    },
    /// Telemetry hosts-file block
    Privacy {
        #[command(subcommand)]
        action: PrivacyCommand,
    },
    /// Preinstalled apps and temp files
    Debloat {
        #[command(subcommand)]
        action: DebloatCommand,
    },
    /// Driver download pages for a hardware inventory
    Drivers {
        /// Hardware inventory as JSON
        #[arg(long, value_name = "PATH")]
        hardware: PathBuf,
    },
}

#[derive(Subcommand)]
enum TweakCommand {
    /// List the tweak catalog
    List {
        #[arg(long)]
        domain: Option<DomainKind>,
    },
    Apply {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    Revert {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Show which tweaks are currently applied
    Status {
        #[arg(long)]
        domain: Option<DomainKind>,
    },
}

#[derive(Subcommand)]
enum ServiceCommand {
    List,
    Disable {
        name: String,
    },
    Enable {
        name: String,
        #[arg(long, default_value = "Manual")]
        startup: StartupType,
    },
}

#[derive(Subcommand)]
enum PowerCommand {
    List,
    /// Activate a power scheme by GUID
    Set {
        guid: String,
    },
    /// Unlock and activate the Ultimate Performance plan
    Ultimate,
    /// Activate the High performance plan
    High,
    Hibernate {
        #[arg(value_parser = BoolishValueParser::new())]
        enabled: bool,
    },
}

#[derive(Subcommand)]
enum NetworkCommand {
    /// Set static DNS servers on every connected interface
    Dns {
        primary: String,
        secondary: String,
    },
    Autotuning {
        #[arg(default_value = "normal")]
        level: AutoTuningLevel,
    },
}

#[derive(Subcommand)]
enum PrivacyCommand {
    BlockHosts,
    UnblockHosts,
}

#[derive(Subcommand)]
enum DebloatCommand {
    /// List installed bloatware, or the whole catalog with --all
    List {
        #[arg(long)]
        all: bool,
    },
    Remove {
        #[arg(required = true)]
        packages: Vec<String>,
    },
    CleanTemp,
}

fn level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    logging::init(&config, level(cli.verbose))?;

    if let Commands::Drivers { hardware } = &cli.command {
        return print_drivers(hardware);
    }

    let engine = Engine::new(config)?;
    let outcome = run(&engine, cli.command);

    if !engine.ledger().is_empty() {
        match engine.ledger().persist() {
            Some(path) => println!("Backup saved to {}", path.display()),
            None => error!("Backup could not be saved, see log for details."),
        }
    }
    outcome
}

fn run(engine: &Engine, command: Commands) -> Result<()> {
    match command {
        Commands::Tweaks { action } => match action {
            TweakCommand::List { domain } => list_tweaks(engine, domain),
            TweakCommand::Apply { ids } => run_tasks(engine, &ids, TweakAction::Apply),
            TweakCommand::Revert { ids } => run_tasks(engine, &ids, TweakAction::Revert),
            TweakCommand::Status { domain } => tweak_status(engine, domain),
        },
        Commands::Try { ids } => try_tweaks(engine, &ids),
        Commands::Services { action } => match action {
            ServiceCommand::List => {
                for info in engine.services.optimizable_services() {
                    println!(
                        "{:<20} {:<10} {:<10} {:<8} {}",
                        info.definition.name,
                        info.state.startup,
                        info.state.run_state,
                        info.definition.risk,
                        info.definition.display_name
                    );
                }
                Ok(())
            }
            ServiceCommand::Disable { name } => {
                engine.services.disable(&name)?;
                println!("{} disabled.", name);
                Ok(())
            }
            ServiceCommand::Enable { name, startup } => {
                engine.services.enable(&name, startup)?;
                println!("{} set to {}.", name, startup);
                Ok(())
            }
        },
        Commands::Power { action } => match action {
            PowerCommand::List => {
                for plan in engine.power.all_plans()? {
                    let marker = if plan.active { "*" } else { " " };
                    println!("{} {} {}", marker, plan.guid, plan.name);
                }
                Ok(())
            }
            PowerCommand::Set { guid } => {
                engine.power.set_plan(&guid)?;
                println!("Active plan: {}", engine.power.current_plan()?.name);
                Ok(())
            }
            PowerCommand::Ultimate => {
                let guid = engine.power.enable_ultimate_performance()?;
                println!("Ultimate Performance active ({}).", guid);
                Ok(())
            }
            PowerCommand::High => {
                engine.power.set_high_performance()?;
                println!("High performance active.");
                Ok(())
            }
            PowerCommand::Hibernate { enabled } => {
                engine.power.set_hibernation(enabled)?;
                println!("Hibernation {}.", if enabled { "enabled" } else { "disabled" });
                Ok(())
            }
        },
        Commands::Network { action } => match action {
            NetworkCommand::Dns { primary, secondary } => {
                let changed = engine.network.set_dns(&primary, &secondary)?;
                if changed.is_empty() {
                    println!("No connected interfaces found.");
                }
                for name in changed {
                    println!("{}: {} / {}", name, primary, secondary);
                }
                Ok(())
            }
            NetworkCommand::Autotuning { level } => {
                engine.network.set_auto_tuning(level)?;
                println!("TCP auto-tuning set to {}.", level);
                Ok(())
            }
        },
        Commands::Privacy { action } => match action {
            PrivacyCommand::BlockHosts => {
                let added = engine.privacy.block_telemetry_hosts()?;
                println!(
                    "Blocked {} telemetry hosts in {}.",
                    added,
                    engine.privacy.hosts_file().display()
                );
                Ok(())
            }
            PrivacyCommand::UnblockHosts => {
                let removed = engine.privacy.unblock_telemetry_hosts()?;
                println!("Removed {} lines from the hosts file.", removed);
                Ok(())
            }
        },
        Commands::Debloat { action } => match action {
            DebloatCommand::List { all } => {
                let apps = if all {
                    KNOWN_BLOATWARE.to_vec()
                } else {
                    engine.debloat.installed_bloatware()?
                };
                for app in apps {
                    println!("{:<40} {}", app.package_name, app.display_name);
                }
                Ok(())
            }
            DebloatCommand::Remove { packages } => {
                let mut failures = 0;
                for package in &packages {
                    match engine.debloat.remove_app(package) {
                        Ok(()) => println!("Removed {}", package),
                        Err(e) => {
                            failures += 1;
                            error!("{} -> {}", package, e);
                        }
                    }
                }
                if failures > 0 {
                    bail!("{} of {} packages could not be removed", failures, packages.len());
                }
                Ok(())
            }
            DebloatCommand::CleanTemp => {
                let report = clean_temp_files(&engine.config().temp_dirs);
                println!(
                    "Freed {:.1} MB ({} files removed, {} in use).",
                    report.bytes_freed as f64 / (1024.0 * 1024.0),
                    report.files_removed,
                    report.files_skipped
                );
                Ok(())
            }
        },
        Commands::Drivers { hardware } => print_drivers(&hardware),
    }
}

fn selected_domains(
    engine: &Engine,
    domain: Option<DomainKind>,
) -> Vec<std::sync::Arc<dyn TweakDomain>> {
    match domain {
        Some(kind) => vec![engine.domain(kind)],
        None => engine.domains().to_vec(),
    }
}

fn list_tweaks(engine: &Engine, domain: Option<DomainKind>) -> Result<()> {
    for domain in selected_domains(engine, domain) {
        println!("[{}]", domain.kind());
        for tweak in domain.tweaks() {
            println!(
                "  {:<34} {:<12} {:<9} {}{}",
                tweak.id,
                tweak.category,
                tweak.risk,
                tweak.name,
                if tweak.is_revertible() { "" } else { " (apply only)" }
            );
        }
    }
    Ok(())
}

fn tweak_status(engine: &Engine, domain: Option<DomainKind>) -> Result<()> {
    for domain in selected_domains(engine, domain) {
        println!("[{}]", domain.kind());
        for (id, applied) in domain.statuses() {
            println!("  [{}] {}", if applied { "x" } else { " " }, id);
        }
    }
    Ok(())
}

/// Runs every id on the orchestrator and waits for all results.
fn run_tasks(engine: &Engine, ids: &[String], action: TweakAction) -> Result<()> {
    let tasks = engine.resolve_tasks(ids, action)?;
    let orchestrator = TaskOrchestrator::new();
    for task in tasks {
        orchestrator.submit(task);
    }

    let mut failures = 0;
    for _ in ids {
        let Some(result) = orchestrator.recv_result(TASK_TIMEOUT) else {
            bail!("Timed out waiting for tweak results");
        };
        match result.error {
            None => println!("{:?} {}: ok", result.action, result.id),
            Some(e) => {
                failures += 1;
                error!("{} -> {:?} failed: {}", result.id, result.action, e);
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} tweaks failed", failures, ids.len());
    }
    Ok(())
}

fn try_tweaks(engine: &Engine, ids: &[String]) -> Result<()> {
    let applied = run_tasks(engine, ids, TweakAction::Apply);
    if let Err(e) = &applied {
        error!("{}", e);
    }
    if let Some(path) = engine.ledger().persist() {
        println!("Backup saved to {}", path.display());
    }

    print!("Tweaks are live. Press Enter to restore the previous state...");
    io::stdout().flush().context("Failed to flush stdout")?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;

    let report = engine.ledger().restore_all();
    print_restore_report(&report);
    if !report.is_complete() {
        bail!("{} targets could not be restored", report.failed.len());
    }
    applied
}

fn print_restore_report(report: &RestoreReport) {
    println!("Restored {} of {} targets.", report.restored.len(), report.total());
    for failure in &report.failed {
        println!("  failed: {} ({})", failure.id, failure.error);
    }
    info!(
        "Restore report: {} restored, {} failed.",
        report.restored.len(),
        report.failed.len()
    );
}

fn print_drivers(hardware: &Path) -> Result<()> {
    let info = HardwareInfo::load(hardware)?;
    for rec in DriverService.recommendations(&info) {
        println!("[{}] {} ({})", rec.category, rec.device_name, rec.vendor);
        if let Some(version) = &rec.current_version {
            println!("    installed: {}", version);
        }
        println!("    {}", rec.description);
        if !rec.download_url.is_empty() {
            println!("    {}", rec.download_url);
        }
    }
    Ok(())
}
