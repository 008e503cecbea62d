//! `bt-demo`: drive an action node through scripted server behaviors.
//!
//! - `bt-demo run <scenario>` - tick a tree until it settles and print what happened
//! - `bt-demo ports` - list the ports an action node accepts

use std::path::PathBuf;

use anyhow::{Context, Result};
use bt_core::BtStatus;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod scenario;

use scenario::Scenario;

#[derive(Parser)]
#[command(name = "bt-demo")]
#[command(about = "Behavior tree action client demo", version)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario
    Run {
        #[arg(value_enum)]
        scenario: Scenario,

        /// YAML file with port values for the action node
        #[arg(long)]
        ports: Option<PathBuf>,

        /// Give up after this many ticks
        #[arg(long, default_value_t = 20)]
        max_ticks: u64,
    },

    /// List the ports an action node accepts
    Ports,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    if cli.json {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).with_target(false).init();
    }

    match cli.command {
        Commands::Run {
            scenario,
            ports,
            max_ticks,
        } => run_scenario(scenario, ports, max_ticks),
        Commands::Ports => {
            for port in bt_action::provided_ports() {
                match port.default {
                    Some(default) => {
                        println!("{:<16} {} (default: {})", port.name, port.description, default)
                    }
                    None => println!("{:<16} {}", port.name, port.description),
                }
            }
            Ok(())
        }
    }
}

fn run_scenario(scenario: Scenario, ports: Option<PathBuf>, max_ticks: u64) -> Result<()> {
    let yaml = match ports {
        Some(path) => Some(
            std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?,
        ),
        None => None,
    };
    let ports = scenario::load_ports(yaml.as_deref())?;

    let report = scenario::run(scenario, ports, max_ticks)?;

    println!("Scenario: {scenario:?}");
    println!("  status:          {:?}", report.status);
    println!("  ticks:           {}", report.ticks);
    println!("  goals received:  {}", report.goals_received);
    println!("  cancel requests: {}", report.cancel_requests);
    println!("  trace:");
    for tag in &report.trace {
        println!("    {tag}");
    }

    if report.status == BtStatus::Running {
        tracing::warn!(max_ticks, "tree still running after the tick limit");
    }
    Ok(())
}
