use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod exec;
mod model;
mod render;
mod spec;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "testnet-harness")]
#[command(about = "Local test network harness and host provisioner", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the compose file from a harness spec (validates while rendering).
    Render {
        #[arg(long)]
        spec: String,

        #[arg(short = 'o', long, default_value = "docker-compose.yml")]
        out: String,
    },

    /// Validate a harness spec and print the resulting topology.
    Check {
        #[arg(long)]
        spec: String,
    },

    /// Render the playbook file from a provisioning plan.
    Playbook {
        #[arg(long)]
        plan: String,

        #[arg(short = 'o', long, default_value = "provision.yml")]
        out: String,
    },

    /// Apply a provisioning plan to the local host, step by step.
    Provision {
        #[arg(long)]
        plan: String,

        /// Print each command without executing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Start the rendered harness (docker compose up -d).
    Up {
        #[arg(short, long, default_value = "docker-compose.yml")]
        file: String,
    },

    /// Stop the harness.
    Down {
        #[arg(short, long, default_value = "docker-compose.yml")]
        file: String,

        /// Also remove volumes
        #[arg(long)]
        volumes: bool,
    },

    /// Follow logs from one service, or all of them.
    Logs {
        #[arg(short, long, default_value = "docker-compose.yml")]
        file: String,

        service: Option<String>,
    },

    /// Run a one-off command in a service container (demo scripts).
    Run {
        #[arg(short, long, default_value = "docker-compose.yml")]
        file: String,

        service: String,

        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.cmd {
        Commands::Render { spec, out } => {
            let topology = load_topology(&spec)?;
            std::fs::write(&out, render::render_compose(&topology))?;
            println!("Wrote {}", out);
        }

        Commands::Check { spec } => {
            let topology = load_topology(&spec)?;
            println!(
                "harness {}: {} services on {} ({})",
                topology.project,
                topology.services.len(),
                topology.network_name,
                topology.subnet
            );
            for svc in &topology.services {
                let role = match svc.role {
                    model::Role::Dev => "dev".to_string(),
                    model::Role::Bootstrap => "bootstrap".to_string(),
                    model::Role::Node => format!("node -> {}", topology.bootstrap),
                };
                println!("  {:<16} {:<16} {}", svc.name, svc.address, role);
            }
            println!("ok");
        }

        Commands::Playbook { plan, out } => {
            let plan = load_plan(&plan)?;
            std::fs::write(&out, render::render_playbook(&plan))?;
            println!("Wrote {}", out);
        }

        Commands::Provision { plan, dry_run } => {
            let plan = load_plan(&plan)?;
            exec::StepRunner::new(dry_run).apply(&plan)?;
        }

        Commands::Up { file } => exec::ComposeDriver::new(file).up()?,

        Commands::Down { file, volumes } => exec::ComposeDriver::new(file).down(volumes)?,

        Commands::Logs { file, service } => {
            exec::ComposeDriver::new(file).logs(service.as_deref())?
        }

        Commands::Run {
            file,
            service,
            command,
        } => exec::ComposeDriver::new(file).run(&service, &command)?,
    }

    Ok(())
}

/// Parse + validate a harness spec file and assemble its topology.
fn load_topology(path: &str) -> Result<model::Topology> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read harness spec {}", path))?;
    let raw: spec::HarnessSpec =
        serde_json::from_str(&text).with_context(|| format!("parse harness spec {}", path))?;
    model::build_topology(&raw.validate_and_build()?)
}

/// Parse + validate a provisioning plan file.
fn load_plan(path: &str) -> Result<spec::ValidatedPlan> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read provisioning plan {}", path))?;
    let raw: spec::PlanSpec =
        serde_json::from_str(&text).with_context(|| format!("parse provisioning plan {}", path))?;
    raw.validate_and_build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_render() {
        let cli = Cli::try_parse_from(["testnet-harness", "render", "--spec", "h.json"]).unwrap();
        match cli.cmd {
            Commands::Render { spec, out } => {
                assert_eq!(spec, "h.json");
                assert_eq!(out, "docker-compose.yml");
            }
            _ => panic!("expected render"),
        }
    }

    #[test]
    fn cli_parses_provision_dry_run() {
        let cli = Cli::try_parse_from([
            "testnet-harness",
            "provision",
            "--plan",
            "p.json",
            "--dry-run",
        ])
        .unwrap();
        match cli.cmd {
            Commands::Provision { dry_run, .. } => assert!(dry_run),
            _ => panic!("expected provision"),
        }
    }

    #[test]
    fn cli_passes_run_command_through() {
        let cli = Cli::try_parse_from([
            "testnet-harness",
            "run",
            "testnet-dev",
            "python",
            "demo.py",
        ])
        .unwrap();
        match cli.cmd {
            Commands::Run { service, command, .. } => {
                assert_eq!(service, "testnet-dev");
                assert_eq!(command, vec!["python", "demo.py"]);
            }
            _ => panic!("expected run"),
        }
    }
}
