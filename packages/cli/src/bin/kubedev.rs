// ABOUTME: kubedev command line entry point
// ABOUTME: Parses arguments, loads configuration and dispatches to sandbox commands

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use kubedev_config::ClusterConfig;
use kubedev_sandbox::SandboxService;
use std::process;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::exec::{ExecArgs, PortCommands, SessionDirArgs};
use cli::sandbox::{CreateArgs, EnvArgs, StatusArgs};
use cli::Context as CommandContext;

const DEFAULT_LOG_FILTER: &str = "kubedev=info";

#[derive(Parser)]
#[command(name = "kubedev")]
#[command(about = "kubedev - Kubernetes development sandboxes")]
#[command(version)]
struct Cli {
    /// Namespace to operate in (defaults to KUBEDEV_NAMESPACE)
    #[arg(long, short = 'n', global = true)]
    namespace: Option<String>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a sandbox and print its URLs
    Create(CreateArgs),
    /// Delete a sandbox and its workspace volume
    Delete {
        /// Sandbox name
        name: String,
    },
    /// Scale a sandbox up to one replica
    Start {
        /// Sandbox name
        name: String,
    },
    /// Scale a sandbox down to zero replicas
    Stop {
        /// Sandbox name
        name: String,
    },
    /// Show the lifecycle status of a sandbox
    Status(StatusArgs),
    /// Merge environment variables into a sandbox
    Env(EnvArgs),
    /// Run a command in the background inside a sandbox
    Exec(ExecArgs),
    /// Inspect or free ports inside a sandbox
    #[command(subcommand)]
    Port(PortCommands),
    /// Show the working directory of a terminal session
    SessionDir(SessionDirArgs),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = ClusterConfig::from_env().context("Failed to load configuration")?;
    let service = SandboxService::connect(config)
        .await
        .context("Failed to connect to the Kubernetes cluster")?;

    let ctx = CommandContext {
        service,
        namespace: cli.namespace,
        json: cli.json,
    };

    match cli.command {
        Commands::Create(args) => cli::sandbox::create(&ctx, args).await,
        Commands::Delete { name } => cli::sandbox::delete(&ctx, &name).await,
        Commands::Start { name } => cli::sandbox::start(&ctx, &name).await,
        Commands::Stop { name } => cli::sandbox::stop(&ctx, &name).await,
        Commands::Status(args) => cli::sandbox::status(&ctx, args).await,
        Commands::Env(args) => cli::sandbox::env(&ctx, args).await,
        Commands::Exec(args) => cli::exec::exec(&ctx, args).await,
        Commands::Port(command) => cli::exec::port(&ctx, command).await,
        Commands::SessionDir(args) => cli::exec::session_dir(&ctx, args).await,
    }
}
