// ABOUTME: CLI commands for the sandbox lifecycle (create, delete, start, stop, status, env)
// ABOUTME: Thin wrappers over SandboxService that format results for the terminal

use std::collections::BTreeMap;

use anyhow::{Context as _, Result};
use clap::Args;
use colored::*;
use kubedev_sandbox::SandboxStatus;
use serde_json::json;

use super::{parse_env_pair, Context};

#[derive(Args)]
pub struct CreateArgs {
    /// Sandbox name
    pub name: String,

    /// Project the sandbox belongs to
    #[arg(long)]
    pub project: String,

    /// Environment variable for the workspace container (repeatable)
    #[arg(long = "env", short = 'e', value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Sandbox name
    pub name: String,

    /// Include replica counters
    #[arg(long)]
    pub detailed: bool,
}

#[derive(Args)]
pub struct EnvArgs {
    /// Sandbox name
    pub name: String,

    /// Variables to merge into the workspace container
    #[arg(value_name = "KEY=VALUE", value_parser = parse_env_pair, required = true)]
    pub vars: Vec<(String, String)>,
}

pub async fn create(ctx: &Context, args: CreateArgs) -> Result<()> {
    let env_vars: BTreeMap<String, String> = args.env.into_iter().collect();

    let info = ctx
        .service
        .create_sandbox(&args.name, &args.project, env_vars, ctx.namespace())
        .await
        .with_context(|| format!("Failed to create sandbox {}", args.name))?;

    ctx.emit(&info, |info| {
        println!("{} Sandbox {} created", "✅".green(), args.name.bold());
        println!("   {} {}", "App:".cyan(), info.public_url);
        println!("   {} {}", "Terminal:".cyan(), info.ttyd_url);
        println!("   {} {}", "Files:".cyan(), info.file_browser_url);
    })
}

pub async fn delete(ctx: &Context, name: &str) -> Result<()> {
    ctx.service
        .delete_sandbox(name, ctx.namespace())
        .await
        .with_context(|| format!("Failed to delete sandbox {}", name))?;

    ctx.emit(&json!({ "deleted": name }), |_| {
        println!("{} Sandbox {} deleted", "🗑️".yellow(), name.bold());
    })
}

pub async fn start(ctx: &Context, name: &str) -> Result<()> {
    ctx.service
        .start_sandbox(name, ctx.namespace())
        .await
        .with_context(|| format!("Failed to start sandbox {}", name))?;

    ctx.emit(&json!({ "started": name }), |_| {
        println!("{} Sandbox {} starting", "▶️".green(), name.bold());
    })
}

pub async fn stop(ctx: &Context, name: &str) -> Result<()> {
    ctx.service
        .stop_sandbox(name, ctx.namespace())
        .await
        .with_context(|| format!("Failed to stop sandbox {}", name))?;

    ctx.emit(&json!({ "stopped": name }), |_| {
        println!("{} Sandbox {} stopping", "⏹️".yellow(), name.bold());
    })
}

pub async fn status(ctx: &Context, args: StatusArgs) -> Result<()> {
    let detailed = ctx
        .service
        .get_sandbox_detailed_status(&args.name, ctx.namespace())
        .await;

    if !args.detailed {
        return ctx.emit(&json!({ "status": detailed.status }), |_| {
            println!("{}: {}", args.name.bold(), colorize(detailed.status));
        });
    }

    ctx.emit(&detailed, |detailed| {
        let counts = &detailed.counts;
        println!("{}: {}", args.name.bold(), colorize(detailed.status));
        println!("   {} {}", "Declared:".cyan(), counts.declared);
        println!("   {} {}", "Replicas:".cyan(), counts.replicas);
        println!("   {} {}", "Ready:".cyan(), counts.ready_replicas);
        println!("   {} {}", "Current:".cyan(), counts.current_replicas);
        println!("   {} {}", "Updated:".cyan(), counts.updated_replicas);
    })
}

pub async fn env(ctx: &Context, args: EnvArgs) -> Result<()> {
    let env_vars: BTreeMap<String, String> = args.vars.into_iter().collect();

    let applied = ctx
        .service
        .update_sandbox_env_vars(&args.name, &env_vars, ctx.namespace())
        .await
        .with_context(|| format!("Failed to update env vars of sandbox {}", args.name))?;

    if !applied {
        anyhow::bail!("Sandbox {} does not exist", args.name);
    }

    ctx.emit(&json!({ "updated": args.name, "keys": env_vars.keys().collect::<Vec<_>>() }), |_| {
        println!(
            "{} Merged {} variable(s) into sandbox {}",
            "✅".green(),
            env_vars.len(),
            args.name.bold()
        );
    })
}

fn colorize(status: SandboxStatus) -> ColoredString {
    let label = status.as_str();
    match status {
        SandboxStatus::Running => label.green(),
        SandboxStatus::Starting | SandboxStatus::Stopping => label.yellow(),
        SandboxStatus::Stopped | SandboxStatus::Terminated => label.dimmed(),
        SandboxStatus::Error => label.red(),
    }
}
