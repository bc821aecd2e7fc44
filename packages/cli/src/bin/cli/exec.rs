// ABOUTME: CLI commands that run inside a sandbox (background exec, ports, session directory)
// ABOUTME: Soft failures from the exec bridge are reported and turned into a non-zero exit

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use colored::*;
use kubedev_sandbox::exec::shell_quote;
use kubedev_sandbox::resources::PROJECT_DIR;
use serde_json::json;

use super::Context;

#[derive(Args)]
pub struct ExecArgs {
    /// Sandbox name
    pub name: String,

    /// Directory to run the command in
    #[arg(long, default_value = PROJECT_DIR)]
    pub workdir: String,

    /// Command to run. A single word is run as a shell snippet; several words
    /// are treated as argv and quoted one by one.
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

impl ExecArgs {
    /// The trailing words as one shell snippet. `-- 'npm run dev && ls'` keeps
    /// shell syntax; `-- sh -c "a b"` keeps each argument whole.
    pub fn command_line(&self) -> String {
        match self.command.as_slice() {
            [snippet] => snippet.clone(),
            words => words
                .iter()
                .map(|word| shell_quote(word))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

#[derive(Subcommand)]
pub enum PortCommands {
    /// Check whether a port is listening
    Check {
        /// Sandbox name
        name: String,
        /// Port number
        port: u16,
    },
    /// Kill the process listening on a port
    Kill {
        /// Sandbox name
        name: String,
        /// Port number
        port: u16,
    },
}

#[derive(Args)]
pub struct SessionDirArgs {
    /// Sandbox name
    pub name: String,

    /// Terminal session id
    pub session_id: String,
}

pub async fn exec(ctx: &Context, args: ExecArgs) -> Result<()> {
    let command = args.command_line();

    let result = ctx
        .service
        .exec_command_in_background(&args.name, &args.workdir, &command, ctx.namespace())
        .await
        .with_context(|| format!("Failed to run command in sandbox {}", args.name))?;

    ctx.emit(&result, |result| {
        if let (Some(pid), Some(log_file)) = (result.pid, result.log_file.as_deref()) {
            println!("{} Started PID {}", "🚀".green(), pid);
            println!("   {} {}", "Log:".cyan(), log_file);
        }
    })?;

    if !result.success {
        anyhow::bail!(
            "Command did not start: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

pub async fn port(ctx: &Context, command: PortCommands) -> Result<()> {
    match command {
        PortCommands::Check { name, port } => {
            let listening = ctx
                .service
                .is_port_listening(&name, port, ctx.namespace())
                .await;

            ctx.emit(&json!({ "port": port, "listening": listening }), |_| {
                if listening {
                    println!("{} Port {} is listening", "🟢".green(), port);
                } else {
                    println!("{} Port {} is not listening", "⚪".dimmed(), port);
                }
            })
        }
        PortCommands::Kill { name, port } => {
            let result = ctx
                .service
                .kill_process_on_port(&name, port, ctx.namespace())
                .await;

            ctx.emit(&result, |result| {
                println!("{} {}", "🛑".yellow(), result.message);
            })?;

            if !result.success {
                anyhow::bail!("{}", result.message);
            }
            Ok(())
        }
    }
}

pub async fn session_dir(ctx: &Context, args: SessionDirArgs) -> Result<()> {
    let directory = ctx
        .service
        .get_sandbox_current_directory(&args.name, &args.session_id, ctx.namespace())
        .await
        .with_context(|| format!("Failed to resolve session {}", args.session_id))?;

    ctx.emit(&directory, |directory| {
        println!("{}", directory.current_dir);
        if !directory.is_in_home {
            println!(
                "   {} outside home directory {}",
                "⚠️".yellow(),
                directory.home_dir
            );
        }
    })
}
