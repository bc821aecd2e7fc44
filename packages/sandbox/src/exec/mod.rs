// ABOUTME: Remote exec bridge running generated scripts in a sandbox's primary container
// ABOUTME: Launches background commands, checks and frees ports, resolves terminal session directories

pub mod scripts;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cluster::{ClusterClient, ExecOutput};
use crate::error::{Result, SandboxError};
use crate::naming::SandboxNames;
use crate::types::{BackgroundExecResult, KillProcessResult, SessionDirectory};

pub use scripts::{shell_quote, ScriptBuilder, SessionId, ShellScripts, EXEC_LOG_DIR};
use scripts::{
    CWD_UNREADABLE, KILLED, KILL_FAILED, LISTENING, NO_PROCESS, PROCESS_NOT_FOUND, SESSION_FOUND,
    SESSION_NOT_FOUND,
};

/// Runs scripts in pod `<sandbox>-0`, container `<sandbox>`.
///
/// One exec channel per call; no timeout is applied here.
pub struct ExecBridge {
    client: Arc<dyn ClusterClient>,
    scripts: Arc<dyn ScriptBuilder>,
}

impl ExecBridge {
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self::with_scripts(client, Arc::new(ShellScripts))
    }

    pub fn with_scripts(client: Arc<dyn ClusterClient>, scripts: Arc<dyn ScriptBuilder>) -> Self {
        Self { client, scripts }
    }

    async fn run(&self, namespace: &str, sandbox_name: &str, script: String) -> Result<ExecOutput> {
        let names = SandboxNames::new(sandbox_name);
        let pod = names.pod();
        debug!("Running script in {}/{}", namespace, pod);

        let output = self
            .client
            .exec(
                namespace,
                &pod,
                names.primary_container(),
                vec!["sh".to_string(), "-c".to_string(), script],
            )
            .await?;
        Ok(output)
    }

    /// Start `command` detached in `workdir`, appending its output to a
    /// timestamped log under `/tmp/exec-logs`.
    ///
    /// A script that does not print a PID yields `success: false`; cluster
    /// transport failures are returned as errors.
    pub async fn exec_in_background(
        &self,
        namespace: &str,
        sandbox_name: &str,
        workdir: &str,
        command: &str,
    ) -> Result<BackgroundExecResult> {
        let log_file = format!(
            "{}/{}.log",
            EXEC_LOG_DIR,
            chrono::Utc::now().timestamp_millis()
        );
        let script = self.scripts.background_launch(workdir, command, &log_file);

        info!(
            "Launching background command in sandbox {} (workdir: {})",
            sandbox_name, workdir
        );
        let output = self.run(namespace, sandbox_name, script).await?;

        if !output.success {
            let reason = failure_reason(&output);
            warn!("Background launch in {} failed: {}", sandbox_name, reason);
            return Ok(BackgroundExecResult::failed(reason));
        }

        match parse_pid(&output.stdout) {
            Ok(pid) => {
                info!("Background command started with PID {} ({})", pid, log_file);
                Ok(BackgroundExecResult::started(pid, log_file))
            }
            Err(e) => {
                warn!("Background launch in {} returned no PID: {}", sandbox_name, e);
                Ok(BackgroundExecResult::failed(e.to_string()))
            }
        }
    }

    /// Whether anything listens on `port`. Any failure reads as not listening.
    pub async fn is_port_listening(&self, namespace: &str, sandbox_name: &str, port: u16) -> bool {
        let script = self.scripts.port_check(port);
        match self.run(namespace, sandbox_name, script).await {
            Ok(output) if output.success => output.stdout.trim() == LISTENING,
            Ok(output) => {
                debug!(
                    "Port check in {} failed: {}",
                    sandbox_name,
                    failure_reason(&output)
                );
                false
            }
            Err(e) => {
                debug!("Port check in {} failed: {}", sandbox_name, e);
                false
            }
        }
    }

    /// Terminate the process listening on `port`. Finding no listener is a success.
    pub async fn kill_process_on_port(
        &self,
        namespace: &str,
        sandbox_name: &str,
        port: u16,
    ) -> KillProcessResult {
        let script = self.scripts.port_kill(port);
        let output = match self.run(namespace, sandbox_name, script).await {
            Ok(output) if output.success => output,
            Ok(output) => {
                return KillProcessResult {
                    success: false,
                    killed_pid: None,
                    message: failure_reason(&output),
                }
            }
            Err(e) => {
                warn!("Port kill in {} failed: {}", sandbox_name, e);
                return KillProcessResult {
                    success: false,
                    killed_pid: None,
                    message: e.to_string(),
                };
            }
        };

        let result = parse_kill_output(&output.stdout, port);
        if result.success {
            info!("Port {} in sandbox {}: {}", port, sandbox_name, result.message);
        } else {
            warn!("Port {} in sandbox {}: {}", port, sandbox_name, result.message);
        }
        result
    }

    /// Resolve the working directory of the process behind terminal session
    /// `session_id`, as recorded in its marker file.
    pub async fn get_current_directory(
        &self,
        namespace: &str,
        sandbox_name: &str,
        session_id: &str,
    ) -> Result<SessionDirectory> {
        let session = SessionId::parse(session_id)?;
        let script = self.scripts.session_lookup(&session);

        let output = self.run(namespace, sandbox_name, script).await?;
        if !output.success {
            return Err(SandboxError::ExecFailed(failure_reason(&output)));
        }

        parse_session_directory(&output.stdout, &session)
    }
}

fn failure_reason(output: &ExecOutput) -> String {
    let stderr = output.stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    output
        .message
        .clone()
        .unwrap_or_else(|| "remote command failed".to_string())
}

fn parse_pid(stdout: &str) -> Result<u32> {
    let trimmed = stdout.trim();
    trimmed
        .parse::<u32>()
        .map_err(|_| SandboxError::ParseFailure(format!("expected a PID, got {:?}", trimmed)))
}

fn parse_kill_output(stdout: &str, port: u16) -> KillProcessResult {
    let line = stdout.trim();
    let mut words = line.split_whitespace();

    match (words.next(), words.next().and_then(|pid| pid.parse::<u32>().ok())) {
        (Some(NO_PROCESS), _) => KillProcessResult {
            success: true,
            killed_pid: None,
            message: format!("No process listening on port {}", port),
        },
        (Some(KILLED), Some(pid)) => KillProcessResult {
            success: true,
            killed_pid: Some(pid),
            message: format!("Killed process {} on port {}", pid, port),
        },
        (Some(KILL_FAILED), pid) => KillProcessResult {
            success: false,
            killed_pid: None,
            message: match pid {
                Some(pid) => format!("Failed to kill process {} on port {}", pid, port),
                None => format!("Failed to kill process on port {}", port),
            },
        },
        _ => KillProcessResult {
            success: false,
            killed_pid: None,
            message: format!("Unexpected output from port kill: {:?}", line),
        },
    }
}

/// Parse the NUL-terminated fields printed by the session lookup script.
fn parse_session_directory(stdout: &str, session: &SessionId) -> Result<SessionDirectory> {
    let fields: Vec<&str> = stdout.trim_start().split('\0').collect();

    match fields.as_slice() {
        [SESSION_FOUND, pid, cwd, home, ..] => {
            let pid = pid.parse::<u32>().map_err(|_| {
                SandboxError::ParseFailure(format!("session lookup returned PID {:?}", pid))
            })?;
            Ok(SessionDirectory {
                pid,
                current_dir: cwd.to_string(),
                home_dir: home.to_string(),
                is_in_home: is_within(cwd, home),
            })
        }
        [SESSION_NOT_FOUND, ..] => Err(SandboxError::SessionNotFound(session.to_string())),
        [PROCESS_NOT_FOUND, pid, ..] => Err(SandboxError::SessionProcessGone {
            pid: pid.to_string(),
        }),
        [CWD_UNREADABLE, pid, ..] => Err(SandboxError::SessionDirectoryUnreadable {
            pid: pid.to_string(),
        }),
        _ => Err(SandboxError::ParseFailure(format!(
            "unexpected session lookup output {:?}",
            stdout
        ))),
    }
}

fn is_within(path: &str, root: &str) -> bool {
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        return path.starts_with('/');
    }
    path == root
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
}
