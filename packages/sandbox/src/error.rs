// ABOUTME: Error type for sandbox orchestration and the remote exec bridge
// ABOUTME: Separates cluster transport failures from remote script contract violations

use crate::cluster::ClusterError;
use kubedev_config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Primary container {container} not found in stateful set {sandbox}")]
    ContainerNotFound { sandbox: String, container: String },

    #[error("Invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("Remote command failed: {0}")]
    ExecFailed(String),

    #[error("Failed to parse remote output: {0}")]
    ParseFailure(String),

    #[error("No terminal session marker for session {0}")]
    SessionNotFound(String),

    #[error("Terminal session process {pid} is no longer running")]
    SessionProcessGone { pid: String },

    #[error("Working directory of session process {pid} is unreadable")]
    SessionDirectoryUnreadable { pid: String },

    #[error("Database manager error: {0}")]
    Database(String),
}

pub type Result<T> = std::result::Result<T, SandboxError>;
