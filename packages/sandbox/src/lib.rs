// ABOUTME: Kubernetes sandbox lifecycle orchestration for per-tenant development environments
// ABOUTME: Builds sandbox resources, converges their lifecycle and bridges commands into the pod

pub mod cluster;
pub mod error;
pub mod exec;
pub mod manager;
pub mod naming;
pub mod resources;
pub mod service;
pub mod status;
pub mod types;

pub use cluster::{ClusterClient, ClusterError, ExecOutput, KubeCluster};
pub use error::{Result, SandboxError};
pub use exec::{ExecBridge, ScriptBuilder, SessionId, ShellScripts};
pub use manager::SandboxManager;
pub use naming::SandboxNames;
pub use resources::ResourceBuilder;
pub use service::{DatabaseManager, IngressDomainResolver, SandboxService, StaticIngressDomain};
pub use status::{DetailedStatus, ReplicaCounts, SandboxStatus};
pub use types::{
    BackgroundExecResult, CreateSandboxRequest, EnvUpdateOutcome, KillProcessResult, SandboxInfo,
    SessionDirectory,
};

pub use kubedev_config::{ClusterConfig, ResourceTier};
