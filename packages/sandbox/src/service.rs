// ABOUTME: Facade over the lifecycle manager, exec bridge and database manager
// ABOUTME: Defaults namespaces and resolves the ingress domain once per call

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use kubedev_config::env::KUBEDEV_INGRESS_DOMAIN;
use kubedev_config::{ClusterConfig, ConfigError};
use tracing::debug;

use crate::cluster::{ClusterClient, KubeCluster};
use crate::error::{Result, SandboxError};
use crate::exec::ExecBridge;
use crate::manager::SandboxManager;
use crate::status::{DetailedStatus, SandboxStatus};
use crate::types::{
    BackgroundExecResult, CreateSandboxRequest, KillProcessResult, SandboxInfo, SessionDirectory,
};

/// Source of the ingress domain that sandbox hosts are published under.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IngressDomainResolver: Send + Sync {
    async fn resolve(&self) -> Result<String>;
}

/// Resolver returning the domain configured through `KUBEDEV_INGRESS_DOMAIN`.
#[derive(Debug, Clone, Default)]
pub struct StaticIngressDomain {
    domain: Option<String>,
}

impl StaticIngressDomain {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: Some(domain.into()),
        }
    }

    pub fn from_config(config: &ClusterConfig) -> Self {
        Self {
            domain: config.ingress_domain.clone(),
        }
    }
}

#[async_trait]
impl IngressDomainResolver for StaticIngressDomain {
    async fn resolve(&self) -> Result<String> {
        self.domain
            .clone()
            .ok_or_else(|| SandboxError::Config(ConfigError::Missing(KUBEDEV_INGRESS_DOMAIN)))
    }
}

/// Manager of the database cluster that can accompany a sandbox.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DatabaseManager: Send + Sync {
    async fn create_database(&self, namespace: &str, name: &str) -> Result<()>;

    async fn delete_database(&self, namespace: &str, name: &str) -> Result<()>;

    async fn start_database(&self, namespace: &str, name: &str) -> Result<()>;

    async fn stop_database(&self, namespace: &str, name: &str) -> Result<()>;

    async fn get_database_status(&self, namespace: &str, name: &str) -> Result<SandboxStatus>;
}

/// Entry point for callers. Every operation takes an optional namespace that
/// falls back to the configured default.
pub struct SandboxService {
    manager: SandboxManager,
    bridge: ExecBridge,
    domains: Arc<dyn IngressDomainResolver>,
    databases: Option<Arc<dyn DatabaseManager>>,
    default_namespace: String,
}

impl SandboxService {
    pub fn new(
        client: Arc<dyn ClusterClient>,
        config: ClusterConfig,
        domains: Arc<dyn IngressDomainResolver>,
    ) -> Self {
        let default_namespace = config.namespace.clone();
        Self {
            manager: SandboxManager::new(client.clone(), Arc::new(config)),
            bridge: ExecBridge::new(client),
            domains,
            databases: None,
            default_namespace,
        }
    }

    /// Connect to the cluster from the ambient kubeconfig, publishing under
    /// the configured ingress domain.
    pub async fn connect(config: ClusterConfig) -> Result<Self> {
        let client = KubeCluster::try_default().await?;
        let domains = StaticIngressDomain::from_config(&config);
        Ok(Self::new(Arc::new(client), config, Arc::new(domains)))
    }

    pub fn with_database_manager(mut self, databases: Arc<dyn DatabaseManager>) -> Self {
        self.databases = Some(databases);
        self
    }

    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    fn namespace<'a>(&'a self, namespace: Option<&'a str>) -> &'a str {
        namespace.unwrap_or(&self.default_namespace)
    }

    fn databases(&self) -> Result<&Arc<dyn DatabaseManager>> {
        self.databases
            .as_ref()
            .ok_or_else(|| SandboxError::Database("no database manager configured".to_string()))
    }

    pub async fn create_sandbox(
        &self,
        sandbox_name: &str,
        project_id: &str,
        env_vars: BTreeMap<String, String>,
        namespace: Option<&str>,
    ) -> Result<SandboxInfo> {
        let ingress_domain = self.domains.resolve().await?;
        debug!("Resolved ingress domain {}", ingress_domain);

        let request = CreateSandboxRequest {
            sandbox_name: sandbox_name.to_string(),
            project_id: project_id.to_string(),
            namespace: self.namespace(namespace).to_string(),
            ingress_domain,
            env_vars,
        };
        self.manager.create_sandbox(&request).await
    }

    pub async fn delete_sandbox(&self, sandbox_name: &str, namespace: Option<&str>) -> Result<()> {
        self.manager
            .delete_sandbox(sandbox_name, self.namespace(namespace))
            .await
    }

    pub async fn stop_sandbox(&self, sandbox_name: &str, namespace: Option<&str>) -> Result<()> {
        self.manager
            .stop_sandbox(sandbox_name, self.namespace(namespace))
            .await
    }

    pub async fn start_sandbox(&self, sandbox_name: &str, namespace: Option<&str>) -> Result<()> {
        self.manager
            .start_sandbox(sandbox_name, self.namespace(namespace))
            .await
    }

    pub async fn get_sandbox_status(
        &self,
        sandbox_name: &str,
        namespace: Option<&str>,
    ) -> SandboxStatus {
        self.manager
            .get_status(sandbox_name, self.namespace(namespace))
            .await
    }

    pub async fn get_sandbox_detailed_status(
        &self,
        sandbox_name: &str,
        namespace: Option<&str>,
    ) -> DetailedStatus {
        self.manager
            .get_detailed_status(sandbox_name, self.namespace(namespace))
            .await
    }

    /// Returns `false` only when the sandbox does not exist.
    pub async fn update_sandbox_env_vars(
        &self,
        sandbox_name: &str,
        env_vars: &BTreeMap<String, String>,
        namespace: Option<&str>,
    ) -> Result<bool> {
        let outcome = self
            .manager
            .update_env_vars(self.namespace(namespace), sandbox_name, env_vars)
            .await?;
        Ok(outcome.is_applied())
    }

    pub async fn exec_command_in_background(
        &self,
        sandbox_name: &str,
        workdir: &str,
        command: &str,
        namespace: Option<&str>,
    ) -> Result<BackgroundExecResult> {
        self.bridge
            .exec_in_background(self.namespace(namespace), sandbox_name, workdir, command)
            .await
    }

    pub async fn is_port_listening(
        &self,
        sandbox_name: &str,
        port: u16,
        namespace: Option<&str>,
    ) -> bool {
        self.bridge
            .is_port_listening(self.namespace(namespace), sandbox_name, port)
            .await
    }

    pub async fn kill_process_on_port(
        &self,
        sandbox_name: &str,
        port: u16,
        namespace: Option<&str>,
    ) -> KillProcessResult {
        self.bridge
            .kill_process_on_port(self.namespace(namespace), sandbox_name, port)
            .await
    }

    pub async fn get_sandbox_current_directory(
        &self,
        sandbox_name: &str,
        session_id: &str,
        namespace: Option<&str>,
    ) -> Result<SessionDirectory> {
        self.bridge
            .get_current_directory(self.namespace(namespace), sandbox_name, session_id)
            .await
    }

    pub async fn create_database(&self, name: &str, namespace: Option<&str>) -> Result<()> {
        self.databases()?
            .create_database(self.namespace(namespace), name)
            .await
    }

    pub async fn delete_database(&self, name: &str, namespace: Option<&str>) -> Result<()> {
        self.databases()?
            .delete_database(self.namespace(namespace), name)
            .await
    }

    pub async fn start_database(&self, name: &str, namespace: Option<&str>) -> Result<()> {
        self.databases()?
            .start_database(self.namespace(namespace), name)
            .await
    }

    pub async fn stop_database(&self, name: &str, namespace: Option<&str>) -> Result<()> {
        self.databases()?
            .stop_database(self.namespace(namespace), name)
            .await
    }

    pub async fn get_database_status(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<SandboxStatus> {
        self.databases()?
            .get_database_status(self.namespace(namespace), name)
            .await
    }
}
