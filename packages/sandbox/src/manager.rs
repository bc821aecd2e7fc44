// ABOUTME: Sandbox lifecycle manager driving create, delete, start, stop and env updates
// ABOUTME: Every operation converges idempotently against live cluster state

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures::future::try_join_all;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::{EnvVar, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kubedev_config::env::{TTYD_ACCESS_TOKEN, TTYD_USER};
use kubedev_config::ClusterConfig;
use tracing::{debug, error, info, warn};

use crate::cluster::{ClusterClient, ClusterError, ClusterResultExt, ClusterUnitResultExt};
use crate::error::{Result, SandboxError};
use crate::naming::SandboxNames;
use crate::resources::ResourceBuilder;
use crate::status::{DetailedStatus, SandboxStatus};
use crate::types::{CreateSandboxRequest, EnvUpdateOutcome, SandboxInfo};

/// Replica count of a running sandbox.
const RUNNING_REPLICAS: i32 = 1;

/// Sandbox lifecycle manager
pub struct SandboxManager {
    client: Arc<dyn ClusterClient>,
    config: Arc<ClusterConfig>,
}

impl SandboxManager {
    pub fn new(client: Arc<dyn ClusterClient>, config: Arc<ClusterConfig>) -> Self {
        Self { client, config }
    }

    /// Create every cluster object of a sandbox, skipping the ones that already exist.
    pub async fn create_sandbox(&self, request: &CreateSandboxRequest) -> Result<SandboxInfo> {
        let namespace = request.namespace.as_str();
        let names = SandboxNames::new(request.sandbox_name.as_str());
        let builder = ResourceBuilder::new(&names, &request.project_id, &self.config);

        info!(
            "Creating sandbox {} in namespace {} (project: {})",
            names.sandbox(),
            namespace,
            request.project_id
        );

        self.ensure_stateful_set(namespace, &builder.stateful_set(&request.env_vars))
            .await?;
        self.ensure_service(namespace, &builder.service()).await?;

        let ingresses = builder.ingresses(&request.ingress_domain);
        try_join_all(
            ingresses
                .iter()
                .map(|ingress| self.ensure_ingress(namespace, ingress)),
        )
        .await?;

        info!("Sandbox {} created", names.sandbox());

        Ok(sandbox_info(
            &names,
            &request.ingress_domain,
            &request.env_vars,
            &self.config.ttyd_user,
        ))
    }

    /// Delete every cluster object of a sandbox concurrently. Objects that are
    /// already gone count as deleted; a failed claim deletion is only logged.
    pub async fn delete_sandbox(&self, sandbox_name: &str, namespace: &str) -> Result<()> {
        let names = SandboxNames::new(sandbox_name);
        let service = names.service();
        let [app_ingress, ttyd_ingress, filebrowser_ingress] = names.ingresses();
        let claim = names.persistent_volume_claim();

        info!("Deleting sandbox {} in namespace {}", sandbox_name, namespace);

        let (stateful_set, service_result, app, ttyd, filebrowser, claim_result) = tokio::join!(
            self.client.delete_stateful_set(namespace, names.stateful_set()),
            self.client.delete_service(namespace, &service),
            self.client.delete_ingress(namespace, &app_ingress),
            self.client.delete_ingress(namespace, &ttyd_ingress),
            self.client.delete_ingress(namespace, &filebrowser_ingress),
            self.client.delete_persistent_volume_claim(namespace, &claim),
        );

        match claim_result {
            Ok(()) => debug!("Deleted volume claim {}", claim),
            Err(e) if e.is_not_found() => debug!("Volume claim {} already gone", claim),
            Err(e) => warn!(
                "Failed to delete volume claim {} (may be reclaimed by retention policy): {}",
                claim, e
            ),
        }

        let outcomes = [
            (names.stateful_set().to_string(), stateful_set),
            (service, service_result),
            (app_ingress, app),
            (ttyd_ingress, ttyd),
            (filebrowser_ingress, filebrowser),
        ];

        let mut first_error: Option<ClusterError> = None;
        for (resource, outcome) in outcomes {
            if let Err(e) = outcome.ignore_not_found() {
                error!("Failed to delete {} in {}: {}", resource, namespace, e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => {
                info!("Sandbox {} deleted", sandbox_name);
                Ok(())
            }
        }
    }

    /// Scale to zero. A missing or already stopped sandbox is left untouched.
    pub async fn stop_sandbox(&self, sandbox_name: &str, namespace: &str) -> Result<()> {
        let Some(stateful_set) = self.find_stateful_set(namespace, sandbox_name).await? else {
            info!("Sandbox {} not found, nothing to stop", sandbox_name);
            return Ok(());
        };

        if declared_replicas(&stateful_set) == 0 {
            debug!("Sandbox {} already stopped", sandbox_name);
            return Ok(());
        }

        info!("Stopping sandbox {} in namespace {}", sandbox_name, namespace);
        self.scale(namespace, sandbox_name, 0).await
    }

    /// Scale to one. A missing or already running sandbox is left untouched.
    pub async fn start_sandbox(&self, sandbox_name: &str, namespace: &str) -> Result<()> {
        let Some(stateful_set) = self.find_stateful_set(namespace, sandbox_name).await? else {
            info!("Sandbox {} not found, nothing to start", sandbox_name);
            return Ok(());
        };

        if declared_replicas(&stateful_set) >= RUNNING_REPLICAS {
            debug!("Sandbox {} already started", sandbox_name);
            return Ok(());
        }

        info!("Starting sandbox {} in namespace {}", sandbox_name, namespace);
        self.scale(namespace, sandbox_name, RUNNING_REPLICAS).await
    }

    /// Merge `env_vars` into the primary container's environment. Keys not in
    /// the request are kept. The whole stateful set is replaced when anything
    /// differs; nothing is written otherwise.
    pub async fn update_env_vars(
        &self,
        namespace: &str,
        sandbox_name: &str,
        env_vars: &BTreeMap<String, String>,
    ) -> Result<EnvUpdateOutcome> {
        let names = SandboxNames::new(sandbox_name);

        let Some(mut stateful_set) = self.find_stateful_set(namespace, sandbox_name).await? else {
            warn!(
                "Sandbox {} not found in {}, env update not applied",
                sandbox_name, namespace
            );
            return Ok(EnvUpdateOutcome::NotApplied);
        };

        let container = stateful_set
            .spec
            .as_mut()
            .and_then(|spec| spec.template.spec.as_mut())
            .and_then(|pod| {
                pod.containers
                    .iter_mut()
                    .find(|c| c.name == names.primary_container())
            })
            .ok_or_else(|| SandboxError::ContainerNotFound {
                sandbox: sandbox_name.to_string(),
                container: names.primary_container().to_string(),
            })?;

        if !merge_env(container.env.get_or_insert_with(Vec::new), env_vars) {
            debug!("Env vars of sandbox {} already up to date", sandbox_name);
            return Ok(EnvUpdateOutcome::Unchanged);
        }

        info!(
            "Updating {} env vars of sandbox {} in {}",
            env_vars.len(),
            sandbox_name,
            namespace
        );

        self.client
            .replace_stateful_set(namespace, sandbox_name, &stateful_set)
            .await
            .inspect_err(|e| error!("Failed to replace stateful set {}: {}", sandbox_name, e))?;

        Ok(EnvUpdateOutcome::Updated)
    }

    pub async fn get_status(&self, sandbox_name: &str, namespace: &str) -> SandboxStatus {
        self.get_detailed_status(sandbox_name, namespace).await.status
    }

    /// Never fails: a missing stateful set is `TERMINATED`, any other error `ERROR`.
    pub async fn get_detailed_status(&self, sandbox_name: &str, namespace: &str) -> DetailedStatus {
        match self.client.get_stateful_set(namespace, sandbox_name).await {
            Ok(stateful_set) => DetailedStatus::from_stateful_set(&stateful_set),
            Err(e) if e.is_not_found() => DetailedStatus::terminated(),
            Err(e) => {
                warn!("Failed to read status of sandbox {}: {}", sandbox_name, e);
                DetailedStatus::error()
            }
        }
    }

    async fn find_stateful_set(&self, namespace: &str, name: &str) -> Result<Option<StatefulSet>> {
        Ok(self
            .client
            .get_stateful_set(namespace, name)
            .await
            .optional()
            .inspect_err(|e| error!("Failed to read stateful set {}: {}", name, e))?)
    }

    async fn scale(&self, namespace: &str, name: &str, replicas: i32) -> Result<()> {
        self.client
            .scale_stateful_set(namespace, name, replicas)
            .await
            .inspect_err(|e| error!("Failed to scale {} to {}: {}", name, replicas, e))?;
        Ok(())
    }

    async fn ensure_stateful_set(&self, namespace: &str, stateful_set: &StatefulSet) -> Result<()> {
        let name = stateful_set.metadata.name.as_deref().unwrap_or_default();

        let existing = self
            .client
            .get_stateful_set(namespace, name)
            .await
            .optional()
            .inspect_err(|e| error!("Failed to check stateful set {}: {}", name, e))?;
        if existing.is_some() {
            debug!("Stateful set {} already exists, skipping", name);
            return Ok(());
        }

        self.client
            .create_stateful_set(namespace, stateful_set)
            .await
            .ignore_conflict()
            .inspect_err(|e| error!("Failed to create stateful set {}: {}", name, e))?;
        debug!("Created stateful set {}", name);
        Ok(())
    }

    async fn ensure_service(&self, namespace: &str, service: &Service) -> Result<()> {
        let name = service.metadata.name.as_deref().unwrap_or_default();

        let existing = self
            .client
            .get_service(namespace, name)
            .await
            .optional()
            .inspect_err(|e| error!("Failed to check service {}: {}", name, e))?;
        if existing.is_some() {
            debug!("Service {} already exists, skipping", name);
            return Ok(());
        }

        self.client
            .create_service(namespace, service)
            .await
            .ignore_conflict()
            .inspect_err(|e| error!("Failed to create service {}: {}", name, e))?;
        debug!("Created service {}", name);
        Ok(())
    }

    async fn ensure_ingress(&self, namespace: &str, ingress: &Ingress) -> Result<()> {
        let name = ingress.metadata.name.as_deref().unwrap_or_default();

        let existing = self
            .client
            .get_ingress(namespace, name)
            .await
            .optional()
            .inspect_err(|e| error!("Failed to check ingress {}: {}", name, e))?;
        if existing.is_some() {
            debug!("Ingress {} already exists, skipping", name);
            return Ok(());
        }

        self.client
            .create_ingress(namespace, ingress)
            .await
            .ignore_conflict()
            .inspect_err(|e| error!("Failed to create ingress {}: {}", name, e))?;
        debug!("Created ingress {}", name);
        Ok(())
    }
}

fn declared_replicas(stateful_set: &StatefulSet) -> i32 {
    stateful_set
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(RUNNING_REPLICAS)
}

/// Apply `requested` onto `existing`, returning whether anything changed.
fn merge_env(existing: &mut Vec<EnvVar>, requested: &BTreeMap<String, String>) -> bool {
    let mut changed = false;

    for (name, value) in requested {
        match existing.iter_mut().find(|var| &var.name == name) {
            Some(var) => {
                if var.value.as_deref() != Some(value.as_str()) || var.value_from.is_some() {
                    var.value = Some(value.clone());
                    var.value_from = None;
                    changed = true;
                }
            }
            None => {
                existing.push(EnvVar {
                    name: name.clone(),
                    value: Some(value.clone()),
                    ..Default::default()
                });
                changed = true;
            }
        }
    }

    changed
}

fn sandbox_info(
    names: &SandboxNames,
    domain: &str,
    env_vars: &BTreeMap<String, String>,
    ttyd_user: &str,
) -> SandboxInfo {
    let mut ttyd_url = format!("https://{}", names.ttyd_host(domain));
    if let Some(token) = env_vars
        .get(TTYD_ACCESS_TOKEN)
        .filter(|token| !token.is_empty())
    {
        // The container runs ttyd with the same override.
        let user = env_vars
            .get(TTYD_USER)
            .map(String::as_str)
            .unwrap_or(ttyd_user);
        let credential = BASE64.encode(format!("{}:{}", user, token));
        ttyd_url.push_str(&format!("?authorization={}", credential));
    }

    SandboxInfo {
        stateful_set_name: names.stateful_set().to_string(),
        service_name: names.service(),
        public_url: format!("https://{}", names.app_host(domain)),
        ttyd_url,
        file_browser_url: format!("https://{}", names.filebrowser_host(domain)),
    }
}
