// ABOUTME: Kubernetes implementation of ClusterClient built on kube-rs
// ABOUTME: Maps API status codes into ClusterError and drains exec streams into buffers

use super::{ClusterClient, ClusterError, ExecOutput, Result};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{AttachParams, DeleteParams, Patch, PatchParams, PostParams};
use kube::{Api, Client};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

const EXEC_SUCCESS: &str = "Success";

impl From<kube::Error> for ClusterError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(response) => match response.code {
                404 => ClusterError::NotFound(response.message),
                409 => ClusterError::Conflict(response.message),
                code => ClusterError::Api {
                    code,
                    message: response.message,
                },
            },
            other => ClusterError::Transport(other.to_string()),
        }
    }
}

pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    /// Connect using the ambient kubeconfig or in-cluster service account.
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn stateful_sets(&self, namespace: &str) -> Api<StatefulSet> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn services(&self, namespace: &str) -> Api<Service> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn ingresses(&self, namespace: &str) -> Api<Ingress> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn claims(&self, namespace: &str) -> Api<PersistentVolumeClaim> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClusterClient for KubeCluster {
    async fn get_stateful_set(&self, namespace: &str, name: &str) -> Result<StatefulSet> {
        Ok(self.stateful_sets(namespace).get(name).await?)
    }

    async fn create_stateful_set(
        &self,
        namespace: &str,
        stateful_set: &StatefulSet,
    ) -> Result<()> {
        self.stateful_sets(namespace)
            .create(&PostParams::default(), stateful_set)
            .await?;
        Ok(())
    }

    async fn replace_stateful_set(
        &self,
        namespace: &str,
        name: &str,
        stateful_set: &StatefulSet,
    ) -> Result<()> {
        self.stateful_sets(namespace)
            .replace(name, &PostParams::default(), stateful_set)
            .await?;
        Ok(())
    }

    async fn scale_stateful_set(&self, namespace: &str, name: &str, replicas: i32) -> Result<()> {
        let patch = serde_json::json!({ "spec": { "replicas": replicas } });
        self.stateful_sets(namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn delete_stateful_set(&self, namespace: &str, name: &str) -> Result<()> {
        self.stateful_sets(namespace)
            .delete(name, &DeleteParams::background())
            .await?;
        Ok(())
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service> {
        Ok(self.services(namespace).get(name).await?)
    }

    async fn create_service(&self, namespace: &str, service: &Service) -> Result<()> {
        self.services(namespace)
            .create(&PostParams::default(), service)
            .await?;
        Ok(())
    }

    async fn delete_service(&self, namespace: &str, name: &str) -> Result<()> {
        self.services(namespace)
            .delete(name, &DeleteParams::default())
            .await?;
        Ok(())
    }

    async fn get_ingress(&self, namespace: &str, name: &str) -> Result<Ingress> {
        Ok(self.ingresses(namespace).get(name).await?)
    }

    async fn create_ingress(&self, namespace: &str, ingress: &Ingress) -> Result<()> {
        self.ingresses(namespace)
            .create(&PostParams::default(), ingress)
            .await?;
        Ok(())
    }

    async fn delete_ingress(&self, namespace: &str, name: &str) -> Result<()> {
        self.ingresses(namespace)
            .delete(name, &DeleteParams::default())
            .await?;
        Ok(())
    }

    async fn delete_persistent_volume_claim(&self, namespace: &str, name: &str) -> Result<()> {
        self.claims(namespace)
            .delete(name, &DeleteParams::default())
            .await?;
        Ok(())
    }

    async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        command: Vec<String>,
    ) -> Result<ExecOutput> {
        debug!("Exec in {}/{} container {}", namespace, pod, container);

        let params = AttachParams::default()
            .container(container)
            .stdin(false)
            .stdout(true)
            .stderr(true);

        let mut attached = self.pods(namespace).exec(pod, command, &params).await?;

        let status = attached.take_status();
        let stdout = attached.stdout();
        let stderr = attached.stderr();

        let (stdout, stderr) = tokio::join!(drain(stdout), drain(stderr));
        let stdout = stdout.map_err(|e| ClusterError::Exec(e.to_string()))?;
        let stderr = stderr.map_err(|e| ClusterError::Exec(e.to_string()))?;

        let status = match status {
            Some(status) => status.await,
            None => None,
        };

        attached
            .join()
            .await
            .map_err(|e| ClusterError::Exec(e.to_string()))?;

        let (success, message) = match status {
            Some(status) => (
                status.status.as_deref() == Some(EXEC_SUCCESS),
                status.message,
            ),
            None => (
                false,
                Some("exec channel closed without reporting a status".to_string()),
            ),
        };

        Ok(ExecOutput {
            stdout,
            stderr,
            success,
            message: if success { None } else { message },
        })
    }
}

async fn drain(stream: Option<impl AsyncRead + Unpin>) -> std::io::Result<String> {
    let mut buffer = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buffer).await?;
    }
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
