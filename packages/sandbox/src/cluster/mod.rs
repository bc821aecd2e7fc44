// ABOUTME: Cluster client trait abstracting typed Kubernetes operations for sandboxes
// ABOUTME: Failures are classified into a closed tag set so callers branch on NotFound/Conflict

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use thiserror::Error;

pub mod kubernetes;

pub use kubernetes::KubeCluster;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    Conflict(String),

    #[error("Cluster API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Exec channel error: {0}")]
    Exec(String),
}

pub type Result<T> = std::result::Result<T, ClusterError>;

impl ClusterError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Adapters for the idempotent outcomes of cluster calls.
pub trait ClusterResultExt<T> {
    /// Maps `NotFound` to `Ok(None)`.
    fn optional(self) -> Result<Option<T>>;
}

impl<T> ClusterResultExt<T> for Result<T> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

pub trait ClusterUnitResultExt {
    /// Treats "already exists" as success.
    fn ignore_conflict(self) -> Result<()>;

    /// Treats "already gone" as success.
    fn ignore_not_found(self) -> Result<()>;
}

impl ClusterUnitResultExt for Result<()> {
    fn ignore_conflict(self) -> Result<()> {
        match self {
            Err(e) if e.is_conflict() => Ok(()),
            other => other,
        }
    }

    fn ignore_not_found(self) -> Result<()> {
        match self {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }
}

/// Captured output of a command run over the exec channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    /// True when the channel reported a successful completion.
    pub success: bool,
    /// Failure message reported by the channel, if any.
    pub message: Option<String>,
}

impl ExecOutput {
    pub fn succeeded(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            success: true,
            ..Default::default()
        }
    }

    pub fn failed(stderr: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stderr: stderr.into(),
            success: false,
            message: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Typed operations against the resource kinds that make up a sandbox.
///
/// Every method is a single round-trip. A missing object surfaces as
/// `ClusterError::NotFound` and a duplicate create as `ClusterError::Conflict`;
/// deciding whether those are acceptable is left to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn get_stateful_set(&self, namespace: &str, name: &str) -> Result<StatefulSet>;

    async fn create_stateful_set(&self, namespace: &str, stateful_set: &StatefulSet)
        -> Result<()>;

    /// Full replace of an existing stateful set.
    async fn replace_stateful_set(
        &self,
        namespace: &str,
        name: &str,
        stateful_set: &StatefulSet,
    ) -> Result<()>;

    /// Patch only `spec.replicas`.
    async fn scale_stateful_set(&self, namespace: &str, name: &str, replicas: i32) -> Result<()>;

    async fn delete_stateful_set(&self, namespace: &str, name: &str) -> Result<()>;

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service>;

    async fn create_service(&self, namespace: &str, service: &Service) -> Result<()>;

    async fn delete_service(&self, namespace: &str, name: &str) -> Result<()>;

    async fn get_ingress(&self, namespace: &str, name: &str) -> Result<Ingress>;

    async fn create_ingress(&self, namespace: &str, ingress: &Ingress) -> Result<()>;

    async fn delete_ingress(&self, namespace: &str, name: &str) -> Result<()>;

    async fn delete_persistent_volume_claim(&self, namespace: &str, name: &str) -> Result<()>;

    /// Run `command` in `container` of `pod` and capture its output.
    async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        command: Vec<String>,
    ) -> Result<ExecOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_maps_not_found_to_none() {
        let missing: Result<u8> = Err(ClusterError::NotFound("x".into()));
        assert_eq!(missing.optional().unwrap(), None);

        let present: Result<u8> = Ok(7);
        assert_eq!(present.optional().unwrap(), Some(7));

        let broken: Result<u8> = Err(ClusterError::Api {
            code: 500,
            message: "boom".into(),
        });
        assert!(broken.optional().is_err());
    }

    #[test]
    fn test_ignore_helpers() {
        let conflict: Result<()> = Err(ClusterError::Conflict("dup".into()));
        assert!(conflict.ignore_conflict().is_ok());

        let conflict: Result<()> = Err(ClusterError::Conflict("dup".into()));
        assert!(conflict.ignore_not_found().is_err());

        let gone: Result<()> = Err(ClusterError::NotFound("gone".into()));
        assert!(gone.ignore_not_found().is_ok());

        let forbidden: Result<()> = Err(ClusterError::Api {
            code: 403,
            message: "forbidden".into(),
        });
        assert_eq!(
            forbidden.ignore_not_found().unwrap_err(),
            ClusterError::Api {
                code: 403,
                message: "forbidden".into()
            }
        );
    }
}
