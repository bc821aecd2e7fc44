// ABOUTME: Lifecycle status derived from a stateful set's replica counters
// ABOUTME: Recomputed on every query; nothing here is persisted

use k8s_openapi::api::apps::v1::StatefulSet;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SandboxStatus {
    Starting,
    Running,
    Stopping,
    Stopped,
    Terminated,
    Error,
}

impl SandboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
            Self::Terminated => "TERMINATED",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for SandboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared replica count plus the four counters the controller reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaCounts {
    pub declared: i32,
    pub replicas: i32,
    pub ready_replicas: i32,
    pub current_replicas: i32,
    pub updated_replicas: i32,
}

impl ReplicaCounts {
    /// An unset `spec.replicas` means the Kubernetes default of one.
    pub fn from_stateful_set(stateful_set: &StatefulSet) -> Self {
        let declared = stateful_set
            .spec
            .as_ref()
            .and_then(|spec| spec.replicas)
            .unwrap_or(1);

        match stateful_set.status.as_ref() {
            Some(status) => Self {
                declared,
                replicas: status.replicas,
                ready_replicas: status.ready_replicas.unwrap_or(0),
                current_replicas: status.current_replicas.unwrap_or(0),
                updated_replicas: status.updated_replicas.unwrap_or(0),
            },
            None => Self {
                declared,
                ..Default::default()
            },
        }
    }

    /// Every observed counter equals the declared count.
    pub fn is_ready(&self) -> bool {
        self.declared == self.replicas
            && self.declared == self.ready_replicas
            && self.declared == self.current_replicas
            && self.declared == self.updated_replicas
    }

    pub fn status(&self) -> SandboxStatus {
        if self.declared == 0 {
            if self.current_replicas > 0 {
                SandboxStatus::Stopping
            } else {
                SandboxStatus::Stopped
            }
        } else if self.is_ready() {
            SandboxStatus::Running
        } else {
            SandboxStatus::Starting
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedStatus {
    pub status: SandboxStatus,
    #[serde(flatten)]
    pub counts: ReplicaCounts,
}

impl DetailedStatus {
    pub fn from_stateful_set(stateful_set: &StatefulSet) -> Self {
        let counts = ReplicaCounts::from_stateful_set(stateful_set);
        Self {
            status: counts.status(),
            counts,
        }
    }

    pub fn terminated() -> Self {
        Self {
            status: SandboxStatus::Terminated,
            counts: ReplicaCounts::default(),
        }
    }

    pub fn error() -> Self {
        Self {
            status: SandboxStatus::Error,
            counts: ReplicaCounts::default(),
        }
    }
}
