// ABOUTME: Request and result types exchanged with sandbox callers
// ABOUTME: Creation info, env update outcomes and exec bridge results

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Inputs for creating a sandbox.
#[derive(Debug, Clone, Default)]
pub struct CreateSandboxRequest {
    pub sandbox_name: String,
    pub project_id: String,
    pub namespace: String,
    pub ingress_domain: String,
    pub env_vars: BTreeMap<String, String>,
}

/// Computed once at creation; URLs are not re-derived afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxInfo {
    pub stateful_set_name: String,
    pub service_name: String,
    pub public_url: String,
    pub ttyd_url: String,
    pub file_browser_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvUpdateOutcome {
    /// The stateful set does not exist; nothing was written.
    NotApplied,
    /// Every requested key already has the requested value; nothing was written.
    Unchanged,
    Updated,
}

impl EnvUpdateOutcome {
    pub fn is_applied(&self) -> bool {
        !matches!(self, Self::NotApplied)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundExecResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BackgroundExecResult {
    pub(crate) fn started(pid: u32, log_file: String) -> Self {
        Self {
            success: true,
            pid: Some(pid),
            log_file: Some(log_file),
            error: None,
        }
    }

    pub(crate) fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            pid: None,
            log_file: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillProcessResult {
    /// True when a process was signalled or when nothing was listening.
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub killed_pid: Option<u32>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDirectory {
    pub pid: u32,
    pub current_dir: String,
    pub home_dir: String,
    pub is_in_home: bool,
}
