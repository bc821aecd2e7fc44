// ABOUTME: Cluster configuration loaded from environment variables
// ABOUTME: Supplies default namespace, ingress settings, images and the resource tier

use std::env;

use tracing::debug;

use crate::env as vars;
use crate::{ConfigError, ResourceTier};

pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_INGRESS_CLASS: &str = "nginx";
pub const DEFAULT_RUNTIME_IMAGE: &str = "ghcr.io/kubedev/runtime:latest";
pub const DEFAULT_FILEBROWSER_IMAGE: &str = "filebrowser/filebrowser:v2.27.0";
pub const DEFAULT_TTYD_USER: &str = "user";

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterConfig {
    pub namespace: String,
    pub ingress_domain: Option<String>,
    pub ingress_class: String,
    pub runtime_image: String,
    pub filebrowser_image: String,
    pub storage_class: Option<String>,
    pub tier: ResourceTier,
    pub ttyd_user: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            ingress_domain: None,
            ingress_class: DEFAULT_INGRESS_CLASS.to_string(),
            runtime_image: DEFAULT_RUNTIME_IMAGE.to_string(),
            filebrowser_image: DEFAULT_FILEBROWSER_IMAGE.to_string(),
            storage_class: None,
            tier: ResourceTier::default(),
            ttyd_user: DEFAULT_TTYD_USER.to_string(),
        }
    }
}

impl ClusterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let namespace = non_empty(vars::KUBEDEV_NAMESPACE).unwrap_or(defaults.namespace);
        validate_dns_label(vars::KUBEDEV_NAMESPACE, &namespace)?;

        let tier = match non_empty(vars::KUBEDEV_RESOURCE_TIER) {
            Some(raw) => raw.parse::<ResourceTier>()?,
            None => defaults.tier,
        };

        let config = ClusterConfig {
            namespace,
            ingress_domain: non_empty(vars::KUBEDEV_INGRESS_DOMAIN),
            ingress_class: non_empty(vars::KUBEDEV_INGRESS_CLASS).unwrap_or(defaults.ingress_class),
            runtime_image: non_empty(vars::KUBEDEV_RUNTIME_IMAGE).unwrap_or(defaults.runtime_image),
            filebrowser_image: non_empty(vars::KUBEDEV_FILEBROWSER_IMAGE)
                .unwrap_or(defaults.filebrowser_image),
            storage_class: non_empty(vars::KUBEDEV_STORAGE_CLASS),
            tier,
            ttyd_user: non_empty(vars::KUBEDEV_TTYD_USER).unwrap_or(defaults.ttyd_user),
        };

        debug!(
            "Loaded cluster config: namespace={}, tier={}, ingress_domain={:?}",
            config.namespace, config.tier, config.ingress_domain
        );

        Ok(config)
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_dns_label(name: &'static str, value: &str) -> Result<(), ConfigError> {
    let valid = value.len() <= 63
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !value.starts_with('-')
        && !value.ends_with('-');

    if valid {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        })
    }
}
