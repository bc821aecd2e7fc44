// ABOUTME: Desired-state documents for the cluster objects that make up a sandbox
// ABOUTME: Pure builders for the stateful set, service and the three ingress routes

use std::collections::BTreeMap;

use kubedev_config::ClusterConfig;

use crate::naming::{
    project_label_value, SandboxNames, MANAGED_BY_LABEL, MANAGED_BY_VALUE, PROJECT_LABEL,
    SANDBOX_LABEL,
};

mod ingress;
mod init_script;
mod service;
mod stateful_set;

pub use init_script::{HOME_DIR, PROJECT_DIR, TEMPLATE_DIR};

pub const APP_PORT: i32 = 3000;
pub const TTYD_PORT: i32 = 7681;
pub const FILEBROWSER_PORT: i32 = 8080;

pub const FILEBROWSER_CONTAINER: &str = "filebrowser";
pub const INIT_CONTAINER: &str = "init-workspace";

/// An externally reachable capability of a sandbox, each served by its own
/// ingress and backend port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    App,
    Terminal,
    FileBrowser,
}

impl Route {
    pub const ALL: [Route; 3] = [Route::App, Route::Terminal, Route::FileBrowser];

    pub fn port_name(&self) -> &'static str {
        match self {
            Self::App => "app",
            Self::Terminal => "ttyd",
            Self::FileBrowser => "filebrowser",
        }
    }

    pub fn port(&self) -> i32 {
        match self {
            Self::App => APP_PORT,
            Self::Terminal => TTYD_PORT,
            Self::FileBrowser => FILEBROWSER_PORT,
        }
    }

    pub fn ingress_name(&self, names: &SandboxNames) -> String {
        match self {
            Self::App => names.app_ingress(),
            Self::Terminal => names.ttyd_ingress(),
            Self::FileBrowser => names.filebrowser_ingress(),
        }
    }

    pub fn host(&self, names: &SandboxNames, domain: &str) -> String {
        match self {
            Self::App => names.app_host(domain),
            Self::Terminal => names.ttyd_host(domain),
            Self::FileBrowser => names.filebrowser_host(domain),
        }
    }
}

/// Builds the resource documents for one sandbox.
pub struct ResourceBuilder<'a> {
    names: &'a SandboxNames,
    config: &'a ClusterConfig,
    project_label: String,
}

impl<'a> ResourceBuilder<'a> {
    pub fn new(names: &'a SandboxNames, project: &str, config: &'a ClusterConfig) -> Self {
        Self {
            names,
            config,
            project_label: project_label_value(project),
        }
    }

    /// Labels attached to every object of the sandbox.
    pub fn labels(&self) -> BTreeMap<String, String> {
        let mut labels = self.selector_labels();
        labels.insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string());
        if !self.project_label.is_empty() {
            labels.insert(PROJECT_LABEL.to_string(), self.project_label.clone());
        }
        labels
    }

    /// Labels the service uses to select the sandbox pod.
    pub fn selector_labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(
            SANDBOX_LABEL.to_string(),
            self.names.sandbox().to_string(),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_include_project_and_selector() {
        let names = SandboxNames::new("acme-x1");
        let config = ClusterConfig::default();
        let builder = ResourceBuilder::new(&names, "Proj 42", &config);

        let labels = builder.labels();
        assert_eq!(labels.get(SANDBOX_LABEL).unwrap(), "acme-x1");
        assert_eq!(labels.get(PROJECT_LABEL).unwrap(), "proj-42");
        assert_eq!(labels.get(MANAGED_BY_LABEL).unwrap(), "kubedev");
    }

    #[test]
    fn test_empty_project_label_is_omitted() {
        let names = SandboxNames::new("acme-x1");
        let config = ClusterConfig::default();
        let builder = ResourceBuilder::new(&names, "***", &config);

        assert!(!builder.labels().contains_key(PROJECT_LABEL));
    }

    #[test]
    fn test_routes_have_distinct_ports() {
        let ports: Vec<i32> = Route::ALL.iter().map(Route::port).collect();
        assert_eq!(ports, vec![APP_PORT, TTYD_PORT, FILEBROWSER_PORT]);
    }
}
