// ABOUTME: Stateful set document for a sandbox: one replica slot, init phase, two containers
// ABOUTME: Claims are deleted with the workload but retained across scale-down

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{
    StatefulSet, StatefulSetPersistentVolumeClaimRetentionPolicy, StatefulSetSpec,
};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, PersistentVolumeClaim, PersistentVolumeClaimSpec,
    PodSpec, PodTemplateSpec, ResourceRequirements, VolumeMount, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

use super::init_script::{init_script, HOME_DIR, PROJECT_DIR};
use super::{ResourceBuilder, Route, FILEBROWSER_CONTAINER, INIT_CONTAINER};
use crate::naming::CLAIM_TEMPLATE;
use kubedev_config::env::{TTYD_ACCESS_TOKEN, TTYD_USER};

const ACCESS_MODE: &str = "ReadWriteOnce";
const RETENTION_DELETE: &str = "Delete";
const RETENTION_RETAIN: &str = "Retain";

impl ResourceBuilder<'_> {
    /// The sandbox workload. `env` becomes the primary container's environment.
    pub fn stateful_set(&self, env: &BTreeMap<String, String>) -> StatefulSet {
        let labels = self.labels();

        StatefulSet {
            metadata: ObjectMeta {
                name: Some(self.names.stateful_set().to_string()),
                labels: Some(labels.clone()),
                ..Default::default()
            },
            spec: Some(StatefulSetSpec {
                replicas: Some(1),
                service_name: self.names.service(),
                selector: LabelSelector {
                    match_labels: Some(self.selector_labels()),
                    ..Default::default()
                },
                persistent_volume_claim_retention_policy: Some(
                    StatefulSetPersistentVolumeClaimRetentionPolicy {
                        when_deleted: Some(RETENTION_DELETE.to_string()),
                        when_scaled: Some(RETENTION_RETAIN.to_string()),
                    },
                ),
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels.clone()),
                        ..Default::default()
                    }),
                    spec: Some(self.pod_spec(env)),
                },
                volume_claim_templates: Some(vec![self.claim_template()]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn pod_spec(&self, env: &BTreeMap<String, String>) -> PodSpec {
        PodSpec {
            init_containers: Some(vec![self.init_container()]),
            containers: vec![self.primary_container(env), self.filebrowser_container()],
            ..Default::default()
        }
    }

    fn workspace_mount(&self, mount_path: &str) -> VolumeMount {
        VolumeMount {
            name: CLAIM_TEMPLATE.to_string(),
            mount_path: mount_path.to_string(),
            ..Default::default()
        }
    }

    fn init_container(&self) -> Container {
        Container {
            name: INIT_CONTAINER.to_string(),
            image: Some(self.config.runtime_image.clone()),
            command: Some(vec![
                "sh".to_string(),
                "-c".to_string(),
                init_script(),
            ]),
            volume_mounts: Some(vec![self.workspace_mount(HOME_DIR)]),
            ..Default::default()
        }
    }

    fn primary_container(&self, env: &BTreeMap<String, String>) -> Container {
        let tier = self.config.tier.resources();

        let mut env_vars = vec![
            EnvVar {
                name: "HOME".to_string(),
                value: Some(HOME_DIR.to_string()),
                ..Default::default()
            },
            EnvVar {
                name: TTYD_USER.to_string(),
                value: Some(self.config.ttyd_user.clone()),
                ..Default::default()
            },
        ];
        env_vars.retain(|var| !env.contains_key(&var.name));
        env_vars.extend(env.iter().map(|(name, value)| EnvVar {
            name: name.clone(),
            value: Some(value.clone()),
            ..Default::default()
        }));

        Container {
            name: self.names.primary_container().to_string(),
            image: Some(self.config.runtime_image.clone()),
            command: Some(vec![
                "sh".to_string(),
                "-c".to_string(),
                ttyd_command(),
            ]),
            working_dir: Some(PROJECT_DIR.to_string()),
            env: Some(env_vars),
            ports: Some(vec![
                container_port(Route::App),
                container_port(Route::Terminal),
            ]),
            resources: Some(ResourceRequirements {
                requests: Some(BTreeMap::from([
                    ("cpu".to_string(), Quantity(tier.cpu_request.to_string())),
                    ("memory".to_string(), Quantity(tier.memory_request.to_string())),
                ])),
                limits: Some(BTreeMap::from([
                    ("cpu".to_string(), Quantity(tier.cpu_limit.to_string())),
                    ("memory".to_string(), Quantity(tier.memory_limit.to_string())),
                ])),
                ..Default::default()
            }),
            volume_mounts: Some(vec![self.workspace_mount(HOME_DIR)]),
            ..Default::default()
        }
    }

    fn filebrowser_container(&self) -> Container {
        Container {
            name: FILEBROWSER_CONTAINER.to_string(),
            image: Some(self.config.filebrowser_image.clone()),
            args: Some(vec![
                "--noauth".to_string(),
                "--address=0.0.0.0".to_string(),
                format!("--port={}", Route::FileBrowser.port()),
                format!("--root={}", PROJECT_DIR),
                "--database=/tmp/filebrowser.db".to_string(),
            ]),
            ports: Some(vec![container_port(Route::FileBrowser)]),
            volume_mounts: Some(vec![self.workspace_mount(HOME_DIR)]),
            ..Default::default()
        }
    }

    fn claim_template(&self) -> PersistentVolumeClaim {
        let size = self.config.tier.resources().storage_size;

        PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some(CLAIM_TEMPLATE.to_string()),
                labels: Some(self.labels()),
                ..Default::default()
            },
            spec: Some(PersistentVolumeClaimSpec {
                access_modes: Some(vec![ACCESS_MODE.to_string()]),
                storage_class_name: self.config.storage_class.clone(),
                resources: Some(VolumeResourceRequirements {
                    requests: Some(BTreeMap::from([(
                        "storage".to_string(),
                        Quantity(size.to_string()),
                    )])),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

fn container_port(route: Route) -> ContainerPort {
    ContainerPort {
        name: Some(route.port_name().to_string()),
        container_port: route.port(),
        protocol: Some("TCP".to_string()),
        ..Default::default()
    }
}

/// Terminal server launch line; enables basic auth only when a token is set.
fn ttyd_command() -> String {
    format!(
        r#"if [ -n "${token}" ]; then exec ttyd -W -p {port} -c "$TTYD_USER:${token}" bash -l; else exec ttyd -W -p {port} bash -l; fi"#,
        token = TTYD_ACCESS_TOKEN,
        port = Route::Terminal.port(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::SandboxNames;
    use kubedev_config::{ClusterConfig, ResourceTier};
    use pretty_assertions::assert_eq;

    fn build(env: &[(&str, &str)], config: &ClusterConfig) -> StatefulSet {
        let names = SandboxNames::new("acme-x1");
        let env: BTreeMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ResourceBuilder::new(&names, "proj", config).stateful_set(&env)
    }

    #[test]
    fn test_single_replica_with_retention_policy() {
        let sts = build(&[], &ClusterConfig::default());
        let spec = sts.spec.unwrap();

        assert_eq!(spec.replicas, Some(1));
        assert_eq!(spec.service_name, "acme-x1-service");

        let policy = spec.persistent_volume_claim_retention_policy.unwrap();
        assert_eq!(policy.when_deleted.as_deref(), Some("Delete"));
        assert_eq!(policy.when_scaled.as_deref(), Some("Retain"));
    }

    #[test]
    fn test_pod_layout() {
        let sts = build(&[("NODE_ENV", "development")], &ClusterConfig::default());
        let pod = sts.spec.unwrap().template.spec.unwrap();

        let init = pod.init_containers.unwrap();
        assert_eq!(init.len(), 1);
        assert_eq!(init[0].name, INIT_CONTAINER);

        let names: Vec<&str> = pod.containers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["acme-x1", FILEBROWSER_CONTAINER]);

        let env = pod.containers[0].env.as_ref().unwrap();
        assert!(env
            .iter()
            .any(|e| e.name == "NODE_ENV" && e.value.as_deref() == Some("development")));
    }

    #[test]
    fn test_claim_template_uses_tier_size() {
        let config = ClusterConfig {
            tier: ResourceTier::Medium,
            storage_class: Some("fast-ssd".to_string()),
            ..Default::default()
        };
        let sts = build(&[], &config);
        let claims = sts.spec.unwrap().volume_claim_templates.unwrap();

        assert_eq!(claims.len(), 1);
        let claim = &claims[0];
        assert_eq!(claim.metadata.name.as_deref(), Some(CLAIM_TEMPLATE));

        let spec = claim.spec.as_ref().unwrap();
        assert_eq!(spec.access_modes, Some(vec!["ReadWriteOnce".to_string()]));
        assert_eq!(spec.storage_class_name.as_deref(), Some("fast-ssd"));
        let storage = spec
            .resources
            .as_ref()
            .and_then(|r| r.requests.as_ref())
            .and_then(|r| r.get("storage"))
            .unwrap();
        assert_eq!(storage, &Quantity("20Gi".to_string()));
    }

    #[test]
    fn test_ttyd_command_guards_on_token() {
        let command = ttyd_command();
        assert!(command.starts_with(r#"if [ -n "$TTYD_ACCESS_TOKEN" ]"#));
        assert!(command.contains(r#"-c "$TTYD_USER:$TTYD_ACCESS_TOKEN""#));
        assert!(command.contains("-p 7681"));
    }
}
