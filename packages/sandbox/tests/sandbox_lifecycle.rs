// ABOUTME: Integration tests for the sandbox lifecycle through SandboxService
// ABOUTME: Runs create, stop, start, env update and delete against an in-memory cluster

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kubedev_sandbox::cluster::{ClusterClient, ClusterError, ExecOutput, Result};
use kubedev_sandbox::{ClusterConfig, SandboxService, SandboxStatus, StaticIngressDomain};
use pretty_assertions::assert_eq;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

type Key = (String, String);

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

fn name_of(meta: &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta) -> String {
    meta.name.clone().unwrap_or_default()
}

/// Cluster double holding objects in maps and answering exec calls from a script.
#[derive(Default)]
struct InMemoryCluster {
    stateful_sets: Mutex<BTreeMap<Key, StatefulSet>>,
    services: Mutex<BTreeMap<Key, Service>>,
    ingresses: Mutex<BTreeMap<Key, Ingress>>,
    claims: Mutex<BTreeSet<Key>>,
    writes: Mutex<Vec<String>>,
    exec_reply: Mutex<Option<ExecOutput>>,
}

impl InMemoryCluster {
    fn record(&self, op: &str, name: &str) {
        self.writes.lock().unwrap().push(format!("{} {}", op, name));
    }

    fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    fn not_found(name: &str) -> ClusterError {
        ClusterError::NotFound(format!("{} not found", name))
    }
}

#[async_trait]
impl ClusterClient for InMemoryCluster {
    async fn get_stateful_set(&self, namespace: &str, name: &str) -> Result<StatefulSet> {
        self.stateful_sets
            .lock()
            .unwrap()
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| Self::not_found(name))
    }

    async fn create_stateful_set(&self, namespace: &str, stateful_set: &StatefulSet) -> Result<()> {
        let name = name_of(&stateful_set.metadata);
        let mut sets = self.stateful_sets.lock().unwrap();
        if sets.contains_key(&key(namespace, &name)) {
            return Err(ClusterError::Conflict(name));
        }
        self.record("create statefulset", &name);
        self.claims
            .lock()
            .unwrap()
            .insert(key(namespace, &format!("workspace-{}-0", name)));
        sets.insert(key(namespace, &name), stateful_set.clone());
        Ok(())
    }

    async fn replace_stateful_set(
        &self,
        namespace: &str,
        name: &str,
        stateful_set: &StatefulSet,
    ) -> Result<()> {
        self.record("replace statefulset", name);
        self.stateful_sets
            .lock()
            .unwrap()
            .insert(key(namespace, name), stateful_set.clone());
        Ok(())
    }

    async fn scale_stateful_set(&self, namespace: &str, name: &str, replicas: i32) -> Result<()> {
        self.record(&format!("scale {}", replicas), name);
        let mut sets = self.stateful_sets.lock().unwrap();
        let set = sets
            .get_mut(&key(namespace, name))
            .ok_or_else(|| Self::not_found(name))?;
        if let Some(spec) = set.spec.as_mut() {
            spec.replicas = Some(replicas);
        }
        Ok(())
    }

    async fn delete_stateful_set(&self, namespace: &str, name: &str) -> Result<()> {
        self.stateful_sets
            .lock()
            .unwrap()
            .remove(&key(namespace, name))
            .map(|_| ())
            .ok_or_else(|| Self::not_found(name))
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service> {
        self.services
            .lock()
            .unwrap()
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| Self::not_found(name))
    }

    async fn create_service(&self, namespace: &str, service: &Service) -> Result<()> {
        let name = name_of(&service.metadata);
        self.record("create service", &name);
        self.services
            .lock()
            .unwrap()
            .insert(key(namespace, &name), service.clone());
        Ok(())
    }

    async fn delete_service(&self, namespace: &str, name: &str) -> Result<()> {
        self.services
            .lock()
            .unwrap()
            .remove(&key(namespace, name))
            .map(|_| ())
            .ok_or_else(|| Self::not_found(name))
    }

    async fn get_ingress(&self, namespace: &str, name: &str) -> Result<Ingress> {
        self.ingresses
            .lock()
            .unwrap()
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| Self::not_found(name))
    }

    async fn create_ingress(&self, namespace: &str, ingress: &Ingress) -> Result<()> {
        let name = name_of(&ingress.metadata);
        self.record("create ingress", &name);
        self.ingresses
            .lock()
            .unwrap()
            .insert(key(namespace, &name), ingress.clone());
        Ok(())
    }

    async fn delete_ingress(&self, namespace: &str, name: &str) -> Result<()> {
        self.ingresses
            .lock()
            .unwrap()
            .remove(&key(namespace, name))
            .map(|_| ())
            .ok_or_else(|| Self::not_found(name))
    }

    async fn delete_persistent_volume_claim(&self, namespace: &str, name: &str) -> Result<()> {
        if self.claims.lock().unwrap().remove(&key(namespace, name)) {
            Ok(())
        } else {
            Err(Self::not_found(name))
        }
    }

    async fn exec(
        &self,
        _namespace: &str,
        _pod: &str,
        _container: &str,
        _command: Vec<String>,
    ) -> Result<ExecOutput> {
        self.exec_reply
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ClusterError::Exec("pod not running".to_string()))
    }
}

fn setup() -> (Arc<InMemoryCluster>, SandboxService) {
    let cluster = Arc::new(InMemoryCluster::default());
    let config = ClusterConfig {
        namespace: "ns1".to_string(),
        ..Default::default()
    };
    let service = SandboxService::new(
        cluster.clone(),
        config,
        Arc::new(StaticIngressDomain::new("usw.example.io")),
    );
    (cluster, service)
}

fn primary_env(cluster: &InMemoryCluster, name: &str) -> BTreeMap<String, String> {
    let sets = cluster.stateful_sets.lock().unwrap();
    sets.get(&key("ns1", name))
        .and_then(|set| set.spec.as_ref())
        .and_then(|spec| spec.template.spec.as_ref())
        .and_then(|pod| pod.containers.iter().find(|c| c.name == name))
        .and_then(|c| c.env.clone())
        .unwrap_or_default()
        .into_iter()
        .map(|var| (var.name, var.value.unwrap_or_default()))
        .collect()
}

#[tokio::test]
async fn test_complete_sandbox_lifecycle() {
    let (cluster, service) = setup();

    let env = BTreeMap::from([("NODE_ENV".to_string(), "development".to_string())]);
    let info = service
        .create_sandbox("acme-x1", "proj-1", env, None)
        .await
        .unwrap();
    assert_eq!(info.public_url, "https://acme-x1-app.usw.example.io");
    assert_eq!(info.service_name, "acme-x1-service");

    // No controller runs here, so nothing is ever observed ready.
    assert_eq!(
        service.get_sandbox_status("acme-x1", None).await,
        SandboxStatus::Starting
    );

    service.stop_sandbox("acme-x1", None).await.unwrap();
    assert_eq!(
        service.get_sandbox_status("acme-x1", None).await,
        SandboxStatus::Stopped
    );

    service.start_sandbox("acme-x1", None).await.unwrap();
    let detailed = service.get_sandbox_detailed_status("acme-x1", None).await;
    assert_eq!(detailed.counts.declared, 1);

    let update = BTreeMap::from([("API_URL".to_string(), "https://api".to_string())]);
    assert!(service
        .update_sandbox_env_vars("acme-x1", &update, None)
        .await
        .unwrap());
    let env = primary_env(&cluster, "acme-x1");
    assert_eq!(env.get("NODE_ENV").map(String::as_str), Some("development"));
    assert_eq!(env.get("API_URL").map(String::as_str), Some("https://api"));

    service.delete_sandbox("acme-x1", None).await.unwrap();
    assert_eq!(
        service.get_sandbox_status("acme-x1", None).await,
        SandboxStatus::Terminated
    );
    assert!(cluster.claims.lock().unwrap().is_empty());
    assert!(cluster.ingresses.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_repeated_operations_converge_without_extra_writes() {
    let (cluster, service) = setup();

    service
        .create_sandbox("acme-x1", "proj-1", BTreeMap::new(), None)
        .await
        .unwrap();
    service
        .create_sandbox("acme-x1", "proj-1", BTreeMap::new(), None)
        .await
        .unwrap();

    service.stop_sandbox("acme-x1", None).await.unwrap();
    service.stop_sandbox("acme-x1", None).await.unwrap();

    let update = BTreeMap::from([("A".to_string(), "1".to_string())]);
    service
        .update_sandbox_env_vars("acme-x1", &update, None)
        .await
        .unwrap();
    service
        .update_sandbox_env_vars("acme-x1", &update, None)
        .await
        .unwrap();

    service.delete_sandbox("acme-x1", None).await.unwrap();
    service.delete_sandbox("acme-x1", None).await.unwrap();

    assert_eq!(
        cluster.writes(),
        vec![
            "create statefulset acme-x1",
            "create service acme-x1-service",
            "create ingress acme-x1-app-ingress",
            "create ingress acme-x1-ttyd-ingress",
            "create ingress acme-x1-filebrowser-ingress",
            "scale 0 acme-x1",
            "replace statefulset acme-x1",
        ]
    );
}

#[tokio::test]
async fn test_operations_on_missing_sandbox_are_noops() {
    let (cluster, service) = setup();

    service.stop_sandbox("ghost", None).await.unwrap();
    service.start_sandbox("ghost", None).await.unwrap();
    service.delete_sandbox("ghost", None).await.unwrap();

    let update = BTreeMap::from([("A".to_string(), "1".to_string())]);
    assert!(!service
        .update_sandbox_env_vars("ghost", &update, None)
        .await
        .unwrap());

    let detailed = service.get_sandbox_detailed_status("ghost", None).await;
    assert_eq!(detailed.status, SandboxStatus::Terminated);
    assert_eq!(detailed.counts.current_replicas, 0);
    assert!(cluster.writes().is_empty());
}

#[tokio::test]
async fn test_exec_bridge_on_unreachable_pod() {
    let (_cluster, service) = setup();

    assert!(!service.is_port_listening("acme-x1", 3000, None).await);
    assert!(!service.kill_process_on_port("acme-x1", 3000, None).await.success);
    assert!(service
        .exec_command_in_background("acme-x1", "/home/dev", "true", None)
        .await
        .is_err());
}

#[tokio::test]
async fn test_background_exec_through_service() {
    let (cluster, service) = setup();
    *cluster.exec_reply.lock().unwrap() = Some(ExecOutput::succeeded("1234\n"));

    let result = service
        .exec_command_in_background("acme-x1", "/home/dev/project", "npm run dev", None)
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.pid, Some(1234));
}
