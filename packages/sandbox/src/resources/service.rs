// ABOUTME: Cluster-internal service exposing the app, terminal and file browser ports
// ABOUTME: Selects the sandbox pod by its sandbox label

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use super::{ResourceBuilder, Route};

impl ResourceBuilder<'_> {
    pub fn service(&self) -> Service {
        let ports = Route::ALL
            .iter()
            .map(|route| ServicePort {
                name: Some(route.port_name().to_string()),
                port: route.port(),
                target_port: Some(IntOrString::Int(route.port())),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            })
            .collect();

        Service {
            metadata: ObjectMeta {
                name: Some(self.names.service()),
                labels: Some(self.labels()),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                type_: Some("ClusterIP".to_string()),
                selector: Some(self.selector_labels()),
                ports: Some(ports),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
