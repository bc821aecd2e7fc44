// ABOUTME: One ingress route per externally reachable capability of a sandbox
// ABOUTME: Carries proxy tuning, and CORS plus resumable-upload headers for the file browser

use std::collections::BTreeMap;

use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use super::{ResourceBuilder, Route};

const NGINX: &str = "nginx.ingress.kubernetes.io";

const TUS_REQUEST_HEADERS: &str = "DNT,User-Agent,X-Requested-With,If-Modified-Since,\
Cache-Control,Content-Type,Range,Authorization,X-Auth,Upload-Offset,Upload-Length,\
Upload-Metadata,Upload-Defer-Length,Upload-Concat,Tus-Resumable";

const TUS_EXPOSE_HEADERS: &str = "Upload-Offset,Upload-Length,Upload-Metadata,Location,\
Tus-Version,Tus-Resumable,Tus-Max-Size,Tus-Extension";

impl ResourceBuilder<'_> {
    /// All three routes in app, terminal, file browser order.
    pub fn ingresses(&self, domain: &str) -> Vec<Ingress> {
        Route::ALL
            .iter()
            .map(|route| self.ingress(*route, domain))
            .collect()
    }

    pub fn ingress(&self, route: Route, domain: &str) -> Ingress {
        let host = route.host(self.names, domain);

        Ingress {
            metadata: ObjectMeta {
                name: Some(route.ingress_name(self.names)),
                labels: Some(self.labels()),
                annotations: Some(route_annotations(route)),
                ..Default::default()
            },
            spec: Some(IngressSpec {
                ingress_class_name: Some(self.config.ingress_class.clone()),
                tls: Some(vec![IngressTLS {
                    hosts: Some(vec![host.clone()]),
                    ..Default::default()
                }]),
                rules: Some(vec![IngressRule {
                    host: Some(host),
                    http: Some(HTTPIngressRuleValue {
                        paths: vec![HTTPIngressPath {
                            path: Some("/".to_string()),
                            path_type: "Prefix".to_string(),
                            backend: IngressBackend {
                                service: Some(IngressServiceBackend {
                                    name: self.names.service(),
                                    port: Some(ServiceBackendPort {
                                        number: Some(route.port()),
                                        ..Default::default()
                                    }),
                                }),
                                ..Default::default()
                            },
                        }],
                    }),
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

fn route_annotations(route: Route) -> BTreeMap<String, String> {
    let mut annotations = BTreeMap::new();
    let mut set = |key: &str, value: &str| {
        annotations.insert(format!("{}/{}", NGINX, key), value.to_string());
    };

    set("backend-protocol", "HTTP");
    set("proxy-connect-timeout", "60");
    set("proxy-read-timeout", "3600");
    set("proxy-send-timeout", "3600");

    match route {
        Route::App => {
            set("proxy-body-size", "32m");
        }
        Route::Terminal => {
            set("proxy-body-size", "1m");
            set("proxy-buffering", "off");
        }
        Route::FileBrowser => {
            set("proxy-body-size", "0");
            set("proxy-request-buffering", "off");
            set("enable-cors", "true");
            set("cors-allow-origin", "*");
            set(
                "cors-allow-methods",
                "GET, PUT, POST, DELETE, PATCH, OPTIONS, HEAD",
            );
            set("cors-allow-headers", TUS_REQUEST_HEADERS);
            set("cors-expose-headers", TUS_EXPOSE_HEADERS);
        }
    }

    annotations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::SandboxNames;
    use kubedev_config::ClusterConfig;

    fn ingresses() -> Vec<Ingress> {
        let names = SandboxNames::new("acme-x1");
        let config = ClusterConfig::default();
        ResourceBuilder::new(&names, "proj", &config).ingresses("usw.example.io")
    }

    fn backend(ingress: &Ingress) -> (String, String, i32) {
        let rule = &ingress.spec.as_ref().unwrap().rules.as_ref().unwrap()[0];
        let path = &rule.http.as_ref().unwrap().paths[0];
        let service = path.backend.service.as_ref().unwrap();
        (
            rule.host.clone().unwrap(),
            service.name.clone(),
            service.port.as_ref().unwrap().number.unwrap(),
        )
    }

    #[test]
    fn test_each_route_has_its_own_host_and_port() {
        let routes = ingresses();
        let backends: Vec<_> = routes.iter().map(backend).collect();

        assert_eq!(
            backends,
            vec![
                (
                    "acme-x1-app.usw.example.io".to_string(),
                    "acme-x1-service".to_string(),
                    3000
                ),
                (
                    "acme-x1-ttyd.usw.example.io".to_string(),
                    "acme-x1-service".to_string(),
                    7681
                ),
                (
                    "acme-x1-filebrowser.usw.example.io".to_string(),
                    "acme-x1-service".to_string(),
                    8080
                ),
            ]
        );

        let names: Vec<_> = routes
            .iter()
            .map(|i| i.metadata.name.clone().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "acme-x1-app-ingress",
                "acme-x1-ttyd-ingress",
                "acme-x1-filebrowser-ingress"
            ]
        );
    }

    #[test]
    fn test_only_file_browser_allows_cors_and_uploads() {
        let cors_key = format!("{}/enable-cors", NGINX);
        let headers_key = format!("{}/cors-allow-headers", NGINX);

        for ingress in ingresses() {
            let annotations = ingress.metadata.annotations.unwrap();
            let is_file_browser = ingress
                .metadata
                .name
                .as_deref()
                .is_some_and(|n| n.ends_with("-filebrowser-ingress"));

            assert_eq!(annotations.contains_key(&cors_key), is_file_browser);
            if is_file_browser {
                let headers = &annotations[&headers_key];
                assert!(headers.contains("Upload-Offset"));
                assert!(headers.contains("Tus-Resumable"));
            }
            assert_eq!(
                annotations[&format!("{}/proxy-read-timeout", NGINX)],
                "3600"
            );
        }
    }
}
