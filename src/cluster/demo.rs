//! Demo-mode `ClusterInfoProvider`, a direct port of the original fixture
//! data in `original_source/k8s.go` / `original_source/src/model/kube/fakeData.go`
//! (three applications: `flamingo`, `akeneo`, `keycloak`) so that
//! `DEMO_MODE=true` reproduces the same recognizable dashboard without a
//! live cluster (§9).

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentCondition, DeploymentSpec, DeploymentStatus};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{
    Container, ConfigMap, PodSpec, PodTemplateSpec, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::api::extensions::v1beta1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule, IngressSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use super::{
    bucket_jobs_by_app, ClusterInfoProvider, ConfigMapMap, DeploymentMap, IngressIndex, JobIndex, ServiceMap,
};
use crate::ingress::group_by_service;

/// The port the demo fixture's services claim to expose. Callers point this
/// at `spawn_fake_probe_server` so that the evaluator's probes actually
/// complete instead of failing with a connection error.
pub struct DemoClusterInfoProvider {
    probe_port: i32,
}

/// Binds `port` and answers every request with a healthcheck-mode body
/// reporting no dead services, so demo applications with a
/// `healthCheckPath` resolve to healthy instead of unhealthy.
pub async fn spawn_fake_probe_server(port: i32) -> crate::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port as u16))
        .await
        .map_err(|e| format_err!("could not bind fake probe responder on port {}: {}", port, e))?;

    tokio::spawn(async move {
        loop {
            let (mut socket, _) = match listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    error!("fake probe responder stopped accepting connections: {}", e);
                    break;
                }
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let body = b"{\"services\":[]}";
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                if socket.write_all(response.as_bytes()).await.is_ok() {
                    let _ = socket.write_all(body).await;
                }
            });
        }
    });

    Ok(())
}

impl DemoClusterInfoProvider {
    pub fn new(probe_port: i32) -> Self {
        DemoClusterInfoProvider { probe_port }
    }

    fn deployment(name: &str, image: &str, available: i32) -> Deployment {
        Deployment {
            metadata: ObjectMeta { name: Some(name.to_string()), ..Default::default() },
            spec: Some(DeploymentSpec {
                template: PodTemplateSpec {
                    spec: Some(PodSpec {
                        containers: vec![Container { image: Some(image.to_string()), ..Default::default() }],
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ..Default::default()
            }),
            status: Some(DeploymentStatus {
                available_replicas: Some(available),
                conditions: Some(vec![DeploymentCondition {
                    type_: "Available".to_string(),
                    status: "True".to_string(),
                    message: Some("Test Condition is feeling good!".to_string()),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
        }
    }
}

#[async_trait]
impl ClusterInfoProvider for DemoClusterInfoProvider {
    async fn get_deployments(&self) -> crate::Result<DeploymentMap> {
        let mut out = BTreeMap::new();
        out.insert("flamingo".to_string(), Self::deployment("flamingo", "flamingo:v1.0.0", 3));
        out.insert("akeneo".to_string(), Self::deployment("akeneo", "akeneo:v1.2.3", 1));
        out.insert("keycloak".to_string(), Self::deployment("keycloak", "keycloak:v1.0.0", 2));
        Ok(out)
    }

    async fn get_services(&self) -> crate::Result<ServiceMap> {
        let port = ServicePort { port: self.probe_port, ..Default::default() };
        let mk = |name: &str| Service {
            metadata: ObjectMeta { name: Some(name.to_string()), ..Default::default() },
            spec: Some(ServiceSpec { ports: Some(vec![port.clone()]), ..Default::default() }),
            status: None,
        };
        let mut out = BTreeMap::new();
        out.insert("flamingo".to_string(), mk("flamingo"));
        out.insert("akeneo".to_string(), mk("akeneo"));
        out.insert("keycloak".to_string(), mk("keycloak"));
        Ok(out)
    }

    async fn get_ingresses_by_service(&self) -> crate::Result<IngressIndex> {
        let rule = |host: &str, service: &str, path: &str| Ingress {
            metadata: ObjectMeta::default(),
            spec: Some(IngressSpec {
                rules: Some(vec![IngressRule {
                    host: Some(host.to_string()),
                    http: Some(HTTPIngressRuleValue {
                        paths: vec![HTTPIngressPath {
                            backend: IngressBackend {
                                service_name: service.to_string(),
                                service_port: IntOrString::Int(80),
                            },
                            path: Some(path.to_string()),
                        }],
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            status: None,
        };
        let ingresses = vec![
            rule("google.com", "flamingo", "/"),
            rule("google.com", "akeneo", "/akeneo"),
            rule("keycloak.bla", "keycloak", "/blabla"),
            rule("keycloak.om3", "keycloak", "/"),
        ];
        Ok(group_by_service(&ingresses))
    }

    async fn get_jobs_by_app(&self) -> crate::Result<JobIndex> {
        Ok(bucket_jobs_by_app(Vec::<Job>::new()))
    }

    async fn get_config_maps(&self) -> crate::Result<ConfigMapMap> {
        Ok(BTreeMap::new())
    }
}
