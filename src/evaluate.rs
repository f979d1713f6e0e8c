//! C4 — Application Evaluator.
//!
//! Combines one declared application with the current cluster snapshot and
//! probe results into a terminal `AppDeploymentInfo` (§4.4). Grounded in the
//! original's `checkDeploymentWithHealthCheck` / `checkJob`
//! (`original_source/src/model/kube/statusFetcher.go`), extended with the
//! config-map seeding, ignore override, job-completion scanning, healthcheck
//! port resolution and API-doc-URL publication the distilled spec adds.

use k8s_openapi::api::batch::v1::Job;

use crate::cluster::{ConfigMapMap, DeploymentMap, IngressIndex, JobIndex, ServiceMap};
use crate::model::{mirror_helm_label, AppDeploymentInfo, DeclaredApplication, HealthCheckType, Image, State};
use crate::probe::{self, ProbeOwner};

/// Everything the evaluator needs to read from the current tick's cluster
/// snapshot, bundled so evaluator invocations don't carry five separate
/// arguments.
pub struct ClusterSnapshot<'a> {
    pub deployments: &'a DeploymentMap,
    pub services: &'a ServiceMap,
    pub ingresses: &'a IngressIndex,
    pub jobs: &'a JobIndex,
    pub config_maps: &'a ConfigMapMap,
}

/// Evaluates one declared application against `snapshot`, probing over
/// `http_client`. Applies the ignore-list override last (§4.4 Step 2).
pub async fn evaluate_application(
    declared: &DeclaredApplication,
    snapshot: &ClusterSnapshot<'_>,
    http_client: &reqwest::Client,
    ignored: &[String],
) -> AppDeploymentInfo {
    // Step 0: config-map seeding, on a local copy so concurrent evaluators
    // never share mutable state (§5).
    let mut app = declared.clone();
    if let Some(cm) = snapshot.config_maps.get(&app.name) {
        if let Some(data) = &cm.data {
            if let Some(seeded) = data.get("k8sDeploymentName") {
                app.properties.insert("k8sDeploymentName".to_string(), seeded.clone());
            }
        }
    }

    let mut info = if app.is_job() {
        evaluate_job(&app, snapshot.jobs)
    } else {
        evaluate_deployment(&app, snapshot, http_client).await
    };

    // Step 2: the ignore override is applied after evaluation, overwriting
    // only the state/reason — every view field routing and probing already
    // populated (ingress, images, labels, dependency gauges) stays intact.
    // Per the resolved Open Question 3, the comparison is against the
    // *declared* name, not the post-`k8sDeploymentName`-override name the
    // deployment path uses as `info.name`.
    if ignored.iter().any(|n| n == &declared.name) {
        info = info.with_state(State::Ignored, "Ignored by setting override");
    }

    info
}

fn evaluate_job(app: &DeclaredApplication, jobs: &JobIndex) -> AppDeploymentInfo {
    let mut info = AppDeploymentInfo::new(app.name.clone(), app.clone());
    info.app_state_info.health_check_type = HealthCheckType::Job;

    let bucket = match jobs.get(&app.name) {
        Some(b) => b,
        None => return info.with_state(State::Unknown, "No job found"),
    };

    let latest = bucket
        .iter()
        .filter(|j| job_completion_time(j).is_some())
        .max_by_key(|j| job_completion_time(j).unwrap());

    let latest = match latest {
        Some(j) => j,
        None => return info.with_state(State::Unknown, "No completed job found"),
    };

    let succeeded = latest.status.as_ref().and_then(|s| s.succeeded).unwrap_or(0);
    let failed = latest.status.as_ref().and_then(|s| s.failed).unwrap_or(0);
    if succeeded == 0 && failed > 0 {
        let job_name = latest.metadata.name.clone().unwrap_or_default();
        return info.with_state(State::Unhealthy, format!("Last job failed: {}", job_name));
    }

    info.with_state(State::Healthy, "")
}

/// Jobs don't carry a directly comparable `Ord` completion time type in
/// `k8s-openapi`, so we compare on the RFC3339 string representation, which
/// sorts identically to the underlying instant for a fixed-width timestamp.
fn job_completion_time(job: &Job) -> Option<String> {
    job.status.as_ref().and_then(|s| s.completion_time.as_ref()).map(|t| t.0.to_rfc3339())
}

async fn evaluate_deployment(
    app: &DeclaredApplication,
    snapshot: &ClusterSnapshot<'_>,
    http_client: &reqwest::Client,
) -> AppDeploymentInfo {
    // Step 1: apply k8sDeploymentName override, if present and non-empty.
    let name = match app.property("k8sDeploymentName") {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => app.name.clone(),
    };

    let mut info = AppDeploymentInfo::new(name.clone(), app.clone());

    let deployment = match snapshot.deployments.get(&name) {
        Some(d) => d,
        None => return info.with_state(State::Unknown, "No deployment found"),
    };

    // Ingresses + images for the primary (possibly overridden) name.
    info.ingress = snapshot.ingresses.get(&name).cloned().unwrap_or_default();
    if let Some(spec) = &deployment.spec {
        if let Some(pod_spec) = &spec.template.spec {
            for c in &pod_spec.containers {
                if let Some(image) = &c.image {
                    info.images.push(Image::parse(image));
                }
            }
        }
    }

    if let Some(labels) = &deployment.metadata.labels {
        info.labels = labels.clone().into_iter().collect();
        mirror_helm_label(&mut info.labels);
    }

    let available = deployment
        .status
        .as_ref()
        .and_then(|s| s.available_replicas)
        .unwrap_or(0);
    if available == 0 {
        return info.with_state(State::Failed, "No pod available");
    }

    // Resolve the probe service.
    let hc_name = app.property("k8sHealthCheckServiceName").map(str::to_string);
    let distinct_override = hc_name.is_some() && hc_name.as_deref() != Some(name.as_str());
    let hc_name = hc_name.unwrap_or_else(|| name.clone());

    if distinct_override {
        if let Some(extra) = snapshot.ingresses.get(&hc_name) {
            info.ingress.extend(extra.iter().cloned());
        }
    }

    let service = match snapshot.services.get(&hc_name) {
        Some(s) => s,
        None => {
            return info.with_state(
                State::Failed,
                format!("Deployment has no service for healthcheck that matches the config / {}", hc_name),
            );
        }
    };

    let ports = service.spec.as_ref().and_then(|s| s.ports.as_ref());
    let ports = match ports.filter(|p| !p.is_empty()) {
        Some(p) => p,
        None => return info.with_state(State::Failed, format!("Service has no port. Cannot check {}", hc_name)),
    };

    let path = app.property("healthCheckPath").unwrap_or("").to_string();
    info.healthcheck_path = path.clone();

    // API documentation URL: the primary name's shortest ingress, if any.
    if let Some(api_doc_path) = app.property("apiDocPath") {
        if let Some(primary_ingresses) = snapshot.ingresses.get(&name) {
            if let Some(first) = primary_ingresses.first() {
                info.api_documentation_url = Some(format!("https://{}/{}", first.host, api_doc_path));
            }
        }
    }

    // Choose probe port: explicit override > named port > first port.
    let port: i32 = if let Some(explicit) = app.property("healthCheckPort") {
        match explicit.parse::<i32>() {
            Ok(p) => p,
            Err(_) => ports[0].port,
        }
    } else if let Some(port_name) = app.property("healthCheckPortName") {
        ports
            .iter()
            .find(|p| p.name.as_deref() == Some(port_name))
            .map(|p| p.port)
            .unwrap_or(ports[0].port)
    } else {
        ports[0].port
    };

    let base = format!("http://{}:{}", hc_name, port);
    let team = app.team.clone();
    let owner = ProbeOwner { application: &app.name, team: &team };
    let result = probe::probe(http_client, &base, &path, Some(owner)).await;
    info.app_state_info.health_check_type = result.kind;

    if !result.ok {
        return info.with_state(State::Unhealthy, format!("Service Unhealthy: {}", result.reason));
    }

    if app.property("k8sHealthCheckThroughIngress").is_some() {
        let ingresses = snapshot.ingresses.get(&hc_name).cloned().unwrap_or_default();
        if ingresses.is_empty() {
            return info.with_state(State::Failed, format!("No Ingress for service {}", hc_name));
        }
        let mut any_ok = false;
        for ing in &ingresses {
            let base = format!("https://{}", ing.host);
            let r = probe::probe(http_client, &base, &path, None).await;
            if r.ok {
                any_ok = true;
                break;
            }
        }
        info.app_state_info.healthy_also_from_ingress = any_ok;
        if !any_ok {
            return info.with_state(
                State::Unhealthy,
                format!("Calling healthcheckPath {} from public ingress failed", path),
            );
        }
    }

    info.with_state(State::Healthy, "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ConfigMapMap, DeploymentMap, IngressIndex, JobIndex, ServiceMap};
    use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, DeploymentStatus};
    use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn app(name: &str, props: &[(&str, &str)]) -> DeclaredApplication {
        DeclaredApplication {
            name: name.to_string(),
            team: "t".to_string(),
            properties: props.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    fn deployment(name: &str, available: i32, image: &str) -> Deployment {
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
            status: Some(DeploymentStatus { available_replicas: Some(available), ..Default::default() }),
        }
    }

    #[tokio::test]
    async fn missing_deployment_is_unknown() {
        let app = app("svc", &[("deployment", "kubernetes")]);
        let deployments = DeploymentMap::new();
        let services = ServiceMap::new();
        let ingresses = IngressIndex::new();
        let jobs = JobIndex::new();
        let config_maps = ConfigMapMap::new();
        let snapshot = ClusterSnapshot {
            deployments: &deployments,
            services: &services,
            ingresses: &ingresses,
            jobs: &jobs,
            config_maps: &config_maps,
        };
        let client = probe::build_client().unwrap();
        let info = evaluate_application(&app, &snapshot, &client, &[]).await;
        assert_eq!(info.state(), State::Unknown);
        assert_eq!(info.app_state_info.state_reason, "No deployment found");
    }

    #[tokio::test]
    async fn no_available_replicas_is_failed() {
        let app = app("svc", &[("deployment", "kubernetes")]);
        let mut deployments = DeploymentMap::new();
        deployments.insert("svc".to_string(), deployment("svc", 0, "svc:1.0.0"));
        let services = ServiceMap::new();
        let ingresses = IngressIndex::new();
        let jobs = JobIndex::new();
        let config_maps = ConfigMapMap::new();
        let snapshot = ClusterSnapshot {
            deployments: &deployments,
            services: &services,
            ingresses: &ingresses,
            jobs: &jobs,
            config_maps: &config_maps,
        };
        let client = probe::build_client().unwrap();
        let info = evaluate_application(&app, &snapshot, &client, &[]).await;
        assert_eq!(info.state(), State::Failed);
        assert_eq!(info.app_state_info.state_reason, "No pod available");
    }

    #[tokio::test]
    async fn missing_service_is_failed() {
        let app = app("svc", &[("deployment", "kubernetes")]);
        let mut deployments = DeploymentMap::new();
        deployments.insert("svc".to_string(), deployment("svc", 1, "svc:1.0.0"));
        let services = ServiceMap::new();
        let ingresses = IngressIndex::new();
        let jobs = JobIndex::new();
        let config_maps = ConfigMapMap::new();
        let snapshot = ClusterSnapshot {
            deployments: &deployments,
            services: &services,
            ingresses: &ingresses,
            jobs: &jobs,
            config_maps: &config_maps,
        };
        let client = probe::build_client().unwrap();
        let info = evaluate_application(&app, &snapshot, &client, &[]).await;
        assert_eq!(info.state(), State::Failed);
        assert!(info.app_state_info.state_reason.contains("no service for healthcheck"));
    }

    #[tokio::test]
    async fn ignore_override_dominates() {
        let app = app("svc", &[("deployment", "kubernetes")]);
        let deployments = DeploymentMap::new();
        let services = ServiceMap::new();
        let ingresses = IngressIndex::new();
        let jobs = JobIndex::new();
        let config_maps = ConfigMapMap::new();
        let snapshot = ClusterSnapshot {
            deployments: &deployments,
            services: &services,
            ingresses: &ingresses,
            jobs: &jobs,
            config_maps: &config_maps,
        };
        let client = probe::build_client().unwrap();
        let info = evaluate_application(&app, &snapshot, &client, &["svc".to_string()]).await;
        assert_eq!(info.state(), State::Ignored);
        assert_eq!(info.app_state_info.state_reason, "Ignored by setting override");
    }

    #[tokio::test]
    async fn missing_job_is_unknown() {
        let app = app("worker", &[("deployment", "kubernetes"), ("k8sType", "job")]);
        let deployments = DeploymentMap::new();
        let services = ServiceMap::new();
        let ingresses = IngressIndex::new();
        let jobs = JobIndex::new();
        let config_maps = ConfigMapMap::new();
        let snapshot = ClusterSnapshot {
            deployments: &deployments,
            services: &services,
            ingresses: &ingresses,
            jobs: &jobs,
            config_maps: &config_maps,
        };
        let client = probe::build_client().unwrap();
        let info = evaluate_application(&app, &snapshot, &client, &[]).await;
        assert_eq!(info.state(), State::Unknown);
        assert_eq!(info.app_state_info.state_reason, "No job found");
        assert_eq!(info.app_state_info.health_check_type, HealthCheckType::Job);
    }
}
