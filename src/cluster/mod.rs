//! C1 — Cluster Info Provider.
//!
//! A small, object-safe interface (`KubeInfoServiceInterface`'s shape,
//! lifted to Rust with `async-trait`) with two
//! implementations: a live cluster client and a demo fixture (§4.1, §9
//! "Plug-replaceable cluster client").

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use k8s_openapi::api::extensions::v1beta1::Ingress;
use regex::Regex;

use crate::model::IngressRecord;

pub mod demo;
pub mod live;

pub type DeploymentMap = BTreeMap<String, Deployment>;
pub type ServiceMap = BTreeMap<String, Service>;
pub type IngressIndex = BTreeMap<String, Vec<IngressRecord>>;
pub type JobIndex = BTreeMap<String, Vec<Job>>;
pub type ConfigMapMap = BTreeMap<String, ConfigMap>;

/// Five snapshot operations; each is a complete, independent read of one
/// cluster object kind (§4.1). Errors surface as-is — the orchestrator
/// treats any of them as fatal for the current process (§7).
#[async_trait]
pub trait ClusterInfoProvider: Send + Sync {
    async fn get_deployments(&self) -> crate::Result<DeploymentMap>;
    async fn get_services(&self) -> crate::Result<ServiceMap>;
    async fn get_ingresses_by_service(&self) -> crate::Result<IngressIndex>;
    async fn get_jobs_by_app(&self) -> crate::Result<JobIndex>;
    async fn get_config_maps(&self) -> crate::Result<ConfigMapMap>;
}

lazy_static::lazy_static! {
    /// Workload-name regex for job bucketing (§6): `^(.*)-([0-9]+)$`.
    static ref JOB_SUFFIX: Regex = Regex::new(r"^(.*)-([0-9]+)$").expect("static regex is valid");
}

/// Buckets `jobs` by application name, stripping a trailing `-<digits>`
/// suffix the way cron-generated job names carry one (§4.1, §6).
pub fn bucket_jobs_by_app(jobs: Vec<Job>) -> JobIndex {
    let mut index: JobIndex = BTreeMap::new();
    for job in jobs {
        let job_name = job.metadata.name.clone().unwrap_or_default();
        let app_name = match JOB_SUFFIX.captures(&job_name) {
            Some(caps) => caps[1].to_string(),
            None => job_name,
        };
        index.entry(app_name).or_insert_with(Vec::new).push(job);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn job_named(name: &str) -> Job {
        Job { metadata: ObjectMeta { name: Some(name.to_string()), ..Default::default() }, ..Default::default() }
    }

    #[test]
    fn buckets_suffixed_job_under_app_name() {
        let idx = bucket_jobs_by_app(vec![job_named("akeneo-12345")]);
        assert!(idx.contains_key("akeneo"));
        assert!(!idx.contains_key("akeneo-12345"));
    }

    #[test]
    fn buckets_unsuffixed_job_under_its_own_name() {
        let idx = bucket_jobs_by_app(vec![job_named("nightly-cleanup")]);
        assert!(idx.contains_key("nightly-cleanup"));
    }
}
