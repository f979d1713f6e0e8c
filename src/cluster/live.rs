//! Live `ClusterInfoProvider`, backed by the `kube` + `k8s-openapi` crates.
//!
//! Grounded in `raftcat/src/state.rs`'s `kube::client::APIClient` /
//! `Resource::namespaced` usage, with the five list-and-index operations
//! translated from `client-go` to `kube-rs`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use k8s_openapi::api::extensions::v1beta1::Ingress;
use kube::api::{Api, ListParams, Meta};
use kube::Client;

use super::{
    bucket_jobs_by_app, ClusterInfoProvider, ConfigMapMap, DeploymentMap, IngressIndex, JobIndex, ServiceMap,
};
use crate::ingress::group_by_service;

/// Talks to a real cluster. The namespace is resolved once at construction
/// time, the way `raftcat`'s `State::new` reads `NAMESPACE` (§9).
pub struct LiveClusterInfoProvider {
    client: Client,
    namespace: String,
}

impl LiveClusterInfoProvider {
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        LiveClusterInfoProvider { client, namespace: namespace.into() }
    }

    /// Loads a client from in-cluster config, falling back to the local
    /// kubeconfig — the Rust analogue of the original's
    /// `KubeClientFromConfig` (§9, `original_source/k8s.go`).
    pub async fn from_env(namespace: impl Into<String>) -> crate::Result<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| format_err!("Failed to load kube config: {}", e))?;
        Ok(LiveClusterInfoProvider::new(client, namespace))
    }
}

#[async_trait]
impl ClusterInfoProvider for LiveClusterInfoProvider {
    async fn get_deployments(&self) -> crate::Result<DeploymentMap> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &self.namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| format_err!("Could not get Deployment config: {}", e))?;
        info!("K8s: found {} deployments", list.items.len());
        let mut out = BTreeMap::new();
        for d in list.items {
            let name = Meta::name(&d);
            out.insert(name, d);
        }
        Ok(out)
    }

    async fn get_services(&self) -> crate::Result<ServiceMap> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), &self.namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| format_err!("Could not get Service config: {}", e))?;
        info!("K8s: found {} services", list.items.len());
        let mut out = BTreeMap::new();
        for s in list.items {
            let name = Meta::name(&s);
            out.insert(name, s);
        }
        Ok(out)
    }

    async fn get_ingresses_by_service(&self) -> crate::Result<IngressIndex> {
        let api: Api<Ingress> = Api::namespaced(self.client.clone(), &self.namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| format_err!("Could not get Ingress config: {}", e))?;
        info!("K8s: found {} ingresses", list.items.len());
        Ok(group_by_service(&list.items))
    }

    async fn get_jobs_by_app(&self) -> crate::Result<JobIndex> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), &self.namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| format_err!("Could not get Jobs config: {}", e))?;
        info!("K8s: found {} jobs", list.items.len());
        Ok(bucket_jobs_by_app(list.items))
    }

    async fn get_config_maps(&self) -> crate::Result<ConfigMapMap> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), &self.namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| format_err!("Could not get ConfigMap config: {}", e))?;
        info!("K8s: found {} config maps", list.items.len());
        let mut out = BTreeMap::new();
        for cm in list.items {
            let name = Meta::name(&cm);
            out.insert(name, cm);
        }
        Ok(out)
    }
}
