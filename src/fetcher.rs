//! C6 — Status Fetcher orchestrator, plus C8 — Result Reader.
//!
//! Grounded in the original's `FetchStatusInRegularInterval`
//! (`original_source/src/model/kube/statusFetcher.go`): an infinite 15-second
//! tick, a sequential snapshot of the four (here five, with config maps)
//! cluster object kinds, then one evaluator per qualifying declared
//! application, jittered and fanned out, drained back in launch order.
//! `raftcat`'s `kompass.rs` contributes the `interval.tick().await` loop
//! shape and the "panic on fatal cluster error" posture (§7).

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::RwLock;

use crate::cluster::ClusterInfoProvider;
use crate::evaluate::{self, ClusterSnapshot};
use crate::history::{self, TICK_INTERVAL_SECS};
use crate::model::{AppDeploymentInfo, DeclaredApplication, HistoryBuffer, ResultMap};
use crate::{metrics, probe};

/// Lower/upper bounds, in milliseconds, of the jitter sleep issued before
/// each evaluator is spawned (§4.6).
const JITTER_MIN_MS: u64 = 300;
const JITTER_MAX_MS: u64 = 1000;

/// Owns the published `ResultMap` and drives the periodic fetch loop.
///
/// `results` is the only state shared with readers (actix-web handlers);
/// `history` is private to the orchestrator task and needs no lock (§5).
pub struct StatusFetcher {
    results: RwLock<ResultMap>,
    provider: Box<dyn ClusterInfoProvider>,
    http_client: reqwest::Client,
    ignored: Vec<String>,
    declared_apps: Vec<DeclaredApplication>,
}

impl StatusFetcher {
    pub fn new(
        provider: Box<dyn ClusterInfoProvider>,
        ignored: Vec<String>,
        declared_apps: Vec<DeclaredApplication>,
    ) -> crate::Result<Arc<Self>> {
        let http_client = probe::build_client()?;
        Ok(Arc::new(StatusFetcher {
            results: RwLock::new(ResultMap::new()),
            provider,
            http_client,
            ignored,
            declared_apps,
        }))
    }

    /// C8 Result Reader: a shallow copy of the most recently published
    /// results, taken under the reader lock (§4.8).
    pub async fn get_current_result(&self) -> ResultMap {
        self.results.read().await.clone()
    }

    /// Runs the fetch loop forever. The first tick fires immediately, then
    /// every `TICK_INTERVAL_SECS` thereafter (§4.6). A failure to read any
    /// of the five cluster snapshots is treated as fatal (§7), matching the
    /// original's `panic()` on the same condition.
    pub async fn run(self: Arc<Self>) -> ! {
        let mut history = HistoryBuffer::new();
        let mut interval = tokio::time::interval(Duration::from_secs(TICK_INTERVAL_SECS));

        loop {
            interval.tick().await;
            self.tick(&mut history).await;
        }
    }

    async fn tick(&self, history: &mut HistoryBuffer) {
        let deployments = Arc::new(
            self.provider
                .get_deployments()
                .await
                .expect("fatal: could not fetch Deployment snapshot"),
        );
        let services = Arc::new(
            self.provider.get_services().await.expect("fatal: could not fetch Service snapshot"),
        );
        let ingresses = Arc::new(
            self.provider
                .get_ingresses_by_service()
                .await
                .expect("fatal: could not fetch Ingress snapshot"),
        );
        let jobs =
            Arc::new(self.provider.get_jobs_by_app().await.expect("fatal: could not fetch Job snapshot"));
        let config_maps = Arc::new(
            self.provider
                .get_config_maps()
                .await
                .expect("fatal: could not fetch ConfigMap snapshot"),
        );

        let mut handles = Vec::with_capacity(self.declared_apps.len());
        for app in &self.declared_apps {
            if !app.is_kubernetes_checked() {
                continue;
            }

            let jitter = rand::thread_rng().gen_range(JITTER_MIN_MS, JITTER_MAX_MS);
            tokio::time::delay_for(Duration::from_millis(jitter)).await;

            let app = app.clone();
            let http_client = self.http_client.clone();
            let ignored = self.ignored.clone();
            let deployments = deployments.clone();
            let services = services.clone();
            let ingresses = ingresses.clone();
            let jobs = jobs.clone();
            let config_maps = config_maps.clone();

            handles.push(tokio::spawn(async move {
                let snapshot = ClusterSnapshot {
                    deployments: &deployments,
                    services: &services,
                    ingresses: &ingresses,
                    jobs: &jobs,
                    config_maps: &config_maps,
                };
                evaluate::evaluate_application(&app, &snapshot, &http_client, &ignored).await
            }));
        }

        // Drain in launch order: the orchestrator doesn't care which
        // evaluator finishes first, only that every one of them completes
        // before the result map is replaced for this tick.
        let mut evaluated: Vec<AppDeploymentInfo> = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(info) => evaluated.push(info),
                Err(e) => error!("evaluator task panicked: {}", e),
            }
        }

        let mut next_results = ResultMap::new();
        for info in evaluated {
            let name = info.name.clone();
            let team = info.vistecture_app.team.clone();
            let deque = history.prepend(info);
            let smoothed = history::smooth(deque);
            metrics::publish_state(&name, &team, smoothed.state());
            next_results.insert(name, smoothed);
        }

        let mut write_guard = self.results.write().await;
        *write_guard = next_results;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::demo::DemoClusterInfoProvider;
    use std::collections::HashMap;

    fn declared(name: &str) -> DeclaredApplication {
        let mut properties = HashMap::new();
        properties.insert("deployment".to_string(), "kubernetes".to_string());
        DeclaredApplication { name: name.to_string(), team: "platform".to_string(), properties }
    }

    #[tokio::test]
    async fn a_full_tick_publishes_a_result_per_declared_app() {
        let provider = Box::new(DemoClusterInfoProvider::new(8099));
        let apps = vec![declared("flamingo"), declared("akeneo"), declared("keycloak")];
        let fetcher = StatusFetcher::new(provider, vec![], apps).expect("client should build");

        let mut history = HistoryBuffer::new();
        fetcher.tick(&mut history).await;

        let results = fetcher.get_current_result().await;
        assert_eq!(results.len(), 3);
        assert!(results.contains_key("flamingo"));
        assert!(results.contains_key("akeneo"));
        assert!(results.contains_key("keycloak"));
    }

    #[tokio::test]
    async fn declared_apps_not_marked_kubernetes_checked_are_skipped() {
        let provider = Box::new(DemoClusterInfoProvider::new(8099));
        let unchecked =
            DeclaredApplication { name: "legacy-app".to_string(), team: "platform".to_string(), properties: HashMap::new() };
        let fetcher = StatusFetcher::new(provider, vec![], vec![unchecked]).expect("client should build");

        let mut history = HistoryBuffer::new();
        fetcher.tick(&mut history).await;

        let results = fetcher.get_current_result().await;
        assert!(results.is_empty());
    }
}
