//! Core data model shared by every component of the status fetcher.
//!
//! Mirrors the shapes the original `vistecture-dashboard` Go service produced
//! (`AppDeploymentInfo`, `K8sIngressInfo`, `Image`, ...) so that a downstream
//! renderer or metrics scraper sees the same fields under Rust-native types.

use std::collections::{BTreeMap, HashMap, VecDeque};

use k8s_openapi::api::apps::v1::Deployment;
use serde_derive::{Deserialize, Serialize};

/// Maximum number of prior `AppDeploymentInfo` records kept per application
/// for smoothing purposes (§3, §4.5).
pub const HISTORY_WINDOW: usize = 20;

/// An application as declared by the architectural project loader.
///
/// The real loader (out of scope here) yields a much
/// richer `vistecture` project document; all the status fetcher needs from it
/// is the name, owning team and the open-ended property bag below.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeclaredApplication {
    pub name: String,
    pub team: String,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl DeclaredApplication {
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// `Properties["deployment"] == "kubernetes"` — the "checked" set (§3).
    pub fn is_kubernetes_checked(&self) -> bool {
        self.property("deployment") == Some("kubernetes")
    }

    pub fn is_job(&self) -> bool {
        self.property("k8sType") == Some("job")
    }
}

/// A single ingress rule, grouped under its backend service name by the
/// Ingress Indexer (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngressRecord {
    pub url: String,
    pub host: String,
    pub path: String,
    /// Unused post-refactor, kept for the view (§3).
    pub alive: bool,
}

/// A container image reference split into its full path and parsed version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Image {
    pub full_path: String,
    pub version: String,
}

impl Image {
    /// `parse("x:1.2.3").version == "1.2.3"`; `parse("x").version == ""`;
    /// `parse("r/x:a:b").version == "a"` — the image reference is split on
    /// every `:` and the *second* field (index 1) is taken as the version,
    /// matching the original `strings.Split(imageUrl, ":")` behaviour: a
    /// third field (a digest or further tag component) is not included.
    pub fn parse(image_ref: &str) -> Self {
        let mut parts = image_ref.split(':');
        let _repo = parts.next();
        let version = parts.next().unwrap_or("").to_string();
        Image { full_path: image_ref.to_string(), version }
    }
}

/// Terminal classification of an application, with deterministic integer
/// codes used verbatim in the `application_health_status` metric mapping
/// is *not* this enum's discriminant — see `metrics::encode_state` (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum State {
    Unknown = 0,
    Failed = 1,
    Unhealthy = 2,
    Healthy = 3,
    Unstable = 4,
    Ignored = 5,
}

impl Default for State {
    fn default() -> Self {
        State::Unknown
    }
}

/// Which probe semantics produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthCheckType {
    #[serde(rename = "")]
    None,
    #[serde(rename = "simple")]
    Simple,
    #[serde(rename = "healthcheck")]
    Healthcheck,
    #[serde(rename = "job")]
    Job,
}

impl Default for HealthCheckType {
    fn default() -> Self {
        HealthCheckType::None
    }
}

impl HealthCheckType {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthCheckType::None => "",
            HealthCheckType::Simple => "simple",
            HealthCheckType::Healthcheck => "healthcheck",
            HealthCheckType::Job => "job",
        }
    }
}

/// The state + reason + probe provenance for one `AppDeploymentInfo` (§3).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppStateInfo {
    pub state: State,
    pub state_reason: String,
    pub health_check_type: HealthCheckType,
    pub healthy_also_from_ingress: bool,
}

impl Default for AppStateInfo {
    fn default() -> Self {
        AppStateInfo {
            state: State::Unknown,
            state_reason: String::new(),
            health_check_type: HealthCheckType::None,
            healthy_also_from_ingress: false,
        }
    }
}

/// One published row of the dashboard: everything the renderer needs to know
/// about a single declared application after the most recent tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppDeploymentInfo {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub ingress: Vec<IngressRecord>,
    pub images: Vec<Image>,
    /// Opaque passthrough of the workload object for the view; `None` when
    /// no workload was found (unknown/job path).
    #[serde(skip)]
    pub k8s_deployment: Option<Deployment>,
    pub healthcheck_path: String,
    pub api_documentation_url: Option<String>,
    pub vistecture_app: DeclaredApplication,
    pub app_state_info: AppStateInfo,
}

impl AppDeploymentInfo {
    pub fn new(name: impl Into<String>, vistecture_app: DeclaredApplication) -> Self {
        AppDeploymentInfo {
            name: name.into(),
            labels: BTreeMap::new(),
            ingress: Vec::new(),
            images: Vec::new(),
            k8s_deployment: None,
            healthcheck_path: String::new(),
            api_documentation_url: None,
            vistecture_app,
            app_state_info: AppStateInfo::default(),
        }
    }

    pub fn with_state(mut self, state: State, reason: impl Into<String>) -> Self {
        self.app_state_info.state = state;
        self.app_state_info.state_reason = reason.into();
        self
    }

    pub fn state(&self) -> State {
        self.app_state_info.state
    }
}

/// Mirrors `helm.sh/version` under the `helm` key, as the view expects (§3,
/// §9 "Label mirroring").
pub fn mirror_helm_label(labels: &mut BTreeMap<String, String>) {
    if let Some(v) = labels.get("helm.sh/version").cloned() {
        labels.insert("helm".to_string(), v);
    }
}

/// Published, reader/writer-locked map of application name -> most recent
/// `AppDeploymentInfo` (§3 `ResultMap`, §4.8 Result Reader).
pub type ResultMap = BTreeMap<String, AppDeploymentInfo>;

/// Orchestrator-private bounded history per application (§3 `HistoryBuffer`).
///
/// Never exposed outside `fetcher::StatusFetcher`; no lock needed since only
/// the orchestrator task touches it (§5).
#[derive(Debug, Default)]
pub struct HistoryBuffer {
    buffers: HashMap<String, VecDeque<AppDeploymentInfo>>,
}

impl HistoryBuffer {
    pub fn new() -> Self {
        HistoryBuffer { buffers: HashMap::new() }
    }

    /// Prepends `info` to the application's history (truncating to
    /// `HISTORY_WINDOW`) and returns a reference to the resulting deque so
    /// the caller can apply smoothing over it.
    pub fn prepend(&mut self, info: AppDeploymentInfo) -> &VecDeque<AppDeploymentInfo> {
        let deque = self.buffers.entry(info.name.clone()).or_insert_with(VecDeque::new);
        deque.push_front(info);
        while deque.len() > HISTORY_WINDOW {
            deque.pop_back();
        }
        deque
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_image_with_version() {
        assert_eq!(Image::parse("x:1.2.3").version, "1.2.3");
    }

    #[test]
    fn parses_image_without_colon() {
        assert_eq!(Image::parse("x").version, "");
    }

    #[test]
    fn parses_image_with_multiple_colons() {
        // strings.Split-style: second field only, third field dropped
        assert_eq!(Image::parse("r/x:a:b").version, "a");
    }

    #[test]
    fn history_buffer_caps_at_window() {
        let mut hist = HistoryBuffer::new();
        for i in 0..25 {
            let app = DeclaredApplication { name: "svc".into(), team: "t".into(), properties: HashMap::new() };
            let info = AppDeploymentInfo::new("svc", app).with_state(State::Healthy, format!("tick {}", i));
            hist.prepend(info);
        }
        assert_eq!(hist.buffers.get("svc").unwrap().len(), HISTORY_WINDOW);
    }
}
