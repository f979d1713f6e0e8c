//! C3 — Probe Client.
//!
//! A single HTTP GET against a health URL, in two modes depending on
//! whether a healthcheck path is configured (§4.3, §6). Mirrors the shape of
//! `integrations::sentryapi::get_slugs` / `integrations::newrelic::get_links`
//! in `raftcat/src/integrations.rs`: build a `reqwest::Client` request,
//! `.send().await?`, inspect status/body.

use serde_derive::Deserialize;

use crate::model::HealthCheckType;

pub const USER_AGENT: &str = "VistectureDashboard";
pub const PROBE_TIMEOUT_SECS: u64 = 15;

/// Response body expected from a healthcheck-mode probe (§6).
#[derive(Debug, Deserialize)]
struct HealthCheckResponse {
    #[serde(default)]
    services: Vec<HealthCheckService>,
}

#[derive(Debug, Deserialize)]
struct HealthCheckService {
    name: String,
    alive: bool,
    details: String,
}

/// Outcome of a single probe call.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub ok: bool,
    pub reason: String,
    pub kind: HealthCheckType,
}

/// Optional owning-application context, used only to publish the
/// per-dependency gauge (§4.7). The evaluator passes `None` for the
/// optional public-ingress confirmation probe, since that check re-probes
/// a service already accounted for by the internal probe.
pub struct ProbeOwner<'a> {
    pub application: &'a str,
    pub team: &'a str,
}

/// Builds the shared `reqwest::Client` used for every probe: fixed
/// `User-Agent`, 15s total timeout (§4.3 step 1).
pub fn build_client() -> crate::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(PROBE_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| format_err!("failed to build probe client: {}", e))
}

/// Performs a GET against `base + path` and classifies the result.
///
/// `owner`, when present, causes each dependency reported by a healthcheck
/// response to be published via `metrics::publish_dependency`.
pub async fn probe(
    client: &reqwest::Client,
    base: &str,
    path: &str,
    owner: Option<ProbeOwner<'_>>,
) -> ProbeResult {
    let url = format!("{}{}", base, path);

    let response = match client.get(&url).send().await {
        Ok(r) => r,
        Err(e) => {
            return ProbeResult { ok: false, reason: e.to_string(), kind: HealthCheckType::None };
        }
    };

    if path.is_empty() {
        // Fallback / simple mode: success iff status <= 500.
        let status = response.status();
        if status.as_u16() > 500 {
            return ProbeResult {
                ok: false,
                reason: format!("Fallbackcheck returns error status {}", status.as_u16()),
                kind: HealthCheckType::Simple,
            };
        }
        return ProbeResult { ok: true, reason: String::new(), kind: HealthCheckType::Simple };
    }

    // Healthcheck mode: the status code is informational only (§9 Open
    // Question 2) — only the JSON's `alive` flags decide success.
    let status_code = response.status().as_u16();
    let body = match response.text().await {
        Ok(b) => b,
        Err(_) => {
            return ProbeResult {
                ok: false,
                reason: "Could not read from HealthcheckPath".to_string(),
                kind: HealthCheckType::Healthcheck,
            };
        }
    };

    let parsed: HealthCheckResponse = match serde_json::from_str(&body) {
        Ok(p) => p,
        Err(_) => {
            return ProbeResult {
                ok: false,
                reason: format!("HealthcheckPath Format Error from {}", url),
                kind: HealthCheckType::Healthcheck,
            };
        }
    };

    let mut status_text = format!("Status {} for {} ", status_code, url);
    let mut all_alive = true;
    for svc in &parsed.services {
        if let Some(owner) = &owner {
            crate::metrics::publish_dependency(owner.application, &svc.name, owner.team, svc.alive);
        }
        if !svc.alive {
            all_alive = false;
            status_text.push_str(&format!("{} ({}) \n", svc.name, svc.details));
        }
    }

    ProbeResult { ok: all_alive, reason: status_text, kind: HealthCheckType::Healthcheck }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_client_without_error() {
        build_client().expect("client should build");
    }
}
