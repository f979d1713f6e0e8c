//! Process configuration.
//!
//! A thin env-var settings struct plus a `clap` flag overlay, in the same
//! spirit as the original's flag surface (`original_source/vistecture-dashboard.go`)
//! but scoped to what the status fetcher itself needs — the architectural
//! project loader and HTML renderer are out of scope (§1 Non-goals).

use clap::{App, Arg};

/// Resolved process settings. Built once at startup in `main`.
pub struct Settings {
    /// Serve the three-application demo fixture instead of talking to a
    /// real cluster (§9).
    pub demo_mode: bool,
    /// Comma-separated application names excluded from evaluation (§4.4
    /// Step 2).
    pub ignored_services: Vec<String>,
    /// Port the demo fixture's fake probe responder listens on.
    pub fake_probe_port: i32,
    /// Path to the declared-applications YAML document (live mode only).
    pub declared_apps_path: Option<String>,
    /// Namespace to query against in live mode.
    pub namespace: String,
    /// Address the HTTP server binds to.
    pub listen: String,
}

impl Settings {
    pub fn from_env_and_args() -> Self {
        let matches = App::new("dashcat")
            .about("Kubernetes cluster health dashboard status fetcher")
            .arg(Arg::with_name("demo").long("demo").help("Serve the built-in demo fixture"))
            .arg(
                Arg::with_name("listen")
                    .long("listen")
                    .takes_value(true)
                    .help("Address to bind the HTTP server to"),
            )
            .arg(
                Arg::with_name("declared-apps")
                    .long("declared-apps")
                    .takes_value(true)
                    .help("Path to the declared-applications YAML document"),
            )
            .get_matches();

        let demo_mode = matches.is_present("demo") || env_flag("DEMO_MODE");

        let ignored_services = std::env::var("IGNORED_SERVICES")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let fake_probe_port = std::env::var("FAKE_PROBE_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8099);

        let declared_apps_path = matches
            .value_of("declared-apps")
            .map(str::to_string)
            .or_else(|| std::env::var("DECLARED_APPS_PATH").ok());

        let namespace = std::env::var("NAMESPACE").unwrap_or_else(|_| "default".to_string());

        let listen = matches
            .value_of("listen")
            .map(str::to_string)
            .unwrap_or_else(|| std::env::var("LISTEN").unwrap_or_else(|_| "0.0.0.0:8080".to_string()));

        Settings { demo_mode, ignored_services, fake_probe_port, declared_apps_path, namespace, listen }
    }
}

fn env_flag(key: &str) -> bool {
    matches!(std::env::var(key).as_deref(), Ok("true") | Ok("1"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_flag_recognises_true_and_one() {
        std::env::set_var("DASHCAT_TEST_FLAG", "true");
        assert!(env_flag("DASHCAT_TEST_FLAG"));
        std::env::set_var("DASHCAT_TEST_FLAG", "1");
        assert!(env_flag("DASHCAT_TEST_FLAG"));
        std::env::set_var("DASHCAT_TEST_FLAG", "nope");
        assert!(!env_flag("DASHCAT_TEST_FLAG"));
        std::env::remove_var("DASHCAT_TEST_FLAG");
    }
}
