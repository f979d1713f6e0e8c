//! C7 — Metrics Publisher.
//!
//! Two labelled Prometheus gauges, process-global like the rest of the
//! corpus' `prometheus` + `lazy_static` usage (see e.g. `trydirect-stacker`,
//! `colliery-io-brokkr` in the retrieval pack). The underlying registry is
//! expected to be concurrency-safe (§5); we rely on the `prometheus` crate's
//! own internal locking and never guard it ourselves.

use prometheus::{GaugeVec, Opts};

use crate::model::State;

lazy_static! {
    pub static ref APPLICATION_HEALTH_STATUS: GaugeVec = GaugeVec::new(
        Opts::new("application_health_status", "Classified health state of a declared application"),
        &["application", "team"]
    )
    .expect("failed to create application_health_status gauge");

    pub static ref APPLICATION_HEALTH_DEPENDENCY: GaugeVec = GaugeVec::new(
        Opts::new(
            "application_health_dependency",
            "Liveness of a single dependency reported by an application's healthcheck"
        ),
        &["application", "dependency", "team"]
    )
    .expect("failed to create application_health_dependency gauge");
}

/// Registers both gauges with `registry`. Call once at process start; a
/// second registration against the same registry is a logic error (the
/// `prometheus` crate returns an `Err` which we propagate).
pub fn register(registry: &prometheus::Registry) -> crate::Result<()> {
    registry
        .register(Box::new(APPLICATION_HEALTH_STATUS.clone()))
        .map_err(|e| format_err!("failed to register application_health_status: {}", e))?;
    registry
        .register(Box::new(APPLICATION_HEALTH_DEPENDENCY.clone()))
        .map_err(|e| format_err!("failed to register application_health_dependency: {}", e))?;
    Ok(())
}

/// Maps a `State` to the `application_health_status` gauge value (§6).
///
/// Note this encoding is *not* the same as `State`'s own discriminant — the
/// metric groups several states together (e.g. `unhealthy` and `unstable`
/// both read as `2`).
pub fn encode_state(state: State) -> f64 {
    match state {
        State::Healthy | State::Ignored => 0.0,
        State::Unknown => 1.0,
        State::Unhealthy | State::Unstable => 2.0,
        State::Failed => 3.0,
    }
}

/// Sets `application_health_status{application, team}` for the current tick.
pub fn publish_state(application: &str, team: &str, state: State) {
    APPLICATION_HEALTH_STATUS
        .with_label_values(&[application, team])
        .set(encode_state(state));
}

/// Sets `application_health_dependency{application, dependency, team}`.
/// `alive = true` -> `0`, `alive = false` -> `1` (§6).
pub fn publish_dependency(application: &str, dependency: &str, team: &str, alive: bool) {
    APPLICATION_HEALTH_DEPENDENCY
        .with_label_values(&[application, dependency, team])
        .set(if alive { 0.0 } else { 1.0 });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_states_per_spec_table() {
        assert_eq!(encode_state(State::Healthy), 0.0);
        assert_eq!(encode_state(State::Ignored), 0.0);
        assert_eq!(encode_state(State::Unknown), 1.0);
        assert_eq!(encode_state(State::Unhealthy), 2.0);
        assert_eq!(encode_state(State::Unstable), 2.0);
        assert_eq!(encode_state(State::Failed), 3.0);
    }

    #[test]
    fn publishes_without_panicking() {
        publish_state("svc", "team-a", State::Healthy);
        publish_dependency("svc", "db", "team-a", false);
        assert_eq!(
            APPLICATION_HEALTH_DEPENDENCY.with_label_values(&["svc", "db", "team-a"]).get(),
            1.0
        );
    }
}
