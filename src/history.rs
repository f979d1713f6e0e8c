//! C5 — History Smoother.
//!
//! Single-tick flapping is common against a live cluster (a pod briefly
//! restarting during a rolling deploy, for instance) and is noisy to surface
//! directly. Before a freshly evaluated `Healthy` result is published, this
//! module checks the application's recent history and downgrades to
//! `Unstable` if any tick in the window failed (§4.5, resolving Open
//! Question 1: "any failure in the window", not just a run in the last N).

use std::collections::VecDeque;

use crate::model::{AppDeploymentInfo, State};

/// Orchestrator tick cadence, in seconds (§4.6). Used only to phrase the
/// smoothing reason in terms of wall-clock time rather than tick count.
pub const TICK_INTERVAL_SECS: u64 = 15;

/// Smooths the most recent entry of `history` (its front, per
/// `HistoryBuffer::prepend`) against the rest of the window.
///
/// Only a `Healthy` latest result can be downgraded; anything already
/// reporting a problem is returned unchanged; the caller publishes the
/// smoothed copy and keeps the raw evaluation in history for the next tick's
/// comparison.
pub fn smooth(history: &VecDeque<AppDeploymentInfo>) -> AppDeploymentInfo {
    let latest = history.front().expect("smooth is called only after prepend").clone();
    if latest.state() != State::Healthy {
        return latest;
    }

    let total = history.len();
    let failures: Vec<&AppDeploymentInfo> = history
        .iter()
        .filter(|info| matches!(info.state(), State::Failed | State::Unhealthy))
        .collect();
    if failures.is_empty() {
        return latest;
    }

    let window_secs = total as u64 * TICK_INTERVAL_SECS;
    let mut reason = format!(
        "Failed {} out of {} checks in the last {} seconds\n",
        failures.len(),
        total,
        window_secs
    );
    for failure in &failures {
        reason.push_str(&failure.app_state_info.state_reason);
        reason.push('\n');
    }

    latest.with_state(State::Unstable, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeclaredApplication;
    use std::collections::HashMap;

    fn app() -> DeclaredApplication {
        DeclaredApplication { name: "svc".into(), team: "t".into(), properties: HashMap::new() }
    }

    fn info(state: State, reason: &str) -> AppDeploymentInfo {
        AppDeploymentInfo::new("svc", app()).with_state(state, reason)
    }

    #[test]
    fn all_healthy_window_stays_healthy() {
        let mut hist = VecDeque::new();
        for _ in 0..5 {
            hist.push_front(info(State::Healthy, ""));
        }
        let result = smooth(&hist);
        assert_eq!(result.state(), State::Healthy);
    }

    #[test]
    fn a_single_past_failure_downgrades_current_healthy_to_unstable() {
        // `prepend` always pushes the newest result to the front, so the
        // current (healthy) tick is index 0 and the earlier failure sits
        // behind it.
        let mut hist = VecDeque::new();
        hist.push_front(info(State::Failed, "No pod available"));
        hist.push_front(info(State::Healthy, ""));

        let result = smooth(&hist);
        assert_eq!(result.state(), State::Unstable);
        assert!(result.app_state_info.state_reason.contains("Failed 1 out of"));
        assert!(result.app_state_info.state_reason.contains("No pod available"));
    }

    #[test]
    fn non_healthy_latest_is_never_smoothed() {
        let mut hist = VecDeque::new();
        hist.push_front(info(State::Failed, "No pod available"));
        let result = smooth(&hist);
        assert_eq!(result.state(), State::Failed);
    }
}
