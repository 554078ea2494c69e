//! Run reporting hooks

use checkout_common::Scenario;
use tracing::{error, info};

use crate::runner::{ScenarioReport, SuiteReport};

/// Listener for run progress. Every hook defaults to a no-op.
pub trait RunObserver: Send + Sync {
    fn run_started(&self, _total: usize) {}

    fn scenario_started(&self, _scenario: &Scenario) {}

    fn scenario_finished(&self, _report: &ScenarioReport) {}

    fn run_finished(&self, _report: &SuiteReport) {}
}

/// Logs progress through `tracing`
#[derive(Debug, Default)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn run_started(&self, total: usize) {
        info!("Running {} scenario(s)...", total);
    }

    fn scenario_started(&self, scenario: &Scenario) {
        info!("▶ {}", scenario.name);
    }

    fn scenario_finished(&self, report: &ScenarioReport) {
        if report.success {
            info!("✓ {} ({} ms)", report.name, report.duration_ms);
        } else {
            error!(
                "✗ {} [{:?} at {:?}] - {}",
                report.name,
                report.category,
                report.reached,
                report.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    fn run_finished(&self, report: &SuiteReport) {
        info!("");
        info!(
            "Scenario results: {} passed, {} failed, {} not run ({} ms)",
            report.passed, report.failed, report.not_run, report.duration_ms
        );
        if let Some(reason) = &report.aborted {
            error!("Run aborted: {}", reason);
        }
    }
}
