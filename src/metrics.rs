// src/metrics.rs

#[cfg(feature = "observability")]
pub use metrics::{counter, describe_counter, describe_histogram, histogram};

// NOTE: When observability feature is disabled, provide stub implementations
#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! counter {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
    ($name:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! histogram {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_counter {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_histogram {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
use crate::{counter, describe_counter, describe_histogram, histogram};

/// Registers descriptions for every metric the SDK emits.
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    describe_counter!(
        "workflow_build_passes_total",
        "Workflow build passes completed, by run mode."
    );
    describe_histogram!(
        "workflow_steps_built",
        "Number of steps resolved by one build pass."
    );
    describe_counter!(
        "workflow_step_failures_total",
        "Generator failures that aborted a build pass, by step name."
    );
    describe_counter!(
        "router_lookups_total",
        "Route lookups, by outcome (path, self, unreachable)."
    );
}

// --- Helper functions to update metrics ---

pub fn record_steps_built(run_mode: &str, steps: usize) {
    counter!("workflow_build_passes_total", 1, "mode" => run_mode.to_string());
    histogram!("workflow_steps_built", steps as f64, "mode" => run_mode.to_string());
}

pub fn increment_step_failures(step: &str) {
    counter!("workflow_step_failures_total", 1, "step" => step.to_string());
}

pub fn increment_route_lookup(outcome: &'static str) {
    counter!("router_lookups_total", 1, "outcome" => outcome);
}
