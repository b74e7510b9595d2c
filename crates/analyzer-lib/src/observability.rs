//! Structured event logging
//!
//! Every significant step emits one tracing event with a stable `event`
//! field, so JSON log output can be filtered per step.

use crate::dispatch::{DispatchRun, HostResult};
use crate::models::ClusterReport;
use tracing::{info, warn};

/// Structured logger for collection and dispatch events
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    component: String,
}

impl StructuredLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    /// Log process startup
    pub fn log_startup(&self, version: &str, mode: &str) {
        info!(
            event = "startup",
            component = %self.component,
            version = %version,
            mode = %mode,
            "Starting pod-analyzer"
        );
    }

    /// Log a finished cluster scan
    pub fn log_collection_complete(&self, report: &ClusterReport) {
        let ratios = report.ratios();
        info!(
            event = "collection_complete",
            component = %self.component,
            pattern = %report.pattern,
            images = report.total_by_image.len(),
            containers = report.total_count,
            target_containers = report.target_count,
            cpu_limit_ratio = ?ratios.cpu_limits,
            memory_limit_ratio = ?ratios.memory_limits,
            "Collected cluster resources"
        );
    }

    /// Log the final state of one host
    pub fn log_host_result(&self, result: &HostResult) {
        if result.status.is_success() {
            info!(
                event = "host_dispatched",
                component = %self.component,
                host = %result.host,
                status = %result.status,
                output_bytes = result.output.len(),
                elapsed_ms = result.elapsed_ms,
                "Host finished"
            );
        } else {
            warn!(
                event = "host_dispatched",
                component = %self.component,
                host = %result.host,
                status = %result.status,
                partial = result.partial,
                output_bytes = result.output.len(),
                elapsed_ms = result.elapsed_ms,
                error = result.error.as_deref().unwrap_or(""),
                "Host failed"
            );
        }
    }

    /// Log the end of a dispatch run
    pub fn log_dispatch_complete(&self, run: &DispatchRun) {
        info!(
            event = "dispatch_complete",
            component = %self.component,
            hosts = run.hosts.len(),
            succeeded = run.succeeded(),
            failed = run.failed(),
            "Dispatch finished"
        );
    }
}
