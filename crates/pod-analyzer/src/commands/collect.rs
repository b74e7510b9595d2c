//! Collect mode: scan the cluster and render the report

use crate::config::Settings;
use crate::output::{print_error, print_success};
use crate::Cli;
use analyzer_lib::collector::{collect, ClusterSource, KubeClusterApi};
use analyzer_lib::report::{write_detail, write_summary, OutputDestination, SummaryFormat};
use analyzer_lib::{ClusterReport, StructuredLogger};
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tracing::{error, info};

/// Credentials source selected by the flags
pub fn cluster_source(cli: &Cli) -> ClusterSource {
    if cli.in_cluster {
        ClusterSource::InCluster
    } else {
        ClusterSource::Kubeconfig {
            path: cli.config_path.clone(),
            context: cli.context.clone(),
        }
    }
}

/// Run one collection and render it
pub async fn run(cli: &Cli, settings: &Settings) -> Result<()> {
    let api = KubeClusterApi::connect(&cluster_source(cli))
        .await
        .context("Failed to connect to cluster")?;

    let report = collect(&api, &cli.pattern)
        .await
        .context("Failed to collect container resources")?;
    StructuredLogger::new("collector").log_collection_complete(&report);

    render_reports(&report, cli, settings)
}

/// Write the summary and, with `--report`, the detail document
///
/// The two renderings are independent: both are attempted, and an error is
/// returned afterwards if either failed.
pub fn render_reports(report: &ClusterReport, cli: &Cli, settings: &Settings) -> Result<()> {
    let destination = OutputDestination::from_path(cli.output.as_ref());
    let format = cli
        .format
        .map(SummaryFormat::from)
        .unwrap_or_else(|| SummaryFormat::for_destination(&destination));

    let mut failures = Vec::new();

    match write_summary(report, format, &destination) {
        Ok(()) => info!(destination = %destination, format = ?format, "Summary written"),
        Err(e) => {
            error!(destination = %destination, error = %e, "Summary rendering failed");
            failures.push(format!("summary: {}", e));
        }
    }

    if cli.report {
        let detail_destination = OutputDestination::File(PathBuf::from(&settings.report_file));
        match write_detail(&report.detail, &detail_destination) {
            Ok(()) => print_success(&format!("Detail report written to {}", detail_destination)),
            Err(e) => {
                error!(destination = %detail_destination, error = %e, "Detail rendering failed");
                failures.push(format!("detail: {}", e));
            }
        }
    }

    if !failures.is_empty() {
        print_error("Report rendering failed");
        bail!(failures.join("; "));
    }
    Ok(())
}
