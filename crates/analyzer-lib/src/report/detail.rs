//! Detail document: declared resources per namespace, pod and image

use super::OutputDestination;
use crate::error::ReportResult;
use crate::models::{ContainerResources, DetailReport};
use std::io::Write;

/// File the detail document is written to unless overridden
pub const DEFAULT_DETAIL_FILE: &str = "report.json";

/// Serialize the detail mapping as pretty JSON with sorted keys
pub fn render_detail(detail: &DetailReport) -> ReportResult<String> {
    Ok(serde_json::to_string_pretty(detail)?)
}

/// Parse a detail document produced by [`render_detail`]
pub fn parse_detail(text: &str) -> ReportResult<DetailReport> {
    Ok(serde_json::from_str(text)?)
}

/// Resources recorded for one container image of a pod
///
/// `None` means no such container was observed.
pub fn lookup_detail<'a>(
    detail: &'a DetailReport,
    namespace: &str,
    pod: &str,
    image: &str,
) -> Option<&'a ContainerResources> {
    detail.get(namespace)?.get(pod)?.get(image)
}

/// Write the detail document to `destination`
pub fn write_detail(detail: &DetailReport, destination: &OutputDestination) -> ReportResult<()> {
    let rendered = render_detail(detail)?;
    let mut out = destination.open()?;
    writeln!(out, "{}", rendered)?;
    out.flush()?;
    Ok(())
}
