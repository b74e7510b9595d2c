//! Aggregation of container resources into a cluster report

use super::ClusterApi;
use crate::error::{CollectError, CollectResult};
use crate::models::{
    ClusterReport, ContainerResourceUsage, ContainerSpec, RawResourceList, ResourcePair,
};
use crate::quantity::{ResourceKind, ResourceQuantity};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Scan the whole cluster and aggregate containers matching `pattern`
///
/// `pattern` is a case-sensitive literal substring of the container image.
/// Any listing error aborts the scan; no partial report is returned.
pub async fn collect(api: &dyn ClusterApi, pattern: &str) -> CollectResult<ClusterReport> {
    let start = Instant::now();
    let mut builder = ReportBuilder::new(pattern);

    let namespaces = api.list_namespaces().await?;
    debug!(namespaces = namespaces.len(), "Listed namespaces");

    for namespace in &namespaces {
        let pods = api.list_pods(namespace).await?;
        debug!(namespace = %namespace, pods = pods.len(), "Listed pods");

        for pod in &pods {
            for container in &pod.containers {
                builder.record(namespace, &pod.name, container)?;
            }
        }
    }

    let report = builder.finish();
    info!(
        namespaces = namespaces.len(),
        containers = report.total_count,
        target_containers = report.target_count,
        elapsed_ms = start.elapsed().as_millis(),
        "Cluster scan complete"
    );
    Ok(report)
}

/// Accumulates containers into a [`ClusterReport`]
///
/// All state is owned by the builder, so independent scans never share
/// totals.
pub struct ReportBuilder {
    report: ClusterReport,
}

impl ReportBuilder {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            report: ClusterReport::new(pattern),
        }
    }

    /// Add one container found in `namespace`/`pod`
    pub fn record(
        &mut self,
        namespace: &str,
        pod: &str,
        container: &ContainerSpec,
    ) -> CollectResult<()> {
        let image = container.image.as_str();
        let invalid = |resource: &'static str, source| CollectError::InvalidQuantity {
            namespace: namespace.to_string(),
            pod: pod.to_string(),
            image: image.to_string(),
            resource,
            source,
        };

        let limits = resource_pair(&container.resources.limits)
            .map_err(|(resource, e)| invalid(resource, e))?;
        let requests = resource_pair(&container.resources.requests)
            .map_err(|(resource, e)| invalid(resource, e))?;
        let overflow = |e| invalid("aggregate", e);

        let report = &mut self.report;
        report
            .grand_totals
            .add(&limits, &requests)
            .map_err(overflow)?;
        report
            .total_by_image
            .entry(image.to_string())
            .or_insert_with(|| ContainerResourceUsage::new(image))
            .add(&limits, &requests)
            .map_err(overflow)?;

        if image.contains(report.pattern.as_str()) {
            report
                .target_totals
                .add(&limits, &requests)
                .map_err(overflow)?;
            report.target_count += 1;
        }
        report.total_count += 1;

        let previous = report
            .detail
            .entry(namespace.to_string())
            .or_default()
            .entry(pod.to_string())
            .or_default()
            .insert(image.to_string(), container.resources.clone());
        if previous.is_some() {
            warn!(
                namespace = %namespace,
                pod = %pod,
                image = %image,
                container = %container.name,
                "Pod runs the same image twice, detail keeps the last container"
            );
        }

        Ok(())
    }

    pub fn finish(self) -> ClusterReport {
        self.report
    }
}

/// Parse cpu and memory from a raw resource list; absent entries are zero
fn resource_pair(
    raw: &RawResourceList,
) -> Result<ResourcePair, (&'static str, crate::error::QuantityError)> {
    let quantity = |kind: ResourceKind| {
        let name = kind.resource_name();
        match raw.get(name) {
            Some(text) => ResourceQuantity::parse(kind, text).map_err(|e| (name, e)),
            None => Ok(ResourceQuantity::zero(kind)),
        }
    };

    Ok(ResourcePair::new(
        quantity(ResourceKind::Cpu)?,
        quantity(ResourceKind::Memory)?,
    ))
}
