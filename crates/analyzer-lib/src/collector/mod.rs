//! Cluster resource collection
//!
//! Scans every namespace and pod of one cluster through a [`ClusterApi`]
//! and aggregates declared container limits and requests into a
//! [`ClusterReport`](crate::models::ClusterReport).

mod aggregate;
mod kubernetes;

#[cfg(test)]
mod tests;

pub use aggregate::{collect, ReportBuilder};
pub use kubernetes::{ClusterSource, KubeClusterApi};

use crate::error::CollectResult;
use crate::models::PodResources;

pub use async_trait::async_trait;

/// Read-only listing access to a cluster
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Names of all namespaces
    async fn list_namespaces(&self) -> CollectResult<Vec<String>>;

    /// Pods of one namespace with their regular containers
    async fn list_pods(&self, namespace: &str) -> CollectResult<Vec<PodResources>>;
}
