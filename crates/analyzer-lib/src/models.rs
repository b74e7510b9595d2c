//! Core data models for the cluster inventory

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::QuantityResult;
use crate::quantity::{ResourceKind, ResourceQuantity};

/// Raw quantity strings keyed by resource name, as declared on a container
pub type RawResourceList = BTreeMap<String, String>;

/// namespace -> pod -> container image -> declared resources
pub type DetailReport = BTreeMap<String, BTreeMap<String, BTreeMap<String, ContainerResources>>>;

/// Declared limits and requests of a single container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerResources {
    #[serde(default)]
    pub limits: RawResourceList,
    #[serde(default)]
    pub requests: RawResourceList,
}

/// A container as listed from the cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub resources: ContainerResources,
}

/// A pod and its regular containers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodResources {
    pub name: String,
    pub containers: Vec<ContainerSpec>,
}

/// CPU and memory of one accounting class (limits or requests)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResourcePair {
    pub cpu: ResourceQuantity,
    pub memory: ResourceQuantity,
}

impl Default for ResourcePair {
    fn default() -> Self {
        Self {
            cpu: ResourceQuantity::zero(ResourceKind::Cpu),
            memory: ResourceQuantity::zero(ResourceKind::Memory),
        }
    }
}

impl ResourcePair {
    pub fn new(cpu: ResourceQuantity, memory: ResourceQuantity) -> Self {
        Self { cpu, memory }
    }

    pub fn checked_add(&self, other: &ResourcePair) -> QuantityResult<ResourcePair> {
        Ok(Self {
            cpu: self.cpu.checked_add(&other.cpu)?,
            memory: self.memory.checked_add(&other.memory)?,
        })
    }
}

/// Summed limits and requests of every container sharing an image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerResourceUsage {
    pub image: String,
    pub limits: ResourcePair,
    pub requests: ResourcePair,
}

impl ContainerResourceUsage {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            limits: ResourcePair::default(),
            requests: ResourcePair::default(),
        }
    }

    /// Add one container's limits and requests
    pub fn add(&mut self, limits: &ResourcePair, requests: &ResourcePair) -> QuantityResult<()> {
        // Compute both before assigning so a failure leaves self untouched
        let limits = self.limits.checked_add(limits)?;
        let requests = self.requests.checked_add(requests)?;
        self.limits = limits;
        self.requests = requests;
        Ok(())
    }
}

/// Target share of the cluster-wide totals; `None` means no data
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UsageRatios {
    pub cpu_limits: Option<f64>,
    pub memory_limits: Option<f64>,
    pub cpu_requests: Option<f64>,
    pub memory_requests: Option<f64>,
}

/// Result of scanning one cluster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterReport {
    /// Image substring that selected the target containers
    pub pattern: String,
    pub total_by_image: BTreeMap<String, ContainerResourceUsage>,
    pub target_totals: ContainerResourceUsage,
    pub grand_totals: ContainerResourceUsage,
    pub target_count: usize,
    pub total_count: usize,
    /// Rendered separately as the detail document
    #[serde(skip)]
    pub detail: DetailReport,
}

impl ClusterReport {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            total_by_image: BTreeMap::new(),
            target_totals: ContainerResourceUsage::new("Target"),
            grand_totals: ContainerResourceUsage::new("Total"),
            target_count: 0,
            total_count: 0,
            detail: DetailReport::new(),
        }
    }

    pub fn ratios(&self) -> UsageRatios {
        let target = &self.target_totals;
        let total = &self.grand_totals;
        UsageRatios {
            cpu_limits: target.limits.cpu.ratio(&total.limits.cpu).ok().flatten(),
            memory_limits: target.limits.memory.ratio(&total.limits.memory).ok().flatten(),
            cpu_requests: target.requests.cpu.ratio(&total.requests.cpu).ok().flatten(),
            memory_requests: target
                .requests
                .memory
                .ratio(&total.requests.memory)
                .ok()
                .flatten(),
        }
    }
}
