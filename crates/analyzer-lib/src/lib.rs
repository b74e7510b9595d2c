//! Analyzer library for container resource inventories
//!
//! This crate provides the core functionality for:
//! - Exact Kubernetes resource quantities
//! - Cluster-wide collection of container requests and limits by image
//! - Summary and detail report rendering
//! - Dispatching the collector to remote hosts over SSH

pub mod collector;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod observability;
pub mod quantity;
pub mod report;

pub use error::{CollectError, DispatchError, QuantityError, ReportError};
pub use models::*;
pub use observability::StructuredLogger;
pub use quantity::{ResourceKind, ResourceQuantity};
