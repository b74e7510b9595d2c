//! Error types for the analyzer library

use std::path::PathBuf;
use thiserror::Error;

use crate::quantity::ResourceKind;

/// Errors from parsing or combining resource quantities
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("empty quantity")]
    Empty,

    #[error("invalid quantity '{0}'")]
    Invalid(String),

    #[error("quantity '{0}' is out of range")]
    Overflow(String),

    #[error("cannot combine {left} and {right} quantities")]
    UnitMismatch {
        left: ResourceKind,
        right: ResourceKind,
    },
}

/// Errors that abort a cluster collection
#[derive(Debug, Error)]
pub enum CollectError {
    /// Credentials, kubeconfig or client construction failed
    #[error("cluster client setup failed: {0}")]
    Setup(String),

    #[error("failed to list namespaces: {0}")]
    ListNamespaces(String),

    #[error("failed to list pods in namespace '{namespace}': {message}")]
    ListPods { namespace: String, message: String },

    #[error("invalid {resource} quantity on {namespace}/{pod} ({image}): {source}")]
    InvalidQuantity {
        namespace: String,
        pod: String,
        image: String,
        resource: &'static str,
        #[source]
        source: QuantityError,
    },
}

/// Errors from a single render call
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot open output destination {path}: {source}")]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write report: {0}")]
    Write(#[from] std::io::Error),

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors from dispatching the collector to remote hosts
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("cannot read host list {path}: {source}")]
    HostList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid host '{0}'")]
    InvalidHost(String),

    #[error("invalid credentials: {0}")]
    Credentials(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("copy failed: {0}")]
    Copy(String),

    #[error("remote execution failed: {0}")]
    Exec(String),
}

pub type QuantityResult<T> = Result<T, QuantityError>;
pub type CollectResult<T> = Result<T, CollectError>;
pub type ReportResult<T> = Result<T, ReportError>;
pub type DispatchResult<T> = Result<T, DispatchError>;
