//! Fleet dispatch of the collector
//!
//! This module provides:
//! - Host list parsing (`host` or `host:port` per line)
//! - A [`RemoteTransport`] abstraction with an OpenSSH implementation
//! - The sequential [`Dispatcher`] loop with per-host failure isolation
//!   and a per-host watchdog

mod hosts;
mod runner;
mod ssh;
mod transport;


pub use hosts::{read_host_list, HostTarget, DEFAULT_SSH_PORT};
pub use runner::{DispatchConfig, Dispatcher, DEFAULT_HOST_TIMEOUT};
pub use ssh::OpenSshTransport;
pub use transport::{collector_command, shell_quote, RemoteExecution, RemoteTransport};

use crate::error::{DispatchError, DispatchResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Final state of one host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostStatus {
    Succeeded,
    ConnectFailed,
    CopyFailed,
    ExecFailed,
    Timeout,
}

impl HostStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, HostStatus::Succeeded)
    }
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HostStatus::Succeeded => "succeeded",
            HostStatus::ConnectFailed => "connect_failed",
            HostStatus::CopyFailed => "copy_failed",
            HostStatus::ExecFailed => "exec_failed",
            HostStatus::Timeout => "timeout",
        };
        f.write_str(label)
    }
}

/// Outcome of dispatching to one host
#[derive(Debug, Clone, Serialize)]
pub struct HostResult {
    /// Host line as read from the host list
    pub host: String,
    pub status: HostStatus,
    /// Remote standard output collected so far
    #[serde(skip)]
    pub output: Vec<u8>,
    /// Output may be incomplete (timeout or failed command)
    pub partial: bool,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// All host results of one dispatch, in host-list order
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchRun {
    pub hosts: Vec<String>,
    pub results: Vec<HostResult>,
}

impl DispatchRun {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn with_status(&self, status: HostStatus) -> impl Iterator<Item = &HostResult> {
        self.results.iter().filter(move |r| r.status == status)
    }
}

/// How to authenticate to remote hosts
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMethod {
    PrivateKey(PathBuf),
    Password(String),
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::PrivateKey(path) => f.debug_tuple("PrivateKey").field(path).finish(),
            AuthMethod::Password(_) => f.write_str("Password(<redacted>)"),
        }
    }
}

/// SSH login for every host of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub auth: AuthMethod,
}

impl Credentials {
    /// Build credentials from exactly one of a key file or a password
    ///
    /// A key file must exist and be readable.
    pub fn new(
        username: impl Into<String>,
        private_key: Option<PathBuf>,
        password: Option<String>,
    ) -> DispatchResult<Self> {
        let auth = match (private_key, password) {
            (Some(path), None) => {
                std::fs::File::open(&path).map_err(|e| {
                    DispatchError::Credentials(format!(
                        "cannot read private key {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                AuthMethod::PrivateKey(path)
            }
            (None, Some(password)) => AuthMethod::Password(password),
            (Some(_), Some(_)) => {
                return Err(DispatchError::Credentials(
                    "use either a private key or a password, not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(DispatchError::Credentials(
                    "a private key or a password is required".to_string(),
                ))
            }
        };

        Ok(Self {
            username: username.into(),
            auth,
        })
    }
}
