//! Host list parsing

use crate::error::{DispatchError, DispatchResult};
use std::fmt;
use std::path::Path;

pub const DEFAULT_SSH_PORT: u16 = 22;

/// A remote host and its SSH port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTarget {
    pub host: String,
    pub port: u16,
}

impl HostTarget {
    /// Parse `host`, `host:port`, `[v6addr]` or `[v6addr]:port`
    ///
    /// A bare IPv6 address (several colons, no brackets) takes the default
    /// port.
    pub fn parse(line: &str, default_port: u16) -> DispatchResult<Self> {
        let trimmed = line.trim();
        let invalid = || DispatchError::InvalidHost(line.to_string());
        if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
            return Err(invalid());
        }

        let (host, port) = if let Some(rest) = trimmed.strip_prefix('[') {
            let (host, after) = rest.split_once(']').ok_or_else(invalid)?;
            match after {
                "" => (host, None),
                _ => (host, Some(after.strip_prefix(':').ok_or_else(invalid)?)),
            }
        } else {
            match trimmed.matches(':').count() {
                0 => (trimmed, None),
                1 => {
                    let (host, port) = trimmed.split_once(':').ok_or_else(invalid)?;
                    (host, Some(port))
                }
                _ => (trimmed, None),
            }
        };

        if host.is_empty() {
            return Err(invalid());
        }
        let port = match port {
            Some(port) => port
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or_else(invalid)?,
            None => default_port,
        };

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    /// Host as accepted in an scp remote path
    pub fn scp_host(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }
}

impl fmt::Display for HostTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scp_host(), self.port)
    }
}

/// Read one host per line, verbatim
pub fn read_host_list(path: &Path) -> DispatchResult<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|source| DispatchError::HostList {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(content.lines().map(str::to_string).collect())
}
