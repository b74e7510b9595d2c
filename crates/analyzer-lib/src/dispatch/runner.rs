//! Sequential dispatch loop
//!
//! Each host goes through connect, copy and execute. A failure at any stage
//! is recorded on that host's result and the loop moves on; nothing is
//! retried. Execution races the remote command against a watchdog.

use super::transport::{collector_command, RemoteExecution, RemoteTransport};
use super::{DispatchRun, HostResult, HostStatus, HostTarget, DEFAULT_SSH_PORT};
use crate::error::DispatchError;
use crate::observability::StructuredLogger;
use chrono::Utc;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};

/// Per-host ceiling on connect + copy + execute
pub const DEFAULT_HOST_TIMEOUT: Duration = Duration::from_secs(300);

const READ_CHUNK: usize = 8192;

/// Settings for one dispatch run
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Collector binary on this machine
    pub local_binary: PathBuf,
    /// Where the binary is placed on each host
    pub remote_binary: String,
    /// Arguments for the remote collector
    pub collector_args: Vec<String>,
    pub host_timeout: Duration,
    /// Port for host lines without one
    pub default_port: u16,
}

impl DispatchConfig {
    pub fn new(local_binary: impl Into<PathBuf>, remote_binary: impl Into<String>) -> Self {
        Self {
            local_binary: local_binary.into(),
            remote_binary: remote_binary.into(),
            collector_args: Vec::new(),
            host_timeout: DEFAULT_HOST_TIMEOUT,
            default_port: DEFAULT_SSH_PORT,
        }
    }
}

/// Runs the collector on a list of hosts, one at a time
pub struct Dispatcher<T> {
    transport: T,
    config: DispatchConfig,
    logger: StructuredLogger,
}

impl<T: RemoteTransport> Dispatcher<T> {
    pub fn new(transport: T, config: DispatchConfig) -> Self {
        Self {
            transport,
            config,
            logger: StructuredLogger::new("dispatcher"),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Dispatch to every host in order, appending each host's output to
    /// `sink` as soon as that host is finished
    ///
    /// Never aborts early: every host gets a result.
    pub async fn dispatch(&self, hosts: &[String], sink: &mut dyn Write) -> DispatchRun {
        let command = collector_command(&self.config.remote_binary, &self.config.collector_args);
        info!(
            hosts = hosts.len(),
            timeout_secs = self.config.host_timeout.as_secs(),
            "Starting dispatch"
        );

        let mut run = DispatchRun {
            hosts: hosts.to_vec(),
            results: Vec::with_capacity(hosts.len()),
        };

        for host in hosts {
            let result = self.dispatch_host(host, &command).await;
            self.logger.log_host_result(&result);

            if let Err(e) = write_host_output(sink, &result) {
                warn!(host = %host, error = %e, "Failed to write host output");
            }
            run.results.push(result);
        }

        self.logger.log_dispatch_complete(&run);
        run
    }

    async fn dispatch_host(&self, line: &str, command: &str) -> HostResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let deadline = start + self.config.host_timeout;
        let mut output = Vec::new();

        let (status, error) = match self.run_stages(line, command, deadline, &mut output).await {
            Ok(()) => (HostStatus::Succeeded, None),
            Err((status, e)) => (status, Some(e.to_string())),
        };

        HostResult {
            host: line.to_string(),
            status,
            partial: matches!(status, HostStatus::Timeout | HostStatus::ExecFailed),
            output,
            error,
            started_at,
            elapsed_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn run_stages(
        &self,
        line: &str,
        command: &str,
        deadline: Instant,
        output: &mut Vec<u8>,
    ) -> Result<(), (HostStatus, DispatchError)> {
        let target = HostTarget::parse(line, self.config.default_port)
            .map_err(|e| (HostStatus::ConnectFailed, e))?;

        timeout_at(deadline, self.transport.connect(&target))
            .await
            .unwrap_or_else(|_| Err(DispatchError::Connect("timed out".to_string())))
            .map_err(|e| (HostStatus::ConnectFailed, e))?;

        info!(host = %target, binary = %self.config.local_binary.display(), "Copying collector");
        timeout_at(
            deadline,
            self.transport.copy_executable(
                &target,
                &self.config.local_binary,
                &self.config.remote_binary,
            ),
        )
        .await
        .unwrap_or_else(|_| Err(DispatchError::Copy("timed out".to_string())))
        .map_err(|e| (HostStatus::CopyFailed, e))?;

        info!(host = %target, command = %command, "Executing collector");
        let execution = timeout_at(deadline, self.transport.execute(&target, command))
            .await
            .map_err(|_| {
                (
                    HostStatus::Timeout,
                    DispatchError::Exec("timed out starting command".to_string()),
                )
            })?
            .map_err(|e| (HostStatus::ExecFailed, e))?;

        match timeout_at(deadline, drive(execution, output)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err((HostStatus::ExecFailed, e)),
            Err(_) => Err((
                HostStatus::Timeout,
                DispatchError::Exec(format!(
                    "no exit within {}s, abandoning host",
                    self.config.host_timeout.as_secs()
                )),
            )),
        }
    }
}

/// Drain stdout into `output` while waiting for the command to exit
async fn drive(execution: RemoteExecution, output: &mut Vec<u8>) -> Result<(), DispatchError> {
    let RemoteExecution { mut stdout, exit } = execution;
    let (drained, exited) = tokio::join!(drain(&mut stdout, output), exit);

    drained.map_err(|e| DispatchError::Exec(format!("reading remote output: {}", e)))?;
    exited
}

async fn drain(
    reader: &mut (dyn AsyncRead + Send + Unpin),
    output: &mut Vec<u8>,
) -> std::io::Result<()> {
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        output.extend_from_slice(&chunk[..n]);
    }
}

fn write_host_output(sink: &mut dyn Write, result: &HostResult) -> std::io::Result<()> {
    writeln!(sink, "### {} [{}]", result.host, result.status)?;
    if !result.output.is_empty() {
        sink.write_all(&result.output)?;
        if !result.output.ends_with(b"\n") {
            writeln!(sink)?;
        }
    }
    sink.flush()
}
