//! OpenSSH transport
//!
//! Drives the system `ssh` and `scp` clients through `tokio::process`.
//! Password logins run the clients under `sshpass -e`, which reads the
//! password from the `SSHPASS` environment variable.

use super::transport::{shell_quote, RemoteExecution, RemoteTransport};
use super::{AuthMethod, Credentials, HostTarget};
use crate::error::{DispatchError, DispatchResult};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Transport backed by the OpenSSH command line clients
#[derive(Debug, Clone)]
pub struct OpenSshTransport {
    credentials: Credentials,
    connect_timeout: Duration,
}

impl OpenSshTransport {
    pub fn new(credentials: Credentials, connect_timeout: Duration) -> Self {
        Self {
            credentials,
            connect_timeout,
        }
    }

    /// Options shared by ssh and scp
    fn common_options(&self) -> Vec<String> {
        let mut options: Vec<String> = [
            "-o",
            "StrictHostKeyChecking=no",
            "-o",
            "UserKnownHostsFile=/dev/null",
            "-o",
            "LogLevel=ERROR",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        options.push("-o".to_string());
        options.push(format!(
            "ConnectTimeout={}",
            self.connect_timeout.as_secs().max(1)
        ));

        match &self.credentials.auth {
            AuthMethod::PrivateKey(path) => {
                options.extend(["-o", "BatchMode=yes", "-i"].iter().map(|s| s.to_string()));
                options.push(path.display().to_string());
            }
            AuthMethod::Password(_) => {
                options.extend(
                    ["-o", "BatchMode=no", "-o", "PubkeyAuthentication=no"]
                        .iter()
                        .map(|s| s.to_string()),
                );
            }
        }

        options
    }

    /// Arguments for `ssh` running `remote_command` on `host`
    pub fn ssh_args(&self, host: &HostTarget, remote_command: &str) -> Vec<String> {
        let mut args = self.common_options();
        args.push("-p".to_string());
        args.push(host.port.to_string());
        args.push(format!("{}@{}", self.credentials.username, host.host));
        args.push(remote_command.to_string());
        args
    }

    /// Arguments for `scp` copying `local` to `remote` on `host`
    pub fn scp_args(&self, host: &HostTarget, local: &Path, remote: &str) -> Vec<String> {
        let mut args = self.common_options();
        args.push("-q".to_string());
        args.push("-P".to_string());
        args.push(host.port.to_string());
        args.push(local.display().to_string());
        args.push(format!(
            "{}@{}:{}",
            self.credentials.username,
            host.scp_host(),
            remote
        ));
        args
    }

    fn command(&self, program: &str, args: Vec<String>) -> Command {
        let mut cmd = match &self.credentials.auth {
            AuthMethod::Password(password) => {
                let mut cmd = Command::new("sshpass");
                cmd.arg("-e").arg(program).env("SSHPASS", password);
                cmd
            }
            AuthMethod::PrivateKey(_) => Command::new(program),
        };
        cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }

    /// Run an ssh/scp command to completion, returning stderr on failure
    async fn run(&self, program: &str, args: Vec<String>) -> Result<(), String> {
        let output = self
            .command(program, args)
            .output()
            .await
            .map_err(|e| format!("failed to start {}: {}", program, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("{} ({})", stderr.trim(), output.status));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteTransport for OpenSshTransport {
    async fn connect(&self, host: &HostTarget) -> DispatchResult<()> {
        debug!(host = %host, "Opening ssh session");
        self.run("ssh", self.ssh_args(host, "true"))
            .await
            .map_err(DispatchError::Connect)
    }

    async fn copy_executable(
        &self,
        host: &HostTarget,
        local: &Path,
        remote: &str,
    ) -> DispatchResult<()> {
        debug!(host = %host, local = %local.display(), remote = %remote, "Copying binary");
        self.run("scp", self.scp_args(host, local, remote))
            .await
            .map_err(DispatchError::Copy)?;

        let chmod = format!("chmod 0755 {}", shell_quote(remote));
        self.run("ssh", self.ssh_args(host, &chmod))
            .await
            .map_err(DispatchError::Copy)
    }

    async fn execute(&self, host: &HostTarget, command: &str) -> DispatchResult<RemoteExecution> {
        let mut child = self
            .command("ssh", self.ssh_args(host, command))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DispatchError::Exec(format!("failed to start ssh: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DispatchError::Exec("ssh stdout not captured".to_string()))?;

        // Dropping this future kills the local ssh client; the remote
        // process is not signalled.
        let exit = async move {
            let output = child
                .wait_with_output()
                .await
                .map_err(|e| DispatchError::Exec(format!("waiting for ssh: {}", e)))?;
            if output.status.success() {
                Ok(())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(DispatchError::Exec(format!(
                    "{} ({})",
                    stderr.trim(),
                    output.status
                )))
            }
        };

        Ok(RemoteExecution {
            stdout: Box::new(stdout),
            exit: Box::pin(exit),
        })
    }
}
