//! Remote transport abstraction

use super::HostTarget;
use crate::error::DispatchResult;
use async_trait::async_trait;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use tokio::io::AsyncRead;

/// A started remote command
///
/// `stdout` and `exit` are driven concurrently by the dispatcher. Dropping
/// either abandons the command.
pub struct RemoteExecution {
    pub stdout: Box<dyn AsyncRead + Send + Unpin>,
    /// Resolves when the command exits; an error for a non-zero status
    pub exit: Pin<Box<dyn Future<Output = DispatchResult<()>> + Send>>,
}

/// Secure remote copy and execution
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Check that a session to `host` can be established
    async fn connect(&self, host: &HostTarget) -> DispatchResult<()>;

    /// Copy `local` to `remote` on `host` with mode 0755
    async fn copy_executable(
        &self,
        host: &HostTarget,
        local: &Path,
        remote: &str,
    ) -> DispatchResult<()>;

    /// Start `command` on `host` in a new session
    async fn execute(&self, host: &HostTarget, command: &str) -> DispatchResult<RemoteExecution>;
}

/// Quote `arg` for a POSIX shell
pub fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

/// Command line running the remote collector binary with `args`
pub fn collector_command(remote_binary: &str, args: &[String]) -> String {
    std::iter::once(remote_binary)
        .chain(args.iter().map(String::as_str))
        .map(shell_quote)
        .collect::<Vec<_>>()
        .join(" ")
}
