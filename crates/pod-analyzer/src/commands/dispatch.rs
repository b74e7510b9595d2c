//! Dispatch mode: run the collector on every host of the list

use crate::config::Settings;
use crate::output::{print_host_table, print_success, print_warning};
use crate::Cli;
use analyzer_lib::dispatch::{
    read_host_list, Credentials, DispatchConfig, Dispatcher, OpenSshTransport,
};
use analyzer_lib::report::OutputDestination;
use anyhow::{Context, Result};
use std::io::Write;
use std::time::Duration;
use tracing::warn;

/// Arguments for the remote collector, which must never dispatch again
pub fn collector_args(cli: &Cli) -> Vec<String> {
    let mut args = vec![
        "--mode".to_string(),
        "collect".to_string(),
        "--config-path".to_string(),
        cli.config_path.display().to_string(),
        "--pattern".to_string(),
        cli.pattern.clone(),
    ];
    if let Some(context) = &cli.context {
        args.push("--context".to_string());
        args.push(context.clone());
    }
    if cli.in_cluster {
        args.push("--in-cluster".to_string());
    }
    if cli.report {
        args.push("--report".to_string());
    }
    args
}

/// Dispatch configuration from flags and settings
pub fn dispatch_config(cli: &Cli, settings: &Settings) -> Result<DispatchConfig> {
    let local_binary =
        std::env::current_exe().context("Failed to locate the running executable")?;

    let mut config = DispatchConfig::new(local_binary, cli.remote_bin.clone());
    config.collector_args = collector_args(cli);
    config.host_timeout = Duration::from_secs(cli.timeout.unwrap_or(settings.host_timeout_secs));
    config.default_port = settings.default_port;
    Ok(config)
}

/// Dispatch to all hosts
///
/// Setup problems (credentials, host list, output file) fail the command.
/// Per-host failures are only reported.
pub async fn run(cli: &Cli, settings: &Settings) -> Result<()> {
    let credentials = Credentials::new(
        cli.username.clone(),
        cli.private_key.clone(),
        cli.password.clone(),
    )
    .context("Invalid SSH credentials")?;

    let hosts = read_host_list(&cli.hosts).context("Failed to read host list")?;

    let transport = OpenSshTransport::new(
        credentials,
        Duration::from_secs(settings.connect_timeout_secs),
    );
    let dispatcher = Dispatcher::new(transport, dispatch_config(cli, settings)?);

    let destination = OutputDestination::from_path(cli.output.as_ref());
    let mut sink = destination
        .open()
        .context("Failed to open output destination")?;

    let run = dispatcher.dispatch(&hosts, &mut *sink).await;

    if let Err(e) = sink.flush() {
        warn!(destination = %destination, error = %e, "Failed to flush host output");
    }
    drop(sink);

    print_host_table(&run);
    if run.failed() == 0 {
        print_success(&format!("All {} hosts succeeded", run.succeeded()));
    } else {
        print_warning(&format!(
            "{} of {} hosts failed",
            run.failed(),
            run.results.len()
        ));
    }

    Ok(())
}
