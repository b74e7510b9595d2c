//! pod-analyzer CLI
//!
//! Inventories container CPU and memory requests and limits by image.
//! In collect mode it scans the cluster reachable from this machine; in
//! dispatch mode it copies itself to every host of a list and runs there in
//! collect mode.

mod commands;
mod config;
mod output;

use analyzer_lib::StructuredLogger;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Entry point selected for this process
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Copy this binary to each host and run it there in collect mode
    Dispatch,
    /// Scan the local cluster and emit a report
    Collect,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Dispatch => "dispatch",
            Mode::Collect => "collect",
        }
    }
}

/// Container resource inventory for Kubernetes clusters
#[derive(Debug, Parser)]
#[command(name = "pod-analyzer")]
#[command(author, version, about = "Inventory container resource requests and limits by image", long_about = None)]
pub struct Cli {
    /// Run as dispatcher or as collector
    #[arg(long, value_enum, env = "POD_ANALYZER_MODE", default_value_t = Mode::Dispatch)]
    pub mode: Mode,

    /// Path to the kubeconfig file
    #[arg(long, env = "POD_ANALYZER_CONFIG_PATH", default_value = ".kube/config")]
    pub config_path: PathBuf,

    /// Kubeconfig context (defaults to the current context)
    #[arg(long, env = "POD_ANALYZER_CONTEXT")]
    pub context: Option<String>,

    /// Use the pod service account instead of a kubeconfig
    #[arg(long, env = "POD_ANALYZER_IN_CLUSTER")]
    pub in_cluster: bool,

    /// Image substring selecting the target containers
    #[arg(long, env = "POD_ANALYZER_PATTERN", default_value = "qbox/qbox-docker:6.2.1")]
    pub pattern: String,

    /// Write the summary (collect) or the host outputs (dispatch) to this file instead of stdout
    #[arg(long, short, env = "POD_ANALYZER_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Summary format (defaults to table on stdout, csv for a file)
    #[arg(long, short, value_enum, env = "POD_ANALYZER_FORMAT")]
    pub format: Option<output::OutputFormat>,

    /// Also write the per-container detail document
    #[arg(long, env = "POD_ANALYZER_REPORT")]
    pub report: bool,

    /// File with one host per line
    #[arg(long, env = "POD_ANALYZER_HOSTS", default_value = "hosts.txt")]
    pub hosts: PathBuf,

    /// SSH user on the remote hosts
    #[arg(long, short, env = "POD_ANALYZER_USERNAME", default_value = "root")]
    pub username: String,

    /// SSH private key file
    #[arg(long, env = "POD_ANALYZER_PRIVATE_KEY", conflicts_with = "password")]
    pub private_key: Option<PathBuf>,

    /// SSH password
    #[arg(long, env = "POD_ANALYZER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Where the binary is placed on each remote host
    #[arg(long, env = "POD_ANALYZER_REMOTE_BIN", default_value = "/tmp/agent")]
    pub remote_bin: String,

    /// Per-host timeout in seconds (overrides settings)
    #[arg(long, env = "POD_ANALYZER_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Settings file (toml, yaml or json)
    #[arg(long, env = "POD_ANALYZER_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long, env = "POD_ANALYZER_LOG_JSON")]
    pub log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries reports only
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let settings = config::Settings::load(cli.settings.as_deref())?;
    StructuredLogger::new("pod-analyzer").log_startup(VERSION, cli.mode.as_str());

    match cli.mode {
        Mode::Collect => commands::collect::run(&cli, &settings).await,
        Mode::Dispatch => commands::dispatch::run(&cli, &settings).await,
    }
}
