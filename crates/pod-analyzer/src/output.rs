//! Terminal output utilities
//!
//! Status messages go to stderr; stdout is reserved for reports.

use analyzer_lib::dispatch::{DispatchRun, HostResult, HostStatus};
use analyzer_lib::report::SummaryFormat;
use clap::ValueEnum;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

/// Summary format selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format
    Table,
    /// Comma separated values
    Csv,
    /// JSON format
    Json,
}

impl From<OutputFormat> for SummaryFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Table => SummaryFormat::Table,
            OutputFormat::Csv => SummaryFormat::Csv,
            OutputFormat::Json => SummaryFormat::Json,
        }
    }
}

/// One line of the dispatch status table
#[derive(Tabled)]
pub struct HostRow {
    #[tabled(rename = "Host")]
    pub host: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Output")]
    pub output: String,
    #[tabled(rename = "Elapsed")]
    pub elapsed: String,
    #[tabled(rename = "Error")]
    pub error: String,
}

impl From<&HostResult> for HostRow {
    fn from(result: &HostResult) -> Self {
        let output = if result.partial {
            format!("{}B (partial)", result.output.len())
        } else {
            format!("{}B", result.output.len())
        };
        Self {
            host: result.host.clone(),
            status: color_status(result.status),
            output,
            elapsed: format_elapsed(result.elapsed_ms),
            error: result.error.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Print the per-host outcome of a dispatch run
pub fn print_host_table(run: &DispatchRun) {
    if run.results.is_empty() {
        print_warning("Host list is empty");
        return;
    }
    let rows: Vec<HostRow> = run.results.iter().map(HostRow::from).collect();
    eprintln!("{}", Table::new(rows).with(Style::rounded()));
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Format milliseconds as seconds
pub fn format_elapsed(ms: u64) -> String {
    if ms >= 1000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{}ms", ms)
    }
}

/// Color a host status
pub fn color_status(status: HostStatus) -> String {
    let label = status.to_string();
    match status {
        HostStatus::Succeeded => label.green().to_string(),
        HostStatus::Timeout => label.yellow().to_string(),
        HostStatus::ConnectFailed | HostStatus::CopyFailed | HostStatus::ExecFailed => {
            label.red().to_string()
        }
    }
}
