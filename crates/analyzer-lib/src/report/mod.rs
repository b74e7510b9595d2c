//! Rendering of cluster reports
//!
//! Two independent renderings of the same [`ClusterReport`](crate::models::ClusterReport):
//! a summary (table, CSV or JSON) and the per-container detail document.
//! Each writes to its own [`OutputDestination`], so a failure in one does
//! not affect the other.

mod detail;
mod output;
mod summary;

pub use detail::{lookup_detail, parse_detail, render_detail, write_detail, DEFAULT_DETAIL_FILE};
pub use output::OutputDestination;
pub use summary::{
    format_ratio, render_summary, write_csv, write_summary, write_table, SummaryRow,
    SUMMARY_HEADERS,
};

/// Summary rendering style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryFormat {
    /// Human readable table
    Table,
    /// Comma separated values with a header row
    Csv,
    /// The whole report as JSON
    Json,
}

impl SummaryFormat {
    /// Table for a terminal, CSV for a file
    pub fn for_destination(destination: &OutputDestination) -> Self {
        match destination {
            OutputDestination::Stdout => SummaryFormat::Table,
            OutputDestination::File(_) => SummaryFormat::Csv,
        }
    }
}
