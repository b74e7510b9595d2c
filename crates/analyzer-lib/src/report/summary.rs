//! Summary rendering: totals, target share and per-image usage

use super::{OutputDestination, SummaryFormat};
use crate::error::ReportResult;
use crate::models::{ClusterReport, ContainerResourceUsage};
use serde::Serialize;
use std::io::Write;
use tabled::{settings::Style, Table, Tabled};

/// Column headers, in order
pub const SUMMARY_HEADERS: [&str; 6] = [
    "#",
    "Name",
    "Memory Limits",
    "CPU Limits",
    "Memory Requests",
    "CPU Requests",
];

/// One summary line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct SummaryRow {
    #[tabled(rename = "#")]
    pub index: usize,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Memory Limits")]
    pub memory_limits: String,
    #[tabled(rename = "CPU Limits")]
    pub cpu_limits: String,
    #[tabled(rename = "Memory Requests")]
    pub memory_requests: String,
    #[tabled(rename = "CPU Requests")]
    pub cpu_requests: String,
}

impl SummaryRow {
    fn from_usage(index: usize, name: &str, usage: &ContainerResourceUsage) -> Self {
        Self {
            index,
            name: name.to_string(),
            memory_limits: usage.limits.memory.to_string(),
            cpu_limits: usage.limits.cpu.to_string(),
            memory_requests: usage.requests.memory.to_string(),
            cpu_requests: usage.requests.cpu.to_string(),
        }
    }

    fn fields(&self) -> [String; 6] {
        [
            self.index.to_string(),
            self.name.clone(),
            self.memory_limits.clone(),
            self.cpu_limits.clone(),
            self.memory_requests.clone(),
            self.cpu_requests.clone(),
        ]
    }
}

/// Format a ratio; a missing ratio (zero denominator) renders as `n/a`
pub fn format_ratio(ratio: Option<f64>) -> String {
    match ratio {
        Some(value) => format!("{:.4}", value),
        None => "n/a".to_string(),
    }
}

/// Rows: grand totals, target totals, ratios, then one row per image
/// sorted by image name
pub fn render_summary(report: &ClusterReport) -> Vec<SummaryRow> {
    let ratios = report.ratios();
    let mut rows = vec![
        SummaryRow::from_usage(1, "Total", &report.grand_totals),
        SummaryRow::from_usage(2, "Target", &report.target_totals),
        SummaryRow {
            index: 3,
            name: "Ratio".to_string(),
            memory_limits: format_ratio(ratios.memory_limits),
            cpu_limits: format_ratio(ratios.cpu_limits),
            memory_requests: format_ratio(ratios.memory_requests),
            cpu_requests: format_ratio(ratios.cpu_requests),
        },
    ];

    // BTreeMap iteration is already ordered by image
    rows.extend(
        report
            .total_by_image
            .iter()
            .enumerate()
            .map(|(i, (image, usage))| SummaryRow::from_usage(i + 4, image, usage)),
    );

    rows
}

/// Write rows as a table followed by the container counts
pub fn write_table(
    rows: &[SummaryRow],
    report: &ClusterReport,
    out: &mut dyn Write,
) -> ReportResult<()> {
    let table = Table::new(rows).with(Style::rounded()).to_string();
    writeln!(out, "{}", table)?;
    writeln!(
        out,
        "Target containers: {} of {} (pattern '{}')",
        report.target_count, report.total_count, report.pattern
    )?;
    Ok(())
}

/// Write rows as CSV with a header line
pub fn write_csv(rows: &[SummaryRow], out: &mut dyn Write) -> ReportResult<()> {
    writeln!(out, "{}", csv_line(SUMMARY_HEADERS.iter().copied()))?;
    for row in rows {
        let fields = row.fields();
        writeln!(out, "{}", csv_line(fields.iter().map(String::as_str)))?;
    }
    Ok(())
}

/// Render the summary of `report` to `destination`
pub fn write_summary(
    report: &ClusterReport,
    format: SummaryFormat,
    destination: &OutputDestination,
) -> ReportResult<()> {
    let mut out = destination.open()?;

    match format {
        SummaryFormat::Table => write_table(&render_summary(report), report, &mut out)?,
        SummaryFormat::Csv => write_csv(&render_summary(report), &mut out)?,
        SummaryFormat::Json => {
            serde_json::to_writer_pretty(&mut out, report)?;
            writeln!(out)?;
        }
    }

    out.flush()?;
    Ok(())
}

fn csv_line<'a>(fields: impl Iterator<Item = &'a str>) -> String {
    fields.map(csv_field).collect::<Vec<_>>().join(",")
}

fn csv_field(field: &str) -> String {
    if field.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::ReportBuilder;
    use crate::models::{ContainerResources, ContainerSpec};
    use tempfile::TempDir;

    fn container(image: &str, cpu: &str, memory: &str) -> ContainerSpec {
        let mut resources = ContainerResources::default();
        resources.limits.insert("cpu".to_string(), cpu.to_string());
        resources
            .limits
            .insert("memory".to_string(), memory.to_string());
        ContainerSpec {
            name: "c".to_string(),
            image: image.to_string(),
            resources,
        }
    }

    fn sample_report() -> ClusterReport {
        let mut builder = ReportBuilder::new("imageB");
        builder
            .record("ns1", "pod1", &container("imageB", "200m", "128Mi"))
            .unwrap();
        builder
            .record("ns1", "pod1", &container("imageA", "500m", "256Mi"))
            .unwrap();
        builder.finish()
    }

    #[test]
    fn test_render_summary_rows() {
        let rows = render_summary(&sample_report());
        assert_eq!(rows.len(), 5);

        assert_eq!(rows[0].name, "Total");
        assert_eq!(rows[0].cpu_limits, "700m");
        assert_eq!(rows[0].memory_limits, "384Mi");
        assert_eq!(rows[1].name, "Target");
        assert_eq!(rows[1].cpu_limits, "200m");

        assert_eq!(rows[2].name, "Ratio");
        assert_eq!(rows[2].cpu_limits, "0.2857");
        assert_eq!(rows[2].memory_limits, "0.3333");
        // No requests declared anywhere
        assert_eq!(rows[2].cpu_requests, "n/a");

        // Images sorted by name
        assert_eq!(rows[3].index, 4);
        assert_eq!(rows[3].name, "imageA");
        assert_eq!(rows[4].name, "imageB");
    }

    fn requesting(image: &str, cpu: &str, memory: &str) -> ContainerSpec {
        let mut spec = container(image, "1", "1Gi");
        spec.resources.requests.insert("cpu".to_string(), cpu.to_string());
        spec.resources
            .requests
            .insert("memory".to_string(), memory.to_string());
        spec
    }

    #[test]
    fn test_request_ratios_use_matching_totals() {
        let mut builder = ReportBuilder::new("imageB");
        builder
            .record("ns1", "pod1", &requesting("imageB", "100m", "64Mi"))
            .unwrap();
        builder
            .record("ns1", "pod2", &requesting("imageA", "900m", "192Mi"))
            .unwrap();
        let rows = render_summary(&builder.finish());

        assert_eq!(rows[0].memory_requests, "256Mi");
        assert_eq!(rows[0].cpu_requests, "1");
        // memory over memory, cpu over cpu
        assert_eq!(rows[2].memory_requests, "0.2500");
        assert_eq!(rows[2].cpu_requests, "0.1000");
    }

    #[test]
    fn test_zero_ratio_differs_from_no_data() {
        assert_eq!(format_ratio(Some(0.0)), "0.0000");
        assert_eq!(format_ratio(None), "n/a");
        assert_ne!(format_ratio(Some(0.0)), format_ratio(None));
    }

    #[test]
    fn test_csv_output() {
        let rows = render_summary(&sample_report());
        let mut out = Vec::new();
        write_csv(&rows, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "#,Name,Memory Limits,CPU Limits,Memory Requests,CPU Requests"
        );
        assert_eq!(lines[1], "1,Total,384Mi,700m,0,0");
        assert_eq!(lines[3], "3,Ratio,0.3333,0.2857,n/a,n/a");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_csv_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_table_output() {
        let report = sample_report();
        let mut out = Vec::new();
        write_table(&render_summary(&report), &report, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Memory Limits"));
        assert!(text.contains("imageA"));
        assert!(text.contains("Target containers: 1 of 2"));
    }

    #[test]
    fn test_write_summary_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.csv");
        let destination = OutputDestination::File(path.clone());
        let report = sample_report();

        write_summary(&report, SummaryFormat::for_destination(&destination), &destination)
            .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("#,Name,"));

        write_summary(&report, SummaryFormat::Json, &destination).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["target_count"], 1);
        assert_eq!(json["grand_totals"]["limits"]["cpu"], "700m");
        assert!(json.get("detail").is_none());
    }
}
