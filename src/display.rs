//! Plain-terminal output for the one-shot CLI commands

use owo_colors::OwoColorize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Rows},
};

use crate::formatting::{format_percent, layout, thresholds};
use crate::models::{HostInfo, JobColumn, JobRecord, PartitionRecord, Snapshot};
use crate::sort::SortDirection;

#[derive(Tabled)]
struct PartitionRow {
    #[tabled(rename = "Partition")]
    name: String,

    #[tabled(rename = "Load")]
    load: String,

    #[tabled(rename = "Alloc")]
    allocated: String,

    #[tabled(rename = "Idle")]
    idle: String,

    #[tabled(rename = "Other")]
    other: String,

    #[tabled(rename = "Total")]
    total: u64,
}

/// Colored load bar: `|` allocated (red), `|` idle (green), `.` other (yellow),
/// followed by the usage ratio
pub fn create_load_bar(partition: &PartitionRecord, width: usize) -> String {
    let bar = partition.load_bar(width);
    format!(
        "[{}{}{}{}]",
        "|".repeat(bar.allocated).red(),
        "|".repeat(bar.idle).green(),
        ".".repeat(bar.other).yellow(),
        format_usage(partition.usage_ratio)
    )
}

/// Usage ratio colored by how busy the partition is
fn format_usage(ratio: f64) -> String {
    let text = format_percent(ratio);
    if ratio > 100.0 {
        text.bright_red().bold().to_string()
    } else if ratio >= thresholds::UTILIZATION_HIGH {
        text.red().to_string()
    } else if ratio >= thresholds::UTILIZATION_LOW {
        text.yellow().to_string()
    } else {
        text.green().to_string()
    }
}

pub fn format_partitions(snapshot: &Snapshot<PartitionRecord>) -> String {
    if snapshot.is_empty() {
        return "No partitions found".yellow().to_string();
    }

    let rows: Vec<PartitionRow> = snapshot
        .records
        .iter()
        .map(|p| PartitionRow {
            name: p.name.cyan().to_string(),
            load: create_load_bar(p, layout::LOAD_BAR_WIDTH),
            allocated: p.allocated.red().to_string(),
            idle: p.idle.green().to_string(),
            other: p.other.yellow().to_string(),
            total: p.total,
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::blank())
        .with(Modify::new(Rows::first()).with(Alignment::left()));

    let mut output = table.to_string();
    output.push_str(&format_warnings(&snapshot.warnings));
    output
}

/// Job table with the sorted column's header marked
pub fn format_jobs(jobs: &[JobRecord], sorted_by: Option<(JobColumn, SortDirection)>) -> String {
    if jobs.is_empty() {
        return "No jobs found".yellow().to_string();
    }

    let mut builder = tabled::builder::Builder::default();
    builder.push_record(JobColumn::ALL.map(|column| match sorted_by {
        Some((sorted, direction)) if sorted == column => {
            format!("{} {}", column.header(), direction.arrow())
        }
        _ => column.header().to_string(),
    }));

    for job in jobs {
        let mut row = job.fields().map(str::to_string);
        row[JobColumn::State.index()] = format_state_code(&job.state);
        builder.push_record(row);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

/// State code colored by category
fn format_state_code(code: &str) -> String {
    match code {
        "R" => code.green().to_string(),
        "P" => code.yellow().to_string(),
        "F" | "T" | "N" | "B" | "O" | "D" => code.red().to_string(),
        "C" => code.bright_blue().to_string(),
        "S" => code.cyan().to_string(),
        _ => code.white().to_string(),
    }
}

pub fn format_info(info: &HostInfo) -> String {
    let mut line = format!("{}@{}", info.user, info.host.bold());
    if !info.system.is_empty() {
        line.push(' ');
        line.push_str(&info.system);
    }
    line.push_str(" / Slurm ");
    match &info.slurm_version {
        Some(version) => line.push_str(version),
        None => line.push_str(&"?".yellow().to_string()),
    }
    line
}

/// Trailing block listing skipped records
pub fn format_warnings(warnings: &[String]) -> String {
    if warnings.is_empty() {
        return String::new();
    }
    let mut output = format!("\n{}\n", "Skipped:".yellow().bold());
    for warning in warnings {
        output.push_str(&format!("  {}\n", warning.yellow()));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodeCounts;

    /// Strip ANSI escape codes from a string
    fn strip_ansi(s: &str) -> String {
        let mut result = String::new();
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                for c in chars.by_ref() {
                    if c.is_ascii_alphabetic() {
                        break;
                    }
                }
            } else {
                result.push(c);
            }
        }
        result
    }

    fn partition(name: &str, allocated: u64, idle: u64, other: u64) -> PartitionRecord {
        let counts = NodeCounts {
            allocated,
            idle,
            other,
            total: allocated + idle + other,
        };
        PartitionRecord::new(name, counts).unwrap()
    }

    #[test]
    fn test_load_bar_layout() {
        let bar = strip_ansi(&create_load_bar(&partition("cpu", 40, 10, 0), 25));
        assert_eq!(bar, format!("[{}{} 80.0%]", "|".repeat(20), "|".repeat(5)));

        let bar = strip_ansi(&create_load_bar(&partition("mix", 1, 1, 1), 25));
        assert_eq!(bar, format!("[{}{}{}66.67%]", "|".repeat(8), "|".repeat(8), ".".repeat(9)));
    }

    #[test]
    fn test_format_partitions() {
        let snapshot = Snapshot::new(
            vec![partition("cpu_p1", 40, 10, 0), partition("gpu", 0, 4, 0)],
            vec!["partition 'empty' reports zero total nodes, skipped".to_string()],
        );
        let output = strip_ansi(&format_partitions(&snapshot));
        assert!(output.contains("Partition"));
        assert!(output.contains("cpu_p1"));
        assert!(output.contains(" 80.0%"));
        assert!(output.contains("0.0%"));
        assert!(output.contains("Skipped:"));
        assert!(output.contains("'empty'"));
    }

    #[test]
    fn test_format_jobs_marks_sorted_column() {
        let jobs = vec![JobRecord {
            job_id: "42".to_string(),
            state: "R".to_string(),
            elapsed: "1:01:01".to_string(),
            ..Default::default()
        }];
        let output = strip_ansi(&format_jobs(
            &jobs,
            Some((JobColumn::Elapsed, SortDirection::Descending)),
        ));
        assert!(output.contains("TIME ▼"));
        assert!(output.contains("JOBID"));
        assert!(!output.contains("JOBID ▲"));
        assert!(output.contains("1:01:01"));
    }

    #[test]
    fn test_empty_outputs() {
        assert!(strip_ansi(&format_jobs(&[], None)).contains("No jobs found"));
        let empty: Snapshot<PartitionRecord> = Snapshot::empty();
        assert!(strip_ansi(&format_partitions(&empty)).contains("No partitions found"));
    }

    #[test]
    fn test_format_info() {
        let info = HostInfo {
            user: "alice".to_string(),
            host: "login1".to_string(),
            system: "Rocky Linux 9.3".to_string(),
            slurm_version: None,
        };
        assert_eq!(strip_ansi(&format_info(&info)), info.summary());
    }
}
