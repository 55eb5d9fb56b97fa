//! Data models: raw Slurm payloads, the normalized records built from them,
//! and configuration.

mod config;
mod job;
mod partition;
mod slurm_responses;
mod time;

use chrono::{DateTime, Local};

pub use config::{Config, ConfigError, DisplayConfig, RefreshConfig, SystemConfig};
pub use job::{ColumnKind, JobColumn, JobRecord};
pub use partition::{LoadBar, NodeCounts, PartitionRecord};
pub use slurm_responses::{JobStateField, SqueueJob, SqueueResponse};
pub use time::NumberValue;

/// Immutable result of one successful poll.
///
/// Records keep the order the provider reported them in. Published snapshots
/// are shared behind `Arc` and never modified; sorting produces a new `Vec`.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub records: Vec<T>,
    pub taken_at: DateTime<Local>,
    /// Per-record problems that did not fail the poll
    pub warnings: Vec<String>,
}

impl<T> Snapshot<T> {
    #[must_use]
    pub fn new(records: Vec<T>, warnings: Vec<String>) -> Self {
        Self {
            records,
            taken_at: Local::now(),
            warnings,
        }
    }

    /// Placeholder published before the first poll completes
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Contents of the info line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostInfo {
    pub user: String,
    pub host: String,
    /// OS name and version from /etc/os-release
    pub system: String,
    /// Scheduler version, `None` when the version provider failed
    pub slurm_version: Option<String>,
}

impl HostInfo {
    /// `user@host OS VERSION / Slurm X.Y.Z`
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("{}@{}", self.user, self.host)];
        if !self.system.is_empty() {
            parts.push(self.system.clone());
        }
        parts.push(format!(
            "/ Slurm {}",
            self.slurm_version.as_deref().unwrap_or("?")
        ));
        parts.join(" ")
    }
}
