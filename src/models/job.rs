//! Job records and the fixed job-table column set.

use std::fmt;
use std::str::FromStr;

use super::slurm_responses::SqueueJob;
use crate::duration::elapsed_since;
use crate::formatting::truncate_field;

/// How values in a column are compared when sorting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Verbose elapsed time ("1 day, 2:03:04")
    Duration,
    /// Decimal integer
    Integer,
    /// Case-sensitive text
    Text,
}

/// Job table columns, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobColumn {
    JobId,
    Partition,
    Name,
    User,
    State,
    Elapsed,
    NodeCount,
    NodeList,
    Priority,
}

impl JobColumn {
    pub const ALL: [JobColumn; 9] = [
        JobColumn::JobId,
        JobColumn::Partition,
        JobColumn::Name,
        JobColumn::User,
        JobColumn::State,
        JobColumn::Elapsed,
        JobColumn::NodeCount,
        JobColumn::NodeList,
        JobColumn::Priority,
    ];

    /// Stable identifier, also accepted by [`FromStr`]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::JobId => "job_id",
            Self::Partition => "partition",
            Self::Name => "name",
            Self::User => "user_name",
            Self::State => "job_state",
            Self::Elapsed => "time_elapse",
            Self::NodeCount => "node_number",
            Self::NodeList => "nodes",
            Self::Priority => "priority_number",
        }
    }

    /// Table header label
    #[must_use]
    pub const fn header(self) -> &'static str {
        match self {
            Self::JobId => "JOBID",
            Self::Partition => "PARTITION",
            Self::Name => "NAME",
            Self::User => "USER",
            Self::State => "S",
            Self::Elapsed => "TIME",
            Self::NodeCount => "NODES",
            Self::NodeList => "NODELIST",
            Self::Priority => "PRIORITY",
        }
    }

    /// Comparator class, fixed per column
    #[must_use]
    pub const fn kind(self) -> ColumnKind {
        match self {
            Self::Elapsed => ColumnKind::Duration,
            Self::JobId | Self::NodeCount | Self::Priority => ColumnKind::Integer,
            _ => ColumnKind::Text,
        }
    }

    /// Column at a zero-based display position
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for JobColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobColumn {
    type Err = String;

    /// Accepts the identifier (`time_elapse`) or header label (`TIME`),
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted) || c.header().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| s.to_string())
    }
}

/// One job as shown in the job table.
///
/// Every field is a display string of at most 20 characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobRecord {
    pub job_id: String,
    pub partition: String,
    pub name: String,
    pub user: String,
    /// Single-character state code ("R", "P", ...)
    pub state: String,
    /// Verbose elapsed time, empty if the job has not started
    pub elapsed: String,
    pub node_count: String,
    pub node_list: String,
    pub priority: String,
}

impl JobRecord {
    /// Normalize one `squeue --json` entry, deriving elapsed time against `now_epoch`.
    #[must_use]
    pub fn from_squeue(job: &SqueueJob, now_epoch: i64) -> Self {
        JobRecord {
            job_id: truncate_field(&job.job_id.to_string()),
            partition: truncate_field(&job.partition),
            name: truncate_field(&job.name),
            user: truncate_field(&job.user_name),
            state: truncate_field(&job.job_state.code()),
            elapsed: truncate_field(&elapsed_since(job.start_time.number(), now_epoch)),
            node_count: truncate_field(&job.node_count.number().to_string()),
            node_list: truncate_field(&job.nodes),
            priority: truncate_field(&job.priority.number().to_string()),
        }
    }

    /// Value of a column
    #[must_use]
    pub fn field(&self, column: JobColumn) -> &str {
        match column {
            JobColumn::JobId => &self.job_id,
            JobColumn::Partition => &self.partition,
            JobColumn::Name => &self.name,
            JobColumn::User => &self.user,
            JobColumn::State => &self.state,
            JobColumn::Elapsed => &self.elapsed,
            JobColumn::NodeCount => &self.node_count,
            JobColumn::NodeList => &self.node_list,
            JobColumn::Priority => &self.priority,
        }
    }

    /// All fields in column order
    #[must_use]
    pub fn fields(&self) -> [&str; 9] {
        JobColumn::ALL.map(|c| self.field(c))
    }
}
