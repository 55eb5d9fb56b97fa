//! Samplers turn raw provider output into typed, validated records.
//!
//! Each sampler owns one provider call and one normalization pass. They hold
//! no state between polls; the refresh coordinator decides when to run them
//! and what to do with failures.

mod info;
mod jobs;
mod partitions;

use std::future::Future;

pub use info::{InfoSampler, os_release_name};
pub use jobs::{JobSample, JobSampler, parse_job_queue};
pub use partitions::{PartitionSample, PartitionSampler, parse_partition_summary};

use crate::error::{ParseWarning, SampleError};
use crate::models::Snapshot;

/// Records of one successful sampling pass plus the per-record problems
/// that were skipped along the way
#[derive(Debug, Clone, PartialEq)]
pub struct Sample<T> {
    pub records: Vec<T>,
    pub warnings: Vec<ParseWarning>,
}

impl<T> Sample<T> {
    /// Stamp the sample with the current time for publication
    #[must_use]
    pub fn into_snapshot(self) -> Snapshot<T> {
        let warnings = self.warnings.iter().map(ToString::to_string).collect();
        Snapshot::new(self.records, warnings)
    }
}

/// A sampler the refresh coordinator can drive
pub trait Sampler: Send + Sync + 'static {
    /// Value published after a successful poll
    type Output: Send + Sync + 'static;

    /// Name used in logs and health reports
    const NAME: &'static str;

    fn poll(&self) -> impl Future<Output = Result<Self::Output, SampleError>> + Send;
}
