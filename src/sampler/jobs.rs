//! Job queue from `squeue --json`.

use std::sync::Arc;

use super::{Sample, Sampler};
use crate::error::SampleError;
use crate::models::{JobRecord, Snapshot, SqueueResponse};
use crate::slurm::SlurmSource;

const COMMAND: &str = "squeue --json";

pub type JobSample = Sample<JobRecord>;

pub struct JobSampler<S> {
    source: Arc<S>,
    /// 0 = unlimited
    max_jobs: usize,
}

impl<S: SlurmSource> JobSampler<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            max_jobs: 0,
        }
    }

    /// Keep at most `max` jobs per sample (0 = unlimited)
    #[must_use]
    pub fn with_limit(mut self, max: usize) -> Self {
        self.max_jobs = max;
        self
    }

    /// Sample the queue, deriving elapsed times against the current clock.
    ///
    /// # Errors
    /// `SourceUnavailable` if `squeue` fails, `MalformedPayload` if its JSON
    /// does not describe a job list.
    pub async fn sample(&self) -> Result<JobSample, SampleError> {
        self.sample_at(chrono::Utc::now().timestamp()).await
    }

    /// Like [`sample`](Self::sample) with an explicit reference time (Unix seconds)
    pub async fn sample_at(&self, now_epoch: i64) -> Result<JobSample, SampleError> {
        let output = self.source.job_queue().await?;
        let mut sample = parse_job_queue(&output, now_epoch)?;

        if self.max_jobs > 0 && sample.records.len() > self.max_jobs {
            tracing::debug!(
                kept = self.max_jobs,
                dropped = sample.records.len() - self.max_jobs,
                "job list capped"
            );
            sample.records.truncate(self.max_jobs);
        }

        Ok(sample)
    }
}

impl<S: SlurmSource> Sampler for JobSampler<S> {
    type Output = Snapshot<JobRecord>;
    const NAME: &'static str = "jobs";

    async fn poll(&self) -> Result<Self::Output, SampleError> {
        self.sample().await.map(Sample::into_snapshot)
    }
}

/// Decode a `squeue --json` payload into job records, in payload order.
pub fn parse_job_queue(output: &str, now_epoch: i64) -> Result<JobSample, SampleError> {
    let response: SqueueResponse = serde_json::from_str(output)
        .map_err(|e| SampleError::malformed(COMMAND, e.to_string()))?;

    let errors = response.error_messages();
    if !errors.is_empty() {
        return Err(SampleError::malformed(
            COMMAND,
            format!("squeue reported errors: {}", errors.join("; ")),
        ));
    }

    let records = response
        .jobs
        .iter()
        .map(|job| JobRecord::from_squeue(job, now_epoch))
        .collect();

    Ok(Sample {
        records,
        warnings: Vec::new(),
    })
}
