//! Partition utilization from `sinfo -s -h`.
//!
//! Each summary line looks like
//!
//! ```text
//! cpu_p1*      up 20-00:00:00     40/10/0/50 node[001-050]
//! ```
//!
//! Only the first field (name) and the fourth (node counts) are used.

use std::sync::Arc;

use super::{Sample, Sampler};
use crate::error::{ParseWarning, SampleError};
use crate::models::{NodeCounts, PartitionRecord, Snapshot};
use crate::slurm::SlurmSource;

const COMMAND: &str = "sinfo -s -h";

pub type PartitionSample = Sample<PartitionRecord>;

pub struct PartitionSampler<S> {
    source: Arc<S>,
    /// 0 = unlimited
    max_partitions: usize,
}

impl<S: SlurmSource> PartitionSampler<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            max_partitions: 0,
        }
    }

    /// Keep at most `max` partitions per sample (0 = unlimited)
    #[must_use]
    pub fn with_limit(mut self, max: usize) -> Self {
        self.max_partitions = max;
        self
    }

    /// Run the partition summary and parse it.
    ///
    /// # Errors
    /// `SourceUnavailable` if the provider fails, `MalformedPayload` if it
    /// printed lines but none of them could be parsed.
    pub async fn sample(&self) -> Result<PartitionSample, SampleError> {
        let output = self.source.partition_summary().await?;
        let mut sample = parse_partition_summary(&output)?;

        if self.max_partitions > 0 && sample.records.len() > self.max_partitions {
            tracing::debug!(
                kept = self.max_partitions,
                dropped = sample.records.len() - self.max_partitions,
                "partition list capped"
            );
            sample.records.truncate(self.max_partitions);
        }

        Ok(sample)
    }
}

impl<S: SlurmSource> Sampler for PartitionSampler<S> {
    type Output = Snapshot<PartitionRecord>;
    const NAME: &'static str = "partitions";

    async fn poll(&self) -> Result<Self::Output, SampleError> {
        self.sample().await.map(Sample::into_snapshot)
    }
}

/// Parse the full output of `sinfo -s -h`.
///
/// Bad lines are skipped and reported as warnings; the parse only fails when
/// there was something to parse and nothing survived.
pub fn parse_partition_summary(output: &str) -> Result<PartitionSample, SampleError> {
    let mut records = Vec::new();
    let mut warnings = Vec::new();
    let mut non_blank = 0usize;

    for (index, line) in output.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        non_blank += 1;

        match parse_partition_line(index + 1, line) {
            Ok(record) => records.push(record),
            Err(warning) => {
                tracing::warn!(%warning, "skipping partition line");
                warnings.push(warning);
            }
        }
    }

    if non_blank > 0 && records.is_empty() {
        let first = warnings
            .first()
            .map_or_else(String::new, |w| format!(": {w}"));
        return Err(SampleError::malformed(
            COMMAND,
            format!("none of {non_blank} line(s) could be parsed{first}"),
        ));
    }

    Ok(Sample { records, warnings })
}

/// Parse one summary line (1-based `line` number for reporting)
pub fn parse_partition_line(line: usize, text: &str) -> Result<PartitionRecord, ParseWarning> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(ParseWarning::MalformedLine {
            line,
            reason: format!("expected at least 4 fields, got {}", fields.len()),
        });
    }

    let counts: NodeCounts = fields[3]
        .parse()
        .map_err(|reason| ParseWarning::MalformedLine { line, reason })?;

    PartitionRecord::new(fields[0], counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSource;

    const SUMMARY: &str = "\
cpu_p1*      up 20-00:00:00     40/10/0/50 node[001-050]
gpu_p2       up  2-00:00:00       3/0/1/4 gpu[001-004]
";

    #[test]
    fn test_parse_summary() {
        let sample = parse_partition_summary(SUMMARY).unwrap();
        assert!(sample.warnings.is_empty());
        assert_eq!(sample.records.len(), 2);

        let cpu = &sample.records[0];
        assert_eq!(cpu.name, "cpu_p1*");
        assert_eq!((cpu.allocated, cpu.idle, cpu.other, cpu.total), (40, 10, 0, 50));
        assert_eq!(cpu.usage_ratio, 80.0);

        let gpu = &sample.records[1];
        assert_eq!(gpu.name, "gpu_p2");
        assert_eq!(gpu.usage_ratio, 100.0);
    }

    #[test]
    fn test_zero_total_skipped_with_warning() {
        let output = "empty up infinite 0/0/0/0 none\ncpu up infinite 1/1/0/2 n[1-2]\n";
        let sample = parse_partition_summary(output).unwrap();
        assert_eq!(sample.records.len(), 1);
        assert_eq!(sample.records[0].name, "cpu");
        assert_eq!(
            sample.warnings,
            vec![ParseWarning::DivisionByZero {
                partition: "empty".to_string()
            }]
        );
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let output = "\
short line
bad up infinite 1/2/three/6 n1
cpu up infinite 1/1/0/2 n[1-2]
";
        let sample = parse_partition_summary(output).unwrap();
        assert_eq!(sample.records.len(), 1);
        assert_eq!(sample.warnings.len(), 2);
        assert!(matches!(
            sample.warnings[0],
            ParseWarning::MalformedLine { line: 1, .. }
        ));
        assert!(matches!(
            sample.warnings[1],
            ParseWarning::MalformedLine { line: 2, .. }
        ));
    }

    #[test]
    fn test_count_field_is_never_evaluated() {
        let sample = parse_partition_summary("p up inf 1+1/0/0/2 n1\nq up inf 1/0/0/1 n2").unwrap();
        assert_eq!(sample.records.len(), 1);
        assert_eq!(sample.records[0].name, "q");
    }

    #[test]
    fn test_blank_output_is_empty_sample() {
        let sample = parse_partition_summary("\n   \n").unwrap();
        assert!(sample.records.is_empty());
        assert!(sample.warnings.is_empty());
    }

    #[test]
    fn test_all_lines_bad_is_malformed_payload() {
        let err = parse_partition_summary("sinfo: error: garbage\n").unwrap_err();
        assert!(matches!(err, SampleError::MalformedPayload { .. }));
    }

    #[tokio::test]
    async fn test_sample_with_limit() {
        let source = Arc::new(FakeSource::new().with_partitions(SUMMARY));
        let sampler = PartitionSampler::new(source).with_limit(1);
        let sample = sampler.sample().await.unwrap();
        assert_eq!(sample.records.len(), 1);
        assert_eq!(sample.records[0].name, "cpu_p1*");
    }

    #[tokio::test]
    async fn test_sample_source_unavailable() {
        let source = Arc::new(FakeSource::new());
        source.fail_partitions(SampleError::unavailable(COMMAND, "exit code 1"));
        let err = PartitionSampler::new(source).sample().await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
