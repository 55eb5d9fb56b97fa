//! In-memory `SlurmSource` for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::SampleError;
use crate::slurm::SlurmSource;

type Canned = Mutex<Result<String, SampleError>>;

pub struct FakeSource {
    partitions: Canned,
    jobs: Canned,
    version: Canned,
    delay: Mutex<Duration>,
    partition_calls: AtomicUsize,
    job_calls: AtomicUsize,
    version_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            partitions: Mutex::new(Ok(String::new())),
            jobs: Mutex::new(Ok(r#"{"jobs": []}"#.to_string())),
            version: Mutex::new(Ok("slurm 24.11.0\n".to_string())),
            delay: Mutex::new(Duration::ZERO),
            partition_calls: AtomicUsize::new(0),
            job_calls: AtomicUsize::new(0),
            version_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_partitions(self, output: &str) -> Self {
        self.set_partitions(output);
        self
    }

    pub fn with_jobs(self, output: &str) -> Self {
        self.set_jobs(output);
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = delay;
        self
    }

    pub fn set_partitions(&self, output: &str) {
        *self.partitions.lock().unwrap() = Ok(output.to_string());
    }

    pub fn set_jobs(&self, output: &str) {
        *self.jobs.lock().unwrap() = Ok(output.to_string());
    }

    pub fn fail_partitions(&self, err: SampleError) {
        *self.partitions.lock().unwrap() = Err(err);
    }

    pub fn fail_jobs(&self, err: SampleError) {
        *self.jobs.lock().unwrap() = Err(err);
    }

    pub fn fail_version(&self, err: SampleError) {
        *self.version.lock().unwrap() = Err(err);
    }

    pub fn job_calls(&self) -> usize {
        self.job_calls.load(Ordering::SeqCst)
    }

    pub fn partition_calls(&self) -> usize {
        self.partition_calls.load(Ordering::SeqCst)
    }

    pub fn version_calls(&self) -> usize {
        self.version_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl SlurmSource for FakeSource {
    async fn partition_summary(&self) -> Result<String, SampleError> {
        self.partition_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.partitions.lock().unwrap().clone()
    }

    async fn job_queue(&self) -> Result<String, SampleError> {
        self.job_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.jobs.lock().unwrap().clone()
    }

    async fn version(&self) -> Result<String, SampleError> {
        self.version_calls.fetch_add(1, Ordering::SeqCst);
        self.version.lock().unwrap().clone()
    }
}
