//! Interface to the Slurm command-line providers
//!
//! The samplers only see the [`SlurmSource`] trait: "give me the raw output
//! of the partition summary / job queue / version command, or tell me why
//! not". [`SlurmInterface`] implements it by running `sinfo` and `squeue`;
//! tests substitute canned output.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;

use crate::error::SampleError;

/// Default upper bound on a single provider invocation
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw data providers consumed by the samplers.
///
/// Implementations must be cheap to share: the refresh coordinator holds one
/// behind an `Arc` and calls it from several tasks at once.
pub trait SlurmSource: Send + Sync + 'static {
    /// Output of the compact, header-less partition summary (`sinfo -s -h`)
    fn partition_summary(&self) -> impl Future<Output = Result<String, SampleError>> + Send;

    /// JSON output of the job queue (`squeue --json`)
    fn job_queue(&self) -> impl Future<Output = Result<String, SampleError>> + Send;

    /// Scheduler version banner (`sinfo --version`)
    fn version(&self) -> impl Future<Output = Result<String, SampleError>> + Send;
}

/// Directory the provider binaries are run from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinDir {
    /// `slurm_bin_path` from config or `SLURMTOP_SLURM_PATH`
    Configured(PathBuf),
    /// Parent directory of the first `sinfo` on `PATH`
    OnPath(PathBuf),
    /// `/usr/bin`. `sinfo_present` is false when nothing else worked and
    /// there is no `sinfo` there either.
    Default { sinfo_present: bool },
}

impl BinDir {
    const DEFAULT_DIR: &'static str = "/usr/bin";

    /// Locate the binaries: a configured directory wins, then `PATH`, then
    /// `/usr/bin`.
    pub fn locate(configured: Option<&Path>) -> Self {
        match configured {
            Some(dir) if dir.is_dir() => return BinDir::Configured(dir.to_path_buf()),
            Some(dir) => tracing::warn!(
                path = %dir.display(),
                "configured slurm_bin_path is not a directory, searching PATH"
            ),
            None => {}
        }

        if let Some(dir) = which::which("sinfo")
            .ok()
            .and_then(|sinfo| sinfo.parent().map(Path::to_path_buf))
        {
            return BinDir::OnPath(dir);
        }

        let sinfo_present = Path::new(Self::DEFAULT_DIR).join("sinfo").exists();
        if !sinfo_present {
            tracing::warn!(
                "no sinfo on PATH or in {}; every poll will fail",
                Self::DEFAULT_DIR
            );
        }
        BinDir::Default { sinfo_present }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            BinDir::Configured(dir) | BinDir::OnPath(dir) => dir,
            BinDir::Default { .. } => Path::new(Self::DEFAULT_DIR),
        }
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        matches!(self, BinDir::Default { .. })
    }
}

static VERSION_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s-])(\d+)\.(\d+)(?:\.(\d+))?")
        .expect("version pattern is a valid regex")
});

/// Scheduler release, e.g. `24.11.0`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SlurmVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SlurmVersion {
    /// First release shipping `squeue --json`
    pub const MIN_JSON_VERSION: SlurmVersion = SlurmVersion {
        major: 21,
        minor: 8,
        patch: 0,
    };

    #[must_use]
    pub fn supports_json(&self) -> bool {
        *self >= Self::MIN_JSON_VERSION
    }
}

impl std::fmt::Display for SlurmVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}.{}", self.major, self.minor, self.patch)
    }
}

impl std::str::FromStr for SlurmVersion {
    type Err = String;

    /// Accepts `slurm 24.11.0`, `slurm-24.05.1` or a bare `24.11.0`. A
    /// missing patch level reads as 0.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid Slurm version string: '{}'", s.trim());
        let caps = VERSION_NUMBER.captures(s.trim()).ok_or_else(invalid)?;
        let number = |i: usize| caps.get(i).map(|m| m.as_str().parse::<u32>());

        Ok(SlurmVersion {
            major: number(1).ok_or_else(invalid)?.map_err(|_| invalid())?,
            minor: number(2).ok_or_else(invalid)?.map_err(|_| invalid())?,
            patch: number(3).and_then(Result::ok).unwrap_or(0),
        })
    }
}

/// Runs the real `sinfo`/`squeue` binaries
#[derive(Debug, Clone)]
pub struct SlurmInterface {
    bin_dir: BinDir,
    timeout: Duration,
}

impl Default for SlurmInterface {
    fn default() -> Self {
        Self::with_config(None)
    }
}

impl SlurmInterface {
    /// Use `bin_dir` if it is a directory, otherwise search for the binaries
    pub fn with_config(bin_dir: Option<&Path>) -> Self {
        let bin_dir = BinDir::locate(bin_dir);
        tracing::debug!(bin_dir = ?bin_dir, "resolved Slurm binary directory");
        Self {
            bin_dir,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Override the per-invocation timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn bin_dir(&self) -> &BinDir {
        &self.bin_dir
    }

    /// Run a provider and return its stdout.
    ///
    /// Any failure to obtain output (missing binary, permissions, non-zero
    /// exit, timeout) is `SourceUnavailable`. The child is killed if this
    /// future is dropped.
    async fn run(&self, program: &str, args: &[&str]) -> Result<String, SampleError> {
        let path = self.bin_dir.path().join(program);
        let command_line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");

        let mut cmd = Command::new(&path);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => {
                return Err(SampleError::unavailable(
                    &command_line,
                    format!("timed out after {}s", self.timeout.as_secs()),
                ));
            }
            Ok(Err(e)) => {
                let reason = match e.kind() {
                    std::io::ErrorKind::NotFound => {
                        format!("binary not found at '{}'", path.display())
                    }
                    std::io::ErrorKind::PermissionDenied => {
                        format!("permission denied executing '{}'", path.display())
                    }
                    _ => format!("failed to execute: {e}"),
                };
                return Err(SampleError::unavailable(&command_line, reason));
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SampleError::unavailable(
                &command_line,
                format!(
                    "exit code {}: {}",
                    output
                        .status
                        .code()
                        .map_or("unknown".to_string(), |c| c.to_string()),
                    stderr.trim()
                ),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl SlurmSource for SlurmInterface {
    async fn partition_summary(&self) -> Result<String, SampleError> {
        self.run("sinfo", &["-s", "-h"]).await
    }

    async fn job_queue(&self) -> Result<String, SampleError> {
        self.run("squeue", &["--json"]).await
    }

    async fn version(&self) -> Result<String, SampleError> {
        self.run("sinfo", &["--version"]).await
    }
}
