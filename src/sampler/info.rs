//! Host and scheduler details for the info line.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::Sampler;
use crate::error::SampleError;
use crate::models::HostInfo;
use crate::slurm::{SlurmSource, SlurmVersion};

const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Re-query interval for a version banner that could not be read
const VERSION_RETRY: Duration = Duration::from_secs(60);

/// Host details never change while running, so they are collected once.
/// Only a failed version query is retried, and no more than every
/// [`VERSION_RETRY`].
pub struct InfoSampler<S> {
    source: Arc<S>,
    cached: Mutex<Option<CachedInfo>>,
}

struct CachedInfo {
    info: HostInfo,
    /// False while the version is still missing
    complete: bool,
    taken_at: Instant,
}

impl<S: SlurmSource> InfoSampler<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            cached: Mutex::new(None),
        }
    }

    /// Collect the info line. Never fails: a missing version shows as `?`.
    pub async fn sample(&self) -> HostInfo {
        if let Some(info) = self.reusable() {
            return info;
        }

        let slurm_version = match self.source.version().await {
            Ok(banner) => parse_version_banner(&banner),
            Err(e) => {
                tracing::debug!(error = %e, "Slurm version unavailable");
                None
            }
        };

        let info = HostInfo {
            user: current_user(),
            host: hostname(),
            system: std::fs::read_to_string(OS_RELEASE_PATH)
                .map(|content| os_release_name(&content))
                .unwrap_or_default(),
            slurm_version,
        };

        if let Ok(mut cached) = self.cached.lock() {
            *cached = Some(CachedInfo {
                complete: info.slurm_version.is_some(),
                info: info.clone(),
                taken_at: Instant::now(),
            });
        }
        info
    }

    fn reusable(&self) -> Option<HostInfo> {
        let cached = self.cached.lock().ok()?;
        cached
            .as_ref()
            .filter(|c| c.complete || c.taken_at.elapsed() < VERSION_RETRY)
            .map(|c| c.info.clone())
    }
}

impl<S: SlurmSource> Sampler for InfoSampler<S> {
    type Output = HostInfo;
    const NAME: &'static str = "info";

    async fn poll(&self) -> Result<Self::Output, SampleError> {
        Ok(self.sample().await)
    }
}

/// Version string from a `sinfo --version` banner, e.g. "slurm 24.11.0"
fn parse_version_banner(banner: &str) -> Option<String> {
    match banner.parse::<SlurmVersion>() {
        Ok(version) => {
            if !version.supports_json() {
                tracing::warn!(
                    %version,
                    minimum = %SlurmVersion::MIN_JSON_VERSION,
                    "squeue on this cluster has no --json output; job polls will fail"
                );
            }
            Some(version.to_string())
        }
        Err(e) => {
            tracing::debug!(error = %e, "unrecognized version banner");
            banner.split_whitespace().nth(1).map(str::to_string)
        }
    }
}

/// Current username from USER or LOGNAME
fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

fn hostname() -> String {
    ["/proc/sys/kernel/hostname", "/etc/hostname"]
        .iter()
        .find_map(|path| {
            std::fs::read_to_string(Path::new(path))
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .or_else(|| std::env::var("HOSTNAME").ok())
        .unwrap_or_else(|| "localhost".to_string())
}

/// `NAME VERSION_ID` from the contents of an os-release file
///
/// # Examples
///
/// ```
/// use slurmtop::sampler::os_release_name;
///
/// let content = "NAME=\"Rocky Linux\"\nVERSION_ID=\"9.3\"\nID=rocky\n";
/// assert_eq!(os_release_name(content), "Rocky Linux 9.3");
/// ```
pub fn os_release_name(content: &str) -> String {
    let value = |key: &str| {
        content.lines().find_map(|line| {
            let (k, v) = line.trim().split_once('=')?;
            (k == key).then(|| v.trim_matches('"').to_string())
        })
    };

    let mut parts = vec![value("NAME").unwrap_or_else(|| "Unknown Linux".to_string())];
    if let Some(version) = value("VERSION_ID") {
        parts.push(version);
    }
    parts.join(" ")
}
