//! Configuration types.
//!
//! Settings come from (lowest to highest priority) built-in defaults,
//! `/etc/slurmtop/config.toml`, the user config file and `SLURMTOP_*`
//! environment variables. Invalid values are replaced by defaults and reported
//! as warnings unless `SLURMTOP_STRICT_CONFIG` is set.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum allowed refresh interval in seconds (prevents tight polling loops)
const MIN_REFRESH_INTERVAL: u64 = 1;

const SYSTEM_CONFIG_PATH: &str = "/etc/slurmtop/config.toml";

/// Configuration error, only produced in strict mode or for an explicit `--config` file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub system: SystemConfig,

    pub refresh: RefreshConfig,

    pub display: DisplayConfig,
}

/// System configuration for paths and environment
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Directory containing `sinfo` and `squeue`; auto-detected via PATH when unset
    pub slurm_bin_path: Option<PathBuf>,

    /// Seconds a single `sinfo`/`squeue` call may take before it is killed
    pub command_timeout: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            slurm_bin_path: None,
            command_timeout: 30,
        }
    }
}

impl SystemConfig {
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Info line refresh interval in seconds
    pub info_interval: u64,

    /// Partition refresh interval in seconds
    pub partitions_interval: u64,

    /// Job refresh interval in seconds (0 = only on request)
    pub jobs_interval: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            info_interval: 1,
            partitions_interval: 5,
            jobs_interval: 5,
        }
    }
}

impl RefreshConfig {
    #[must_use]
    pub fn info_period(&self) -> Duration {
        Duration::from_secs(self.info_interval)
    }

    #[must_use]
    pub fn partitions_period(&self) -> Duration {
        Duration::from_secs(self.partitions_interval)
    }

    /// `None` when periodic job polling is disabled
    #[must_use]
    pub fn jobs_period(&self) -> Option<Duration> {
        (self.jobs_interval > 0).then(|| Duration::from_secs(self.jobs_interval))
    }

    /// Validate refresh configuration values.
    /// Returns a list of warnings for invalid values that were corrected to defaults.
    /// If `strict` is true, returns Err instead of correcting values.
    pub fn validate(&mut self, strict: bool) -> Result<Vec<String>, String> {
        let mut warnings = Vec::new();
        let defaults = Self::default();

        for (field, value, default) in [
            ("info_interval", &mut self.info_interval, defaults.info_interval),
            (
                "partitions_interval",
                &mut self.partitions_interval,
                defaults.partitions_interval,
            ),
        ] {
            if *value < MIN_REFRESH_INTERVAL {
                let msg = format!(
                    "refresh.{field} must be at least {MIN_REFRESH_INTERVAL} second(s), got {value}"
                );
                if strict {
                    return Err(msg);
                }
                warnings.push(format!("{msg} - using default ({default})"));
                *value = default;
            }
        }

        Ok(warnings)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Maximum number of partitions kept per sample (0 = no limit)
    pub max_partitions: usize,

    /// Maximum number of jobs kept per sample (0 = no limit)
    pub max_jobs: usize,

    /// Column applied once when the job table first loads (e.g. "priority_number")
    pub default_sort: Option<String>,

    /// TUI color theme: "dark" or "light"
    pub theme: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_partitions: 20,
            max_jobs: 0,
            default_sort: None,
            theme: "dark".to_string(),
        }
    }
}

impl Config {
    /// Get the user config file path, respecting XDG_CONFIG_HOME
    ///
    /// Resolution order:
    /// 1. $XDG_CONFIG_HOME/slurmtop/config.toml (if XDG_CONFIG_HOME is set)
    /// 2. $HOME/.config/slurmtop/config.toml (if HOME is set)
    /// 3. dirs::config_dir()/slurmtop/config.toml
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
            && !xdg_config.is_empty()
        {
            return Some(PathBuf::from(xdg_config).join("slurmtop/config.toml"));
        }

        if let Some(home) = std::env::var_os("HOME") {
            return Some(PathBuf::from(home).join(".config/slurmtop/config.toml"));
        }

        dirs::config_dir().map(|dir| dir.join("slurmtop/config.toml"))
    }

    /// Load configuration from the standard locations and the environment.
    ///
    /// `explicit` replaces the user config file and must exist.
    /// Returns the config and any warnings encountered during loading.
    ///
    /// # Errors
    /// Unreadable `explicit` file, or any problem at all in strict mode.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Vec<String>), ConfigError> {
        let mut config = Self::default();
        let mut warnings = Vec::new();
        let strict = Self::is_strict_mode();

        config.load_file(Path::new(SYSTEM_CONFIG_PATH), false, strict, &mut warnings)?;

        match explicit {
            Some(path) => config.load_file(path, true, true, &mut warnings)?,
            None => {
                if let Some(user_path) = Self::user_config_path() {
                    config.load_file(&user_path, false, strict, &mut warnings)?;
                }
            }
        }

        config.apply_env_overrides(strict, &mut warnings)?;

        let refresh_warnings = config.refresh.validate(strict).map_err(ConfigError::Invalid)?;
        warnings.extend(refresh_warnings);

        Ok((config, warnings))
    }

    /// Check if strict config mode is enabled via SLURMTOP_STRICT_CONFIG
    fn is_strict_mode() -> bool {
        std::env::var("SLURMTOP_STRICT_CONFIG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Merge a config file. A missing file is only an error when `required`.
    fn load_file(
        &mut self,
        path: &Path,
        required: bool,
        strict: bool,
        warnings: &mut Vec<String>,
    ) -> Result<(), ConfigError> {
        let shown = path.display().to_string();
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_toml(&content) {
                Ok(parsed) => {
                    tracing::debug!(path = %shown, "loaded config file");
                    self.merge(parsed);
                    Ok(())
                }
                Err(source) if strict => Err(ConfigError::Parse {
                    path: shown,
                    source,
                }),
                Err(e) => {
                    warnings.push(format!("Config parse error in '{}': {}", shown, e));
                    Ok(())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => Ok(()),
            Err(source) if strict || required => Err(ConfigError::Read {
                path: shown,
                source,
            }),
            Err(e) => {
                warnings.push(format!("Could not read config '{}': {}", shown, e));
                Ok(())
            }
        }
    }

    /// Parse a TOML document into a config
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn merge(&mut self, other: Config) {
        // A later file without slurm_bin_path keeps the earlier one
        self.system.slurm_bin_path = other
            .system
            .slurm_bin_path
            .or(self.system.slurm_bin_path.take());
        self.system.command_timeout = other.system.command_timeout;
        self.refresh = other.refresh;
        self.display = other.display;
    }

    fn apply_env_overrides(
        &mut self,
        strict: bool,
        warnings: &mut Vec<String>,
    ) -> Result<(), ConfigError> {
        let mut report = |var: &str, value: &str, reason: &str| -> Result<(), ConfigError> {
            let msg = format!("Invalid value '{}' for {}: {}", value, var, reason);
            if strict {
                return Err(ConfigError::Invalid(msg));
            }
            warnings.push(format!("{msg} - using default"));
            Ok(())
        };

        if let Ok(val) = std::env::var("SLURMTOP_SLURM_PATH")
            && !val.is_empty()
        {
            let path = PathBuf::from(&val);
            if path.is_dir() {
                self.system.slurm_bin_path = Some(path);
            } else {
                report("SLURMTOP_SLURM_PATH", &val, "not a valid directory")?;
            }
        }

        if let Ok(val) = std::env::var("SLURMTOP_REFRESH_PARTITIONS") {
            match val.parse::<u64>() {
                Ok(secs) if secs >= MIN_REFRESH_INTERVAL => self.refresh.partitions_interval = secs,
                _ => report(
                    "SLURMTOP_REFRESH_PARTITIONS",
                    &val,
                    "expected a positive integer (seconds)",
                )?,
            }
        }

        if let Ok(val) = std::env::var("SLURMTOP_REFRESH_JOBS") {
            match val.parse::<u64>() {
                Ok(secs) => self.refresh.jobs_interval = secs,
                Err(_) => report(
                    "SLURMTOP_REFRESH_JOBS",
                    &val,
                    "expected a non-negative integer (seconds)",
                )?,
            }
        }

        Ok(())
    }
}
