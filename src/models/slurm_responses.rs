//! Raw `squeue --json` payload.
//!
//! Only the fields the job table needs are decoded; everything else in the
//! payload is ignored by serde. Shape problems surface as a single
//! deserialization error for the whole payload.

use serde::Deserialize;

use super::time::NumberValue;

/// Top-level `squeue --json` object
#[derive(Debug, Deserialize)]
pub struct SqueueResponse {
    pub jobs: Vec<SqueueJob>,

    /// Slurm reports errors either as strings or as objects with a description
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

impl SqueueResponse {
    /// Human-readable error messages reported inside the payload
    #[must_use]
    pub fn error_messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(|err| match err {
                serde_json::Value::String(s) => s.clone(),
                other => other
                    .get("description")
                    .and_then(|d| d.as_str())
                    .filter(|d| !d.is_empty())
                    .map_or_else(|| other.to_string(), str::to_string),
            })
            .collect()
    }
}

/// One entry of the `jobs` array
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SqueueJob {
    #[serde(default)]
    pub job_id: u64,

    #[serde(default)]
    pub partition: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub user_name: String,

    #[serde(default)]
    pub job_state: JobStateField,

    #[serde(default)]
    pub node_count: NumberValue,

    /// Allocated node list (empty while pending)
    #[serde(default)]
    pub nodes: String,

    #[serde(default)]
    pub priority: NumberValue,

    #[serde(default)]
    pub start_time: NumberValue,
}

/// `job_state` is a list of flags on recent Slurm, a single word on older ones
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum JobStateField {
    List(Vec<String>),
    Word(String),
}

impl Default for JobStateField {
    fn default() -> Self {
        JobStateField::List(Vec::new())
    }
}

impl JobStateField {
    /// The primary state word (e.g. "RUNNING")
    #[must_use]
    pub fn primary(&self) -> &str {
        match self {
            JobStateField::List(states) => states.first().map_or("", String::as_str),
            JobStateField::Word(word) => word,
        }
    }

    /// Single-character state code (e.g. "R" for RUNNING), empty if unknown
    #[must_use]
    pub fn code(&self) -> String {
        self.primary().chars().next().map(String::from).unwrap_or_default()
    }
}
