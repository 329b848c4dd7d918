use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use jobwatch_logging::watch_debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type JobId = u64;
pub type Timestamp = DateTime<FixedOffset>;

/// A background job as reported by the backend.
///
/// Any field the backend sends beyond the lifecycle fields ends up in
/// `metadata` untouched (`context`, `created`, target dates, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    #[serde(default)]
    pub job_type: String,
    #[serde(default)]
    pub pid: Option<i64>,
    #[serde(default)]
    pub start: Option<Timestamp>,
    #[serde(default)]
    pub end: Option<Timestamp>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl Job {
    pub fn new(id: JobId, job_type: impl Into<String>) -> Self {
        Self {
            id,
            job_type: job_type.into(),
            pid: None,
            start: None,
            end: None,
            message: None,
            metadata: Map::new(),
        }
    }

    /// The error text, if the backend reported a non-empty one.
    pub fn error_message(&self) -> Option<&str> {
        self.message.as_deref().filter(|msg| !msg.is_empty())
    }

    pub fn status(&self) -> JobStatus {
        resolve_status(self)
    }

    /// Reports lifecycle field combinations the status table does not cover.
    pub fn check_consistency(&self) -> Result<(), InconsistentJobRecord> {
        if self.error_message().is_some() {
            return Ok(());
        }
        match (self.pid.is_some(), self.start.is_some(), self.end.is_some()) {
            (true, true, _) | (false, false, false) => Ok(()),
            (has_pid, has_start, has_end) => Err(InconsistentJobRecord {
                job_id: self.id,
                has_pid,
                has_start,
                has_end,
            }),
        }
    }

    pub fn sort_key(&self, field: &str) -> SortKey {
        match field {
            "id" => SortKey::Number(self.id as f64),
            "job_type" => SortKey::Text(self.job_type.clone()),
            "pid" => self.pid.map_or(SortKey::Missing, |pid| SortKey::Number(pid as f64)),
            "start" => self.start.map_or(SortKey::Missing, SortKey::Time),
            "end" => self.end.map_or(SortKey::Missing, SortKey::Time),
            "message" => self
                .error_message()
                .map_or(SortKey::Missing, |msg| SortKey::Text(msg.to_string())),
            "status" => SortKey::Text(self.status().as_str().to_string()),
            other => self
                .metadata
                .get(other)
                .map_or(SortKey::Missing, SortKey::from_value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Pending,
        JobStatus::Running,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job status {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error(
    "job {job_id} has an inconsistent lifecycle (pid: {has_pid}, start: {has_start}, end: {has_end})"
)]
pub struct InconsistentJobRecord {
    pub job_id: JobId,
    pub has_pid: bool,
    pub has_start: bool,
    pub has_end: bool,
}

/// Maps a job's lifecycle fields to its status. Order matters: a message
/// always wins, and combinations outside the table fall back to pending.
pub fn resolve_status(job: &Job) -> JobStatus {
    if job.error_message().is_some() {
        return JobStatus::Failed;
    }
    match (job.pid.is_some(), job.start.is_some(), job.end.is_some()) {
        (true, true, true) => JobStatus::Completed,
        (true, true, false) => JobStatus::Running,
        (false, false, false) => JobStatus::Pending,
        _ => {
            if let Err(anomaly) = job.check_consistency() {
                watch_debug!("{anomaly}; treating as pending");
            }
            JobStatus::Pending
        }
    }
}

/// Comparable projection of a job field. Missing values order first.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Missing,
    Bool(bool),
    Number(f64),
    Time(Timestamp),
    Text(String),
}

impl SortKey {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => SortKey::Missing,
            Value::Bool(flag) => SortKey::Bool(*flag),
            Value::Number(num) => num.as_f64().map_or(SortKey::Missing, SortKey::Number),
            Value::String(text) => SortKey::Text(text.clone()),
            other => SortKey::Text(other.to_string()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortKey::Missing => 0,
            SortKey::Bool(_) => 1,
            SortKey::Number(_) => 2,
            SortKey::Time(_) => 3,
            SortKey::Text(_) => 4,
        }
    }

    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Bool(a), SortKey::Bool(b)) => a.cmp(b),
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Time(a), SortKey::Time(b)) => a.cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}
