use std::collections::BTreeMap;
use std::fmt;

use jobwatch_core::Job;
use serde::Deserialize;

/// One response of the jobs endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct JobsPage {
    pub jobs: Vec<Job>,
    /// Present when the backend pages the list itself.
    pub total: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JobsResponse {
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub total_jobs: Option<usize>,
}

impl From<JobsResponse> for JobsPage {
    fn from(response: JobsResponse) -> Self {
        Self {
            jobs: response.jobs,
            total: response.total_jobs,
        }
    }
}

/// Job count per status name, as drawn by the distribution chart.
pub type StatusCounts = BTreeMap<String, u64>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct GatewayError {
    pub kind: FailureKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "superseded by a newer request")
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == FailureKind::Cancelled
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    InvalidToken,
    HttpStatus(u16),
    Timeout,
    Decode,
    Cancelled,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::InvalidToken => write!(f, "invalid anti-forgery token"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Decode => write!(f, "malformed response"),
            FailureKind::Cancelled => write!(f, "cancelled"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
