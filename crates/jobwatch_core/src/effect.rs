use crate::JobId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Re-fetch the job list with the current view state.
    Refresh,
    /// Re-fetch the status distribution.
    RefreshChart,
    /// Replace the persisted fragment with this one (no leading `#`).
    ReplaceFragment(String),
    /// Clear the polling timer and start a new one.
    RestartTimer { interval_seconds: u32 },
    RestartJobs(Vec<JobId>),
}
