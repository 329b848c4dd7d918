use std::collections::BTreeMap;

use crate::{Job, JobStatus};

/// Everything the presentation layer needs to draw the jobs table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardView {
    pub rows: Vec<JobRowView>,
    pub total: usize,
    pub page: u32,
    pub page_count: usize,
    pub selected_count: usize,
    pub loading: bool,
    pub error_banner: Option<String>,
    pub status_counts: BTreeMap<String, u64>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobRowView {
    pub job: Job,
    pub status: JobStatus,
    pub selected: bool,
}
