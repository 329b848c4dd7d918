use chrono::{DateTime, Timelike};
use jobwatch_logging::watch_warn;
use serde::{Serialize, Serializer};

use crate::job::{Job, JobStatus, Timestamp};

/// Canonical textual form for every date the engine writes.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

pub const DEFAULT_SORT_BY: &str = "job_type";
pub const DEFAULT_PER_PAGE: u32 = 250;
pub const DEFAULT_REFRESH_SECONDS: u32 = 30;

pub fn format_date(date: &Timestamp) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses any RFC 3339 date (`Z`, fractional seconds, explicit offsets).
/// Sub-second precision is dropped so the value survives a format round trip.
pub fn parse_date(raw: &str) -> Option<Timestamp> {
    DateTime::parse_from_rfc3339(raw.trim()).ok()?.with_nanosecond(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
}

impl DateRange {
    pub fn new(start: Option<Timestamp>, end: Option<Timestamp>) -> Self {
        Self { start, end }
    }
}

/// Everything that decides which jobs are shown and how often they refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    /// Window a job is scheduled to be active in.
    pub active_range: DateRange,
    /// Window a job actually ran in.
    pub job_range: DateRange,
    pub job_type: Vec<String>,
    pub job_status: Vec<String>,
    pub sort_by: String,
    pub sort_desc: bool,
    pub page: u32,
    pub per_page: u32,
    pub refresh_interval_seconds: u32,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            active_range: DateRange::default(),
            job_range: DateRange::default(),
            job_type: Vec::new(),
            job_status: Vec::new(),
            sort_by: DEFAULT_SORT_BY.to_string(),
            sort_desc: false,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            refresh_interval_seconds: DEFAULT_REFRESH_SECONDS,
        }
    }
}

impl ViewState {
    /// An empty type set means no type filter, not "match nothing".
    pub fn type_passes(&self, job: &Job) -> bool {
        self.job_type.is_empty() || self.job_type.iter().any(|ty| *ty == job.job_type)
    }

    /// Same empty-means-all rule as [`ViewState::type_passes`].
    pub fn status_passes(&self, status: JobStatus) -> bool {
        self.job_status.is_empty()
            || self
                .job_status
                .iter()
                .any(|wanted| wanted.eq_ignore_ascii_case(status.as_str()))
    }

    /// Merges `patch` into the state and reports what changed.
    pub fn apply(&mut self, patch: ViewStatePatch) -> ViewChange {
        let before = self.clone();

        if let Some(start) = patch.active_start {
            self.active_range.start = start;
        }
        if let Some(end) = patch.active_end {
            self.active_range.end = end;
        }
        if let Some(start) = patch.job_start {
            self.job_range.start = start;
        }
        if let Some(end) = patch.job_end {
            self.job_range.end = end;
        }
        if let Some(types) = patch.job_type {
            self.job_type = dedup_ordered(types);
        }
        if let Some(statuses) = patch.job_status {
            self.job_status = dedup_ordered(statuses);
        }
        if let Some(sort_by) = patch.sort_by {
            if sort_by.trim().is_empty() {
                watch_warn!("Ignoring empty sort field");
            } else {
                self.sort_by = sort_by;
            }
        }
        if let Some(sort_desc) = patch.sort_desc {
            self.sort_desc = sort_desc;
        }
        apply_positive("page", &mut self.page, patch.page);
        apply_positive("per_page", &mut self.per_page, patch.per_page);
        apply_positive(
            "refresh_interval_seconds",
            &mut self.refresh_interval_seconds,
            patch.refresh_interval_seconds,
        );

        ViewChange {
            changed: before != *self,
            interval_changed: before.refresh_interval_seconds != self.refresh_interval_seconds,
        }
    }

    pub fn filter_payload(&self) -> FilterPayload {
        FilterPayload {
            active_date_range: RangePayload::from(&self.active_range),
            job_date_range: RangePayload::from(&self.job_range),
            per_page: self.per_page,
            curr_page: self.page,
            sort_by: self.sort_by.clone(),
            sort_desc: self.sort_desc,
            job_type: self.job_type.clone(),
            job_status: self.job_status.clone(),
        }
    }

    pub fn chart_payload(&self) -> ChartPayload {
        ChartPayload {
            active_date_range: RangePayload::from(&self.active_range),
            job_type: self.job_type.clone(),
        }
    }
}

fn apply_positive(name: &str, slot: &mut u32, value: Option<u32>) {
    match value {
        Some(0) => watch_warn!("Ignoring non-positive {name}"),
        Some(value) => *slot = value,
        None => {}
    }
}

fn dedup_ordered(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !value.is_empty() && !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

/// A partial update of [`ViewState`]. `None` leaves a field untouched; the
/// date fields use `Some(None)` to clear a bound.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewStatePatch {
    pub active_start: Option<Option<Timestamp>>,
    pub active_end: Option<Option<Timestamp>>,
    pub job_start: Option<Option<Timestamp>>,
    pub job_end: Option<Option<Timestamp>>,
    pub job_type: Option<Vec<String>>,
    pub job_status: Option<Vec<String>>,
    pub sort_by: Option<String>,
    pub sort_desc: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub refresh_interval_seconds: Option<u32>,
}

impl ViewStatePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewChange {
    pub changed: bool,
    pub interval_changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangePayload {
    #[serde(rename = "startDate", serialize_with = "serialize_opt_date")]
    pub start_date: Option<Timestamp>,
    #[serde(rename = "endDate", serialize_with = "serialize_opt_date")]
    pub end_date: Option<Timestamp>,
}

impl From<&DateRange> for RangePayload {
    fn from(range: &DateRange) -> Self {
        Self {
            start_date: range.start,
            end_date: range.end,
        }
    }
}

/// Body of a jobs query, in the backend's field naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPayload {
    pub active_date_range: RangePayload,
    pub job_date_range: RangePayload,
    pub per_page: u32,
    pub curr_page: u32,
    pub sort_by: String,
    pub sort_desc: bool,
    pub job_type: Vec<String>,
    pub job_status: Vec<String>,
}

/// Body of a status-distribution query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPayload {
    pub active_date_range: RangePayload,
    pub job_type: Vec<String>,
}

fn serialize_opt_date<S: Serializer>(
    value: &Option<Timestamp>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(date) => serializer.serialize_str(&format_date(date)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_page_is_ignored() {
        let mut state = ViewState::default();
        let change = state.apply(ViewStatePatch::page(0));
        assert_eq!(state.page, 1);
        assert!(!change.changed);
    }

    #[test]
    fn parse_date_canonicalises_utc_suffix() {
        let date = parse_date("2024-01-01T10:20:30.5Z").unwrap();
        assert_eq!(format_date(&date), "2024-01-01T10:20:30+00:00");
    }

    #[test]
    fn payload_uses_backend_names() {
        let mut state = ViewState::default();
        state.active_range.start = parse_date("2024-03-01T00:00:00-08:00");
        let json = serde_json::to_value(state.filter_payload()).unwrap();
        assert_eq!(json["activeDateRange"]["startDate"], "2024-03-01T00:00:00-08:00");
        assert!(json["activeDateRange"]["endDate"].is_null());
        assert_eq!(json["currPage"], 1);
        assert_eq!(json["perPage"], 250);
        assert_eq!(json["sortBy"], "job_type");
    }
}
