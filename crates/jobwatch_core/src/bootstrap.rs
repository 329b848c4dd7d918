use chrono::{FixedOffset, NaiveDate, NaiveTime, TimeZone};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::job::{Job, Timestamp};

/// An academic term from the host page vocabulary.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Term {
    pub id: u64,
    #[serde(default)]
    pub sis_term_id: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub quarter: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Term {
    /// Label for listings; falls back to year and quarter, then the id.
    pub fn display_name(&self) -> String {
        if let Some(label) = self.label.as_deref().filter(|label| !label.is_empty()) {
            return label.to_string();
        }
        match (&self.quarter, self.year) {
            (Some(quarter), Some(year)) => format!("{quarter} {year}"),
            _ => format!("term {}", self.id),
        }
    }
}

/// A distinct target window that existing jobs were created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct JobRange {
    #[serde(default)]
    pub target_day_start: Option<NaiveDate>,
    #[serde(default)]
    pub target_day_end: Option<NaiveDate>,
}

impl JobRange {
    /// Active-window bounds covering the whole target days, in UTC.
    pub fn active_bounds(&self) -> (Option<Timestamp>, Option<Timestamp>) {
        let start = self.target_day_start.and_then(|day| at_utc(day, 0, 0, 0));
        let end = self.target_day_end.and_then(|day| at_utc(day, 23, 59, 59));
        (start, end)
    }
}

fn at_utc(day: NaiveDate, hour: u32, min: u32, sec: u32) -> Option<Timestamp> {
    let time = NaiveTime::from_hms_opt(hour, min, sec)?;
    let utc = FixedOffset::east_opt(0)?;
    Some(utc.from_utc_datetime(&day.and_time(time)))
}

/// Data the host page renders once, before the first refresh.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct HostBootstrap {
    #[serde(default)]
    pub jobs: Vec<Job>,
    #[serde(default, rename = "jobtypes")]
    pub job_types: Vec<String>,
    #[serde(default)]
    pub terms: Vec<Term>,
    #[serde(default)]
    pub job_ranges: Vec<JobRange>,
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("failed to parse {section} bootstrap data: {source}")]
    Parse {
        section: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl HostBootstrap {
    /// Parses the blobs the way a page embeds them: one JSON document per
    /// section. Blank sections are treated as empty.
    pub fn from_sections(
        jobs: &str,
        job_types: &str,
        terms: &str,
        job_ranges: &str,
    ) -> Result<Self, BootstrapError> {
        Ok(Self {
            jobs: parse_section("jobs", jobs)?,
            job_types: parse_section("jobtypes", job_types)?,
            terms: parse_section("terms", terms)?,
            job_ranges: parse_section("job_ranges", job_ranges)?,
        })
    }

    /// Parses a single document holding `jobs`, `jobtypes`, `terms` and
    /// `job_ranges`.
    pub fn from_json(document: &str) -> Result<Self, BootstrapError> {
        serde_json::from_str(document).map_err(|source| BootstrapError::Parse {
            section: "document",
            source,
        })
    }
}

fn parse_section<T>(section: &'static str, raw: &str) -> Result<Vec<T>, BootstrapError>
where
    T: for<'de> Deserialize<'de>,
{
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw).map_err(|source| BootstrapError::Parse { section, source })
}
