//! Codec between [`ViewState`] and the URL fragment used to bookmark a view.
//!
//! The fragment is always rewritten wholesale from the full state, so a key
//! that stops applying disappears instead of lingering. Decoding only yields
//! the keys that are present; the caller merges the patch over its current
//! state.

use jobwatch_logging::{watch_debug, watch_warn};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::job::Timestamp;
use crate::view_state::{format_date, parse_date, ViewState, ViewStatePatch};

pub const KEY_PER_PAGE: &str = "perPage";
pub const KEY_CURR_PAGE: &str = "currPage";
pub const KEY_SORT_BY: &str = "sortBy";
pub const KEY_SORT_DESC: &str = "sortDesc";
pub const KEY_START_DATE: &str = "startDate";
pub const KEY_END_DATE: &str = "endDate";
pub const KEY_JOB_START_DATE: &str = "jobStartDate";
pub const KEY_JOB_END_DATE: &str = "jobEndDate";
pub const KEY_REFRESH_TIME: &str = "refreshTime";
pub const KEY_JOB_TYPE: &str = "jobType";
pub const KEY_JOB_STATUS: &str = "jobStatus";

/// Characters left bare by a browser's `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Flat, ordered key/value view of a fragment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FragmentParams(Vec<(String, String)>);

impl FragmentParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, replacing an earlier value so the last occurrence wins.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FragmentError {
    #[error("fragment segment {0:?} is not a key=value pair")]
    MissingSeparator(String),
    #[error("fragment segment {0:?} has an empty key")]
    EmptyKey(String),
}

pub fn encode(state: &ViewState) -> FragmentParams {
    let mut params = FragmentParams::new();
    params.insert(KEY_PER_PAGE, state.per_page.to_string());
    params.insert(KEY_CURR_PAGE, state.page.to_string());
    params.insert(KEY_SORT_BY, state.sort_by.clone());
    params.insert(KEY_SORT_DESC, state.sort_desc.to_string());
    insert_date(&mut params, KEY_START_DATE, state.active_range.start.as_ref());
    insert_date(&mut params, KEY_END_DATE, state.active_range.end.as_ref());
    insert_date(&mut params, KEY_JOB_START_DATE, state.job_range.start.as_ref());
    insert_date(&mut params, KEY_JOB_END_DATE, state.job_range.end.as_ref());
    params.insert(KEY_REFRESH_TIME, state.refresh_interval_seconds.to_string());
    insert_list(&mut params, KEY_JOB_TYPE, &state.job_type);
    insert_list(&mut params, KEY_JOB_STATUS, &state.job_status);
    params
}

fn insert_date(params: &mut FragmentParams, key: &str, date: Option<&Timestamp>) {
    if let Some(date) = date {
        params.insert(key, format_date(date));
    }
}

fn insert_list(params: &mut FragmentParams, key: &str, values: &[String]) {
    if !values.is_empty() {
        params.insert(key, values.join(","));
    }
}

/// Builds a patch from whichever known keys are present. A value that does
/// not parse drops only its own field.
pub fn decode(params: &FragmentParams) -> ViewStatePatch {
    let mut patch = ViewStatePatch::default();
    for (key, raw) in params.iter() {
        match key {
            KEY_PER_PAGE => patch.per_page = decode_positive(key, raw),
            KEY_CURR_PAGE => patch.page = decode_positive(key, raw),
            KEY_REFRESH_TIME => patch.refresh_interval_seconds = decode_positive(key, raw),
            KEY_SORT_BY => {
                if !raw.is_empty() {
                    patch.sort_by = Some(raw.to_string());
                }
            }
            KEY_SORT_DESC => patch.sort_desc = Some(raw.eq_ignore_ascii_case("true")),
            KEY_START_DATE => patch.active_start = decode_date(key, raw),
            KEY_END_DATE => patch.active_end = decode_date(key, raw),
            KEY_JOB_START_DATE => patch.job_start = decode_date(key, raw),
            KEY_JOB_END_DATE => patch.job_end = decode_date(key, raw),
            KEY_JOB_TYPE => patch.job_type = Some(split_list(raw)),
            KEY_JOB_STATUS => patch.job_status = Some(split_list(raw)),
            other => watch_debug!("Ignoring unknown fragment key {other:?}"),
        }
    }
    patch
}

fn decode_positive(key: &str, raw: &str) -> Option<u32> {
    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            watch_warn!("Dropping fragment value {key}={raw:?}: expected a positive integer");
            None
        }
    }
}

fn decode_date(key: &str, raw: &str) -> Option<Option<Timestamp>> {
    match parse_date(raw) {
        Some(date) => Some(Some(date)),
        None => {
            watch_warn!("Dropping fragment value {key}={raw:?}: not an RFC 3339 date");
            None
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter(|segment| !segment.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Renders `key=value&...` with percent-encoded keys and values, without the
/// leading `#`.
pub fn to_fragment(params: &FragmentParams) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", escape(key), escape(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn escape(raw: &str) -> String {
    utf8_percent_encode(raw, COMPONENT).to_string()
}

/// Percent-decodes only; a literal `+` stays a `+` (it is a date offset, not
/// a space).
fn unescape(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Splits a fragment (with or without its leading `#`) into decoded pairs.
pub fn parse_fragment(raw: &str) -> Result<FragmentParams, FragmentError> {
    let body = raw.trim().strip_prefix('#').unwrap_or(raw.trim());
    let mut params = FragmentParams::new();
    if body.is_empty() {
        return Ok(params);
    }
    for segment in body.split('&') {
        let Some((key, value)) = segment.split_once('=') else {
            return Err(FragmentError::MissingSeparator(segment.to_string()));
        };
        if key.is_empty() {
            return Err(FragmentError::EmptyKey(segment.to_string()));
        }
        params.insert(unescape(key), unescape(value));
    }
    Ok(params)
}

pub fn encode_fragment(state: &ViewState) -> String {
    to_fragment(&encode(state))
}

/// Decodes a fragment for page start-up. A malformed fragment restores
/// nothing rather than failing.
pub fn decode_fragment(raw: &str) -> ViewStatePatch {
    match parse_fragment(raw) {
        Ok(params) => decode(&params),
        Err(err) => {
            watch_warn!("Ignoring malformed fragment: {err}");
            ViewStatePatch::default()
        }
    }
}
