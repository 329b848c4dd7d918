use std::collections::{BTreeMap, BTreeSet};

use jobwatch_logging::{watch_debug, watch_warn};

use crate::bootstrap::{HostBootstrap, JobRange, Term};
use crate::job::{Job, JobId};
use crate::view_model::{DashboardView, JobRowView};
use crate::view_state::{ViewChange, ViewState, ViewStatePatch};

/// Who slices the job list into pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PagingMode {
    /// The backend returns every matching job; the store slices locally.
    #[default]
    Client,
    /// The backend returns only the requested page plus a total count.
    Server,
}

/// One page of the derived job list.
#[derive(Debug, Clone, PartialEq)]
pub struct JobPage {
    pub items: Vec<Job>,
    /// Matching jobs before pagination.
    pub total: usize,
}

/// Owns the job list, the view state, and the operator's selection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobStore {
    jobs: Vec<Job>,
    view: ViewState,
    selected: BTreeSet<JobId>,
    paging: PagingMode,
    server_total: Option<usize>,
    status_counts: BTreeMap<String, u64>,
    loading: bool,
    error_banner: Option<String>,
    job_types: Vec<String>,
    terms: Vec<Term>,
    job_ranges: Vec<JobRange>,
    dirty: bool,
}

impl JobStore {
    pub fn new(paging: PagingMode) -> Self {
        Self {
            paging,
            ..Self::default()
        }
    }

    /// Seeds the store from the data the host page renders up front.
    pub fn from_bootstrap(paging: PagingMode, bootstrap: HostBootstrap) -> Self {
        let mut store = Self::new(paging);
        store.job_types = bootstrap.job_types;
        store.terms = bootstrap.terms;
        store.job_ranges = bootstrap.job_ranges;
        store.set_jobs(bootstrap.jobs);
        store
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub fn paging(&self) -> PagingMode {
        self.paging
    }

    pub fn job_types(&self) -> &[String] {
        &self.job_types
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn job_ranges(&self) -> &[JobRange] {
        &self.job_ranges
    }

    /// Names in `types` missing from the bootstrapped vocabulary. Without a
    /// vocabulary every name is accepted.
    pub fn unknown_job_types<'a>(&self, types: &'a [String]) -> Vec<&'a str> {
        if self.job_types.is_empty() {
            return Vec::new();
        }
        types
            .iter()
            .filter(|ty| !self.job_types.contains(ty))
            .map(String::as_str)
            .collect()
    }

    /// Replaces the job list. Selected ids that are still present stay
    /// selected; the rest are dropped.
    pub fn set_jobs(&mut self, jobs: Vec<Job>) {
        for job in &jobs {
            if let Err(anomaly) = job.check_consistency() {
                watch_warn!("{anomaly}");
            }
        }
        let present: BTreeSet<JobId> = jobs.iter().map(|job| job.id).collect();
        let before = self.selected.len();
        self.selected.retain(|id| present.contains(id));
        let dropped = before - self.selected.len();
        if dropped > 0 {
            watch_debug!("Dropped {dropped} selected job(s) no longer in the list");
        }
        self.jobs = jobs;
        self.mark_dirty();
    }

    pub fn set_view_state(&mut self, patch: ViewStatePatch) -> ViewChange {
        let change = self.view.apply(patch);
        if change.changed {
            self.mark_dirty();
        }
        change
    }

    /// Filters by type then status, sorts, and slices the current page.
    pub fn filtered_sorted_page(&self) -> JobPage {
        let view = &self.view;
        let mut matching: Vec<&Job> = self
            .jobs
            .iter()
            .filter(|job| view.type_passes(job))
            .filter(|job| view.status_passes(job.status()))
            .collect();

        let sort_by = view.sort_by.as_str();
        matching.sort_by(|a, b| {
            let ord = a.sort_key(sort_by).total_cmp(&b.sort_key(sort_by));
            let ord = if view.sort_desc { ord.reverse() } else { ord };
            ord.then_with(|| a.id.cmp(&b.id))
        });

        let filtered = matching.len();
        let (items, total): (Vec<&Job>, usize) = match self.paging {
            PagingMode::Client => {
                let per_page = view.per_page.max(1) as usize;
                let start = (view.page.max(1) as usize - 1).saturating_mul(per_page);
                let page = matching.into_iter().skip(start).take(per_page).collect();
                (page, filtered)
            }
            PagingMode::Server => (matching, self.server_total.unwrap_or(filtered)),
        };

        JobPage {
            items: items.into_iter().cloned().collect(),
            total,
        }
    }

    /// Flips the selection of `id`. Returns false for ids not in the list.
    pub fn toggle_selection(&mut self, id: JobId) -> bool {
        if !self.jobs.iter().any(|job| job.id == id) {
            watch_debug!("Ignoring selection toggle for unknown job {id}");
            return false;
        }
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
        self.mark_dirty();
        true
    }

    pub fn is_selected(&self, id: JobId) -> bool {
        self.selected.contains(&id)
    }

    pub fn selected_ids(&self) -> Vec<JobId> {
        self.selected.iter().copied().collect()
    }

    pub fn selected_jobs(&self) -> Vec<Job> {
        self.jobs
            .iter()
            .filter(|job| self.selected.contains(&job.id))
            .cloned()
            .collect()
    }

    pub fn clear_selection(&mut self) {
        if !self.selected.is_empty() {
            self.selected.clear();
            self.mark_dirty();
        }
    }

    pub fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.mark_dirty();
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Total reported by the backend with the last applied response.
    pub fn set_server_total(&mut self, total: Option<usize>) {
        self.server_total = total;
        self.mark_dirty();
    }

    pub fn server_total(&self) -> Option<usize> {
        self.server_total
    }

    pub fn set_status_counts(&mut self, counts: BTreeMap<String, u64>) {
        self.status_counts = counts;
        self.mark_dirty();
    }

    pub fn status_counts(&self) -> &BTreeMap<String, u64> {
        &self.status_counts
    }

    pub fn set_error(&mut self, banner: impl Into<String>) {
        self.error_banner = Some(banner.into());
        self.mark_dirty();
    }

    pub fn clear_error(&mut self) {
        if self.error_banner.take().is_some() {
            self.mark_dirty();
        }
    }

    pub fn error_banner(&self) -> Option<&str> {
        self.error_banner.as_deref()
    }

    pub fn view(&self) -> DashboardView {
        let page = self.filtered_sorted_page();
        let per_page = self.view.per_page.max(1) as usize;
        let rows = page
            .items
            .into_iter()
            .map(|job| JobRowView {
                status: job.status(),
                selected: self.selected.contains(&job.id),
                job,
            })
            .collect();
        DashboardView {
            rows,
            total: page.total,
            page: self.view.page,
            page_count: page.total.div_ceil(per_page).max(1),
            selected_count: self.selected.len(),
            loading: self.loading,
            error_banner: self.error_banner.clone(),
            status_counts: self.status_counts.clone(),
            dirty: self.dirty,
        }
    }

    /// Status distribution of the loaded jobs under the type filter, keyed
    /// like the chart endpoint's response. Stands in for the chart data when
    /// that endpoint fails; in server paging it only sees the current page.
    pub fn local_status_counts(&self) -> BTreeMap<String, u64> {
        let mut counts = BTreeMap::new();
        for job in self.jobs.iter().filter(|job| self.view.type_passes(job)) {
            *counts.entry(job.status().as_str().to_string()).or_insert(0) += 1;
        }
        counts
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns whether anything changed since the last call, and resets it.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use super::*;

    fn job(id: JobId, ty: &str) -> Job {
        Job::new(id, ty)
    }

    #[test]
    fn toggling_unknown_job_is_ignored() {
        let mut store = JobStore::new(PagingMode::Client);
        store.set_jobs(vec![job(1, "a")]);
        assert!(!store.toggle_selection(9));
        assert!(store.selected_ids().is_empty());
    }

    #[test]
    fn server_paging_reports_server_total() {
        let mut store = JobStore::new(PagingMode::Server);
        store.set_jobs(vec![job(1, "a"), job(2, "a")]);
        store.set_server_total(Some(40));
        store.set_view_state(ViewStatePatch::page(3));
        let page = store.filtered_sorted_page();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 40);
    }

    #[test]
    fn consume_dirty_resets() {
        let mut store = JobStore::new(PagingMode::Client);
        store.set_jobs(Vec::new());
        assert!(store.consume_dirty());
        assert!(!store.consume_dirty());
    }

    #[test]
    fn ordering_is_total_over_mixed_keys() {
        let mut a = job(1, "x");
        a.metadata.insert("created".into(), serde_json::json!("2024-01-02"));
        let b = job(2, "x");
        assert_eq!(
            a.sort_key("created").total_cmp(&b.sort_key("created")),
            Ordering::Greater
        );
    }
}
