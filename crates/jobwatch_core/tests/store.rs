use std::sync::Once;

use jobwatch_core::{
    parse_date, HostBootstrap, Job, JobId, JobStore, PagingMode, ViewStatePatch,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(jobwatch_logging::initialize_for_tests);
}

fn sample_jobs() -> Vec<Job> {
    let pending = Job::new(1, "ingest");
    let mut running = Job::new(2, "export");
    running.pid = Some(7);
    running.start = parse_date("2024-01-01T00:00:00Z");
    let mut failed = Job::new(3, "ingest");
    failed.message = Some("boom".to_string());
    vec![pending, running, failed]
}

fn ids(jobs: &[Job]) -> Vec<JobId> {
    jobs.iter().map(|job| job.id).collect()
}

fn numbered(count: u64, ty: &str) -> Vec<Job> {
    (1..=count).map(|id| Job::new(id, ty)).collect()
}

#[test]
fn status_filter_without_type_filter_yields_failed_job() {
    init_logging();
    let mut store = JobStore::new(PagingMode::Client);
    store.set_jobs(sample_jobs());
    store.set_view_state(ViewStatePatch {
        job_type: Some(Vec::new()),
        job_status: Some(vec!["failed".to_string()]),
        ..ViewStatePatch::default()
    });

    let page = store.filtered_sorted_page();
    assert_eq!(ids(&page.items), vec![3]);
    assert_eq!(page.total, 1);
}

#[test]
fn empty_filters_pass_everything() {
    init_logging();
    let mut store = JobStore::new(PagingMode::Client);
    store.set_jobs(sample_jobs());
    assert_eq!(store.filtered_sorted_page().total, 3);
}

#[test]
fn type_and_status_filters_combine() {
    init_logging();
    let mut store = JobStore::new(PagingMode::Client);
    store.set_jobs(sample_jobs());
    store.set_view_state(ViewStatePatch {
        job_type: Some(vec!["ingest".to_string()]),
        job_status: Some(vec!["pending".to_string(), "running".to_string()]),
        ..ViewStatePatch::default()
    });
    assert_eq!(ids(&store.filtered_sorted_page().items), vec![1]);
}

#[test]
fn total_counts_filtered_jobs_before_paging() {
    init_logging();
    let mut store = JobStore::new(PagingMode::Client);
    store.set_jobs(numbered(7, "ingest"));
    store.set_view_state(ViewStatePatch {
        sort_by: Some("id".to_string()),
        per_page: Some(3),
        page: Some(3),
        ..ViewStatePatch::default()
    });

    let page = store.filtered_sorted_page();
    assert_eq!(ids(&page.items), vec![7]);
    assert_eq!(page.total, 7);
    assert_eq!(store.view().page_count, 3);

    store.set_view_state(ViewStatePatch::page(2));
    assert_eq!(ids(&store.filtered_sorted_page().items), vec![4, 5, 6]);

    store.set_view_state(ViewStatePatch::page(9));
    let beyond = store.filtered_sorted_page();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total, 7);
}

#[test]
fn ties_break_by_ascending_id_in_both_directions() {
    init_logging();
    let jobs = vec![
        Job::new(5, "b"),
        Job::new(2, "a"),
        Job::new(9, "b"),
        Job::new(1, "b"),
    ];
    let mut store = JobStore::new(PagingMode::Client);
    store.set_jobs(jobs);

    store.set_view_state(ViewStatePatch {
        sort_by: Some("job_type".to_string()),
        ..ViewStatePatch::default()
    });
    assert_eq!(ids(&store.filtered_sorted_page().items), vec![2, 1, 5, 9]);

    store.set_view_state(ViewStatePatch {
        sort_desc: Some(true),
        ..ViewStatePatch::default()
    });
    assert_eq!(ids(&store.filtered_sorted_page().items), vec![1, 5, 9, 2]);
}

#[test]
fn missing_sort_values_come_first_ascending() {
    init_logging();
    let mut store = JobStore::new(PagingMode::Client);
    store.set_jobs(sample_jobs());
    store.set_view_state(ViewStatePatch {
        sort_by: Some("start".to_string()),
        ..ViewStatePatch::default()
    });
    assert_eq!(ids(&store.filtered_sorted_page().items), vec![1, 3, 2]);
}

#[test]
fn sorting_by_status_uses_resolved_status() {
    init_logging();
    let mut store = JobStore::new(PagingMode::Client);
    store.set_jobs(sample_jobs());
    store.set_view_state(ViewStatePatch {
        sort_by: Some("status".to_string()),
        ..ViewStatePatch::default()
    });
    // failed < pending < running
    assert_eq!(ids(&store.filtered_sorted_page().items), vec![3, 1, 2]);
}

#[test]
fn set_jobs_is_idempotent_for_derived_page() {
    init_logging();
    let mut store = JobStore::new(PagingMode::Client);
    store.set_jobs(sample_jobs());
    let first = store.filtered_sorted_page();
    store.set_jobs(sample_jobs());
    assert_eq!(store.filtered_sorted_page(), first);
}

#[test]
fn selection_survives_refresh_by_id() {
    init_logging();
    let mut store = JobStore::new(PagingMode::Client);
    store.set_jobs(vec![Job::new(42, "ingest"), Job::new(43, "ingest")]);
    assert!(store.toggle_selection(42));

    let mut replacement = Job::new(42, "ingest");
    replacement.pid = Some(100);
    replacement.start = parse_date("2024-06-01T00:00:00Z");
    store.set_jobs(vec![Job::new(44, "ingest"), replacement]);
    assert_eq!(ids(&store.selected_jobs()), vec![42]);
    assert!(store.is_selected(42));

    store.set_jobs(vec![Job::new(44, "ingest")]);
    assert!(store.selected_jobs().is_empty());
    assert!(store.selected_ids().is_empty());
}

#[test]
fn toggle_twice_deselects() {
    init_logging();
    let mut store = JobStore::new(PagingMode::Client);
    store.set_jobs(sample_jobs());
    store.toggle_selection(2);
    store.toggle_selection(2);
    assert!(store.selected_jobs().is_empty());
}

#[test]
fn view_marks_selected_rows_and_status() {
    init_logging();
    let mut store = JobStore::new(PagingMode::Client);
    store.set_jobs(sample_jobs());
    store.set_view_state(ViewStatePatch {
        sort_by: Some("id".to_string()),
        ..ViewStatePatch::default()
    });
    store.toggle_selection(3);
    store.set_error("backend unreachable");

    let view = store.view();
    let selected: Vec<_> = view.rows.iter().map(|row| row.selected).collect();
    assert_eq!(selected, vec![false, false, true]);
    assert_eq!(view.rows[1].status, jobwatch_core::JobStatus::Running);
    assert_eq!(view.selected_count, 1);
    assert_eq!(view.error_banner.as_deref(), Some("backend unreachable"));

    store.clear_error();
    assert!(store.view().error_banner.is_none());
}

#[test]
fn unchanged_patch_does_not_mark_dirty() {
    init_logging();
    let mut store = JobStore::new(PagingMode::Client);
    store.consume_dirty();
    let change = store.set_view_state(ViewStatePatch::page(1));
    assert!(!change.changed);
    assert!(!store.consume_dirty());
}

#[test]
fn local_counts_respect_type_filter() {
    init_logging();
    let mut store = JobStore::new(PagingMode::Client);
    store.set_jobs(sample_jobs());
    store.set_view_state(ViewStatePatch {
        job_type: Some(vec!["ingest".to_string()]),
        ..ViewStatePatch::default()
    });
    let counts = store.local_status_counts();
    assert_eq!(counts.get("pending"), Some(&1));
    assert_eq!(counts.get("failed"), Some(&1));
    assert_eq!(counts.get("running"), None);
}

#[test]
fn unknown_job_types_are_reported_against_the_vocabulary() {
    let bootstrap = HostBootstrap {
        job_types: vec!["assignment".to_string(), "participation".to_string()],
        ..HostBootstrap::default()
    };
    let store = JobStore::from_bootstrap(PagingMode::Client, bootstrap);
    let wanted = vec!["assignment".to_string(), "grades".to_string()];
    assert_eq!(store.unknown_job_types(&wanted), vec!["grades"]);

    let open = JobStore::new(PagingMode::Client);
    assert!(open.unknown_job_types(&wanted).is_empty());
}
