use chrono::Local;
use jobwatch_core::{format_date, DashboardView, JobRowView, Timestamp, ViewState};

const MESSAGE_WIDTH: usize = 48;

/// Renders the dashboard as plain text lines.
pub fn render(view: &DashboardView, state: &ViewState) -> Vec<String> {
    let mut lines = Vec::with_capacity(view.rows.len() + 6);

    let loading = if view.loading { " | refreshing" } else { "" };
    lines.push(format!(
        "[{}] Page {}/{} | {} job(s) | {} selected | every {}s{}",
        Local::now().format("%H:%M:%S"),
        view.page,
        view.page_count,
        view.total,
        view.selected_count,
        state.refresh_interval_seconds,
        loading
    ));
    lines.push(filter_line(state));
    if !view.status_counts.is_empty() {
        let counts: Vec<String> = view
            .status_counts
            .iter()
            .map(|(status, count)| format!("{status} {count}"))
            .collect();
        lines.push(format!("Status: {}", counts.join(", ")));
    }
    if let Some(banner) = &view.error_banner {
        lines.push(format!("!! {banner}"));
    }

    lines.push(format!(
        "    {:>8}  {:<16} {:<10} {:>8}  {:<25} {:<25} {}",
        "id", "type", "status", "pid", "start", "end", "message"
    ));
    lines.extend(view.rows.iter().map(row_line));
    lines
}

fn filter_line(state: &ViewState) -> String {
    let direction = if state.sort_desc { "desc" } else { "asc" };
    let mut parts = vec![format!("sort {} {}", state.sort_by, direction)];
    if !state.job_type.is_empty() {
        parts.push(format!("type {}", state.job_type.join(",")));
    }
    if !state.job_status.is_empty() {
        parts.push(format!("status {}", state.job_status.join(",")));
    }
    for (label, range) in [("active", &state.active_range), ("ran", &state.job_range)] {
        if range.start.is_some() || range.end.is_some() {
            parts.push(format!(
                "{label} {}..{}",
                date_cell(range.start.as_ref()),
                date_cell(range.end.as_ref())
            ));
        }
    }
    format!("Filters: {}", parts.join(" | "))
}

fn row_line(row: &JobRowView) -> String {
    let job = &row.job;
    let mark = if row.selected { "[x]" } else { "[ ]" };
    let pid = job.pid.map(|pid| pid.to_string()).unwrap_or_default();
    let message = job.error_message().map(truncate).unwrap_or_default();
    format!(
        "{mark} {:>8}  {:<16} {:<10} {:>8}  {:<25} {:<25} {}",
        job.id,
        job.job_type,
        row.status,
        pid,
        date_cell(job.start.as_ref()),
        date_cell(job.end.as_ref()),
        message
    )
}

fn date_cell(date: Option<&Timestamp>) -> String {
    date.map(format_date).unwrap_or_else(|| "-".to_string())
}

fn truncate(message: &str) -> String {
    let first_line = message.lines().next().unwrap_or_default();
    if first_line.chars().count() <= MESSAGE_WIDTH {
        return first_line.to_string();
    }
    let mut short: String = first_line.chars().take(MESSAGE_WIDTH - 3).collect();
    short.push_str("...");
    short
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobwatch_core::{parse_date, Job, JobStatus};

    fn row(id: u64, selected: bool) -> JobRowView {
        let mut job = Job::new(id, "ingest");
        job.pid = Some(77);
        job.start = parse_date("2024-05-01T07:00:00Z");
        job.message = Some(format!("{}\ntraceback", "x".repeat(80)));
        JobRowView {
            job,
            status: JobStatus::Failed,
            selected,
        }
    }

    #[test]
    fn rows_follow_header() {
        let view = DashboardView {
            rows: vec![row(3, true), row(4, false)],
            total: 2,
            page: 1,
            page_count: 1,
            selected_count: 1,
            ..DashboardView::default()
        };
        let lines = render(&view, &ViewState::default());
        let body: Vec<&String> = lines.iter().filter(|line| line.starts_with('[')).collect();
        assert!(body.iter().any(|line| line.starts_with("[x]") && line.contains(" 3 ")));
        assert!(body.iter().any(|line| line.starts_with("[ ]") && line.contains(" 4 ")));
        assert!(lines[0].contains("Page 1/1 | 2 job(s) | 1 selected"));
    }

    #[test]
    fn long_messages_are_cut_to_one_line() {
        let line = row_line(&row(3, false));
        assert!(line.contains("failed"));
        assert!(line.contains("2024-05-01T07:00:00+00:00"));
        assert!(line.ends_with("..."));
        assert!(!line.contains("traceback"));
    }

    #[test]
    fn banner_is_shown() {
        let view = DashboardView {
            error_banner: Some("Could not refresh jobs".to_string()),
            ..DashboardView::default()
        };
        let lines = render(&view, &ViewState::default());
        assert!(lines.iter().any(|line| line == "!! Could not refresh jobs"));
    }
}
