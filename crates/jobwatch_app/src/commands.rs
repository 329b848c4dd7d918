//! Operator commands read from stdin, one per line.

use anyhow::{anyhow, bail, Context};
use jobwatch_core::{
    decode_fragment, parse_date, JobId, JobStatus, JobStore, Msg, Timestamp, ViewStatePatch,
};

pub const HELP: &str = "\
commands:
  page N                 show page N
  per-page N             rows per page
  sort FIELD [desc]      sort by a job field
  type [A,B,...]         filter by job type (no list clears)
  status [S,...]         filter by pending, running, completed, failed
  active [FROM|-] [TO|-] scheduled window, RFC 3339 dates
  ran [FROM|-] [TO|-]    run window, RFC 3339 dates
  window N               scheduled window of known job range N
  interval SECONDS       refresh period
  open FRAGMENT          replace the view with a shared link's fragment
  select ID              toggle selection of a job
  clear                  clear the selection
  restart                restart the selected jobs
  refresh                refresh now
  help
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Msg(Msg),
    Help,
    Quit,
}

/// Help text followed by the vocabulary the host page bootstrapped.
pub fn help(store: &JobStore) -> String {
    let mut text = HELP.to_string();
    if !store.job_types().is_empty() {
        text.push_str(&format!("\njob types: {}", store.job_types().join(", ")));
    }
    for (index, range) in store.job_ranges().iter().enumerate() {
        let day = |day: Option<chrono::NaiveDate>| {
            day.map(|day| day.to_string()).unwrap_or_else(|| "-".to_string())
        };
        text.push_str(&format!(
            "\nwindow {}: {} .. {}",
            index + 1,
            day(range.target_day_start),
            day(range.target_day_end)
        ));
    }
    if !store.terms().is_empty() {
        let terms: Vec<String> = store.terms().iter().map(|term| term.display_name()).collect();
        text.push_str(&format!("\nterms: {}", terms.join(", ")));
    }
    text
}

/// Parses one operator line. `store` supplies the bootstrapped vocabulary
/// that `type` and `window` are checked against.
pub fn parse(line: &str, store: &JobStore) -> anyhow::Result<Command> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(Command::Msg(Msg::NoOp));
    };
    let args: Vec<&str> = words.collect();

    let command = match verb.to_ascii_lowercase().as_str() {
        "page" => view(ViewStatePatch::page(positive(&args, "page")?)),
        "per-page" | "perpage" => view(ViewStatePatch {
            per_page: Some(positive(&args, "per-page")?),
            ..ViewStatePatch::default()
        }),
        "sort" => {
            let field = args.first().context("sort needs a field")?;
            let desc = match args.get(1).map(|dir| dir.to_ascii_lowercase()) {
                None => false,
                Some(dir) if dir == "desc" => true,
                Some(dir) if dir == "asc" => false,
                Some(dir) => bail!("unknown sort direction {dir:?}"),
            };
            view(ViewStatePatch {
                sort_by: Some((*field).to_string()),
                sort_desc: Some(desc),
                ..ViewStatePatch::default()
            })
        }
        "type" => {
            let types = list(&args);
            let unknown = store.unknown_job_types(&types);
            if !unknown.is_empty() {
                bail!("unknown job type(s): {}", unknown.join(", "));
            }
            view(ViewStatePatch {
                job_type: Some(types),
                ..ViewStatePatch::default()
            })
        }
        "status" => {
            let statuses = list(&args);
            for status in &statuses {
                status.parse::<JobStatus>()?;
            }
            view(ViewStatePatch {
                job_status: Some(statuses),
                ..ViewStatePatch::default()
            })
        }
        "active" => {
            let (start, end) = range(&args)?;
            view(ViewStatePatch {
                active_start: Some(start),
                active_end: Some(end),
                ..ViewStatePatch::default()
            })
        }
        "ran" => {
            let (start, end) = range(&args)?;
            view(ViewStatePatch {
                job_start: Some(start),
                job_end: Some(end),
                ..ViewStatePatch::default()
            })
        }
        "window" => {
            let index = positive(&args, "window")? as usize;
            let range = store
                .job_ranges()
                .get(index - 1)
                .with_context(|| format!("no job range {index}, see help"))?;
            let (start, end) = range.active_bounds();
            view(ViewStatePatch {
                active_start: Some(start),
                active_end: Some(end),
                ..ViewStatePatch::default()
            })
        }
        "interval" => view(ViewStatePatch {
            refresh_interval_seconds: Some(positive(&args, "interval")?),
            ..ViewStatePatch::default()
        }),
        // Pasting a shared link is an ordinary view change: the decoded keys
        // merge over the current view and the canonical fragment is rewritten.
        "open" => view(decode_fragment(args.first().copied().unwrap_or_default())),
        "select" => {
            let id: JobId = args
                .first()
                .context("select needs a job id")?
                .parse()
                .context("job id must be a number")?;
            Command::Msg(Msg::ToggleSelected(id))
        }
        "clear" => Command::Msg(Msg::ClearSelection),
        "restart" => Command::Msg(Msg::RestartSelectedClicked),
        "refresh" => Command::Msg(Msg::RefreshRequested),
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command {other:?}, try help"),
    };
    Ok(command)
}

fn view(patch: ViewStatePatch) -> Command {
    Command::Msg(Msg::ViewChanged(patch))
}

fn positive(args: &[&str], name: &str) -> anyhow::Result<u32> {
    let raw = args.first().with_context(|| format!("{name} needs a number"))?;
    match raw.parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => bail!("{name} must be a positive integer, got {raw:?}"),
    }
}

fn list(args: &[&str]) -> Vec<String> {
    args.iter()
        .flat_map(|arg| arg.split(','))
        .filter(|item| !item.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn range(args: &[&str]) -> anyhow::Result<(Option<Timestamp>, Option<Timestamp>)> {
    Ok((bound(args.first())?, bound(args.get(1))?))
}

fn bound(arg: Option<&&str>) -> anyhow::Result<Option<Timestamp>> {
    match arg {
        None | Some(&"-") => Ok(None),
        Some(raw) => parse_date(raw)
            .map(Some)
            .ok_or_else(|| anyhow!("{raw:?} is not an RFC 3339 date")),
    }
}
