use jobwatch_logging::watch_info;

use crate::fragment::encode_fragment;
use crate::{Effect, JobStore, Msg};

/// Applies an operator message to the store and returns the side effects the
/// caller must run.
pub fn update(store: &mut JobStore, msg: Msg) -> Vec<Effect> {
    match msg {
        Msg::ViewChanged(patch) => {
            let change = store.set_view_state(patch);
            if !change.changed {
                return Vec::new();
            }
            let view = store.view_state();
            let mut effects = vec![
                Effect::ReplaceFragment(encode_fragment(view)),
                Effect::Refresh,
                Effect::RefreshChart,
            ];
            if change.interval_changed {
                effects.push(Effect::RestartTimer {
                    interval_seconds: view.refresh_interval_seconds,
                });
            }
            effects
        }
        Msg::ToggleSelected(id) => {
            store.toggle_selection(id);
            Vec::new()
        }
        Msg::ClearSelection => {
            store.clear_selection();
            Vec::new()
        }
        Msg::RestartSelectedClicked => {
            let ids = store.selected_ids();
            if ids.is_empty() {
                return Vec::new();
            }
            watch_info!("Restart requested for {} job(s)", ids.len());
            vec![Effect::RestartJobs(ids)]
        }
        Msg::RefreshRequested => vec![Effect::Refresh, Effect::RefreshChart],
        Msg::Tick | Msg::NoOp => Vec::new(),
    }
}
