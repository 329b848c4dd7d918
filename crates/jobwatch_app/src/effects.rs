use std::path::PathBuf;
use std::sync::Arc;

use jobwatch_core::Effect;
use jobwatch_engine::{RefreshController, RefreshOutcome};
use jobwatch_logging::{watch_debug, watch_info};

use crate::persistence;

/// Carries out the effects `update` returns, on the tokio runtime.
pub struct EffectRunner {
    controller: Arc<RefreshController>,
    state_dir: PathBuf,
}

impl EffectRunner {
    pub fn new(controller: Arc<RefreshController>, state_dir: PathBuf) -> Self {
        Self {
            controller,
            state_dir,
        }
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Refresh => {
                    let controller = self.controller.clone();
                    tokio::spawn(async move {
                        let outcome = controller.refresh().await;
                        log_outcome(&outcome);
                    });
                }
                Effect::RefreshChart => {
                    let controller = self.controller.clone();
                    tokio::spawn(async move {
                        let _ = controller.refresh_chart().await;
                    });
                }
                Effect::ReplaceFragment(fragment) => {
                    watch_info!("View #{}", fragment);
                    persistence::save_fragment(&self.state_dir, &fragment);
                }
                Effect::RestartTimer { interval_seconds } => {
                    self.controller.start(interval_seconds);
                }
                Effect::RestartJobs(ids) => {
                    let controller = self.controller.clone();
                    tokio::spawn(async move {
                        if let Ok(outcome) = controller.restart_jobs(&ids).await {
                            log_outcome(&outcome);
                        }
                    });
                }
            }
        }
    }
}

fn log_outcome(outcome: &RefreshOutcome) {
    match outcome {
        RefreshOutcome::Applied { jobs, total } => {
            watch_debug!("Refresh applied: {} job(s), total {:?}", jobs, total);
        }
        other => watch_debug!("Refresh settled as {:?}", other),
    }
}
