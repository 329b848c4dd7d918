use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use jobwatch_core::{FilterPayload, JobId, JobStore};
use jobwatch_logging::{watch_debug, watch_info, watch_warn};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{GatewayError, JobsGateway, JobsPage};

pub type SharedStore = Arc<Mutex<JobStore>>;

/// Identifies one jobs fetch. Only the most recently minted token is
/// current; a response carrying any other token is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Fetching { token: RequestToken },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The response was current and replaced the job list.
    Applied { jobs: usize, total: Option<usize> },
    /// A newer refresh started before this one settled.
    Stale,
    Cancelled,
    /// The fetch failed; the previous job list is kept.
    Failed(GatewayError),
}

struct InFlight {
    token: RequestToken,
    cancel: CancellationToken,
}

struct Timer {
    handle: JoinHandle<()>,
    interval_seconds: u32,
}

/// Polls the jobs backend and reconciles responses into the shared store.
pub struct RefreshController {
    gateway: Arc<dyn JobsGateway>,
    store: SharedStore,
    next_token: AtomicU64,
    in_flight: Mutex<Option<InFlight>>,
    timer: Mutex<Option<Timer>>,
}

impl RefreshController {
    pub fn new(gateway: Arc<dyn JobsGateway>, store: SharedStore) -> Arc<Self> {
        Arc::new(Self {
            gateway,
            store,
            next_token: AtomicU64::new(0),
            in_flight: Mutex::new(None),
            timer: Mutex::new(None),
        })
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn state(&self) -> ControllerState {
        match self.lock_in_flight().as_ref() {
            Some(in_flight) => ControllerState::Fetching {
                token: in_flight.token,
            },
            None => ControllerState::Idle,
        }
    }

    /// Polling period of the running timer, if any.
    pub fn interval_seconds(&self) -> Option<u32> {
        self.lock_timer().as_ref().map(|timer| timer.interval_seconds)
    }

    /// Starts polling every `interval_seconds`, replacing any running timer.
    /// The first tick fires one full period after the call.
    pub fn start(self: &Arc<Self>, interval_seconds: u32) {
        let interval_seconds = interval_seconds.max(1);
        let period = Duration::from_secs(u64::from(interval_seconds));
        // The timer task must not keep the controller alive.
        let controller = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                controller.spawn_tick();
            }
        });

        let previous = self.lock_timer().replace(Timer {
            handle,
            interval_seconds,
        });
        if let Some(previous) = previous {
            previous.handle.abort();
            watch_info!(
                "Refresh interval changed from {}s to {}s",
                previous.interval_seconds,
                interval_seconds
            );
        } else {
            watch_info!("Polling every {}s", interval_seconds);
        }
    }

    /// Stops polling. A fetch still in flight is left to finish and is then
    /// discarded as stale.
    pub fn stop(&self) {
        if let Some(timer) = self.lock_timer().take() {
            timer.handle.abort();
            watch_info!("Polling stopped");
        }
        if self.lock_in_flight().take().is_some() {
            self.lock_store().set_loading(false);
        }
    }

    fn spawn_tick(self: Arc<Self>) {
        let chart = self.clone();
        tokio::spawn(async move {
            self.refresh().await;
        });
        tokio::spawn(async move {
            let _ = chart.refresh_chart().await;
        });
    }

    /// Fetches the jobs for the current view state, superseding any fetch
    /// still in flight.
    pub async fn refresh(&self) -> RefreshOutcome {
        let (token, cancel, payload) = self.begin();
        let result = self.gateway.fetch(&payload, &cancel).await;
        self.settle(token, result)
    }

    /// Swaps in a new token, raises the loading flag and snapshots the
    /// payload in one critical section, so a superseded refresh can never
    /// raise the flag after a newer one has settled.
    fn begin(&self) -> (RequestToken, CancellationToken, FilterPayload) {
        let mut in_flight = self.lock_in_flight();
        let token = RequestToken(self.next_token.fetch_add(1, Ordering::Relaxed) + 1);
        let cancel = CancellationToken::new();
        let previous = in_flight.replace(InFlight {
            token,
            cancel: cancel.clone(),
        });
        if let Some(previous) = previous {
            watch_debug!("Cancelling refresh {:?} for {:?}", previous.token, token);
            previous.cancel.cancel();
        }
        let payload = {
            let mut store = self.lock_store();
            store.set_loading(true);
            store.view_state().filter_payload()
        };
        (token, cancel, payload)
    }

    fn settle(
        &self,
        token: RequestToken,
        result: Result<JobsPage, GatewayError>,
    ) -> RefreshOutcome {
        // The in-flight slot stays locked until the store is updated, so no
        // refresh can begin between the staleness check and the apply.
        let mut in_flight = self.lock_in_flight();
        let is_current = in_flight
            .as_ref()
            .is_some_and(|current| current.token == token);
        if !is_current {
            return match result {
                Err(err) if err.is_cancelled() => RefreshOutcome::Cancelled,
                _ => {
                    watch_debug!("Discarding stale response for {:?}", token);
                    RefreshOutcome::Stale
                }
            };
        }
        *in_flight = None;

        let mut store = self.lock_store();
        store.set_loading(false);
        match result {
            Ok(page) => {
                let jobs = page.jobs.len();
                let total = page.total;
                store.set_jobs(page.jobs);
                store.set_server_total(total);
                store.clear_error();
                RefreshOutcome::Applied { jobs, total }
            }
            Err(err) if err.is_cancelled() => RefreshOutcome::Cancelled,
            Err(err) => {
                watch_warn!("Refreshing jobs failed: {err}");
                store.set_error(format!("Could not refresh jobs: {err}"));
                RefreshOutcome::Failed(err)
            }
        }
    }

    /// Fetches the per-status job counts for the chart. When the endpoint
    /// fails, the counts are taken from the loaded jobs instead.
    pub async fn refresh_chart(&self) -> Result<(), GatewayError> {
        let payload = self.lock_store().view_state().chart_payload();
        match self.gateway.fetch_chart_data(&payload).await {
            Ok(counts) => {
                self.lock_store().set_status_counts(counts);
                Ok(())
            }
            Err(err) => {
                watch_warn!("Refreshing status counts failed, counting loaded jobs: {err}");
                let mut store = self.lock_store();
                let counts = store.local_status_counts();
                store.set_status_counts(counts);
                Err(err)
            }
        }
    }

    /// Asks the backend to reset `ids`, then refreshes so the reset shows up.
    pub async fn restart_jobs(&self, ids: &[JobId]) -> Result<RefreshOutcome, GatewayError> {
        if let Err(err) = self.gateway.restart_jobs(ids).await {
            watch_warn!("Restarting {} job(s) failed: {err}", ids.len());
            self.lock_store()
                .set_error(format!("Could not restart jobs: {err}"));
            return Err(err);
        }
        watch_info!("Restarted {} job(s)", ids.len());
        Ok(self.refresh().await)
    }

    fn lock_store(&self) -> MutexGuard<'_, JobStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_timer(&self) -> MutexGuard<'_, Option<Timer>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RefreshController {
    fn drop(&mut self) {
        let timer = self
            .timer
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(timer) = timer {
            timer.handle.abort();
        }
    }
}
