use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::backend::PipelineBackend;
use super::service::{PipelineError, PipelineService};

/// Refreshes `service` every `every` until `shutdown` flips to true or its sender drops.
///
/// The first refresh fires one full interval after spawning; callers perform the initial
/// load themselves so they can report its outcome.
pub fn spawn_periodic_refresh<B>(
    service: Arc<PipelineService<B>>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    B: PipelineBackend + 'static,
{
    tokio::spawn(async move {
        let mut ticker = time::interval_at(time::Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = every.as_secs_f64(), "periodic pipeline refresh started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match service.refresh().await {
                        Ok(summary) => debug!(applications = summary.applications, "periodic refresh applied"),
                        Err(PipelineError::StaleRefresh) => debug!("periodic refresh superseded"),
                        Err(error) => warn!(%error, "periodic refresh failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("periodic pipeline refresh stopped");
    })
}
