//! Handler for the `run` command.
//!
//! The scheduler owns one job. On Unix, `SIGUSR1` runs that job immediately;
//! a signal that arrives mid-cycle is queued and runs once the cycle ends,
//! since the engine's cycle guard never lets two cycles interleave. A
//! one-shot `marketsync sync` from another process may overlap a scheduled
//! cycle; SQLite transactions and the (asset, date) constraint keep the
//! stored rows consistent in that case.

use std::future::Future;
use std::sync::Arc;

use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::adapter::inbound::cli::output;
use crate::application::scheduler::Scheduler;
use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::settings::Config;
use crate::port::inbound::sync::SyncTrigger;

/// Run the scheduler until Ctrl-C, then stop it and wait for the job to end.
pub async fn execute(config: &Config) -> Result<()> {
    let store = bootstrap::open_store(config)?;
    let engine = bootstrap::build_engine(config, store)?;
    let trigger: Arc<dyn SyncTrigger> = engine;
    let mut scheduler = bootstrap::build_scheduler(config, trigger)?;

    output::header(env!("CARGO_PKG_VERSION"));
    output::field("Database", &config.database);
    output::field("Job", &config.schedule.job_name);
    output::field("Interval", format!("{}s", config.schedule.interval_secs));
    output::field("Top N", config.sync.top_n);
    println!();

    let (manual_tx, mut manual_rx) = mpsc::channel(1);
    forward_manual_triggers(manual_tx)?;

    scheduler.start();
    info!("marketsync running, press Ctrl-C to stop");

    let served = serve(
        &scheduler,
        &config.schedule.job_name,
        &mut manual_rx,
        signal::ctrl_c(),
    )
    .await;
    info!("Shutdown signal received");
    scheduler.stop().await;
    info!("marketsync stopped");
    served?;
    Ok(())
}

/// Forward manual trigger requests to `job` until `shutdown` resolves.
async fn serve<F>(
    scheduler: &Scheduler,
    job: &str,
    manual: &mut mpsc::Receiver<()>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            result = &mut shutdown => return result,
            Some(()) = manual.recv() => {
                if scheduler.trigger(job) {
                    info!(job, "Manual sync requested");
                } else {
                    warn!(job, "Manual sync ignored, job is not scheduled");
                }
            }
        }
    }
}

#[cfg(unix)]
fn forward_manual_triggers(tx: mpsc::Sender<()>) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut usr1 = signal(SignalKind::user_defined1())?;
    tokio::spawn(async move {
        while usr1.recv().await.is_some() {
            // A full channel already has a trigger pending.
            if let Err(mpsc::error::TrySendError::Closed(())) = tx.try_send(()) {
                break;
            }
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn forward_manual_triggers(_tx: mpsc::Sender<()>) -> Result<()> {
    Ok(())
}
