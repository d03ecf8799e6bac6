//! Interval scheduler for sync jobs.
//!
//! Each job is a named [`SyncTrigger`] run every `interval_secs`, plus on
//! demand through [`Scheduler::trigger`]. A job never overlaps itself: the
//! next tick or manual wake-up is handled only after the current run ends,
//! and ticks missed during a long run are delayed rather than burst.
//!
//! ```text
//! start() ─▶ spawn job task ─▶ loop { select!(shutdown | tick | wake) ─▶ run }
//! stop()  ─▶ shutdown=true ─▶ running cycle stops at its next asset boundary ─▶ join
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::port::inbound::sync::{CancelSignal, SyncTrigger};

/// Scheduled sync configuration (`[schedule]` table).
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_job_name")]
    pub job_name: String,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Run once immediately on start instead of waiting a full interval.
    #[serde(default = "default_run_on_start")]
    pub run_on_start: bool,
}

fn default_job_name() -> String {
    "asset_sync".into()
}

const fn default_interval_secs() -> u64 {
    1800
}

const fn default_run_on_start() -> bool {
    true
}

impl ScheduleConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            job_name: default_job_name(),
            interval_secs: default_interval_secs(),
            run_on_start: default_run_on_start(),
        }
    }
}

struct Job {
    interval: Duration,
    run_on_start: bool,
    trigger: Arc<dyn SyncTrigger>,
    wake: Arc<Notify>,
}

/// Owns the job tasks between [`Scheduler::start`] and [`Scheduler::stop`].
#[derive(Default)]
pub struct Scheduler {
    jobs: HashMap<String, Job>,
    shutdown: Option<watch::Sender<bool>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job under `config.job_name`.
    ///
    /// Returns `false`, leaving the existing job in place, if the name is
    /// already taken or the scheduler is running.
    pub fn add_job(&mut self, config: &ScheduleConfig, trigger: Arc<dyn SyncTrigger>) -> bool {
        if self.is_running() || self.jobs.contains_key(&config.job_name) {
            debug!(job = %config.job_name, "Job not added");
            return false;
        }
        self.jobs.insert(
            config.job_name.clone(),
            Job {
                interval: config.interval(),
                run_on_start: config.run_on_start,
                trigger,
                wake: Arc::new(Notify::new()),
            },
        );
        info!(job = %config.job_name, interval_secs = config.interval_secs, "Job added");
        true
    }

    #[must_use]
    pub fn job_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.jobs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shutdown.is_some()
    }

    /// Spawn one task per job. Returns `false` if already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        for (name, job) in &self.jobs {
            let task = JobTask {
                name: name.clone(),
                interval: job.interval,
                run_on_start: job.run_on_start,
                trigger: job.trigger.clone(),
                wake: job.wake.clone(),
            };
            self.tasks.push(tokio::spawn(task.run(shutdown_rx.clone())));
        }

        self.shutdown = Some(shutdown_tx);
        info!(jobs = self.jobs.len(), "Scheduler started");
        true
    }

    /// Run `name` now, outside its interval.
    ///
    /// Returns `false` if no such job exists or the scheduler is stopped. A
    /// trigger that arrives during a run is queued and handled right after.
    pub fn trigger(&self, name: &str) -> bool {
        match self.jobs.get(name) {
            Some(job) if self.is_running() => {
                debug!(job = name, "Manual trigger");
                job.wake.notify_one();
                true
            }
            _ => false,
        }
    }

    /// Signal every job to stop and wait for them to finish.
    ///
    /// A cycle in progress sees its cancel signal fire and ends at the next
    /// asset boundary.
    pub async fn stop(&mut self) {
        let Some(shutdown) = self.shutdown.take() else {
            return;
        };
        shutdown.send_replace(true);

        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "Scheduler job task ended abnormally");
            }
        }
        info!("Scheduler stopped");
    }
}

struct JobTask {
    name: String,
    interval: Duration,
    run_on_start: bool,
    trigger: Arc<dyn SyncTrigger>,
    wake: Arc<Notify>,
}

impl JobTask {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let first = if self.run_on_start {
            Instant::now()
        } else {
            Instant::now() + self.interval
        };
        let mut ticker = time::interval_at(first, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let reason = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = ticker.tick() => "scheduled",
                () = self.wake.notified() => "manual",
            };
            if *shutdown.borrow() {
                break;
            }
            self.run_once(reason, CancelSignal::from_receiver(shutdown.clone()))
                .await;
        }
        debug!(job = %self.name, "Job task exiting");
    }

    async fn run_once(&self, reason: &'static str, cancel: CancelSignal) {
        info!(job = %self.name, reason, "Running job");
        match self.trigger.trigger(cancel).await {
            Ok(summary) => info!(
                job = %self.name,
                assets = summary.assets_processed(),
                observations_inserted = summary.observations_inserted,
                history_failures = summary.history_failures.len(),
                cancelled = summary.cancelled,
                "Job finished"
            ),
            Err(e) => warn!(job = %self.name, error = %e, "Job failed"),
        }
    }
}
