//! Background tick thread.
//!
//! Once per tick the thread asks the scheduler for due jobs and runs each one on
//! its own worker thread, so a slow printer never delays other triggers.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use homeprint_printer::PrinterTransport;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::SchedulerError;
use crate::scheduler::Scheduler;
use crate::store::PrintStore;
use crate::types::PrintRunStatus;

/// Handle to a running scheduler thread.
///
/// Dropping the handle also stops the thread, at its next tick.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<JoinHandle<()>>,
    stats: Arc<Mutex<RuntimeStats>>,
}

impl SchedulerHandle {
    /// Request shutdown and wait for the tick thread to exit.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }

    /// Block until the tick thread exits on its own.
    pub fn wait(mut self) {
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }

    pub fn stats(&self) -> RuntimeStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RuntimeStats {
    pub ticks: u64,
    pub jobs_fired: u64,
    pub runs_succeeded: u64,
    pub runs_skipped: u64,
    pub runs_failed: u64,
    pub current_running: usize,
    pub uptime_secs: u64,
}

impl RuntimeStats {
    fn record(&mut self, status: PrintRunStatus) {
        match status {
            PrintRunStatus::Success => self.runs_succeeded += 1,
            PrintRunStatus::Skipped => self.runs_skipped += 1,
            PrintRunStatus::Failed => self.runs_failed += 1,
        }
    }
}

fn update(stats: &Mutex<RuntimeStats>, f: impl FnOnce(&mut RuntimeStats)) {
    f(&mut stats.lock().unwrap_or_else(PoisonError::into_inner));
}

pub fn spawn<S, T>(scheduler: Arc<Scheduler<S, T>>) -> Result<SchedulerHandle, SchedulerError>
where
    S: PrintStore + 'static,
    T: PrinterTransport + 'static,
{
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
    let stats = Arc::new(Mutex::new(RuntimeStats::default()));
    let stats_clone = stats.clone();

    let join = thread::Builder::new()
        .name(scheduler.config().name.clone())
        .spawn(move || runtime_loop(scheduler, shutdown_rx, stats_clone))
        .map_err(SchedulerError::Spawn)?;

    Ok(SchedulerHandle {
        shutdown: shutdown_tx,
        join: Some(join),
        stats,
    })
}

fn runtime_loop<S, T>(
    scheduler: Arc<Scheduler<S, T>>,
    shutdown_rx: mpsc::Receiver<()>,
    stats: Arc<Mutex<RuntimeStats>>,
) where
    S: PrintStore + 'static,
    T: PrinterTransport + 'static,
{
    let config = scheduler.config().clone();
    info!(scheduler = %config.name, installed = scheduler.installed_count(), "scheduler started");
    let start_time = Instant::now();
    let mut in_flight: Vec<JoinHandle<()>> = Vec::new();

    loop {
        in_flight.retain(|h| !h.is_finished());

        for job_id in scheduler.due_jobs() {
            debug!(scheduler = %config.name, job_id = %job_id, "trigger fired");
            update(&stats, |s| {
                s.jobs_fired += 1;
                s.current_running += 1;
            });

            let worker = scheduler.clone();
            let worker_stats = stats.clone();
            let spawned = thread::Builder::new()
                .name(format!("print-job-{job_id}"))
                .spawn(move || {
                    let status = match worker.execute(job_id) {
                        Ok(outcome) => {
                            info!(job_id = %job_id, outcome = %outcome, "scheduled run finished");
                            outcome.status
                        }
                        Err(e) => {
                            warn!(job_id = %job_id, error = %e, "scheduled run failed");
                            PrintRunStatus::Failed
                        }
                    };
                    update(&worker_stats, |s| {
                        s.record(status);
                        s.current_running = s.current_running.saturating_sub(1);
                    });
                });

            match spawned {
                Ok(handle) => in_flight.push(handle),
                Err(e) => {
                    error!(job_id = %job_id, error = %e, "failed to start print run");
                    update(&stats, |s| {
                        s.runs_failed += 1;
                        s.current_running = s.current_running.saturating_sub(1);
                    });
                }
            }
        }

        update(&stats, |s| {
            s.ticks += 1;
            s.uptime_secs = start_time.elapsed().as_secs();
        });

        match shutdown_rx.recv_timeout(config.tick_interval) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    if config.wait_for_running && !in_flight.is_empty() {
        info!(scheduler = %config.name, running = in_flight.len(), "waiting for print runs");
        for handle in in_flight {
            let _ = handle.join();
        }
    }
    info!(scheduler = %config.name, "scheduler stopped");
}
