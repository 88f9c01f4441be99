//! Operations exposed to the UI layer.
//!
//! CRUD on entities lives outside this crate; job edits come through here so the
//! trigger registry follows the store.

use std::sync::Arc;

use chrono::NaiveDateTime;
use homeprint_core::PrintJobId;
use homeprint_escpos::{Message, Preview, PrintContent, decode};
use homeprint_printer::PrinterTransport;
use tracing::info;

use crate::error::SchedulerError;
use crate::scheduler::Scheduler;
use crate::store::PrintStore;
use crate::types::{PrintJob, RunOutcome};

pub struct PrintService<S, T> {
    scheduler: Arc<Scheduler<S, T>>,
}

impl<S, T> Clone for PrintService<S, T> {
    fn clone(&self) -> Self {
        Self {
            scheduler: self.scheduler.clone(),
        }
    }
}

impl<S: PrintStore, T: PrinterTransport> PrintService<S, T> {
    pub fn new(scheduler: Arc<Scheduler<S, T>>) -> Self {
        Self { scheduler }
    }

    pub fn scheduler(&self) -> &Arc<Scheduler<S, T>> {
        &self.scheduler
    }

    /// Encode and decode content exactly as it would print; nothing is sent.
    pub fn preview_content(&self, content: &PrintContent) -> Result<Preview, SchedulerError> {
        let bytes = self.scheduler.render(content)?.to_bytes();
        Ok(decode(&bytes))
    }

    /// Today's content for a job, previewed without printing or bookkeeping.
    pub fn preview_job(&self, job_id: PrintJobId) -> Result<Preview, SchedulerError> {
        let job = self.load(job_id)?;
        let prepared = self.scheduler.prepare(&job)?;
        self.preview_content(&prepared.content)
    }

    /// Same pipeline as a timer fire; the outcome or failure comes back to the caller.
    pub fn run_job_now(&self, job_id: PrintJobId) -> Result<RunOutcome, SchedulerError> {
        info!(job_id = %job_id, "manual run requested");
        self.scheduler.execute(job_id)
    }

    /// Bare TCP connect to the printer; no bytes are written.
    pub fn test_connectivity(&self, ip: &str) -> bool {
        self.scheduler.transport().probe(ip)
    }

    /// Print a one-off markdown message. Not tied to a job, so nothing is logged to the store.
    pub fn print_message(
        &self,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<(), SchedulerError> {
        let content = PrintContent::from(Message::new(title, body));
        self.scheduler.deliver(&content)?;
        info!("message printed");
        Ok(())
    }

    /// Persist a created or edited job and rebuild its trigger from the stored copy.
    pub fn save_job(&self, job: PrintJob) -> Result<bool, SchedulerError> {
        self.scheduler.store().save_job(&job)?;
        self.scheduler.reinstall(job.id)
    }

    pub fn set_job_enabled(&self, job_id: PrintJobId, enabled: bool) -> Result<bool, SchedulerError> {
        let mut job = self.load(job_id)?;
        job.enabled = enabled;
        self.save_job(job)
    }

    pub fn delete_job(&self, job_id: PrintJobId) -> Result<bool, SchedulerError> {
        self.scheduler.uninstall(job_id);
        Ok(self.scheduler.store().delete_job(job_id)?)
    }

    pub fn next_run_at(&self, job_id: PrintJobId) -> Option<NaiveDateTime> {
        self.scheduler.next_run_at(job_id)
    }

    fn load(&self, job_id: PrintJobId) -> Result<PrintJob, SchedulerError> {
        self.scheduler
            .store()
            .load_job(job_id)?
            .ok_or(SchedulerError::JobNotFound(job_id))
    }
}
