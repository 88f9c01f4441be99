//! Trigger management and the `execute(job)` pipeline.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;
use homeprint_core::{Employee, PrintJobId};
use homeprint_escpos::{ByteStream, EncoderConfig, PrintContent, encode};
use homeprint_printer::PrinterTransport;
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::SchedulerConfig;
use crate::content::{self, PreparedPrint};
use crate::cron::CronSchedule;
use crate::error::SchedulerError;
use crate::registry::{SchedulerState, Trigger};
use crate::store::{PrintStore, StoreError};
use crate::types::{
    ALREADY_RUNNING, EMPLOYEE_OFF, JobType, NOTHING_TO_PRINT, PrintJob, PrintLogEntry, RunOutcome,
};

/// Owns the trigger registry and runs print jobs.
///
/// Timer ticks and manual "run now" requests both go through [`Scheduler::execute`].
pub struct Scheduler<S, T> {
    store: S,
    transport: T,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    state: Mutex<SchedulerState>,
}

fn lock(state: &Mutex<SchedulerState>) -> MutexGuard<'_, SchedulerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Releases the per-job run claim when the execution ends, however it ends.
struct RunGuard<'a> {
    state: &'a Mutex<SchedulerState>,
    job_id: PrintJobId,
}

impl<'a> RunGuard<'a> {
    fn claim(state: &'a Mutex<SchedulerState>, job_id: PrintJobId) -> Option<Self> {
        lock(state)
            .begin_run(job_id)
            .then_some(Self { state, job_id })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        lock(self.state).end_run(self.job_id);
    }
}

impl<S: PrintStore, T: PrinterTransport> Scheduler<S, T> {
    pub fn new(store: S, transport: T) -> Self {
        Self {
            store,
            transport,
            clock: Arc::new(SystemClock),
            config: SchedulerConfig::default(),
            state: Mutex::new(SchedulerState::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Install one trigger per enabled job in the store. Only the first call does
    /// anything; it returns the number of triggers installed.
    ///
    /// Jobs with an invalid schedule are logged and left uninstalled.
    pub fn initialize(&self) -> Result<usize, SchedulerError> {
        let mut state = lock(&self.state);
        if state.is_initialized() {
            debug!("scheduler already initialized");
            return Ok(0);
        }
        let jobs = self.store.list_jobs()?;
        state.mark_initialized();

        for job in jobs.iter().filter(|j| j.enabled) {
            match CronSchedule::parse(&job.schedule) {
                Ok(schedule) => {
                    state.install(Trigger::new(job.id, schedule));
                }
                Err(e) => {
                    warn!(job_id = %job.id, schedule = %job.schedule, error = %e, "job not installed")
                }
            }
        }
        info!(jobs = jobs.len(), installed = state.len(), "scheduler initialized");
        Ok(state.len())
    }

    /// Re-read the job and rebuild its trigger. The old trigger is always removed
    /// first; a new one is installed only if the job still exists and is enabled.
    pub fn reinstall(&self, job_id: PrintJobId) -> Result<bool, SchedulerError> {
        let job = self.store.load_job(job_id)?;
        let mut state = lock(&self.state);
        let previous = state.uninstall(job_id);

        let Some(job) = job.filter(|j| j.enabled) else {
            if previous.is_some() {
                info!(job_id = %job_id, "trigger uninstalled");
            }
            return Ok(false);
        };
        let schedule = CronSchedule::parse(&job.schedule)
            .map_err(|source| SchedulerError::InvalidSchedule { job_id, source })?;
        state.install(Trigger::new(job_id, schedule).continuing(previous.as_ref()));
        info!(job_id = %job_id, schedule = %job.schedule, "trigger installed");
        Ok(true)
    }

    pub fn uninstall(&self, job_id: PrintJobId) -> bool {
        let removed = lock(&self.state).uninstall(job_id).is_some();
        if removed {
            info!(job_id = %job_id, "trigger uninstalled");
        }
        removed
    }

    pub fn is_installed(&self, job_id: PrintJobId) -> bool {
        lock(&self.state).contains(job_id)
    }

    pub fn installed_count(&self) -> usize {
        lock(&self.state).len()
    }

    pub fn installed_jobs(&self) -> Vec<PrintJobId> {
        lock(&self.state).job_ids()
    }

    pub fn next_run_at(&self, job_id: PrintJobId) -> Option<NaiveDateTime> {
        lock(&self.state).next_run_at(job_id, self.clock.now())
    }

    /// Jobs whose trigger matches the current minute and has not fired in it yet.
    pub fn due_jobs(&self) -> Vec<PrintJobId> {
        lock(&self.state).take_due(self.clock.now())
    }

    pub fn is_running(&self, job_id: PrintJobId) -> bool {
        lock(&self.state).is_running(job_id)
    }

    /// Run a job once: skip, print or fail, and record the outcome in its log.
    ///
    /// A failed print is logged as `FAILED` and returned as the error. A second
    /// execution of a job that is still running is recorded as skipped.
    pub fn execute(&self, job_id: PrintJobId) -> Result<RunOutcome, SchedulerError> {
        let job = self
            .store
            .load_job(job_id)?
            .ok_or(SchedulerError::JobNotFound(job_id))?;

        let Some(_claim) = RunGuard::claim(&self.state, job_id) else {
            warn!(job_id = %job_id, "execution already in flight");
            return self.finish(&job, RunOutcome::skipped(ALREADY_RUNNING));
        };

        info!(job_id = %job.id, job = %job.name, job_type = job.job_type.as_str(), "executing print job");
        match self.run(&job) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(job_id = %job.id, error = %e, "print job failed");
                let entry = PrintLogEntry::from_outcome(&RunOutcome::failed(e.to_string()), self.clock.timestamp());
                if let Err(log_err) = self.store.append_print_log(job.id, entry) {
                    warn!(job_id = %job.id, error = %log_err, "failed to record failure");
                }
                Err(e)
            }
        }
    }

    fn run(&self, job: &PrintJob) -> Result<RunOutcome, SchedulerError> {
        let today = self.clock.today();
        let employee = self.target_employee(job)?;

        if job.job_type == JobType::DailyTasks {
            if let Some(employee) = employee.as_ref().filter(|e| !e.works_on(today)) {
                debug!(job_id = %job.id, employee = %employee.name, "employee off today");
                return self.finish(job, RunOutcome::skipped(EMPLOYEE_OFF));
            }
        }

        let prepared = content::prepare(&self.store, job, employee.as_ref(), today)?;
        if prepared.is_empty() {
            return self.finish(job, RunOutcome::skipped(NOTHING_TO_PRINT));
        }

        self.deliver(&prepared.content)?;

        let now = self.clock.timestamp();
        if !prepared.one_off_ids.is_empty() {
            self.store.mark_one_off_consumed(&prepared.one_off_ids, now)?;
        }
        self.store.update_job_last_run(job.id, now)?;
        // Last step: a bookkeeping error above is logged once, as FAILED.
        let outcome = RunOutcome::success();
        self.store
            .append_print_log(job.id, PrintLogEntry::from_outcome(&outcome, now))?;
        info!(job_id = %job.id, consumed = prepared.one_off_ids.len(), "print job succeeded");
        Ok(outcome)
    }

    /// Record a non-printing outcome; `last_run_at` is left alone.
    fn finish(&self, job: &PrintJob, outcome: RunOutcome) -> Result<RunOutcome, SchedulerError> {
        info!(job_id = %job.id, outcome = %outcome, "print job finished without printing");
        self.store.append_print_log(
            job.id,
            PrintLogEntry::from_outcome(&outcome, self.clock.timestamp()),
        )?;
        Ok(outcome)
    }

    fn target_employee(&self, job: &PrintJob) -> Result<Option<Employee>, SchedulerError> {
        let Some(employee_id) = job.employee_id else {
            return Ok(None);
        };
        let employee = self
            .store
            .load_employee(employee_id)?
            .ok_or_else(|| StoreError::not_found("employee", employee_id))?;
        Ok(Some(employee))
    }

    /// Today's content for a job, without any bookkeeping.
    pub fn prepare(&self, job: &PrintJob) -> Result<PreparedPrint, SchedulerError> {
        let employee = self.target_employee(job)?;
        Ok(content::prepare(
            &self.store,
            job,
            employee.as_ref(),
            self.clock.today(),
        )?)
    }

    /// Encode content with the household's printer settings.
    pub fn render(&self, content: &PrintContent) -> Result<ByteStream, SchedulerError> {
        let settings = self
            .store
            .load_printer_settings()?
            .ok_or_else(|| StoreError::not_found("printer settings", "household"))?;
        Ok(encode(content, &self.encoder_config(&settings))?)
    }

    /// Encode and send to the configured printer.
    pub fn deliver(&self, content: &PrintContent) -> Result<(), SchedulerError> {
        let settings = self
            .store
            .load_printer_settings()?
            .ok_or_else(|| StoreError::not_found("printer settings", "household"))?;
        let bytes = encode(content, &self.encoder_config(&settings))?.to_bytes();
        self.transport.send(&settings.ip, &bytes)?;
        Ok(())
    }

    fn encoder_config(&self, settings: &homeprint_core::PrinterSettings) -> EncoderConfig {
        let config = EncoderConfig::from_settings(settings);
        match self.config.line_width {
            Some(width) => config.with_line_width(width),
            None => config,
        }
    }
}

impl<S, T> Scheduler<S, T>
where
    S: PrintStore + 'static,
    T: PrinterTransport + 'static,
{
    /// Start the background tick thread.
    pub fn spawn(self: Arc<Self>) -> Result<crate::runtime::SchedulerHandle, SchedulerError> {
        crate::runtime::spawn(self)
    }
}
