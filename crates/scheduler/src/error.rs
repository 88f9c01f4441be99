//! Scheduler errors.
//!
//! Skipped runs are not errors; they are [`crate::RunOutcome`]s.

use std::io;

use homeprint_core::PrintJobId;
use homeprint_escpos::EncodingError;
use homeprint_printer::TransportError;
use thiserror::Error;

use crate::cron::CronError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("job {job_id} has an invalid schedule: {source}")]
    InvalidSchedule {
        job_id: PrintJobId,
        #[source]
        source: CronError,
    },

    #[error("print job not found: {0}")]
    JobNotFound(PrintJobId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    #[error("printer unavailable: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to spawn scheduler thread: {0}")]
    Spawn(#[source] io::Error),
}

impl SchedulerError {
    /// Whether the failure happened while producing or delivering the print.
    pub fn is_print_failure(&self) -> bool {
        matches!(
            self,
            SchedulerError::Encoding(_) | SchedulerError::Transport(_)
        )
    }
}
