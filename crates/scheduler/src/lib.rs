//! `homeprint-scheduler`
//!
//! **Responsibility:** decide what to print and when, print it, and keep the books.
//!
//! ## Components
//!
//! - [`cron`]: 5-field schedules attached to print jobs, evaluated by the `cron` crate
//! - [`registry`]: live triggers, one per enabled job, behind a single mutex
//! - [`store`]: the external store boundary ([`PrintStore`]) plus an in-memory implementation
//! - [`content`]: today's printable content, filtered through the recurrence resolver
//! - [`scheduler`]: the `execute(job)` pipeline shared by timer and manual runs
//! - [`runtime`]: background tick thread
//! - [`service`]: operations exposed to the UI layer

pub mod clock;
pub mod config;
pub mod content;
pub mod cron;
pub mod error;
pub mod registry;
pub mod runtime;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, SchedulerConfig};
pub use content::PreparedPrint;
pub use crate::cron::{CronError, CronSchedule};
pub use error::SchedulerError;
pub use registry::SchedulerState;
pub use runtime::{RuntimeStats, SchedulerHandle};
pub use scheduler::Scheduler;
pub use service::PrintService;
pub use store::{DueTasks, InMemoryPrintStore, PrintStore, StoreError, StoreSnapshot};
pub use types::{JobType, PrintJob, PrintLogEntry, PrintRunStatus, RunOutcome};
