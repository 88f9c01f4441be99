//! Print jobs, run outcomes and their log entries.

use std::fmt;

use chrono::{DateTime, Utc};
use homeprint_core::{EmployeeId, Entity, PrintJobId};
use serde::{Deserialize, Serialize};

/// Skip reason: the target employee is off today.
pub const EMPLOYEE_OFF: &str = "employee does not work today";
/// Skip reason: no tasks, special tasks, one-off tasks or meals for today.
pub const NOTHING_TO_PRINT: &str = "nothing to print";
/// Skip reason: another execution of the same job is in flight.
pub const ALREADY_RUNNING: &str = "job is already running";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    DailyTasks,
    WeeklyMenu,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::DailyTasks => "DAILY_TASKS",
            JobType::WeeklyMenu => "WEEKLY_MENU",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrintRunStatus {
    Success,
    Failed,
    Skipped,
}

impl PrintRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrintRunStatus::Success => "SUCCESS",
            PrintRunStatus::Failed => "FAILED",
            PrintRunStatus::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for PrintRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One run of a job, appended and never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintLogEntry {
    pub status: PrintRunStatus,
    #[serde(default)]
    pub message: Option<String>,
    pub at: DateTime<Utc>,
}

impl PrintLogEntry {
    pub fn from_outcome(outcome: &RunOutcome, at: DateTime<Utc>) -> Self {
        Self {
            status: outcome.status,
            message: outcome.message.clone(),
            at,
        }
    }
}

/// A scheduled print.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: PrintJobId,
    pub name: String,
    /// 5-field cron expression, local time.
    pub schedule: String,
    pub job_type: JobType,
    #[serde(default)]
    pub employee_id: Option<EmployeeId>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub logs: Vec<PrintLogEntry>,
}

fn default_enabled() -> bool {
    true
}

impl PrintJob {
    pub fn new(name: impl Into<String>, schedule: impl Into<String>, job_type: JobType) -> Self {
        Self {
            id: PrintJobId::new(),
            name: name.into(),
            schedule: schedule.into(),
            job_type,
            employee_id: None,
            enabled: true,
            last_run_at: None,
            logs: Vec::new(),
        }
    }

    pub fn for_employee(mut self, employee_id: EmployeeId) -> Self {
        self.employee_id = Some(employee_id);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn last_log(&self) -> Option<&PrintLogEntry> {
        self.logs.last()
    }
}

impl Entity for PrintJob {
    type Id = PrintJobId;

    fn id(&self) -> PrintJobId {
        self.id
    }
}

/// Result of one execution, as reported to a manual caller and written to the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub status: PrintRunStatus,
    #[serde(default)]
    pub message: Option<String>,
}

impl RunOutcome {
    pub fn success() -> Self {
        Self {
            status: PrintRunStatus::Success,
            message: None,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: PrintRunStatus::Skipped,
            message: Some(reason.into()),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: PrintRunStatus::Failed,
            message: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PrintRunStatus::Success
    }

    pub fn is_skipped(&self) -> bool {
        self.status == PrintRunStatus::Skipped
    }

    pub fn is_failed(&self) -> bool {
        self.status == PrintRunStatus::Failed
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.status, message),
            None => write!(f, "{}", self.status),
        }
    }
}
