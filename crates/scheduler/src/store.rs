//! Store boundary and the in-memory implementation.
//!
//! Persistence of household entities is external; the scheduler only needs the
//! operations on [`PrintStore`]. [`InMemoryPrintStore`] backs tests and the daemon,
//! which seeds it from a JSON [`StoreSnapshot`].

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Days, NaiveDate, Utc};
use homeprint_core::{
    DayMenu, DomainError, Employee, EmployeeId, Entity, OneOffTask, PrintJobId, PrinterSettings,
    SpecialTask, Task, TaskId,
};
use homeprint_recurrence::{CompiledSpec, occurs_on};
use serde::{Deserialize, Serialize};

use crate::types::{PrintJob, PrintLogEntry};

/// Entities eligible for printing on one day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DueTasks {
    pub recurring: Vec<Task>,
    pub special: Vec<SpecialTask>,
    pub one_off: Vec<OneOffTask>,
}

impl DueTasks {
    pub fn is_empty(&self) -> bool {
        self.recurring.is_empty() && self.special.is_empty() && self.one_off.is_empty()
    }

    pub fn len(&self) -> usize {
        self.recurring.len() + self.special.len() + self.one_off.len()
    }
}

/// Store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("storage error: {0}")]
    Storage(String),
    #[error("invalid snapshot: {0}")]
    Snapshot(String),
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Operations the scheduler consumes from the household store.
pub trait PrintStore: Send + Sync {
    fn load_job(&self, job_id: PrintJobId) -> Result<Option<PrintJob>, StoreError>;

    fn list_jobs(&self) -> Result<Vec<PrintJob>, StoreError>;

    /// Insert or replace.
    fn save_job(&self, job: &PrintJob) -> Result<(), StoreError>;

    /// Returns whether the job existed.
    fn delete_job(&self, job_id: PrintJobId) -> Result<bool, StoreError>;

    /// Recurring and special tasks occurring on `date`, plus pending one-off tasks due
    /// by then. With `employee`, only tasks assigned to that employee.
    fn load_due_tasks(
        &self,
        date: NaiveDate,
        employee: Option<EmployeeId>,
    ) -> Result<DueTasks, StoreError>;

    fn load_employee(&self, employee_id: EmployeeId) -> Result<Option<Employee>, StoreError>;

    fn load_day_menu(&self, date: NaiveDate) -> Result<Option<DayMenu>, StoreError>;

    /// Seven consecutive days from `first_day`; days without a plan come back empty.
    fn load_week_menu(&self, first_day: NaiveDate) -> Result<Vec<DayMenu>, StoreError> {
        (0..7)
            .filter_map(|offset| first_day.checked_add_days(Days::new(offset)))
            .map(|date| Ok(self.load_day_menu(date)?.unwrap_or_else(|| DayMenu::empty(date))))
            .collect()
    }

    fn load_printer_settings(&self) -> Result<Option<PrinterSettings>, StoreError>;

    /// Idempotent: already consumed tasks keep their original timestamp.
    fn mark_one_off_consumed(&self, ids: &[TaskId], at: DateTime<Utc>) -> Result<(), StoreError>;

    fn append_print_log(&self, job_id: PrintJobId, entry: PrintLogEntry) -> Result<(), StoreError>;

    fn update_job_last_run(&self, job_id: PrintJobId, at: DateTime<Utc>) -> Result<(), StoreError>;
}

impl<S: PrintStore + ?Sized> PrintStore for Arc<S> {
    fn load_job(&self, job_id: PrintJobId) -> Result<Option<PrintJob>, StoreError> {
        (**self).load_job(job_id)
    }

    fn list_jobs(&self) -> Result<Vec<PrintJob>, StoreError> {
        (**self).list_jobs()
    }

    fn save_job(&self, job: &PrintJob) -> Result<(), StoreError> {
        (**self).save_job(job)
    }

    fn delete_job(&self, job_id: PrintJobId) -> Result<bool, StoreError> {
        (**self).delete_job(job_id)
    }

    fn load_due_tasks(
        &self,
        date: NaiveDate,
        employee: Option<EmployeeId>,
    ) -> Result<DueTasks, StoreError> {
        (**self).load_due_tasks(date, employee)
    }

    fn load_employee(&self, employee_id: EmployeeId) -> Result<Option<Employee>, StoreError> {
        (**self).load_employee(employee_id)
    }

    fn load_day_menu(&self, date: NaiveDate) -> Result<Option<DayMenu>, StoreError> {
        (**self).load_day_menu(date)
    }

    fn load_week_menu(&self, first_day: NaiveDate) -> Result<Vec<DayMenu>, StoreError> {
        (**self).load_week_menu(first_day)
    }

    fn load_printer_settings(&self) -> Result<Option<PrinterSettings>, StoreError> {
        (**self).load_printer_settings()
    }

    fn mark_one_off_consumed(&self, ids: &[TaskId], at: DateTime<Utc>) -> Result<(), StoreError> {
        (**self).mark_one_off_consumed(ids, at)
    }

    fn append_print_log(&self, job_id: PrintJobId, entry: PrintLogEntry) -> Result<(), StoreError> {
        (**self).append_print_log(job_id, entry)
    }

    fn update_job_last_run(&self, job_id: PrintJobId, at: DateTime<Utc>) -> Result<(), StoreError> {
        (**self).update_job_last_run(job_id, at)
    }
}

/// Serialized form of the whole household, as loaded by the daemon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub special_tasks: Vec<SpecialTask>,
    #[serde(default)]
    pub one_off_tasks: Vec<OneOffTask>,
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub menus: Vec<DayMenu>,
    #[serde(default)]
    pub printer: Option<PrinterSettings>,
    #[serde(default)]
    pub jobs: Vec<PrintJob>,
}

impl StoreSnapshot {
    /// Reject entities the UI would never have saved, including recurrence
    /// rules that do not parse.
    pub fn validate(&self) -> Result<(), StoreError> {
        for task in &self.tasks {
            task.validate()?;
            check_recurrence(&task.title, &task.recurrence)?;
        }
        for task in &self.special_tasks {
            task.validate()?;
            check_recurrence(&task.title, &task.recurrence)?;
        }
        for task in &self.one_off_tasks {
            task.validate()?;
        }
        for employee in &self.employees {
            employee.validate()?;
        }
        Ok(())
    }
}

fn check_recurrence(title: &str, spec: &str) -> Result<(), StoreError> {
    CompiledSpec::compile(spec)
        .map(drop)
        .map_err(|e| DomainError::validation(format!("task `{title}`: {e}")).into())
}

fn by_id<E: Entity>(items: Vec<E>) -> BTreeMap<E::Id, E> {
    items.into_iter().map(|e| (e.id(), e)).collect()
}

#[derive(Debug, Default)]
struct State {
    tasks: BTreeMap<TaskId, Task>,
    special_tasks: BTreeMap<TaskId, SpecialTask>,
    one_off_tasks: BTreeMap<TaskId, OneOffTask>,
    employees: BTreeMap<EmployeeId, Employee>,
    menus: BTreeMap<NaiveDate, DayMenu>,
    printer: Option<PrinterSettings>,
    jobs: BTreeMap<PrintJobId, PrintJob>,
}

/// In-memory store for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryPrintStore {
    state: RwLock<State>,
}

impl InMemoryPrintStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let state = State {
            tasks: by_id(snapshot.tasks),
            special_tasks: by_id(snapshot.special_tasks),
            one_off_tasks: by_id(snapshot.one_off_tasks),
            employees: by_id(snapshot.employees),
            menus: snapshot.menus.into_iter().map(|m| (m.date, m)).collect(),
            printer: snapshot.printer,
            jobs: by_id(snapshot.jobs),
        };
        Self {
            state: RwLock::new(state),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let snapshot: StoreSnapshot =
            serde_json::from_str(json).map_err(|e| StoreError::Snapshot(e.to_string()))?;
        snapshot.validate()?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.read();
        StoreSnapshot {
            tasks: state.tasks.values().cloned().collect(),
            special_tasks: state.special_tasks.values().cloned().collect(),
            one_off_tasks: state.one_off_tasks.values().cloned().collect(),
            employees: state.employees.values().cloned().collect(),
            menus: state.menus.values().cloned().collect(),
            printer: state.printer.clone(),
            jobs: state.jobs.values().cloned().collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(&self.snapshot()).map_err(|e| StoreError::Snapshot(e.to_string()))
    }

    pub fn insert_task(&self, task: Task) {
        self.write().tasks.insert(task.id, task);
    }

    pub fn insert_special_task(&self, task: SpecialTask) {
        self.write().special_tasks.insert(task.id, task);
    }

    pub fn insert_one_off(&self, task: OneOffTask) {
        self.write().one_off_tasks.insert(task.id, task);
    }

    pub fn insert_employee(&self, employee: Employee) {
        self.write().employees.insert(employee.id, employee);
    }

    pub fn set_menu(&self, menu: DayMenu) {
        self.write().menus.insert(menu.date, menu);
    }

    pub fn set_printer_settings(&self, settings: PrinterSettings) {
        self.write().printer = Some(settings);
    }

    pub fn one_off(&self, id: TaskId) -> Option<OneOffTask> {
        self.read().one_off_tasks.get(&id).cloned()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PrintStore for InMemoryPrintStore {
    fn load_job(&self, job_id: PrintJobId) -> Result<Option<PrintJob>, StoreError> {
        Ok(self.read().jobs.get(&job_id).cloned())
    }

    fn list_jobs(&self) -> Result<Vec<PrintJob>, StoreError> {
        Ok(self.read().jobs.values().cloned().collect())
    }

    fn save_job(&self, job: &PrintJob) -> Result<(), StoreError> {
        self.write().jobs.insert(job.id, job.clone());
        Ok(())
    }

    fn delete_job(&self, job_id: PrintJobId) -> Result<bool, StoreError> {
        Ok(self.write().jobs.remove(&job_id).is_some())
    }

    fn load_due_tasks(
        &self,
        date: NaiveDate,
        employee: Option<EmployeeId>,
    ) -> Result<DueTasks, StoreError> {
        let state = self.read();
        let assigned = |owner: Option<EmployeeId>| employee.is_none_or(|e| owner == Some(e));

        let due = DueTasks {
            recurring: state
                .tasks
                .values()
                .filter(|t| assigned(t.employee_id))
                .filter(|t| occurs_on(&t.recurrence, date, t.start_date))
                .cloned()
                .collect(),
            special: state
                .special_tasks
                .values()
                .filter(|t| assigned(t.employee_id))
                .filter(|t| occurs_on(&t.recurrence, date, t.start_date))
                .cloned()
                .collect(),
            one_off: state
                .one_off_tasks
                .values()
                .filter(|t| assigned(t.employee_id))
                .filter(|t| t.is_due(date))
                .cloned()
                .collect(),
        };
        tracing::debug!(%date, due = due.len(), "loaded due tasks");
        Ok(due)
    }

    fn load_employee(&self, employee_id: EmployeeId) -> Result<Option<Employee>, StoreError> {
        Ok(self.read().employees.get(&employee_id).cloned())
    }

    fn load_day_menu(&self, date: NaiveDate) -> Result<Option<DayMenu>, StoreError> {
        Ok(self.read().menus.get(&date).cloned())
    }

    fn load_printer_settings(&self) -> Result<Option<PrinterSettings>, StoreError> {
        Ok(self.read().printer.clone())
    }

    fn mark_one_off_consumed(&self, ids: &[TaskId], at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut state = self.write();
        for id in ids {
            match state.one_off_tasks.get_mut(id) {
                Some(task) if task.consumed_at.is_none() => task.consumed_at = Some(at),
                Some(_) => {}
                None => return Err(StoreError::not_found("one-off task", id)),
            }
        }
        Ok(())
    }

    fn append_print_log(&self, job_id: PrintJobId, entry: PrintLogEntry) -> Result<(), StoreError> {
        let mut state = self.write();
        let job = state
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| StoreError::not_found("print job", job_id))?;
        job.logs.push(entry);
        Ok(())
    }

    fn update_job_last_run(&self, job_id: PrintJobId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut state = self.write();
        let job = state
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| StoreError::not_found("print job", job_id))?;
        job.last_run_at = Some(at);
        Ok(())
    }
}
