use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use homeprint_core::{
    DayMenu, Dish, Employee, EmployeeId, OneOffTask, PrintJobId, PrinterSettings, Task, TaskId,
};
use homeprint_escpos::decode;
use homeprint_printer::{PrinterTransport, TransportError};
use homeprint_scheduler::{
    DueTasks, FixedClock, InMemoryPrintStore, JobType, PrintJob, PrintLogEntry, PrintRunStatus,
    PrintService, PrintStore, Scheduler, SchedulerConfig, SchedulerError, StoreError,
};

#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<(String, Vec<u8>)>>,
    refuse: AtomicBool,
}

impl RecordingTransport {
    fn payloads(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, bytes)| decode(bytes).to_plain_text())
            .collect()
    }
}

impl PrinterTransport for RecordingTransport {
    fn send(&self, address: &str, payload: &[u8]) -> Result<(), TransportError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionRefused {
                addr: format!("{address}:9100"),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((address.to_string(), payload.to_vec()));
        Ok(())
    }

    fn probe(&self, _address: &str) -> bool {
        !self.refuse.load(Ordering::SeqCst)
    }
}

type TestScheduler = Scheduler<Arc<InMemoryPrintStore>, Arc<RecordingTransport>>;

struct Household {
    store: Arc<InMemoryPrintStore>,
    transport: Arc<RecordingTransport>,
    clock: Arc<FixedClock>,
    scheduler: Arc<TestScheduler>,
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

fn household(now: NaiveDateTime) -> Household {
    household_with(now, SchedulerConfig::default())
}

fn household_with(now: NaiveDateTime, config: SchedulerConfig) -> Household {
    let store = InMemoryPrintStore::arc();
    store.set_printer_settings(PrinterSettings::new("192.168.0.50", "Casa Azul"));
    let transport = Arc::new(RecordingTransport::default());
    let clock = Arc::new(FixedClock::new(now));
    let scheduler = Arc::new(
        Scheduler::new(store.clone(), transport.clone())
            .with_clock(clock.clone())
            .with_config(config),
    );
    Household {
        store,
        transport,
        clock,
        scheduler,
    }
}

fn saved(h: &Household, job: PrintJob) -> PrintJob {
    h.store.save_job(&job).unwrap();
    job
}

fn reload(h: &Household, job: &PrintJob) -> PrintJob {
    h.store.load_job(job.id).unwrap().unwrap()
}

#[test]
fn employee_off_on_saturday_is_skipped_without_touching_last_run() {
    // 2026-10-24 is a Saturday
    let h = household(at(2026, 10, 24, 7, 0));
    let maria = Employee::new("Maria", [1, 2, 3, 4, 5]);
    h.store.insert_employee(maria.clone());
    h.store
        .insert_task(Task::new("Varrer a sala", "FREQ=DAILY").assigned_to(maria.id));

    let mut job = PrintJob::new("Manhã", "0 7 * * *", JobType::DailyTasks).for_employee(maria.id);
    let previous_run = at(2026, 10, 23, 7, 0).and_utc();
    job.last_run_at = Some(previous_run);
    let job = saved(&h, job);

    let outcome = h.scheduler.execute(job.id).unwrap();
    assert!(outcome.is_skipped());
    assert_eq!(outcome.message.as_deref(), Some("employee does not work today"));

    let job = reload(&h, &job);
    assert_eq!(job.last_run_at, Some(previous_run));
    assert_eq!(job.logs.len(), 1);
    assert_eq!(job.logs[0].status, PrintRunStatus::Skipped);
    assert!(h.transport.payloads().is_empty());
}

#[test]
fn one_off_task_prints_once() {
    let h = household(at(2026, 10, 19, 7, 0));
    h.store.insert_task(Task::new("Lavar a louça", "FREQ=DAILY"));
    let lamp = OneOffTask::new("Trocar lâmpada da cozinha");
    h.store.insert_one_off(lamp.clone());
    let job = saved(&h, PrintJob::new("Manhã", "0 7 * * *", JobType::DailyTasks));

    assert!(h.scheduler.execute(job.id).unwrap().is_success());
    let consumed_at = h.store.one_off(lamp.id).unwrap().consumed_at;
    assert_eq!(consumed_at, Some(at(2026, 10, 19, 7, 0).and_utc()));
    assert_eq!(
        reload(&h, &job).last_run_at,
        Some(at(2026, 10, 19, 7, 0).and_utc())
    );

    h.clock.advance(TimeDelta::days(1));
    assert!(h.scheduler.execute(job.id).unwrap().is_success());

    let payloads = h.transport.payloads();
    assert_eq!(payloads.len(), 2);
    assert!(payloads[0].contains("[ ] Trocar lâmpada da cozinha"));
    assert!(!payloads[1].contains("Trocar lâmpada"));
    assert!(payloads[1].contains("[ ] Lavar a louça"));
    assert_eq!(h.store.one_off(lamp.id).unwrap().consumed_at, consumed_at);
}

#[test]
fn nothing_due_is_skipped() {
    let h = household(at(2026, 10, 19, 7, 0));
    h.store.insert_task(Task::new("Limpar vidros", "FREQ=WEEKLY;BYDAY=SA"));
    let job = saved(&h, PrintJob::new("Manhã", "0 7 * * *", JobType::DailyTasks));

    let outcome = h.scheduler.execute(job.id).unwrap();
    assert_eq!(outcome.to_string(), "SKIPPED: nothing to print");
    assert!(reload(&h, &job).last_run_at.is_none());
    assert!(h.transport.payloads().is_empty());
}

#[test]
fn transport_failure_is_logged_and_returned() {
    let h = household(at(2026, 10, 19, 7, 0));
    h.store.insert_task(Task::new("Varrer a sala", "FREQ=DAILY"));
    let lamp = OneOffTask::new("Trocar lâmpada");
    h.store.insert_one_off(lamp.clone());
    let job = saved(&h, PrintJob::new("Manhã", "0 7 * * *", JobType::DailyTasks));
    h.transport.refuse.store(true, Ordering::SeqCst);

    let err = h.scheduler.execute(job.id).unwrap_err();
    assert!(matches!(err, SchedulerError::Transport(_)));
    assert!(err.is_print_failure());

    let job = reload(&h, &job);
    assert!(job.last_run_at.is_none());
    let entry = job.last_log().unwrap();
    assert_eq!(entry.status, PrintRunStatus::Failed);
    assert!(entry.message.as_deref().unwrap().contains("refused"));
    assert!(h.store.one_off(lamp.id).unwrap().consumed_at.is_none());
}

#[test]
fn missing_printer_settings_fail_the_run() {
    let h = household(at(2026, 10, 19, 7, 0));
    let store = InMemoryPrintStore::arc();
    store.insert_task(Task::new("Varrer a sala", "FREQ=DAILY"));
    let scheduler = Scheduler::new(store.clone(), h.transport.clone()).with_clock(h.clock.clone());
    let job = PrintJob::new("Manhã", "0 7 * * *", JobType::DailyTasks);
    store.save_job(&job).unwrap();

    assert!(matches!(
        scheduler.execute(job.id),
        Err(SchedulerError::Store(_))
    ));
    let job = store.load_job(job.id).unwrap().unwrap();
    assert_eq!(job.last_log().unwrap().status, PrintRunStatus::Failed);
}

#[test]
fn weekly_menu_prints_the_current_week() {
    // Sunday evening, planning the week that started on Monday 19
    let h = household(at(2026, 10, 25, 18, 0));
    let mut monday = DayMenu::empty(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
    monday.lunch = Some(Dish::new("Feijoada"));
    h.store.set_menu(monday);
    let mut sunday = DayMenu::empty(NaiveDate::from_ymd_opt(2026, 10, 25).unwrap());
    sunday.dinner = Some(Dish::new("Sopa de legumes"));
    h.store.set_menu(sunday);
    let job = saved(&h, PrintJob::new("Cardápio", "0 18 * * 0", JobType::WeeklyMenu));

    assert!(h.scheduler.execute(job.id).unwrap().is_success());
    let text = &h.transport.payloads()[0];
    assert!(text.contains("Cardápio da semana"));
    assert!(text.contains("Segunda-feira 19/10\nAlmoço: Feijoada"));
    assert!(text.contains("Domingo 25/10\nJantar: Sopa de legumes"));
    assert!(text.contains("(sem refeições planejadas)"));
}

#[test]
fn weekly_menu_without_meals_is_skipped() {
    let h = household(at(2026, 10, 25, 18, 0));
    let job = saved(&h, PrintJob::new("Cardápio", "0 18 * * 0", JobType::WeeklyMenu));
    assert!(h.scheduler.execute(job.id).unwrap().is_skipped());
}

#[test]
fn repeated_edits_keep_one_trigger_per_enabled_job() {
    let h = household(at(2026, 10, 19, 6, 0));
    let service = PrintService::new(h.scheduler.clone());

    let morning = saved(&h, PrintJob::new("Manhã", "0 7 * * 1-5", JobType::DailyTasks));
    let menu = saved(&h, PrintJob::new("Cardápio", "0 18 * * 0", JobType::WeeklyMenu));
    saved(&h, PrintJob::new("Antigo", "0 9 * * *", JobType::DailyTasks).disabled());
    assert_eq!(h.scheduler.initialize().unwrap(), 2);
    assert_eq!(h.scheduler.initialize().unwrap(), 0);
    assert_eq!(h.scheduler.installed_count(), 2);

    for minute in 0..10 {
        let mut edited = reload(&h, &morning);
        edited.schedule = format!("{minute} 7 * * 1-5");
        service.save_job(edited).unwrap();
        service.set_job_enabled(menu.id, minute % 2 == 0).unwrap();
    }
    // Last iteration disabled the menu job.
    assert_eq!(h.scheduler.installed_jobs(), vec![morning.id]);

    service.set_job_enabled(menu.id, true).unwrap();
    let mut expected = vec![morning.id, menu.id];
    expected.sort();
    assert_eq!(h.scheduler.installed_jobs(), expected);

    h.clock.set(at(2026, 10, 19, 7, 9));
    assert_eq!(h.scheduler.due_jobs(), vec![morning.id]);
    assert!(h.scheduler.due_jobs().is_empty());
}

#[test]
fn invalid_schedule_is_rejected_and_left_uninstalled() {
    let h = household(at(2026, 10, 19, 6, 0));
    let service = PrintService::new(h.scheduler.clone());
    let job = PrintJob::new("Quebrado", "61 7 * * *", JobType::DailyTasks);

    let err = service.save_job(job.clone()).unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidSchedule { .. }));
    assert!(!h.scheduler.is_installed(job.id));
    assert_eq!(h.scheduler.initialize().unwrap(), 0);
}

/// Transport that holds the first send until released.
struct GatedTransport {
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl PrinterTransport for GatedTransport {
    fn send(&self, _address: &str, _payload: &[u8]) -> Result<(), TransportError> {
        self.entered.lock().unwrap().send(()).unwrap();
        self.release.lock().unwrap().recv().unwrap();
        Ok(())
    }

    fn probe(&self, _address: &str) -> bool {
        true
    }
}

#[test]
fn overlapping_run_of_the_same_job_is_skipped() {
    let store = InMemoryPrintStore::arc();
    store.set_printer_settings(PrinterSettings::new("192.168.0.50", "Casa Azul"));
    store.insert_task(Task::new("Varrer a sala", "FREQ=DAILY"));
    let job = PrintJob::new("Manhã", "0 7 * * *", JobType::DailyTasks);
    store.save_job(&job).unwrap();

    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let transport = GatedTransport {
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
    };
    let scheduler = Arc::new(
        Scheduler::new(store.clone(), transport)
            .with_clock(Arc::new(FixedClock::new(at(2026, 10, 19, 7, 0)))),
    );

    let first = {
        let scheduler = scheduler.clone();
        thread::spawn(move || scheduler.execute(job.id))
    };
    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(scheduler.is_running(job.id));

    let second = scheduler.execute(job.id).unwrap();
    assert!(second.is_skipped());
    assert_eq!(second.message.as_deref(), Some("job is already running"));

    release_tx.send(()).unwrap();
    assert!(first.join().unwrap().unwrap().is_success());
    assert!(!scheduler.is_running(job.id));

    let statuses: Vec<_> = store
        .load_job(job.id)
        .unwrap()
        .unwrap()
        .logs
        .iter()
        .map(|l| l.status)
        .collect();
    assert_eq!(statuses, vec![PrintRunStatus::Skipped, PrintRunStatus::Success]);
}

#[test]
fn runtime_fires_a_due_trigger_once_per_minute() {
    let h = household_with(
        at(2026, 10, 19, 7, 0),
        SchedulerConfig::default().with_tick_interval(Duration::from_millis(10)),
    );
    h.store.insert_task(Task::new("Varrer a sala", "FREQ=DAILY"));
    let job = saved(&h, PrintJob::new("Manhã", "0 7 * * *", JobType::DailyTasks));
    h.scheduler.initialize().unwrap();

    let handle = h.scheduler.clone().spawn().unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);
    while reload(&h, &job).last_run_at.is_none() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    // Let a few more ticks pass inside the same minute.
    thread::sleep(Duration::from_millis(50));
    let stats = handle.stats();
    handle.shutdown();

    assert_eq!(h.transport.payloads().len(), 1);
    assert_eq!(stats.jobs_fired, 1);
    assert_eq!(stats.runs_succeeded, 1);
    assert!(stats.ticks > 1);
}

/// Delegates to the in-memory store but cannot persist `last_run_at`.
struct LastRunUnwritable(Arc<InMemoryPrintStore>);

impl PrintStore for LastRunUnwritable {
    fn load_job(&self, job_id: PrintJobId) -> Result<Option<PrintJob>, StoreError> {
        self.0.load_job(job_id)
    }

    fn list_jobs(&self) -> Result<Vec<PrintJob>, StoreError> {
        self.0.list_jobs()
    }

    fn save_job(&self, job: &PrintJob) -> Result<(), StoreError> {
        self.0.save_job(job)
    }

    fn delete_job(&self, job_id: PrintJobId) -> Result<bool, StoreError> {
        self.0.delete_job(job_id)
    }

    fn load_due_tasks(
        &self,
        date: NaiveDate,
        employee: Option<EmployeeId>,
    ) -> Result<DueTasks, StoreError> {
        self.0.load_due_tasks(date, employee)
    }

    fn load_employee(&self, employee_id: EmployeeId) -> Result<Option<Employee>, StoreError> {
        self.0.load_employee(employee_id)
    }

    fn load_day_menu(&self, date: NaiveDate) -> Result<Option<DayMenu>, StoreError> {
        self.0.load_day_menu(date)
    }

    fn load_printer_settings(&self) -> Result<Option<PrinterSettings>, StoreError> {
        self.0.load_printer_settings()
    }

    fn mark_one_off_consumed(&self, ids: &[TaskId], at: DateTime<Utc>) -> Result<(), StoreError> {
        self.0.mark_one_off_consumed(ids, at)
    }

    fn append_print_log(&self, job_id: PrintJobId, entry: PrintLogEntry) -> Result<(), StoreError> {
        self.0.append_print_log(job_id, entry)
    }

    fn update_job_last_run(&self, _job_id: PrintJobId, _at: DateTime<Utc>) -> Result<(), StoreError> {
        Err(StoreError::Storage("disk full".into()))
    }
}

#[test]
fn bookkeeping_failure_after_printing_logs_a_single_failure() {
    let h = household(at(2026, 10, 19, 7, 0));
    h.store.insert_task(Task::new("Varrer a sala", "FREQ=DAILY"));
    let job = saved(&h, PrintJob::new("Manhã", "0 7 * * *", JobType::DailyTasks));
    let scheduler = Scheduler::new(LastRunUnwritable(h.store.clone()), h.transport.clone())
        .with_clock(h.clock.clone());

    let err = scheduler.execute(job.id).unwrap_err();
    assert!(matches!(err, SchedulerError::Store(StoreError::Storage(_))));
    assert_eq!(h.transport.payloads().len(), 1);

    let job = reload(&h, &job);
    assert!(job.last_run_at.is_none());
    let statuses: Vec<_> = job.logs.iter().map(|l| l.status).collect();
    assert_eq!(statuses, vec![PrintRunStatus::Failed]);
    assert!(job.logs[0].message.as_deref().unwrap().contains("disk full"));
}
