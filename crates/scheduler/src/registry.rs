//! Live trigger registry.
//!
//! One [`SchedulerState`] per scheduler instance, always accessed through the
//! scheduler's mutex. Holds at most one trigger per job id.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDateTime, Timelike};
use homeprint_core::PrintJobId;

use crate::cron::CronSchedule;

#[derive(Debug, Clone)]
pub struct Trigger {
    pub job_id: PrintJobId,
    pub schedule: CronSchedule,
    /// Minute this trigger last fired, so a minute never fires twice.
    pub last_fired: Option<NaiveDateTime>,
}

impl Trigger {
    pub fn new(job_id: PrintJobId, schedule: CronSchedule) -> Self {
        Self {
            job_id,
            schedule,
            last_fired: None,
        }
    }

    /// Continue from a replaced trigger so an edit does not re-fire the current minute.
    pub fn continuing(mut self, previous: Option<&Trigger>) -> Self {
        self.last_fired = previous.and_then(|p| p.last_fired);
        self
    }
}

#[derive(Debug, Default)]
pub struct SchedulerState {
    triggers: HashMap<PrintJobId, Trigger>,
    running: HashSet<PrintJobId>,
    initialized: bool,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any existing trigger for the same job and returns it.
    pub fn install(&mut self, trigger: Trigger) -> Option<Trigger> {
        self.triggers.insert(trigger.job_id, trigger)
    }

    pub fn uninstall(&mut self, job_id: PrintJobId) -> Option<Trigger> {
        self.triggers.remove(&job_id)
    }

    pub fn contains(&self, job_id: PrintJobId) -> bool {
        self.triggers.contains_key(&job_id)
    }

    pub fn trigger(&self, job_id: PrintJobId) -> Option<&Trigger> {
        self.triggers.get(&job_id)
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn job_ids(&self) -> Vec<PrintJobId> {
        let mut ids: Vec<_> = self.triggers.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Triggers matching `now`'s minute that have not fired in it yet; marks them fired.
    pub fn take_due(&mut self, now: NaiveDateTime) -> Vec<PrintJobId> {
        let Some(minute) = now.with_second(0).and_then(|t| t.with_nanosecond(0)) else {
            return Vec::new();
        };
        let mut due = Vec::new();
        for trigger in self.triggers.values_mut() {
            if trigger.last_fired != Some(minute) && trigger.schedule.matches(&minute) {
                trigger.last_fired = Some(minute);
                due.push(trigger.job_id);
            }
        }
        due.sort();
        due
    }

    pub fn next_run_at(&self, job_id: PrintJobId, after: NaiveDateTime) -> Option<NaiveDateTime> {
        self.triggers.get(&job_id)?.schedule.next_after(&after)
    }

    /// Claim the job for one execution; false while another one is in flight.
    pub fn begin_run(&mut self, job_id: PrintJobId) -> bool {
        self.running.insert(job_id)
    }

    pub fn end_run(&mut self, job_id: PrintJobId) {
        self.running.remove(&job_id);
    }

    pub fn is_running(&self, job_id: PrintJobId) -> bool {
        self.running.contains(&job_id)
    }

    /// First call returns true; later calls return false.
    pub fn mark_initialized(&mut self) -> bool {
        !std::mem::replace(&mut self.initialized, true)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn every_minute() -> CronSchedule {
        CronSchedule::parse("* * * * *").unwrap()
    }

    #[test]
    fn reinstall_keeps_a_single_trigger() {
        let mut state = SchedulerState::new();
        let id = PrintJobId::new();
        for _ in 0..5 {
            state.install(Trigger::new(id, every_minute()));
        }
        assert_eq!(state.len(), 1);
        assert!(state.uninstall(id).is_some());
        assert!(state.is_empty());
    }

    #[test]
    fn fires_once_per_minute() {
        let mut state = SchedulerState::new();
        let id = PrintJobId::new();
        state.install(Trigger::new(id, every_minute()));

        assert_eq!(state.take_due(at(7, 0, 1)), vec![id]);
        assert!(state.take_due(at(7, 0, 30)).is_empty());
        assert_eq!(state.take_due(at(7, 1, 0)), vec![id]);
    }

    #[test]
    fn reinstall_in_same_minute_does_not_refire() {
        let mut state = SchedulerState::new();
        let id = PrintJobId::new();
        state.install(Trigger::new(id, every_minute()));
        assert_eq!(state.take_due(at(7, 0, 0)).len(), 1);

        let previous = state.uninstall(id);
        state.install(Trigger::new(id, every_minute()).continuing(previous.as_ref()));
        assert!(state.take_due(at(7, 0, 20)).is_empty());
    }

    #[test]
    fn run_claims_are_exclusive() {
        let mut state = SchedulerState::new();
        let id = PrintJobId::new();
        assert!(state.begin_run(id));
        assert!(!state.begin_run(id));
        state.end_run(id);
        assert!(state.begin_run(id));
    }

    #[test]
    fn initialization_happens_once() {
        let mut state = SchedulerState::new();
        assert!(state.mark_initialized());
        assert!(!state.mark_initialized());
    }
}
