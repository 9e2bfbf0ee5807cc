//! Single-threaded timer scheduling
//!
//! Debounced bindings need exactly one kind of delayed work: "run this at
//! time T unless cancelled first". [`Scheduler`] is that seam.
//! [`ManualScheduler`] is a deterministic timer queue: the host pumps it from
//! its run loop (`advance_to(Utc::now())` on each tick) and tests drive it
//! with synthetic timestamps.

use chrono::{DateTime, Duration, Utc};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};

/// Deferred unit of work
pub type Task = Box<dyn FnOnce()>;

/// Identifier of a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Cancellable one-shot timers on the calling thread
pub trait Scheduler {
    /// Current time as seen by this scheduler
    fn now(&self) -> DateTime<Utc>;

    /// Run `task` once `deadline` has been reached
    fn schedule_at(&self, deadline: DateTime<Utc>, task: Task) -> TimerId;

    /// Cancel a pending task. Returns false if it already ran or was cancelled.
    fn cancel(&self, id: TimerId) -> bool;
}

/// Timer queue driven explicitly by its owner.
///
/// Timers fire in deadline order; timers sharing a deadline fire in the order
/// they were scheduled.
pub struct ManualScheduler {
    now: Cell<DateTime<Utc>>,
    next_id: Cell<u64>,
    timers: RefCell<BTreeMap<(DateTime<Utc>, TimerId), Task>>,
    deadlines: RefCell<HashMap<TimerId, DateTime<Utc>>>,
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("now", &self.now.get())
            .field("pending", &self.pending())
            .finish()
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl ManualScheduler {
    /// Create a scheduler whose clock starts at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(start),
            next_id: Cell::new(0),
            timers: RefCell::new(BTreeMap::new()),
            deadlines: RefCell::new(HashMap::new()),
        }
    }

    /// Number of timers waiting to fire
    pub fn pending(&self) -> usize {
        self.deadlines.borrow().len()
    }

    /// Deadline of the earliest pending timer
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.timers.borrow().keys().next().map(|(deadline, _)| *deadline)
    }

    /// Move the clock forward to `target`, firing every timer due by then.
    ///
    /// Tasks may schedule or cancel other timers; newly scheduled timers that
    /// are already due fire within the same call. The clock never moves
    /// backwards. Returns the number of tasks run.
    pub fn advance_to(&self, target: DateTime<Utc>) -> usize {
        let mut fired = 0;

        loop {
            let due = {
                let mut timers = self.timers.borrow_mut();
                match timers.keys().next().copied() {
                    Some(key) if key.0 <= target => timers.remove(&key).map(|task| (key, task)),
                    _ => None,
                }
            };

            let Some(((deadline, id), task)) = due else {
                break;
            };

            self.deadlines.borrow_mut().remove(&id);
            if deadline > self.now.get() {
                self.now.set(deadline);
            }
            task();
            fired += 1;
        }

        if target > self.now.get() {
            self.now.set(target);
        }
        fired
    }

    /// Move the clock forward by `duration`
    pub fn advance_by(&self, duration: Duration) -> usize {
        self.advance_to(self.now.get() + duration)
    }

    /// Fire every pending timer, advancing the clock as far as needed
    pub fn run_until_idle(&self) -> usize {
        let mut fired = 0;
        while let Some(deadline) = self.next_deadline() {
            fired += self.advance_to(deadline);
        }
        fired
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn schedule_at(&self, deadline: DateTime<Utc>, task: Task) -> TimerId {
        let id = TimerId(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);

        self.timers.borrow_mut().insert((deadline, id), task);
        self.deadlines.borrow_mut().insert(id, deadline);
        id
    }

    fn cancel(&self, id: TimerId) -> bool {
        let deadline = self.deadlines.borrow_mut().remove(&id);
        match deadline {
            Some(deadline) => self.timers.borrow_mut().remove(&(deadline, id)).is_some(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::rc::Rc;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
    }

    fn log_task(log: &Rc<RefCell<Vec<&'static str>>>, name: &'static str) -> Task {
        let log = Rc::clone(log);
        Box::new(move || log.borrow_mut().push(name))
    }

    #[test]
    fn test_fires_in_deadline_order() {
        let scheduler = ManualScheduler::new(start());
        let log = Rc::new(RefCell::new(Vec::new()));

        scheduler.schedule_at(start() + Duration::milliseconds(200), log_task(&log, "b"));
        scheduler.schedule_at(start() + Duration::milliseconds(100), log_task(&log, "a"));
        scheduler.schedule_at(start() + Duration::milliseconds(200), log_task(&log, "c"));

        assert_eq!(scheduler.advance_by(Duration::milliseconds(150)), 1);
        assert_eq!(scheduler.advance_by(Duration::milliseconds(50)), 2);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_cancel() {
        let scheduler = ManualScheduler::new(start());
        let log = Rc::new(RefCell::new(Vec::new()));

        let id = scheduler.schedule_at(start() + Duration::milliseconds(10), log_task(&log, "x"));
        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        assert_eq!(scheduler.pending(), 0);

        scheduler.advance_by(Duration::seconds(1));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_clock_tracks_fired_deadline() {
        let scheduler = Rc::new(ManualScheduler::new(start()));
        let observed = Rc::new(Cell::new(None));

        let inner = Rc::clone(&scheduler);
        let sink = Rc::clone(&observed);
        scheduler.schedule_at(
            start() + Duration::milliseconds(300),
            Box::new(move || sink.set(Some(inner.now()))),
        );

        scheduler.advance_by(Duration::seconds(2));
        assert_eq!(observed.get(), Some(start() + Duration::milliseconds(300)));
        assert_eq!(scheduler.now(), start() + Duration::seconds(2));
    }

    #[test]
    fn test_task_can_schedule_due_follow_up() {
        let scheduler = Rc::new(ManualScheduler::new(start()));
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner = Rc::clone(&scheduler);
        let follow_up = log_task(&log, "second");
        let first_log = Rc::clone(&log);
        scheduler.schedule_at(
            start() + Duration::milliseconds(10),
            Box::new(move || {
                first_log.borrow_mut().push("first");
                inner.schedule_at(inner.now() + Duration::milliseconds(10), follow_up);
            }),
        );

        assert_eq!(scheduler.advance_by(Duration::milliseconds(100)), 2);
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_run_until_idle() {
        let scheduler = ManualScheduler::new(start());
        let log = Rc::new(RefCell::new(Vec::new()));
        scheduler.schedule_at(start() + Duration::hours(1), log_task(&log, "late"));

        assert_eq!(scheduler.run_until_idle(), 1);
        assert_eq!(scheduler.now(), start() + Duration::hours(1));
    }
}
