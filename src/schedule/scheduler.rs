use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread::{self, ThreadId};

use crate::time::convert::millis_to_nanos;
use crate::time::{Clock, ControlledClock, Timestamp};
use crate::{Error, Result};

/// Work queued on a [`ControlledScheduler`]. Tasks may schedule more work.
pub type Task = Box<dyn FnOnce(&ControlledScheduler) -> anyhow::Result<()> + Send>;

struct Entry {
    at: i64,
    seq: u64,
    task: Task,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed so the max-heap pops the earliest time, then the earliest insert.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Deterministic scheduler driven by virtual time.
///
/// Queued tasks run only when a `run_*` method drains them; the clock moves
/// to each task's fire time as it runs and never goes backwards. Drains are
/// serialised, while scheduling stays possible from any thread, including
/// from inside a running task. Queued tasks cannot be cancelled.
pub struct ControlledScheduler {
    clock: ControlledClock,
    seq: AtomicU64,
    queue: Mutex<BinaryHeap<Entry>>,
    drain: Mutex<()>,
    drain_owner: Mutex<Option<ThreadId>>,
}

struct DrainGuard<'a> {
    scheduler: &'a ControlledScheduler,
    _held: MutexGuard<'a, ()>,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        *lock(&self.scheduler.drain_owner) = None;
    }
}

impl Default for ControlledScheduler {
    fn default() -> Self {
        Self::new(Timestamp::EPOCH)
    }
}

impl ControlledScheduler {
    pub fn new(start: Timestamp) -> Self {
        Self {
            clock: ControlledClock::new(start),
            seq: AtomicU64::new(0),
            queue: Mutex::new(BinaryHeap::new()),
            drain: Mutex::new(()),
            drain_owner: Mutex::new(None),
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        lock(&self.queue).len()
    }

    pub fn schedule_at<F>(&self, at: Timestamp, task: F)
    where
        F: FnOnce(&ControlledScheduler) -> anyhow::Result<()> + Send + 'static,
    {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        lock(&self.queue).push(Entry {
            at: at.nanos(),
            seq,
            task: Box::new(task),
        });
    }

    pub fn schedule_at_epoch_millis<F>(&self, epoch_millis: i64, task: F) -> Result<()>
    where
        F: FnOnce(&ControlledScheduler) -> anyhow::Result<()> + Send + 'static,
    {
        let at = Timestamp::try_from_nanos(millis_to_nanos(epoch_millis)?)?;
        self.schedule_at(at, task);
        Ok(())
    }

    /// Schedule relative to the current virtual time.
    pub fn schedule_after_delay<F>(&self, delay_nanos: i64, task: F) -> Result<()>
    where
        F: FnOnce(&ControlledScheduler) -> anyhow::Result<()> + Send + 'static,
    {
        let at = self.now().checked_add_nanos(delay_nanos)?;
        self.schedule_at(at, task);
        Ok(())
    }

    pub fn schedule_after_delay_millis<F>(&self, delay_millis: i64, task: F) -> Result<()>
    where
        F: FnOnce(&ControlledScheduler) -> anyhow::Result<()> + Send + 'static,
    {
        self.schedule_after_delay(millis_to_nanos(delay_millis)?, task)
    }

    /// Schedule at the current virtual time; runs on the next drain.
    pub fn schedule_immediately<F>(&self, task: F)
    where
        F: FnOnce(&ControlledScheduler) -> anyhow::Result<()> + Send + 'static,
    {
        self.schedule_at(self.now(), task);
    }

    /// Virtual time `delay_millis` from now.
    pub fn time_after_millis(&self, delay_millis: i64) -> Result<Timestamp> {
        self.now().checked_add_nanos(millis_to_nanos(delay_millis)?)
    }

    fn begin_drain(&self) -> Result<DrainGuard<'_>> {
        let me = thread::current().id();
        if *lock(&self.drain_owner) == Some(me) {
            return Err(Error::InvalidArgument(
                "scheduler drained from inside one of its own tasks".into(),
            ));
        }
        let held = lock(&self.drain);
        *lock(&self.drain_owner) = Some(me);
        Ok(DrainGuard {
            scheduler: self,
            _held: held,
        })
    }

    /// Pop the earliest entry if `ready` accepts its fire time.
    fn pop_if(&self, ready: impl Fn(i64) -> bool) -> Option<Entry> {
        let mut queue = lock(&self.queue);
        if ready(queue.peek()?.at) {
            queue.pop()
        } else {
            None
        }
    }

    fn run_entry(&self, entry: Entry) -> Result<()> {
        if let Some(at) = Timestamp::from_nanos(entry.at) {
            if at > self.now() {
                self.clock.set_time(at);
            }
        }
        (entry.task)(self).map_err(|e| {
            log::error!("scheduled task at {} failed: {e:#}", entry.at);
            Error::Task(e)
        })
    }

    /// Run the earliest queued task, if any. Returns whether one ran.
    pub fn run_one(&self) -> Result<bool> {
        let _drain = self.begin_drain()?;
        match self.pop_if(|_| true) {
            Some(entry) => self.run_entry(entry).map(|()| true),
            None => Ok(false),
        }
    }

    /// Run tasks due strictly before `max(now, until)`, then move the clock there.
    pub fn run_until(&self, until: Timestamp) -> Result<()> {
        let _drain = self.begin_drain()?;
        while let Some(entry) = self.pop_if(|at| at < self.now().nanos().max(until.nanos())) {
            self.run_entry(entry)?;
        }
        self.advance_to(until);
        Ok(())
    }

    /// Run tasks due at or before `max(now, through)`, then move the clock there.
    pub fn run_through(&self, through: Timestamp) -> Result<()> {
        let _drain = self.begin_drain()?;
        while let Some(entry) = self.pop_if(|at| at <= self.now().nanos().max(through.nanos())) {
            self.run_entry(entry)?;
        }
        self.advance_to(through);
        Ok(())
    }

    pub fn run_through_millis(&self, through_millis: i64) -> Result<()> {
        self.run_through(Timestamp::try_from_nanos(millis_to_nanos(through_millis)?)?)
    }

    /// Run tasks until the queue is empty, including any they schedule.
    pub fn run_until_queue_empty(&self) -> Result<()> {
        let _drain = self.begin_drain()?;
        while let Some(entry) = self.pop_if(|_| true) {
            self.run_entry(entry)?;
        }
        Ok(())
    }

    fn advance_to(&self, t: Timestamp) {
        if t > self.now() {
            self.clock.set_time(t);
        }
    }
}

impl Clock for ControlledScheduler {
    fn current_time_nanos(&self) -> i64 {
        self.clock.current_time_nanos()
    }
}

impl fmt::Debug for ControlledScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlledScheduler")
            .field("now", &self.now().nanos())
            .field("pending", &self.pending())
            .finish()
    }
}
