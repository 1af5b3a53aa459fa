//! Cooperative periodic scheduler
//!
//! The tick interrupt walks the task table and pushes due task bodies onto
//! the ready queue. The main loop drains that queue outside of interrupt
//! context. Both halves share one `Inner` behind a critical-section mutex,
//! and task bodies always run with the lock released.

use core::cell::RefCell;

use critical_section::Mutex;
use ufmt::derive::uDebug;

use super::queue::ReadyQueue;
use super::task::{TaskDescriptor, TaskHandle, TaskRef, TaskTable};
use super::{Error, TaskControl, TaskSpawn};

/// Whether the main loop has ready work (`Awake`) or may wait for the next
/// interrupt (`Sleeping`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
pub enum PowerState {
    Sleeping,
    Awake,
}

impl Default for PowerState {
    fn default() -> Self {
        PowerState::Sleeping
    }
}

/// Running counters, mostly for diagnostics over the serial console.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, uDebug)]
pub struct SchedulerStats {
    pub ticks: u32,
    pub enqueued: u32,
    pub dispatched: u32,
    pub dropped: u32,
}

struct Inner<'a, const TASKS: usize, const SLOTS: usize> {
    table: TaskTable<'a, TASKS>,
    queue: ReadyQueue<'a, SLOTS>,
    state: PowerState,
    stats: SchedulerStats,
}

pub struct Scheduler<'a, const TASKS: usize, const SLOTS: usize> {
    inner: Mutex<RefCell<Inner<'a, TASKS, SLOTS>>>,
}

impl<'a, const TASKS: usize, const SLOTS: usize> Scheduler<'a, TASKS, SLOTS> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                table: TaskTable::new(),
                queue: ReadyQueue::new(),
                state: PowerState::Sleeping,
                stats: SchedulerStats {
                    ticks: 0,
                    enqueued: 0,
                    dispatched: 0,
                    dropped: 0,
                },
            })),
        }
    }

    /// Appends a periodic task. `initial_countdown_ms` is the delay before
    /// the first activation; `period_ms` must be positive.
    pub fn register(
        &self,
        task: TaskRef<'a>,
        period_ms: i32,
        initial_countdown_ms: i32,
        active: bool,
    ) -> Result<TaskHandle, Error> {
        if period_ms <= 0 {
            crate::log_warn!("sched: rejected period {}", period_ms);
            return Err(Error::InvalidPeriod);
        }

        let result = critical_section::with(|cs| {
            self.inner.borrow_ref_mut(cs).table.push(TaskDescriptor::new(
                task,
                period_ms,
                initial_countdown_ms,
                active,
            ))
        });

        match result {
            Ok(handle) => {
                crate::log_debug!("sched: task {} every {}ms", handle.index(), period_ms);
            }
            Err(_) => {
                crate::log_error!("sched: task table full ({})", TASKS);
            }
        }
        result
    }

    /// Removes the most recently registered task.
    pub fn deregister_last(&self) -> Option<TaskHandle> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).table.pop())
    }

    pub fn set_active(&self, handle: TaskHandle, active: bool) -> Result<(), Error> {
        critical_section::with(|cs| {
            self.inner
                .borrow_ref_mut(cs)
                .table
                .get_mut(handle)
                .map(|task| task.set_active(active))
        })
    }

    /// Changes the period of a task. A countdown already in flight is not
    /// shortened; the new period takes effect at the next activation.
    pub fn set_period(&self, handle: TaskHandle, period_ms: i32) -> Result<(), Error> {
        if period_ms <= 0 {
            crate::log_warn!("sched: rejected period {}", period_ms);
            return Err(Error::InvalidPeriod);
        }
        critical_section::with(|cs| {
            self.inner
                .borrow_ref_mut(cs)
                .table
                .get_mut(handle)
                .map(|task| task.set_period(period_ms))
        })
    }

    /// Reloads a task's countdown from its current period, so that a
    /// period changed from inside the task's own body applies right away.
    pub fn restart(&self, handle: TaskHandle) -> Result<(), Error> {
        critical_section::with(|cs| {
            self.inner
                .borrow_ref_mut(cs)
                .table
                .get_mut(handle)
                .map(TaskDescriptor::restart)
        })
    }

    /// Queues a one-shot task body, typically from another interrupt
    /// handler. Wakes the main loop on success.
    pub fn enqueue_external(&self, task: TaskRef<'a>) -> Result<(), Error> {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            match inner.queue.enqueue(task) {
                Ok(()) => {
                    inner.stats.enqueued = inner.stats.enqueued.wrapping_add(1);
                    inner.state = PowerState::Awake;
                    Ok(())
                }
                Err(e) => {
                    inner.stats.dropped = inner.stats.dropped.wrapping_add(1);
                    Err(e)
                }
            }
        })
    }

    /// Timer tick entry point. Advances every active countdown by
    /// `elapsed_ms` and queues due tasks in table order. Returns how many
    /// were queued.
    ///
    /// A due task whose body does not fit in the queue is dropped for this
    /// period; its countdown is reset all the same.
    pub fn tick(&self, elapsed_ms: i32) -> usize {
        critical_section::with(|cs| {
            let mut guard = self.inner.borrow_ref_mut(cs);
            let inner = &mut *guard;
            let mut queued = 0;

            inner.stats.ticks = inner.stats.ticks.wrapping_add(1);
            for task in inner.table.iter_mut() {
                if !task.advance(elapsed_ms) {
                    continue;
                }
                match inner.queue.enqueue(task.task()) {
                    Ok(()) => queued += 1,
                    Err(_) => {
                        inner.stats.dropped = inner.stats.dropped.wrapping_add(1);
                        crate::log_debug!("sched: queue full, activation dropped");
                    }
                }
            }

            inner.stats.enqueued = inner.stats.enqueued.wrapping_add(queued as u32);
            if queued > 0 && inner.state == PowerState::Sleeping {
                inner.state = PowerState::Awake;
            }
            queued
        })
    }

    /// Runs every ready task body, oldest first, until the queue is empty,
    /// then goes back to `Sleeping`. Returns the number of bodies run.
    pub fn drain(&self) -> usize {
        let mut executed = 0;
        while let Some(task) = self.next_ready() {
            task.run();
            executed += 1;
        }
        executed
    }

    // The empty check and the state change share one critical section, so
    // a tick landing right after the last dequeue leaves the state `Awake`.
    fn next_ready(&self) -> Option<TaskRef<'a>> {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            match inner.queue.dequeue() {
                Some(task) => {
                    inner.stats.dispatched = inner.stats.dispatched.wrapping_add(1);
                    Some(task)
                }
                None => {
                    inner.state = PowerState::Sleeping;
                    None
                }
            }
        })
    }

    pub fn power_state(&self) -> PowerState {
        critical_section::with(|cs| self.inner.borrow_ref(cs).state)
    }

    #[inline]
    pub fn is_awake(&self) -> bool {
        self.power_state() == PowerState::Awake
    }

    pub fn period(&self, handle: TaskHandle) -> Result<i32, Error> {
        critical_section::with(|cs| {
            self.inner
                .borrow_ref(cs)
                .table
                .get(handle)
                .map(TaskDescriptor::period_ms)
        })
    }

    pub fn countdown(&self, handle: TaskHandle) -> Result<i32, Error> {
        critical_section::with(|cs| {
            self.inner
                .borrow_ref(cs)
                .table
                .get(handle)
                .map(TaskDescriptor::countdown_ms)
        })
    }

    pub fn is_active(&self, handle: TaskHandle) -> Result<bool, Error> {
        critical_section::with(|cs| {
            self.inner
                .borrow_ref(cs)
                .table
                .get(handle)
                .map(TaskDescriptor::is_active)
        })
    }

    /// Number of registered periodic tasks.
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.inner.borrow_ref(cs).table.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of task bodies waiting in the ready queue.
    pub fn pending(&self) -> usize {
        critical_section::with(|cs| self.inner.borrow_ref(cs).queue.len())
    }

    pub fn stats(&self) -> SchedulerStats {
        critical_section::with(|cs| self.inner.borrow_ref(cs).stats)
    }
}

impl<'a, const TASKS: usize, const SLOTS: usize> Default for Scheduler<'a, TASKS, SLOTS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, const TASKS: usize, const SLOTS: usize> TaskControl for Scheduler<'a, TASKS, SLOTS> {
    fn set_active(&self, handle: TaskHandle, active: bool) -> Result<(), Error> {
        Scheduler::set_active(self, handle, active)
    }

    fn set_period(&self, handle: TaskHandle, period_ms: i32) -> Result<(), Error> {
        Scheduler::set_period(self, handle, period_ms)
    }

    fn restart(&self, handle: TaskHandle) -> Result<(), Error> {
        Scheduler::restart(self, handle)
    }
}

impl<'a, const TASKS: usize, const SLOTS: usize> TaskSpawn<'a> for Scheduler<'a, TASKS, SLOTS> {
    fn register(
        &self,
        task: TaskRef<'a>,
        period_ms: i32,
        initial_countdown_ms: i32,
        active: bool,
    ) -> Result<TaskHandle, Error> {
        Scheduler::register(self, task, period_ms, initial_countdown_ms, active)
    }

    fn enqueue_external(&self, task: TaskRef<'a>) -> Result<(), Error> {
        Scheduler::enqueue_external(self, task)
    }
}

/// Fluent registration helper.
///
/// ```ignore
/// let handle = TaskBuilder::new(&update_temperature)
///     .period(5500)
///     .register(&SCHEDULER)?;
/// ```
pub struct TaskBuilder<'a> {
    task: TaskRef<'a>,
    period_ms: i32,
    delay_ms: Option<i32>,
    active: bool,
}

impl<'a> TaskBuilder<'a> {
    pub fn new(task: TaskRef<'a>) -> Self {
        Self {
            task,
            period_ms: 1000,
            delay_ms: None,
            active: true,
        }
    }

    pub fn period(mut self, period_ms: i32) -> Self {
        self.period_ms = period_ms;
        self
    }

    /// Delay before the first activation. Defaults to one period.
    pub fn delay(mut self, delay_ms: i32) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn register(self, spawner: &dyn TaskSpawn<'a>) -> Result<TaskHandle, Error> {
        spawner.register(
            self.task,
            self.period_ms,
            self.delay_ms.unwrap_or(self.period_ms),
            self.active,
        )
    }
}
