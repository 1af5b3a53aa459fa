//! Cooperative run-to-completion task scheduling

pub mod queue;
pub mod scheduler;
pub mod task;

use ufmt::derive::uDebug;

pub use queue::ReadyQueue;
pub use scheduler::{PowerState, Scheduler, SchedulerStats, TaskBuilder};
pub use task::{Task, TaskDescriptor, TaskHandle, TaskRef, TaskTable};

#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
pub enum Error {
    /// The task table has no free entry.
    CapacityExhausted,
    /// The handle does not refer to a registered task.
    InvalidHandle,
    /// Periods must be strictly positive.
    InvalidPeriod,
    /// The ready queue has no free slot.
    QueueFull,
}

/// Runtime control over already registered tasks.
///
/// Subsystems hold a `&dyn TaskControl` so that they can enable, disable
/// and retime their own tasks without knowing the scheduler's capacities.
pub trait TaskControl: Sync {
    fn set_active(&self, handle: TaskHandle, active: bool) -> Result<(), Error>;

    fn set_period(&self, handle: TaskHandle, period_ms: i32) -> Result<(), Error>;

    fn restart(&self, handle: TaskHandle) -> Result<(), Error>;
}

/// Adding work to the scheduler: periodic registration and one-shot
/// submission from interrupt handlers.
pub trait TaskSpawn<'a>: TaskControl {
    fn register(
        &self,
        task: TaskRef<'a>,
        period_ms: i32,
        initial_countdown_ms: i32,
        active: bool,
    ) -> Result<TaskHandle, Error>;

    fn enqueue_external(&self, task: TaskRef<'a>) -> Result<(), Error>;
}
