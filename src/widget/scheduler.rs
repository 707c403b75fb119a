//! Deferred widget steps
//!
//! Opening waits one animation frame before revealing the iframe; closing
//! waits for the settle delay before removing it from layout. Both are
//! scheduled through a `Scheduler`, and every handle can be cancelled. The
//! widget cancels its pending handle whenever a new transition starts.

use std::collections::BTreeMap;
use std::time::Duration;

/// Identifies one scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

impl TaskHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// What to run when a task fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Fade/slide the iframe into its resting position
    Reveal,
    /// Remove the hidden iframe from layout
    Settle,
}

/// When a task fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferral {
    /// After the host has painted the next frame
    NextFrame,
    /// After a fixed delay
    After(Duration),
}

/// Timer and animation-frame capability
pub trait Scheduler {
    /// Schedule `task`; the returned handle is delivered back through
    /// `Widget::run_task` when it fires.
    fn schedule(&mut self, deferral: Deferral, task: Task) -> TaskHandle;

    /// Cancel a task. Unknown or already fired handles are ignored.
    fn cancel(&mut self, handle: TaskHandle);

    /// Monotonic time since the scheduler was created.
    fn now(&self) -> Duration;
}

/// Deterministic scheduler driven by hand
///
/// Frames and time only move when the owner calls `next_frame` or `advance`.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    clock: Duration,
    next_id: u64,
    frame_queue: Vec<(TaskHandle, Task)>,
    /// Keyed by (deadline, handle) so equal deadlines fire in schedule order
    timers: BTreeMap<(Duration, TaskHandle), Task>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to fire
    pub fn pending(&self) -> usize {
        self.frame_queue.len() + self.timers.len()
    }

    pub fn is_scheduled(&self, handle: TaskHandle) -> bool {
        self.frame_queue.iter().any(|(h, _)| *h == handle)
            || self.timers.keys().any(|(_, h)| *h == handle)
    }

    /// Fire every task waiting for the next animation frame.
    pub fn next_frame(&mut self) -> Vec<(TaskHandle, Task)> {
        std::mem::take(&mut self.frame_queue)
    }

    /// Move the clock forward and return the timers that expired, in
    /// deadline order.
    pub fn advance(&mut self, by: Duration) -> Vec<(TaskHandle, Task)> {
        self.clock += by;
        let pending = self.timers.split_off(&(self.clock + Duration::from_nanos(1), TaskHandle(0)));
        let due = std::mem::replace(&mut self.timers, pending);
        due.into_iter()
            .map(|((_, handle), task)| (handle, task))
            .collect()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, deferral: Deferral, task: Task) -> TaskHandle {
        let handle = TaskHandle(self.next_id);
        self.next_id += 1;
        match deferral {
            Deferral::NextFrame => self.frame_queue.push((handle, task)),
            Deferral::After(delay) => {
                self.timers.insert((self.clock + delay, handle), task);
            }
        }
        handle
    }

    fn cancel(&mut self, handle: TaskHandle) {
        self.frame_queue.retain(|(h, _)| *h != handle);
        self.timers.retain(|(_, h), _| *h != handle);
    }

    fn now(&self) -> Duration {
        self.clock
    }
}
