//! Sample-locked task scheduling.
//!
//! [`BlockScheduler`] is the graph's first dependent: every block it
//! drains an intake queue and fires any delayed tasks whose time has
//! come. Its notion of "now" is the graph's nanosecond clock, derived
//! from the sample position — if the audio thread falls behind and
//! several blocks are processed in one wall-clock burst, task timing
//! stays self-consistent because it never consults wall time.
//!
//! Tasks can be submitted from any thread; they always *execute* on the
//! audio thread, inside the block update. Keep them short.

use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;

use crate::graph::{Dependent, SampleClock};

/// Errors from the executor-style control surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// Termination is driven by the host's audio device, not the
    /// scheduler; the executor-style shutdown operations are refused.
    #[error("scheduler termination is not supported; the audio device drives shutdown")]
    NotSupported,
}

/// Cancellation handle for a scheduled task.
///
/// Cancellation is cooperative: a cancelled task is dropped at the next
/// point the scheduler would consider firing it. A task already running
/// cannot be interrupted — the executing thread is the audio thread.
#[derive(Clone)]
pub struct TaskHandle {
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    /// Marks the task cancelled.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

enum TaskKind {
    Once(Option<Box<dyn FnOnce() + Send>>),
    Periodic(Box<dyn FnMut() + Send>),
}

struct Delayed {
    /// Absolute fire time in graph nanoseconds. Zero until the intake
    /// drain stamps it against the current clock.
    fire_at: i64,
    delay: i64,
    period: i64,
    /// Submission order, breaking fire-time ties.
    seq: u64,
    kind: TaskKind,
    cancelled: Arc<AtomicBool>,
}

impl PartialEq for Delayed {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.seq == other.seq
    }
}

impl Eq for Delayed {}

impl PartialOrd for Delayed {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Delayed {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.fire_at
            .cmp(&other.fire_at)
            .then(self.seq.cmp(&other.seq))
    }
}

enum Intake {
    Immediate(Box<dyn FnOnce() + Send>),
    Delayed(Delayed),
}

/// Per-block task executor clocked by the graph's sample position.
///
/// Submission ([`execute`](Self::execute), [`schedule`](Self::schedule),
/// [`schedule_at_fixed_rate`](Self::schedule_at_fixed_rate)) is safe
/// from any thread; execution happens in [`Dependent::update`] on the
/// audio thread. Within one block, all pending immediate tasks run
/// before any delayed task firing in that block; delayed tasks fire in
/// time order with submission order breaking ties.
pub struct BlockScheduler {
    intake_tx: Sender<Intake>,
    intake_rx: Receiver<Intake>,
    delayed: Mutex<BinaryHeap<Reverse<Delayed>>>,
    seq: AtomicU64,
}

impl Default for BlockScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockScheduler {
    /// Creates a scheduler with an empty queue.
    pub fn new() -> Self {
        let (intake_tx, intake_rx) = unbounded();
        Self {
            intake_tx,
            intake_rx,
            delayed: Mutex::new(BinaryHeap::new()),
            seq: AtomicU64::new(0),
        }
    }

    /// Runs `task` at the next block boundary.
    pub fn execute(&self, task: impl FnOnce() + Send + 'static) {
        let _ = self.intake_tx.send(Intake::Immediate(Box::new(task)));
    }

    /// Runs `task` once, `delay` after the block that dequeues it.
    pub fn schedule(&self, task: impl FnOnce() + Send + 'static, delay: Duration) -> TaskHandle {
        self.submit(TaskKind::Once(Some(Box::new(task))), delay, Duration::ZERO)
    }

    /// Runs `task` repeatedly: first `initial_delay` after dequeue, then
    /// every `period` of graph time. Re-arming uses `fire_at += period`,
    /// so long-running periods accumulate no drift.
    pub fn schedule_at_fixed_rate(
        &self,
        task: impl FnMut() + Send + 'static,
        initial_delay: Duration,
        period: Duration,
    ) -> TaskHandle {
        self.submit(TaskKind::Periodic(Box::new(task)), initial_delay, period)
    }

    /// Alias for [`schedule_at_fixed_rate`](Self::schedule_at_fixed_rate):
    /// with block-granular execution the two executor flavors coincide.
    pub fn schedule_with_fixed_delay(
        &self,
        task: impl FnMut() + Send + 'static,
        initial_delay: Duration,
        period: Duration,
    ) -> TaskHandle {
        self.schedule_at_fixed_rate(task, initial_delay, period)
    }

    /// Refused — see [`SchedulerError::NotSupported`].
    pub fn shutdown(&self) -> Result<(), SchedulerError> {
        Err(SchedulerError::NotSupported)
    }

    /// Refused — see [`SchedulerError::NotSupported`].
    pub fn shutdown_now(&self) -> Result<(), SchedulerError> {
        Err(SchedulerError::NotSupported)
    }

    /// Refused — see [`SchedulerError::NotSupported`].
    pub fn await_termination(&self, _timeout: Duration) -> Result<bool, SchedulerError> {
        Err(SchedulerError::NotSupported)
    }

    /// Always false; the scheduler lives as long as its graph.
    pub fn is_shutdown(&self) -> bool {
        false
    }

    /// Always false; the scheduler lives as long as its graph.
    pub fn is_terminated(&self) -> bool {
        false
    }

    fn submit(&self, kind: TaskKind, delay: Duration, period: Duration) -> TaskHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let task = Delayed {
            fire_at: 0,
            delay: duration_nanos(delay),
            period: duration_nanos(period),
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            kind,
            cancelled: cancelled.clone(),
        };
        let _ = self.intake_tx.send(Intake::Delayed(task));
        TaskHandle { cancelled }
    }
}

fn duration_nanos(duration: Duration) -> i64 {
    i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX)
}

impl Dependent for BlockScheduler {
    fn update(&self, clock: &SampleClock) {
        let now = clock.nanos();
        let mut heap = self.delayed.lock();

        // Intake first: immediate tasks run right away, delayed tasks
        // get their absolute fire time stamped and join the heap. This
        // ordering is what guarantees immediates precede any delayed
        // task firing this block.
        while let Ok(intake) = self.intake_rx.try_recv() {
            match intake {
                Intake::Immediate(task) => task(),
                Intake::Delayed(mut task) => {
                    if task.cancelled.load(Ordering::Acquire) {
                        continue;
                    }
                    task.fire_at = now + task.delay;
                    heap.push(Reverse(task));
                }
            }
        }

        while let Some(Reverse(head)) = heap.peek() {
            if head.cancelled.load(Ordering::Acquire) {
                heap.pop();
                continue;
            }
            if head.fire_at > now {
                break;
            }
            let Some(Reverse(mut task)) = heap.pop() else {
                break;
            };
            match &mut task.kind {
                TaskKind::Once(slot) => {
                    if let Some(run) = slot.take() {
                        run();
                    }
                }
                TaskKind::Periodic(run) => {
                    run();
                    if task.period > 0 && !task.cancelled.load(Ordering::Acquire) {
                        task.fire_at += task.period;
                        heap.push(Reverse(task));
                    }
                }
            }
        }
    }
}
