//! Scheduler collaborator and its tokio-backed implementation

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::{TimerError, TimerResult};
use crate::timer::TimerId;

/// Granularity of timer delays and intervals
pub const TIMER_RESOLUTION: Duration = Duration::from_millis(100);

const TICKS_PER_SECOND: f32 = 10.0;

/// Callback invoked every time a timer fires
pub type TimerCallback = Arc<dyn Fn(TimerId) + Send + Sync>;

/// Lifecycle of a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Waiting for its next fire
    Scheduled,
    /// Callback currently running
    Executing,
    /// Repeats exhausted or cancelled
    Finished,
}

impl TimerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => TimerState::Scheduled,
            1 => TimerState::Executing,
            _ => TimerState::Finished,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            TimerState::Scheduled => 0,
            TimerState::Executing => 1,
            TimerState::Finished => 2,
        }
    }
}

/// Validated, quantized timer parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSpec {
    initial_delay: Duration,
    repeat_count: i64,
    interval: Duration,
}

impl TimerSpec {
    /// Builds a timer spec from seconds
    ///
    /// `repeat_count` is the number of fires after the first one; any
    /// negative count repeats forever. Delay and interval are rounded to
    /// [`TIMER_RESOLUTION`], with anything shorter than one tick (including
    /// a zero, negative or non-finite interval) raised to one tick.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the initial delay is not greater than
    /// zero
    pub fn new(
        initial_delay_secs: f32,
        repeat_count: i64,
        interval_secs: f32,
    ) -> TimerResult<Self> {
        if !initial_delay_secs.is_finite() || initial_delay_secs <= 0.0 {
            return Err(TimerError::InvalidArgument(
                "initial delay must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            initial_delay: quantize(initial_delay_secs),
            repeat_count,
            interval: quantize(interval_secs),
        })
    }

    /// Delay before the first fire
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Fires after the first one (negative = infinite)
    pub fn repeat_count(&self) -> i64 {
        self.repeat_count
    }

    /// Delay between consecutive fires
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true if a timer that has fired `fired` times fires again
    pub fn fires_again(&self, fired: u64) -> bool {
        match u64::try_from(self.repeat_count) {
            Ok(repeats) => fired <= repeats,
            Err(_) => true,
        }
    }
}

fn quantize(secs: f32) -> Duration {
    if !secs.is_finite() {
        return TIMER_RESOLUTION;
    }
    let ticks = (secs * TICKS_PER_SECOND).round().max(1.0) as u32;
    TIMER_RESOLUTION * ticks
}

/// Opaque handle the scheduler returns for a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchedulerHandle(u64);

impl SchedulerHandle {
    /// Wraps a scheduler-specific handle value
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw handle value
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Time-keeping collaborator driving timer fires
///
/// Implementations must be safe to call from any thread. Querying a handle
/// the scheduler no longer knows about returns false.
pub trait Scheduler: Send + Sync {
    /// Starts a timer and returns its handle
    fn schedule(&self, timer: TimerId, spec: TimerSpec) -> SchedulerHandle;

    /// Stops a timer; unknown handles are ignored
    fn cancel(&self, handle: SchedulerHandle);

    /// Returns true until the timer is cancelled or its repeats run out
    fn is_running(&self, handle: SchedulerHandle) -> bool;

    /// Returns true while the timer's callback is running
    fn is_executing(&self, handle: SchedulerHandle) -> bool;
}

struct ScheduledTask {
    state: Arc<AtomicU8>,
    task: JoinHandle<()>,
}

// Marks the timer finished however its task ends (exhausted, aborted, panicked)
struct FinishOnDrop(Arc<AtomicU8>);

impl Drop for FinishOnDrop {
    fn drop(&mut self) {
        self.0.store(TimerState::Finished.as_u8(), Ordering::SeqCst);
    }
}

/// Scheduler running every timer as a task on a tokio runtime
pub struct TokioScheduler {
    runtime: Handle,
    on_fire: TimerCallback,
    next_handle: AtomicU64,
    tasks: Mutex<HashMap<SchedulerHandle, ScheduledTask>>,
}

impl TokioScheduler {
    /// Creates a scheduler spawning onto the given runtime
    pub fn new<F>(runtime: Handle, on_fire: F) -> Self
    where
        F: Fn(TimerId) + Send + Sync + 'static,
    {
        Self::with_callback(runtime, Arc::new(on_fire))
    }

    /// Creates a scheduler from an already shared callback
    pub fn with_callback(runtime: Handle, on_fire: TimerCallback) -> Self {
        Self {
            runtime,
            on_fire,
            next_handle: AtomicU64::new(1),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the state of a timer, if the handle is known
    pub fn state(&self, handle: SchedulerHandle) -> Option<TimerState> {
        self.tasks
            .lock()
            .get(&handle)
            .map(|task| TimerState::from_u8(task.state.load(Ordering::SeqCst)))
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, timer: TimerId, spec: TimerSpec) -> SchedulerHandle {
        let handle = SchedulerHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        let state = Arc::new(AtomicU8::new(TimerState::Scheduled.as_u8()));

        let task_state = Arc::clone(&state);
        let on_fire = Arc::clone(&self.on_fire);

        let task = self.runtime.spawn(async move {
            let _finish = FinishOnDrop(Arc::clone(&task_state));
            let mut fired: u64 = 0;

            tokio::time::sleep(spec.initial_delay()).await;
            loop {
                task_state.store(TimerState::Executing.as_u8(), Ordering::SeqCst);
                trace!("Timer {} firing", timer);
                on_fire(timer);
                fired += 1;

                if !spec.fires_again(fired) {
                    debug!("Timer {} finished after {} fires", timer, fired);
                    break;
                }

                task_state.store(TimerState::Scheduled.as_u8(), Ordering::SeqCst);
                tokio::time::sleep(spec.interval()).await;
            }
        });

        self.tasks.lock().insert(handle, ScheduledTask { state, task });
        handle
    }

    fn cancel(&self, handle: SchedulerHandle) {
        if let Some(scheduled) = self.tasks.lock().remove(&handle) {
            scheduled.task.abort();
            scheduled
                .state
                .store(TimerState::Finished.as_u8(), Ordering::SeqCst);
        }
    }

    fn is_running(&self, handle: SchedulerHandle) -> bool {
        matches!(
            self.state(handle),
            Some(TimerState::Scheduled | TimerState::Executing)
        )
    }

    fn is_executing(&self, handle: SchedulerHandle) -> bool {
        self.state(handle) == Some(TimerState::Executing)
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, scheduled) in self.tasks.lock().drain() {
            scheduled.task.abort();
        }
    }
}
