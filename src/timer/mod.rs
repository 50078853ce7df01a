//! Timer management
//!
//! The registry hands out timer IDs and keeps track of the timers it
//! created; the scheduler collaborator does the actual time keeping and
//! fires the callbacks.

pub mod registry;
pub mod scheduler;

pub use registry::TimerRegistry;
pub use scheduler::{
    Scheduler, SchedulerHandle, TimerCallback, TimerSpec, TimerState, TokioScheduler,
    TIMER_RESOLUTION,
};

/// Identifier of a registered timer
///
/// Valid IDs are positive; zero and negative values are rejected by every
/// registry operation.
pub type TimerId = i64;
