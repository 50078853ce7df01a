//! Timer registry
//!
//! Owns timer identities. IDs come from a process-wide counter and are never
//! reused, so a stale ID held by a caller can't address a newer timer.
//! Timers that run out of repeats stay tracked until removed explicitly.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::{TimerError, TimerResult};
use crate::timer::scheduler::{Scheduler, SchedulerHandle, TimerSpec};
use crate::timer::TimerId;

static NEXT_TIMER_ID: AtomicI64 = AtomicI64::new(1);

/// Registry of timers created through this client
pub struct TimerRegistry {
    scheduler: Arc<dyn Scheduler>,
    timers: Mutex<BTreeMap<TimerId, SchedulerHandle>>,
}

impl TimerRegistry {
    /// Creates an empty registry on top of a scheduler
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            timers: Mutex::new(BTreeMap::new()),
        }
    }

    /// Adds a timer and returns its ID
    ///
    /// # Arguments
    ///
    /// * `initial_delay` - Seconds before the first fire (0.1s resolution)
    /// * `repeat_count` - Fires after the first one; -1 repeats forever
    /// * `interval` - Seconds between fires (0.1s resolution, at least one tick)
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `initial_delay <= 0`
    pub fn add(
        &self,
        initial_delay: f32,
        repeat_count: i64,
        interval: f32,
    ) -> TimerResult<TimerId> {
        let spec = TimerSpec::new(initial_delay, repeat_count, interval)?;

        let mut timers = self.timers.lock();
        let id = NEXT_TIMER_ID.fetch_add(1, Ordering::SeqCst);
        let handle = self.scheduler.schedule(id, spec);
        timers.insert(id, handle);

        debug!(
            "Added timer {} (delay {:?}, repeats {}, interval {:?})",
            id,
            spec.initial_delay(),
            spec.repeat_count(),
            spec.interval()
        );
        Ok(id)
    }

    /// Removes a timer
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a non-positive ID and `UnknownTimer` if
    /// the ID is not tracked, including when it was already removed
    pub fn remove(&self, id: TimerId) -> TimerResult<()> {
        Self::validate_id(id)?;

        let handle = self
            .timers
            .lock()
            .remove(&id)
            .ok_or(TimerError::UnknownTimer(id))?;

        self.scheduler.cancel(handle);
        debug!("Removed timer {}", id);
        Ok(())
    }

    /// Removes every tracked timer
    pub fn remove_all(&self) {
        let drained = std::mem::take(&mut *self.timers.lock());
        if drained.is_empty() {
            return;
        }

        for handle in drained.values() {
            self.scheduler.cancel(*handle);
        }
        info!("Removed all {} timers", drained.len());
    }

    /// Returns true if the timer is still alive
    ///
    /// Unknown IDs report false.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a non-positive ID
    pub fn is_running(&self, id: TimerId) -> TimerResult<bool> {
        Self::validate_id(id)?;
        Ok(self
            .handle(id)
            .is_some_and(|handle| self.scheduler.is_running(handle)))
    }

    /// Returns true if the timer's callback is currently running
    ///
    /// Unknown IDs report false.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a non-positive ID
    pub fn is_executing(&self, id: TimerId) -> TimerResult<bool> {
        Self::validate_id(id)?;
        Ok(self
            .handle(id)
            .is_some_and(|handle| self.scheduler.is_executing(handle)))
    }

    /// Returns the tracked IDs in ascending order
    pub fn tracked_ids(&self) -> Vec<TimerId> {
        self.timers.lock().keys().copied().collect()
    }

    /// Returns the number of tracked timers
    pub fn len(&self) -> usize {
        self.timers.lock().len()
    }

    /// Returns true if no timers are tracked
    pub fn is_empty(&self) -> bool {
        self.timers.lock().is_empty()
    }

    fn handle(&self, id: TimerId) -> Option<SchedulerHandle> {
        self.timers.lock().get(&id).copied()
    }

    fn validate_id(id: TimerId) -> TimerResult<()> {
        if id <= 0 {
            return Err(TimerError::InvalidArgument(format!(
                "timer ID must be greater than zero, got {}",
                id
            )));
        }
        Ok(())
    }
}

impl Drop for TimerRegistry {
    fn drop(&mut self) {
        self.remove_all();
    }
}
