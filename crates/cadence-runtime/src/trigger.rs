//! Named triggers re-fired at per-trigger frequencies
//!
//! Each frame the scheduler compares every trigger's next fire time with the
//! frame clock. A due trigger is handed to the timer worker, which invokes it
//! one period later, off the main thread.

use crate::clock::FrameClock;
use crate::timer::{TimerHandle, TimerService};
use cadence_core::{IdAllocator, TriggerId, Triggerable};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Identifies one trigger table entry.
///
/// Names are not unique; the handle tells duplicates apart.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TriggerHandle {
    id: TriggerId,
    name: String,
}

impl TriggerHandle {
    pub fn id(&self) -> TriggerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

struct TriggerEntry {
    id: TriggerId,
    name: String,
    /// Target rate in Hz, at least 1
    frequency: u32,
    handler: Arc<dyn Triggerable>,
    one_shot: bool,
    /// Clock time (ms since start) at which the trigger is next due
    next_fire_ms: u64,
    /// Submitted firings that may still be waiting on the worker
    pending: Vec<TimerHandle>,
}

impl TriggerEntry {
    /// Whole milliseconds between firings. Rates above 1 kHz still advance by 1 ms.
    fn period_ms(&self) -> u64 {
        (1000 / u64::from(self.frequency)).max(1)
    }

    fn cancel_pending(&self) {
        for pending in &self.pending {
            pending.cancel();
        }
    }

    fn forget_settled(&mut self) {
        self.pending.retain(|p| !p.is_finished() && !p.is_cancelled());
    }
}

/// Owns the trigger table.
///
/// Methods take `&self` so trigger handlers running on the timer worker can
/// add and remove triggers while the main thread ticks.
pub struct TriggerScheduler {
    timers: Arc<TimerService>,
    triggers: Mutex<Vec<TriggerEntry>>,
    ids: IdAllocator,
    last_frame: AtomicU32,
}

impl TriggerScheduler {
    pub fn new(timers: Arc<TimerService>) -> Self {
        Self {
            timers,
            triggers: Mutex::new(Vec::new()),
            ids: IdAllocator::new(),
            last_frame: AtomicU32::new(0),
        }
    }

    fn triggers(&self) -> MutexGuard<'_, Vec<TriggerEntry>> {
        self.triggers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a repeating trigger. A frequency of 0 is treated as 1 Hz.
    ///
    /// Names are not checked for collisions; a duplicate is scheduled
    /// independently of the first one.
    pub fn add<H>(&self, name: impl Into<String>, frequency_hz: u32, handler: H) -> TriggerHandle
    where
        H: Triggerable + 'static,
    {
        self.insert(name.into(), frequency_hz, Arc::new(handler), false)
    }

    /// Add a trigger that leaves the table as soon as it has been scheduled once
    pub fn add_one_shot<H>(
        &self,
        name: impl Into<String>,
        frequency_hz: u32,
        handler: H,
    ) -> TriggerHandle
    where
        H: Triggerable + 'static,
    {
        self.insert(name.into(), frequency_hz, Arc::new(handler), true)
    }

    fn insert(
        &self,
        name: String,
        frequency_hz: u32,
        handler: Arc<dyn Triggerable>,
        one_shot: bool,
    ) -> TriggerHandle {
        let id = TriggerId::next(&self.ids);
        let frequency = frequency_hz.max(1);
        let mut triggers = self.triggers();
        if triggers.iter().any(|t| t.name == name) {
            log::debug!("Trigger '{name}' added again; both entries will fire");
        }
        triggers.push(TriggerEntry {
            id,
            name: name.clone(),
            frequency,
            handler,
            one_shot,
            next_fire_ms: 0,
            pending: Vec::new(),
        });
        TriggerHandle { id, name }
    }

    /// Remove the first trigger called `name`, cancelling its pending firing.
    ///
    /// Returns false if no trigger had that name.
    pub fn remove(&self, name: &str) -> bool {
        let mut triggers = self.triggers();
        match triggers.iter().position(|t| t.name == name) {
            Some(index) => {
                triggers.remove(index).cancel_pending();
                true
            }
            None => false,
        }
    }

    /// Remove exactly the entry `handle` refers to
    pub fn remove_handle(&self, handle: &TriggerHandle) -> bool {
        let mut triggers = self.triggers();
        match triggers.iter().position(|t| t.id == handle.id) {
            Some(index) => {
                triggers.remove(index).cancel_pending();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.triggers().iter().any(|t| t.name == name)
    }

    /// Cancel every pending firing and empty the table
    pub fn remove_all(&self) {
        let drained: Vec<TriggerEntry> = self.triggers().drain(..).collect();
        for entry in &drained {
            entry.cancel_pending();
        }
    }

    /// Shutdown hook: same as [`TriggerScheduler::remove_all`]
    pub fn clean(&self) {
        let count = self.len();
        self.remove_all();
        log::debug!("Trigger table cleaned ({count} trigger(s) removed)");
    }

    /// Schedule every trigger that is due at the clock's current time.
    ///
    /// A trigger whose submission to the timer worker fails is left untouched
    /// and considered again next frame. `frame_index` is recorded but does
    /// not influence scheduling.
    pub fn tick(&self, frame_index: u32, clock: &FrameClock) {
        self.last_frame.store(frame_index, Ordering::Relaxed);
        let now = clock.elapsed_millis();

        let mut triggers = self.triggers();
        let mut spent = Vec::new();

        for entry in triggers.iter_mut() {
            entry.forget_settled();
            if now < entry.next_fire_ms {
                continue;
            }

            let period = entry.period_ms();
            let handler = entry.handler.clone();
            let submitted = self
                .timers
                .schedule(Duration::from_millis(period), move || handler.invoke(true));

            match submitted {
                Ok(pending) => {
                    entry.next_fire_ms = now + period;
                    entry.pending.push(pending);
                    if entry.one_shot {
                        spent.push(entry.id);
                    }
                }
                Err(e) => {
                    log::warn!("Trigger '{}' not scheduled this frame: {e}", entry.name);
                }
            }
        }

        if !spent.is_empty() {
            triggers.retain(|t| !spent.contains(&t.id));
        }
    }

    // --- Query methods ---

    pub fn len(&self) -> usize {
        self.triggers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers().is_empty()
    }

    /// Trigger names in insertion order (duplicates included)
    pub fn names(&self) -> Vec<String> {
        self.triggers().iter().map(|t| t.name.clone()).collect()
    }

    /// Effective frequency of the first trigger called `name`
    pub fn frequency(&self, name: &str) -> Option<u32> {
        self.triggers()
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.frequency)
    }

    /// Clock time (ms) at which the first trigger called `name` is next due
    pub fn next_fire_millis(&self, name: &str) -> Option<u64> {
        self.triggers()
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.next_fire_ms)
    }

    /// Frame index passed to the most recent tick
    pub fn last_frame_index(&self) -> u32 {
        self.last_frame.load(Ordering::Relaxed)
    }
}
