use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::event_bus::EventBus;
use crate::metrics::{SlotCounters, SlotStats};

/// Extra enablement condition supplied by the front-end, e.g. "a drone id
/// has been entered".
pub type Predicate = Arc<dyn Fn() -> bool + Send + Sync>;

/// The slot already has an invocation in flight.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Busy {
    pub slot: &'static str,
}

impl std::fmt::Display for Busy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "command '{}' is already executing", self.slot)
    }
}

impl std::error::Error for Busy {}

/// A named command guarded so at most one invocation runs at a time.
///
/// States are `Idle` and `Executing`. The `Idle -> Executing` edge is a single
/// compare-exchange, so a concurrent second invocation is rejected with
/// [`Busy`] instead of being queued. The way back to `Idle` is tied to the
/// drop of an [`ExecutionGuard`], which covers success, error and a future
/// that is dropped before it finishes.
pub struct CommandSlot {
    name: &'static str,
    executing: AtomicBool,
    predicate: Option<Predicate>,
    bus: EventBus,
    counters: SlotCounters,
}

impl std::fmt::Debug for CommandSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSlot")
            .field("name", &self.name)
            .field("executing", &self.is_executing())
            .finish()
    }
}

impl CommandSlot {
    pub fn new(name: &'static str, bus: EventBus) -> Arc<Self> {
        Arc::new(Self {
            name,
            executing: AtomicBool::new(false),
            predicate: None,
            bus,
            counters: SlotCounters::default(),
        })
    }

    pub fn with_predicate(name: &'static str, bus: EventBus, predicate: Predicate) -> Arc<Self> {
        Arc::new(Self {
            name,
            executing: AtomicBool::new(false),
            predicate: Some(predicate),
            bus,
            counters: SlotCounters::default(),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_executing(&self) -> bool {
        self.executing.load(Ordering::Acquire)
    }

    /// False while executing; otherwise whatever the predicate says.
    pub fn can_invoke(&self) -> bool {
        if self.is_executing() {
            return false;
        }
        self.predicate.as_ref().map_or(true, |p| p())
    }

    pub fn stats(&self) -> SlotStats {
        self.counters.snapshot()
    }

    /// Moves the slot to `Executing`, or fails with [`Busy`].
    ///
    /// Only the exclusion is enforced here; the predicate is advisory and is
    /// consulted through [`CommandSlot::can_invoke`].
    pub fn try_begin(self: &Arc<Self>) -> Result<ExecutionGuard, Busy> {
        if self
            .executing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.counters.record_rejected();
            debug!(slot = self.name, "rejected: already executing");
            return Err(Busy { slot: self.name });
        }
        self.counters.record_started();
        self.bus.emit(self.name, true);
        Ok(ExecutionGuard {
            slot: Arc::clone(self),
        })
    }

    /// Starts `op` under the guard.
    ///
    /// `Busy` is reported synchronously and `op` is never called in that case.
    /// The returned future owns the guard, so it can be spawned.
    pub fn invoke<F, Fut, T, E>(
        self: &Arc<Self>,
        op: F,
    ) -> Result<impl Future<Output = Result<T, E>>, Busy>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let guard = self.try_begin()?;
        let fut = op();
        Ok(async move {
            let result = fut.await;
            guard.finish(result.is_ok());
            result
        })
    }
}

/// Holds a slot in `Executing`; dropping it returns the slot to `Idle`.
#[must_use = "dropping the guard immediately releases the slot"]
pub struct ExecutionGuard {
    slot: Arc<CommandSlot>,
}

impl ExecutionGuard {
    pub fn slot(&self) -> &'static str {
        self.slot.name
    }

    /// Records the outcome, then releases the slot.
    pub fn finish(self, ok: bool) {
        self.slot.counters.record_outcome(ok);
    }
}

impl Drop for ExecutionGuard {
    fn drop(&mut self) {
        self.slot.executing.store(false, Ordering::Release);
        self.slot.bus.emit(self.slot.name, false);
    }
}
