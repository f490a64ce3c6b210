use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use crate::command::{Busy, CommandSlot, Predicate};
use crate::event_bus::{EventBus, ReadinessChanged};
use crate::metrics::Metrics;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejected {
    Busy(Busy),
    UnknownSlot(String),
}

impl std::fmt::Display for Rejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejected::Busy(busy) => write!(f, "{busy}"),
            Rejected::UnknownSlot(name) => write!(f, "no command named '{name}'"),
        }
    }
}

impl std::error::Error for Rejected {}

impl From<Busy> for Rejected {
    fn from(busy: Busy) -> Self {
        Rejected::Busy(busy)
    }
}

/// Registry of named command slots sharing one readiness bus.
///
/// Different slots run concurrently with each other; each slot on its own
/// admits one invocation at a time.
#[derive(Debug, Default)]
pub struct CommandDispatcher {
    bus: EventBus,
    slots: BTreeMap<&'static str, Arc<CommandSlot>>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a slot with no extra predicate.
    ///
    /// A name is registered once; later calls return the existing slot
    /// unchanged, so an execution in flight keeps excluding new ones.
    pub fn register(&mut self, name: &'static str) -> Arc<CommandSlot> {
        let bus = self.bus.clone();
        self.insert_once(name, move || CommandSlot::new(name, bus))
    }

    /// Like [`CommandDispatcher::register`]; the predicate is ignored if the
    /// name already exists.
    pub fn register_with(&mut self, name: &'static str, predicate: Predicate) -> Arc<CommandSlot> {
        let bus = self.bus.clone();
        self.insert_once(name, move || CommandSlot::with_predicate(name, bus, predicate))
    }

    fn insert_once(
        &mut self,
        name: &'static str,
        make: impl FnOnce() -> Arc<CommandSlot>,
    ) -> Arc<CommandSlot> {
        match self.slots.entry(name) {
            Entry::Occupied(existing) => {
                debug!(slot = name, "already registered, keeping existing slot");
                Arc::clone(existing.get())
            }
            Entry::Vacant(vacant) => Arc::clone(vacant.insert(make())),
        }
    }

    pub fn slot(&self, name: &str) -> Option<&Arc<CommandSlot>> {
        self.slots.get(name)
    }

    /// Unknown slots are never invokable.
    pub fn can_invoke(&self, name: &str) -> bool {
        self.slots.get(name).is_some_and(|s| s.can_invoke())
    }

    pub fn is_busy(&self, name: &str) -> bool {
        self.slots.get(name).is_some_and(|s| s.is_executing())
    }

    pub fn invoke<F, Fut, T, E>(
        &self,
        name: &str,
        op: F,
    ) -> Result<impl Future<Output = Result<T, E>>, Rejected>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let slot = self
            .slots
            .get(name)
            .ok_or_else(|| Rejected::UnknownSlot(name.to_string()))?;
        Ok(slot.invoke(op)?)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReadinessChanged> {
        self.bus.subscribe()
    }

    pub fn metrics(&self) -> Metrics {
        let mut m = Metrics::default();
        for (name, slot) in &self.slots {
            m.insert(*name, slot.stats());
        }
        m
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use tokio::sync::oneshot;

    use super::{CommandDispatcher, Rejected};
    use crate::command::Busy;

    #[tokio::test]
    async fn slots_are_independent() {
        let mut d = CommandDispatcher::new();
        d.register("takeoff");
        d.register("land");

        let (tx, rx) = oneshot::channel::<()>();
        let pending = d
            .invoke("takeoff", move || async move { rx.await.map_err(|_| ()) })
            .unwrap();

        assert!(d.is_busy("takeoff"));
        assert!(!d.can_invoke("takeoff"));
        assert!(d.can_invoke("land"));
        assert_eq!(
            d.invoke("takeoff", || async { Ok::<(), ()>(()) }).err(),
            Some(Rejected::Busy(Busy { slot: "takeoff" }))
        );

        d.invoke("land", || async { Ok::<(), ()>(()) })
            .unwrap()
            .await
            .unwrap();

        tx.send(()).unwrap();
        pending.await.unwrap();
        assert!(d.can_invoke("takeoff"));

        let m = d.metrics();
        assert_eq!(m.slot("takeoff").rejected, 1);
        assert_eq!(m.slot("takeoff").succeeded, 1);
        assert_eq!(m.slot("land").succeeded, 1);
    }

    #[test]
    fn unknown_slot_is_rejected() {
        let d = CommandDispatcher::new();
        assert!(!d.can_invoke("warp"));
        assert_eq!(
            d.invoke("warp", || async { Ok::<(), ()>(()) }).err(),
            Some(Rejected::UnknownSlot("warp".to_string()))
        );
    }

    #[test]
    fn registered_predicate_is_consulted() {
        let mut d = CommandDispatcher::new();
        let ready = Arc::new(AtomicBool::new(false));
        let r = Arc::clone(&ready);
        d.register_with("connect", Arc::new(move || r.load(Ordering::SeqCst)));
        assert!(!d.can_invoke("connect"));
        ready.store(true, Ordering::SeqCst);
        assert!(d.can_invoke("connect"));
    }

    #[tokio::test]
    async fn registering_twice_keeps_the_running_slot() {
        let mut d = CommandDispatcher::new();
        let first = d.register("stop");

        let (tx, rx) = oneshot::channel::<()>();
        let pending = d
            .invoke("stop", move || async move { rx.await.map_err(|_| ()) })
            .unwrap();

        let again = d.register_with("stop", Arc::new(|| true));
        assert!(Arc::ptr_eq(&first, &again));
        assert!(d.is_busy("stop"));
        assert_eq!(
            d.invoke("stop", || async { Ok::<(), ()>(()) }).err(),
            Some(Rejected::Busy(Busy { slot: "stop" }))
        );

        tx.send(()).unwrap();
        pending.await.unwrap();
        assert!(d.can_invoke("stop"));
    }

    #[tokio::test]
    async fn subscribers_share_one_bus() {
        let mut d = CommandDispatcher::new();
        d.register("a");
        d.register("b");
        let mut rx = d.subscribe();
        d.invoke("a", || async { Ok::<(), ()>(()) }).unwrap().await.unwrap();
        d.invoke("b", || async { Ok::<(), ()>(()) }).unwrap().await.unwrap();
        let slots: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| (e.slot, e.executing))
            .collect();
        assert_eq!(slots, vec![("a", true), ("a", false), ("b", true), ("b", false)]);
    }
}
