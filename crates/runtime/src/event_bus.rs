use tokio::sync::broadcast;

/// Emitted on every slot transition so a front-end can re-evaluate which
/// commands are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessChanged {
    pub slot: &'static str,
    pub executing: bool,
}

/// Fan-out of [`ReadinessChanged`] notifications.
///
/// Cloning yields another handle onto the same channel. Emitting with no
/// subscribers is not an error; the event is simply dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ReadinessChanged>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn emit(&self, slot: &'static str, executing: bool) {
        let _ = self.sender.send(ReadinessChanged { slot, executing });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReadinessChanged> {
        self.sender.subscribe()
    }
}
