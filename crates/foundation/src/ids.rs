use std::sync::atomic::{AtomicU64, Ordering};

/// Name of a swarm as addressed by the remote API.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SwarmId(String);

impl SwarmId {
    pub fn new(id: impl Into<String>) -> Self {
        SwarmId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SwarmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Drone id, unique within one swarm.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DroneId(String);

impl DroneId {
    pub fn new(id: impl Into<String>) -> Self {
        DroneId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DroneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DroneId {
    fn from(s: &str) -> Self {
        DroneId::new(s)
    }
}

/// Process-unique identity of a registry entry.
///
/// Two snapshots with the same `EntryId` describe the same in-memory entry,
/// even if every telemetry field changed in between.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(u64);

static NEXT_ENTRY: AtomicU64 = AtomicU64::new(1);

impl EntryId {
    pub fn next() -> Self {
        EntryId(NEXT_ENTRY.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}
