use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use foundation::{DroneId, SwarmId};
use parking_lot::RwLock;
use tracing::debug;

use crate::drone::{Drone, DroneHandle};
use crate::error::ClientError;
use crate::protocol::DroneStatus;
use crate::transport::{Endpoint, Transport};

/// What happens to drones that stop appearing in status reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Keep them with their last known telemetry.
    #[default]
    Never,
    /// Drop a drone once no status for it has arrived for this long.
    Ttl(Duration),
}

struct SwarmInner {
    id: SwarmId,
    transport: Transport,
    eviction: EvictionPolicy,
    drones: RwLock<HashMap<DroneId, Drone>>,
}

/// The drones known for one swarm id.
///
/// Cheap to clone; clones share the same registry. Entries are only mutated
/// after a remote call has completed and decoded, and each mutation takes the
/// write lock once, so readers see either the old or the new state of a batch.
#[derive(Clone)]
pub struct Swarm {
    inner: Arc<SwarmInner>,
}

impl std::fmt::Debug for Swarm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Swarm")
            .field("id", &self.inner.id)
            .field("drones", &self.len())
            .finish()
    }
}

impl Swarm {
    pub fn new(id: SwarmId, transport: Transport) -> Self {
        Self::with_eviction(id, transport, EvictionPolicy::Never)
    }

    pub fn with_eviction(id: SwarmId, transport: Transport, eviction: EvictionPolicy) -> Self {
        Self {
            inner: Arc::new(SwarmInner {
                id,
                transport,
                eviction,
                drones: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn id(&self) -> &SwarmId {
        &self.inner.id
    }

    pub(crate) fn transport(&self) -> &Transport {
        &self.inner.transport
    }

    /// Handle for issuing commands; does not create a registry entry.
    pub fn drone(&self, id: impl Into<DroneId>) -> DroneHandle {
        DroneHandle::new(self.clone(), id.into())
    }

    pub fn get(&self, id: &DroneId) -> Option<Drone> {
        self.inner.drones.read().get(id).cloned()
    }

    /// Snapshots of every known drone, sorted by id.
    pub fn drones(&self) -> Vec<Drone> {
        let mut drones: Vec<Drone> = self.inner.drones.read().values().cloned().collect();
        drones.sort_by(|a, b| a.id().cmp(b.id()));
        drones
    }

    pub fn len(&self) -> usize {
        self.inner.drones.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetches `/api/{swarm}/status` and merges it into the registry.
    ///
    /// The whole array is decoded before anything is applied, so a failed
    /// call changes nothing. Returns the statuses in server order.
    pub async fn refresh_status(&self) -> Result<Vec<DroneStatus>, ClientError> {
        let statuses: Vec<DroneStatus> = self
            .inner
            .transport
            .get(&Endpoint::SwarmStatus(&self.inner.id))
            .await?;
        self.apply_batch(&statuses, Instant::now());
        Ok(statuses)
    }

    /// Upserts every status, then applies the eviction policy.
    pub(crate) fn apply_batch(&self, statuses: &[DroneStatus], now: Instant) {
        let mut drones = self.inner.drones.write();
        for status in statuses {
            upsert(&mut drones, &self.inner.id, &status.id, status, now);
        }
        if let EvictionPolicy::Ttl(ttl) = self.inner.eviction {
            drones.retain(|id, drone| {
                let keep = now.saturating_duration_since(drone.last_seen()) <= ttl;
                if !keep {
                    debug!(swarm = %self.inner.id, drone = %id, "evicted stale drone");
                }
                keep
            });
        }
    }

    /// Applies a single-drone status to the entry keyed `id`.
    pub(crate) fn apply_one(&self, id: &DroneId, status: &DroneStatus, now: Instant) {
        let mut drones = self.inner.drones.write();
        upsert(&mut drones, &self.inner.id, id, status, now);
    }

    /// Creates an entry without telemetry if none exists yet.
    pub(crate) fn ensure(&self, id: &DroneId, now: Instant) {
        self.inner
            .drones
            .write()
            .entry(id.clone())
            .or_insert_with(|| Drone::new(id.clone(), self.inner.id.clone(), now));
    }
}

fn upsert(
    drones: &mut HashMap<DroneId, Drone>,
    swarm: &SwarmId,
    id: &DroneId,
    status: &DroneStatus,
    now: Instant,
) {
    let drone = drones.entry(id.clone()).or_insert_with(|| {
        debug!(%swarm, drone = %id, "new drone");
        Drone::new(id.clone(), swarm.clone(), now)
    });
    drone.apply_status(status, now);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use foundation::{DroneId, SwarmId};
    use pretty_assertions::assert_eq;

    use super::{EvictionPolicy, Swarm};
    use crate::protocol::DroneState;
    use crate::test_server::StubServer;
    use crate::transport::Transport;

    const BATCH: &str = r#"[
        {"id": 2, "x": 1.0, "y": 2.0, "z": 0.5, "status": "HOVERING", "battery_percentage": 80},
        {"id": 1, "x": 3.0, "y": 4.0, "z": 0.0, "status": "IDLE", "battery_percentage": 55}
    ]"#;

    async fn swarm_with(body: &str) -> (StubServer, Swarm) {
        let stub = StubServer::start().await;
        stub.respond("/api/alpha/status", 200, body);
        let swarm = Swarm::new(SwarmId::new("alpha"), Transport::new(stub.config()));
        (stub, swarm)
    }

    #[tokio::test]
    async fn refresh_returns_server_order_and_upserts() {
        let (_stub, swarm) = swarm_with(BATCH).await;
        let statuses = swarm.refresh_status().await.unwrap();
        let order: Vec<&str> = statuses.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(order, vec!["2", "1"]);

        assert_eq!(swarm.len(), 2);
        let d2 = swarm.get(&DroneId::new("2")).unwrap();
        let t = d2.telemetry().unwrap();
        assert_eq!((t.x, t.y, t.z), (1.0, 2.0, 0.5));
        assert_eq!(t.battery_percentage, 80.0);
        assert_eq!(t.status, DroneState::Hovering);
        assert_eq!(d2.swarm_id(), &SwarmId::new("alpha"));
    }

    #[tokio::test]
    async fn applying_same_batch_twice_is_idempotent() {
        let (_stub, swarm) = swarm_with(BATCH).await;
        swarm.refresh_status().await.unwrap();
        let once = swarm.drones();
        swarm.refresh_status().await.unwrap();
        let twice = swarm.drones();

        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(&twice) {
            assert_eq!(a.entry(), b.entry());
            assert_eq!(a.telemetry(), b.telemetry());
        }
    }

    #[tokio::test]
    async fn existing_drone_keeps_identity() {
        let (stub, swarm) = swarm_with(BATCH).await;
        swarm.refresh_status().await.unwrap();
        let before = swarm.get(&DroneId::new("1")).unwrap().entry();

        stub.respond(
            "/api/alpha/status",
            200,
            r#"[{"id": "1", "x": 9.0, "y": 9.0, "z": 1.0, "battery_percentage": 40}]"#,
        );
        swarm.refresh_status().await.unwrap();

        let after = swarm.get(&DroneId::new("1")).unwrap();
        assert_eq!(after.entry(), before);
        assert_eq!(after.telemetry().unwrap().x, 9.0);
        // Absent from the second batch, still known.
        assert_eq!(swarm.len(), 2);
    }

    #[tokio::test]
    async fn malformed_batch_changes_nothing() {
        let (stub, swarm) = swarm_with(BATCH).await;
        swarm.refresh_status().await.unwrap();
        let before = swarm.drones();

        // First element is fine, second lacks a position.
        stub.respond(
            "/api/alpha/status",
            200,
            r#"[{"id": 1, "x": 7, "y": 7, "z": 7, "battery_percentage": 1}, {"id": 2}]"#,
        );
        assert!(swarm.refresh_status().await.unwrap_err().is_decode());
        assert_eq!(swarm.drones(), before);

        stub.respond("/api/alpha/status", 502, "");
        assert_eq!(swarm.refresh_status().await.unwrap_err().status(), Some(502));
        assert_eq!(swarm.drones(), before);
    }

    #[tokio::test]
    async fn ttl_policy_evicts_unreported_drones() {
        let stub = StubServer::start().await;
        stub.respond("/api/alpha/status", 200, BATCH);
        let swarm = Swarm::with_eviction(
            SwarmId::new("alpha"),
            Transport::new(stub.config()),
            EvictionPolicy::Ttl(Duration::from_millis(1)),
        );
        swarm.refresh_status().await.unwrap();
        assert_eq!(swarm.len(), 2);

        tokio::time::sleep(Duration::from_millis(20)).await;
        stub.respond(
            "/api/alpha/status",
            200,
            r#"[{"id": 2, "x": 1, "y": 1, "z": 1, "battery_percentage": 70}]"#,
        );
        swarm.refresh_status().await.unwrap();
        let ids: Vec<String> = swarm.drones().iter().map(|d| d.id().to_string()).collect();
        assert_eq!(ids, vec!["2".to_string()]);
    }

    #[tokio::test]
    async fn never_policy_keeps_unreported_drones() {
        let (stub, swarm) = swarm_with(BATCH).await;
        swarm.refresh_status().await.unwrap();
        stub.respond("/api/alpha/status", 200, "[]");
        swarm.refresh_status().await.unwrap();
        assert_eq!(swarm.len(), 2);
    }
}
