use std::time::Instant;

use foundation::{CanvasParams, DroneId, EntryId, Point2, SwarmId};
use tracing::{debug, info};

use crate::arena::ArenaModel;
use crate::error::ClientError;
use crate::protocol::{DroneState, DroneStatus, GoToResult, SuccessResult, TakeoffLandResult};
use crate::swarm::Swarm;
use crate::transport::{ConnectParams, DroneCommand, Endpoint, GoToParams, VerticalMove};

/// Last reported position, battery and flight state.
#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,
    pub battery_percentage: f64,
    pub battery_voltage: f64,
    pub status: DroneState,
}

impl From<&DroneStatus> for Telemetry {
    fn from(s: &DroneStatus) -> Self {
        Self {
            x: s.x,
            y: s.y,
            z: s.z,
            yaw: s.yaw,
            battery_percentage: s.battery_percentage,
            battery_voltage: s.battery_voltage,
            status: s.status.clone(),
        }
    }
}

/// Registry entry for one drone.
///
/// `telemetry` is `None` until the first status report (a drone created by
/// `connect` has none yet). It is written only from decoded status payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct Drone {
    entry: EntryId,
    id: DroneId,
    swarm: SwarmId,
    telemetry: Option<Telemetry>,
    last_seen: Instant,
}

impl Drone {
    pub(crate) fn new(id: DroneId, swarm: SwarmId, now: Instant) -> Self {
        Self {
            entry: EntryId::next(),
            id,
            swarm,
            telemetry: None,
            last_seen: now,
        }
    }

    pub(crate) fn apply_status(&mut self, status: &DroneStatus, now: Instant) {
        self.telemetry = Some(Telemetry::from(status));
        self.last_seen = now;
    }

    pub fn entry(&self) -> EntryId {
        self.entry
    }

    pub fn id(&self) -> &DroneId {
        &self.id
    }

    /// Owning swarm, by id.
    pub fn swarm_id(&self) -> &SwarmId {
        &self.swarm
    }

    pub fn telemetry(&self) -> Option<&Telemetry> {
        self.telemetry.as_ref()
    }

    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }
}

/// Altitude, speed and heading used when a drone is sent to a canvas point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoToDefaults {
    pub z: f64,
    pub velocity: f64,
    pub yaw: f64,
}

impl Default for GoToDefaults {
    fn default() -> Self {
        Self {
            z: 1.0,
            velocity: 0.2,
            yaw: 0.0,
        }
    }
}

/// Command surface for one drone of a [`Swarm`].
///
/// Every call is one round trip. On error nothing in the registry changes
/// and the error is returned as is. Only status replies (`update_status`)
/// write telemetry; command replies describe targets, not positions.
#[derive(Debug, Clone)]
pub struct DroneHandle {
    swarm: Swarm,
    id: DroneId,
}

impl DroneHandle {
    pub(crate) fn new(swarm: Swarm, id: DroneId) -> Self {
        Self { swarm, id }
    }

    pub fn id(&self) -> &DroneId {
        &self.id
    }

    pub fn swarm_id(&self) -> &SwarmId {
        self.swarm.id()
    }

    /// Current registry entry, if the drone is known.
    pub fn snapshot(&self) -> Option<Drone> {
        self.swarm.get(&self.id)
    }

    fn endpoint<'a>(&'a self, command: DroneCommand<'a>) -> Endpoint<'a> {
        Endpoint::Drone {
            swarm: self.swarm.id(),
            drone: &self.id,
            command,
        }
    }

    /// Opens the radio link. A reply with `success: true` registers the drone.
    pub async fn connect(&self, params: &ConnectParams) -> Result<SuccessResult, ClientError> {
        let result: SuccessResult = self
            .swarm
            .transport()
            .get(&self.endpoint(DroneCommand::Connect(params)))
            .await?;
        if result.success {
            self.swarm.ensure(&self.id, Instant::now());
            info!(swarm = %self.swarm.id(), drone = %self.id, "connected");
        }
        Ok(result)
    }

    pub async fn disconnect(&self) -> Result<SuccessResult, ClientError> {
        self.swarm
            .transport()
            .get(&self.endpoint(DroneCommand::Disconnect))
            .await
    }

    pub async fn calibrate(&self) -> Result<SuccessResult, ClientError> {
        self.swarm
            .transport()
            .get(&self.endpoint(DroneCommand::Calibrate))
            .await
    }

    pub async fn takeoff(&self, z: f64, velocity: f64) -> Result<TakeoffLandResult, ClientError> {
        self.swarm
            .transport()
            .get(&self.endpoint(DroneCommand::Takeoff(VerticalMove { z, velocity })))
            .await
    }

    pub async fn land(&self, z: f64, velocity: f64) -> Result<TakeoffLandResult, ClientError> {
        self.swarm
            .transport()
            .get(&self.endpoint(DroneCommand::Land(VerticalMove { z, velocity })))
            .await
    }

    pub async fn go_to(&self, target: GoToParams) -> Result<GoToResult, ClientError> {
        self.swarm
            .transport()
            .get(&self.endpoint(DroneCommand::GoTo(target)))
            .await
    }

    /// Sends the drone to the arena point under a canvas position.
    pub async fn go_to_canvas(
        &self,
        arena: &ArenaModel,
        tap: Point2,
        params: &CanvasParams,
        defaults: GoToDefaults,
    ) -> Result<GoToResult, ClientError> {
        let target = arena.transform_to_arena(tap, params)?;
        debug!(drone = %self.id, x = target.x, y = target.y, "canvas tap mapped to arena");
        self.go_to(GoToParams {
            x: target.x,
            y: target.y,
            z: defaults.z,
            velocity: defaults.velocity,
            yaw: defaults.yaw,
            relative: false,
        })
        .await
    }

    /// Stops the drone. The reply is status-shaped but is returned as is,
    /// without touching the registry.
    pub async fn stop(&self) -> Result<DroneStatus, ClientError> {
        self.swarm
            .transport()
            .get(&self.endpoint(DroneCommand::Stop))
            .await
    }

    /// Fetches this drone's status and applies it to its registry entry,
    /// creating the entry if needed.
    pub async fn update_status(&self) -> Result<DroneStatus, ClientError> {
        let status: DroneStatus = self
            .swarm
            .transport()
            .get(&self.endpoint(DroneCommand::Status))
            .await?;
        if status.id != self.id {
            debug!(requested = %self.id, reported = %status.id, "status id differs from request");
        }
        self.swarm.apply_one(&self.id, &status, Instant::now());
        Ok(status)
    }
}
