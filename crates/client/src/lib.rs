//! Client core for a drone swarm exposed by a remote HTTP control server.
//!
//! - [`Transport`] issues GET requests built from an [`Endpoint`] and
//!   classifies failures.
//! - [`ArenaModel`] caches the flight volume and maps it onto a canvas.
//! - [`Swarm`] owns the drones of one swarm id and merges status reports.
//! - [`DroneHandle`] issues per-drone commands.

pub mod arena;
pub mod config;
pub mod drone;
pub mod error;
pub mod protocol;
pub mod swarm;
pub mod transport;

#[cfg(test)]
mod test_server;

pub use arena::ArenaModel;
pub use config::ServerConfig;
pub use drone::{Drone, DroneHandle, GoToDefaults, Telemetry};
pub use error::ClientError;
pub use protocol::*;
pub use swarm::{EvictionPolicy, Swarm};
pub use transport::{ConnectParams, DroneCommand, Endpoint, GoToParams, Transport, VerticalMove};
