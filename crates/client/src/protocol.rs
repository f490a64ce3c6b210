//! Wire records returned by the control server.
//!
//! These are immutable values decoded from JSON. Nothing here touches the
//! in-memory model; mapping a record into it is an explicit step done by
//! [`ArenaModel`](crate::ArenaModel) and [`Swarm`](crate::Swarm).
//!
//! Units: positions in arena meters, durations in seconds, battery in percent
//! (0-100) and volts, yaw in degrees.

use foundation::{ArenaBounds, DroneId, InvalidBounds};
use serde::{Deserialize, Deserializer};

/// Flight volume as reported by `/api/arena`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Arena {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl Arena {
    pub fn bounds(&self) -> Result<ArenaBounds, InvalidBounds> {
        ArenaBounds::new(
            [self.min_x, self.min_y, self.min_z],
            [self.max_x, self.max_y, self.max_z],
        )
    }
}

/// Flight state names used by the server.
///
/// Anything the client does not recognise is kept verbatim in `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum DroneState {
    Idle,
    Offline,
    Hovering,
    Starting,
    Landing,
    Navigating,
    #[default]
    Unreported,
    Unknown(String),
}

impl From<String> for DroneState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "IDLE" => DroneState::Idle,
            "OFFLINE" => DroneState::Offline,
            "HOVERING" => DroneState::Hovering,
            "STARTING" => DroneState::Starting,
            "LANDING" => DroneState::Landing,
            "NAVIGATING" => DroneState::Navigating,
            _ => DroneState::Unknown(s),
        }
    }
}

impl std::fmt::Display for DroneState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DroneState::Idle => write!(f, "IDLE"),
            DroneState::Offline => write!(f, "OFFLINE"),
            DroneState::Hovering => write!(f, "HOVERING"),
            DroneState::Starting => write!(f, "STARTING"),
            DroneState::Landing => write!(f, "LANDING"),
            DroneState::Navigating => write!(f, "NAVIGATING"),
            DroneState::Unreported => write!(f, "-"),
            DroneState::Unknown(s) => write!(f, "{s}"),
        }
    }
}

/// One drone's telemetry from a status endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DroneStatus {
    /// The server uses numeric ids; string ids are accepted as well.
    #[serde(deserialize_with = "drone_id")]
    pub id: DroneId,
    #[serde(default)]
    pub var_x: f64,
    #[serde(default)]
    pub var_y: f64,
    #[serde(default)]
    pub var_z: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub yaw: f64,
    #[serde(default)]
    pub status: DroneState,
    #[serde(default)]
    pub battery_voltage: f64,
    // Some server builds emit the key with a trailing colon.
    #[serde(alias = "battery_percentage:")]
    pub battery_percentage: f64,
}

/// Reply to `goto`: where the drone was sent and how long it will take.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct GoToResult {
    pub duration: f64,
    pub target_x: f64,
    pub target_y: f64,
    pub target_z: f64,
    pub target_yaw: f64,
    #[serde(deserialize_with = "flag")]
    pub relative: bool,
}

/// Reply to `takeoff` and `land`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TakeoffLandResult {
    pub duration: f64,
    pub target_z: f64,
}

/// Reply to `connect`, `disconnect` and `calibrate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SuccessResult {
    pub success: bool,
}

fn drone_id<'de, D: Deserializer<'de>>(d: D) -> Result<DroneId, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
    }

    Ok(match RawId::deserialize(d)? {
        RawId::Text(s) => DroneId::new(s),
        RawId::Int(n) => DroneId::new(n.to_string()),
    })
}

fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawFlag {
        Bool(bool),
        Int(i64),
    }

    Ok(match RawFlag::deserialize(d)? {
        RawFlag::Bool(b) => b,
        RawFlag::Int(n) => n != 0,
    })
}
