//! HTTP transport: endpoint schema, URL construction and failure classification.

use std::sync::Arc;

use foundation::{DroneId, SwarmId};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::error::ClientError;

/// Radio link settings for `connect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub radio_id: u32,
    pub channel: u32,
    pub address: String,
    pub data_rate: String,
}

impl Default for ConnectParams {
    fn default() -> Self {
        Self {
            radio_id: 0,
            channel: 80,
            address: "E7E7E7E7E7".to_string(),
            data_rate: "2M".to_string(),
        }
    }
}

/// Target height and vertical velocity for `takeoff`/`land`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalMove {
    pub z: f64,
    pub velocity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoToParams {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub velocity: f64,
    pub yaw: f64,
    pub relative: bool,
}

/// Per-drone operation and its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum DroneCommand<'a> {
    Status,
    Connect(&'a ConnectParams),
    Disconnect,
    Calibrate,
    Takeoff(VerticalMove),
    Land(VerticalMove),
    GoTo(GoToParams),
    Stop,
}

impl DroneCommand<'_> {
    fn segment(&self) -> &'static str {
        match self {
            DroneCommand::Status => "status",
            DroneCommand::Connect(_) => "connect",
            DroneCommand::Disconnect => "disconnect",
            DroneCommand::Calibrate => "calibrate",
            DroneCommand::Takeoff(_) => "takeoff",
            DroneCommand::Land(_) => "land",
            DroneCommand::GoTo(_) => "goto",
            DroneCommand::Stop => "stop",
        }
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            DroneCommand::Connect(p) => vec![
                ("r", p.radio_id.to_string()),
                ("c", p.channel.to_string()),
                ("a", p.address.clone()),
                ("dr", p.data_rate.clone()),
            ],
            DroneCommand::Takeoff(m) | DroneCommand::Land(m) => {
                vec![("z", m.z.to_string()), ("v", m.velocity.to_string())]
            }
            DroneCommand::GoTo(g) => vec![
                ("x", g.x.to_string()),
                ("y", g.y.to_string()),
                ("z", g.z.to_string()),
                ("yaw", g.yaw.to_string()),
                ("v", g.velocity.to_string()),
                ("r", if g.relative { "1" } else { "0" }.to_string()),
            ],
            DroneCommand::Status
            | DroneCommand::Disconnect
            | DroneCommand::Calibrate
            | DroneCommand::Stop => Vec::new(),
        }
    }
}

/// Every resource the control server exposes.
///
/// Ids are path segments and are percent-encoded; arguments travel as
/// query pairs with the server's literal key names.
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint<'a> {
    Arena,
    SwarmStatus(&'a SwarmId),
    Drone {
        swarm: &'a SwarmId,
        drone: &'a DroneId,
        command: DroneCommand<'a>,
    },
}

impl Endpoint<'_> {
    pub fn path_segments(&self) -> Vec<&str> {
        match self {
            Endpoint::Arena => vec!["api", "arena"],
            Endpoint::SwarmStatus(swarm) => vec!["api", swarm.as_str(), "status"],
            Endpoint::Drone {
                swarm,
                drone,
                command,
            } => vec!["api", swarm.as_str(), drone.as_str(), command.segment()],
        }
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Endpoint::Drone { command, .. } => command.query(),
            Endpoint::Arena | Endpoint::SwarmStatus(_) => Vec::new(),
        }
    }

    /// Resolves this endpoint against `base`, keeping any path prefix it has.
    ///
    /// Ids that are empty, `.` or `..` are rejected: URL normalization would
    /// drop or collapse them and address a different resource.
    pub fn url(&self, base: &Url) -> Result<Url, ClientError> {
        let segments = self.path_segments();
        if let Some(bad) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
            return Err(ClientError::InvalidId {
                id: bad.to_string(),
            });
        }

        let mut url = base.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidBaseUrl {
                url: base.to_string(),
                reason: "not a base url".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);

        let query = self.query();
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }
}

/// Stateless GET-and-decode over a shared [`ServerConfig`].
///
/// No retries happen here.
#[derive(Debug, Clone)]
pub struct Transport {
    config: Arc<ServerConfig>,
    http: reqwest::Client,
}

impl Transport {
    pub fn new(config: Arc<ServerConfig>) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &Arc<ServerConfig> {
        &self.config
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &Endpoint<'_>) -> Result<T, ClientError> {
        let url = endpoint.url(&self.config.base_url())?;
        let path = url.path().to_string();
        debug!(%url, "GET");

        let resp = self
            .http
            .get(url)
            .timeout(self.config.timeout())
            .send()
            .await
            .map_err(|source| {
                warn!(%path, "request failed: {source}");
                ClientError::Unreachable {
                    path: path.clone(),
                    source,
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%path, %status, "server rejected request");
            return Err(ClientError::Remote {
                path,
                status: status.as_u16(),
            });
        }

        let body = match resp.text().await {
            Ok(body) => body,
            Err(source) => {
                warn!(%path, "reading response failed: {source}");
                return Err(ClientError::Unreachable { path, source });
            }
        };

        match serde_json::from_str::<T>(&body) {
            Ok(value) => Ok(value),
            Err(source) => {
                warn!(%path, "undecodable response: {source}");
                Err(ClientError::Decode {
                    path,
                    raw_body: body,
                    source,
                })
            }
        }
    }
}
