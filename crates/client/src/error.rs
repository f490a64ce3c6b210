use foundation::{InvalidBounds, MapError};

/// Error type for every remote operation.
///
/// Callers can tell "the server rejected the request" ([`ClientError::Remote`])
/// from "the server accepted it but the payload was unusable"
/// ([`ClientError::Decode`], [`ClientError::InvalidArena`]) and from "no HTTP
/// answer at all" ([`ClientError::Unreachable`]).
#[derive(Debug)]
pub enum ClientError {
    /// Non-success HTTP status. The body is not read.
    Remote { path: String, status: u16 },
    /// Success status, but the body did not decode into the expected record.
    Decode {
        path: String,
        raw_body: String,
        source: serde_json::Error,
    },
    /// Connect, timeout or body-read failure.
    Unreachable {
        path: String,
        source: reqwest::Error,
    },
    InvalidBaseUrl { url: String, reason: String },
    /// Swarm or drone id that cannot be sent as a single path segment.
    InvalidId { id: String },
    /// Arena payload decoded but has an inverted or non-finite axis.
    InvalidArena(InvalidBounds),
    Map(MapError),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Remote { path, status } => {
                write!(f, "server answered {status} for {path}")
            }
            ClientError::Decode { path, source, .. } => {
                write!(f, "unparseable response from {path}: {source}")
            }
            ClientError::Unreachable { path, source } => {
                write!(f, "request to {path} failed: {source}")
            }
            ClientError::InvalidBaseUrl { url, reason } => {
                write!(f, "invalid base url '{url}': {reason}")
            }
            ClientError::InvalidId { id } => {
                write!(f, "id '{id}' cannot be used as a path segment")
            }
            ClientError::InvalidArena(err) => write!(f, "server reported {err}"),
            ClientError::Map(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Decode { source, .. } => Some(source),
            ClientError::Unreachable { source, .. } => Some(source),
            ClientError::InvalidArena(err) => Some(err),
            ClientError::Map(err) => Some(err),
            ClientError::Remote { .. }
            | ClientError::InvalidBaseUrl { .. }
            | ClientError::InvalidId { .. } => None,
        }
    }
}

impl From<MapError> for ClientError {
    fn from(err: MapError) -> Self {
        ClientError::Map(err)
    }
}

impl ClientError {
    /// HTTP status, when the server answered with a non-success one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, ClientError::Decode { .. })
    }
}
