use std::env;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::Url;

use crate::error::ClientError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Connection settings shared by every [`Transport`](crate::Transport) call.
///
/// The base URL may be changed at any time. Each call reads it once when it
/// starts, so a change affects the next call and never one already in flight.
#[derive(Debug)]
pub struct ServerConfig {
    base_url: RwLock<Url>,
    timeout: Duration,
}

impl ServerConfig {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            base_url: RwLock::new(parse_base_url(base_url)?),
            timeout,
        })
    }

    /// Reads `CRAZYSERV_URL` and `CRAZYSERV_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, ClientError> {
        let url = env::var("CRAZYSERV_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout = env_var_u64("CRAZYSERV_TIMEOUT_MS", DEFAULT_TIMEOUT_MS);
        Self::new(&url, Duration::from_millis(timeout))
    }

    pub fn base_url(&self) -> Url {
        self.base_url.read().clone()
    }

    /// Replaces the base URL; an invalid value leaves the current one in place.
    pub fn set_base_url(&self, base_url: &str) -> Result<(), ClientError> {
        let url = parse_base_url(base_url)?;
        *self.base_url.write() = url;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let invalid = |reason: String| ClientError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("not a base url".to_string()));
    }
    Ok(url)
}

fn env_var_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::ServerConfig;

    #[test]
    fn set_base_url_swaps_value() {
        let cfg = ServerConfig::new("http://localhost:5000", Duration::from_secs(1)).unwrap();
        cfg.set_base_url("http://10.0.0.2:8080/").unwrap();
        assert_eq!(cfg.base_url().as_str(), "http://10.0.0.2:8080/");
    }

    #[test]
    fn invalid_url_keeps_previous_value() {
        let cfg = ServerConfig::new("http://localhost:5000", Duration::from_secs(1)).unwrap();
        assert!(cfg.set_base_url("not a url").is_err());
        assert!(cfg.set_base_url("ftp://host").is_err());
        assert_eq!(cfg.base_url().as_str(), "http://localhost:5000/");
    }
}
