//! Connection configuration for the socket messenger

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default Unix socket hosted by the native endpoint
pub const DEFAULT_SOCKET: &str = "/tmp/app-events-bridge.sock";

/// Where the native endpoint listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Unix domain socket path
    Unix(PathBuf),
    /// TCP host and port
    Tcp { host: String, port: u16 },
}

impl Endpoint {
    /// Parse `host:port` as TCP, anything else as a socket path
    pub fn parse(s: &str) -> Self {
        if let Some((host, port)) = s.rsplit_once(':') {
            if !host.is_empty() && !host.contains('/') {
                if let Ok(port) = port.parse::<u16>() {
                    return Endpoint::Tcp {
                        host: host.to_string(),
                        port,
                    };
                }
            }
        }
        Endpoint::Unix(PathBuf::from(s))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "unix:{}", path.display()),
            Endpoint::Tcp { host, port } => write!(f, "tcp:{}:{}", host, port),
        }
    }
}

/// Configuration for the bridge connection
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Native endpoint address (default: /tmp/app-events-bridge.sock)
    pub endpoint: Endpoint,
    /// Connection timeout; replies themselves are never timed out
    pub connect_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::Unix(PathBuf::from(DEFAULT_SOCKET)),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl BridgeConfig {
    /// Defaults overridden by `APP_EVENTS_SOCKET`, `APP_EVENTS_TCP` and
    /// `APP_EVENTS_CONNECT_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("APP_EVENTS_SOCKET") {
            config.endpoint = Endpoint::Unix(PathBuf::from(path));
        }
        if let Some(addr) = lookup("APP_EVENTS_TCP") {
            match Endpoint::parse(&addr) {
                tcp @ Endpoint::Tcp { .. } => config.endpoint = tcp,
                Endpoint::Unix(_) => {
                    tracing::warn!("Ignoring APP_EVENTS_TCP={}: expected host:port", addr)
                }
            }
        }
        if let Some(secs) = lookup("APP_EVENTS_CONNECT_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(secs) => config.connect_timeout = Duration::from_secs(secs),
                Err(_) => tracing::warn!(
                    "Ignoring APP_EVENTS_CONNECT_TIMEOUT_SECS={}: not a number",
                    secs
                ),
            }
        }

        config
    }

    /// Replace the endpoint
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }
}
