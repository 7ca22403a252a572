//! Server configuration loaded from environment variables

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

/// Timing and sizing knobs for the poll session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Time limit used when create-poll omits one (or sends 0)
    pub default_time_limit: u32,
    /// Upper bound accepted for a poll time limit
    pub max_time_limit: u32,
    /// Most options a single poll may offer
    pub max_options: usize,
    /// Longest question or option label, in characters
    pub max_label_len: usize,
    /// Delay between a poll ending and the current poll being cleared
    pub grace_period: Duration,
    /// Capacity of the fan-out channel
    pub broadcast_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_time_limit: 60,
            max_time_limit: 3600,
            max_options: 20,
            max_label_len: 500,
            grace_period: Duration::from_secs(5),
            broadcast_capacity: 256,
        }
    }
}

/// Full server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Exact CORS origin; None = permissive CORS
    pub client_url: Option<String>,
    /// Directory holding the built client
    pub static_dir: String,
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 5000,
            client_url: None,
            static_dir: "client/build".to_string(),
            session: SessionConfig::default(),
        }
    }
}

/// Read and parse an env var, falling back to `default` when unset or invalid
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

impl ServerConfig {
    /// Load config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let client_url = std::env::var("CLIENT_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let static_dir = std::env::var("STATIC_DIR")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.static_dir);

        let session = SessionConfig {
            default_time_limit: env_or(
                "POLL_DEFAULT_TIME_LIMIT",
                defaults.session.default_time_limit,
            ),
            max_time_limit: env_or("POLL_MAX_TIME_LIMIT", defaults.session.max_time_limit),
            max_options: env_or("POLL_MAX_OPTIONS", defaults.session.max_options).max(2),
            max_label_len: env_or("POLL_MAX_LABEL_LEN", defaults.session.max_label_len).max(1),
            grace_period: Duration::from_secs(env_or(
                "POLL_GRACE_SECONDS",
                defaults.session.grace_period.as_secs(),
            )),
            broadcast_capacity: env_or(
                "BROADCAST_CAPACITY",
                defaults.session.broadcast_capacity,
            )
            .max(1),
        };

        Self {
            bind_addr: env_or("BIND_ADDR", defaults.bind_addr),
            port: env_or("PORT", defaults.port),
            client_url,
            static_dir,
            session,
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}
