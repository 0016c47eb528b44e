//! Config schema types (IRC publisher, TCP listener, metrics).
use std::{net::SocketAddr, path::PathBuf, time::Duration};

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Hard limit of an IRC line, CRLF included.
pub const IRC_LINE_LIMIT: usize = 512;

/// Largest accepted `channel_maxlen`; anything above is clamped.
pub const MAX_CHANNEL_MAXLEN: usize = IRC_LINE_LIMIT - 1;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeraldConfig {
    pub irc: IrcConfig,
    pub listener: ListenerConfig,
    pub metrics: MetricsConfig,
}

/// Outbound IRC connection and publishing behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IrcConfig {
    /// IRC server hostname or address.
    pub server: String,
    pub port: u16,
    /// Connect with TLS.
    pub ssl: bool,
    pub nickname: String,
    pub realname: String,
    pub username: String,
    /// Global server password sent with `PASS`, if any.
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub server_password: Option<Secret<String>>,
    /// Seconds between reconnection attempts.
    pub reconnection_interval: u64,
    /// Seconds between two publishing ticks (one line per tick at most).
    pub line_sleep: f64,
    /// Reroute target for messages to channels that cannot be joined.
    /// Empty disables rerouting.
    pub fallback_channel: String,
    /// Join attempts before a channel is considered blocked (0 = unlimited).
    pub max_join_attempts: u32,
    /// Seconds after which a blocked channel gets another join attempt.
    pub memory_timeout: u64,
    /// Longest accepted channel name in bytes.
    pub channel_maxlen: usize,
    /// Seconds between client keep-alive probes (0 disables).
    pub keepalive_interval: u64,
    /// Seconds allowed for TCP + TLS connection setup.
    pub connect_timeout: u64,
}

impl Default for IrcConfig {
    fn default() -> Self {
        Self {
            server: "localhost".into(),
            port: 6667,
            ssl: false,
            nickname: "herald".into(),
            realname: "herald notification relay".into(),
            username: "herald".into(),
            server_password: None,
            reconnection_interval: 10,
            line_sleep: 1.0,
            fallback_channel: String::new(),
            max_join_attempts: 5,
            memory_timeout: 3600,
            channel_maxlen: 100,
            keepalive_interval: 60,
            connect_timeout: 30,
        }
    }
}

impl IrcConfig {
    /// `channel_maxlen` clamped to what still fits on an IRC line.
    #[must_use]
    pub fn effective_channel_maxlen(&self) -> usize {
        self.channel_maxlen.min(MAX_CHANNEL_MAXLEN)
    }

    #[must_use]
    pub fn fallback_channel(&self) -> Option<&str> {
        let name = self.fallback_channel.trim();
        (!name.is_empty()).then_some(name)
    }

    #[must_use]
    pub fn line_sleep(&self) -> Duration {
        // Negative or NaN values fall back to no throttling at all.
        Duration::try_from_secs_f64(self.line_sleep).unwrap_or(Duration::ZERO)
    }

    #[must_use]
    pub fn reconnection_interval(&self) -> Duration {
        Duration::from_secs(self.reconnection_interval)
    }

    #[must_use]
    pub fn memory_timeout(&self) -> Duration {
        Duration::from_secs(self.memory_timeout)
    }

    #[must_use]
    pub fn keepalive_interval(&self) -> Option<Duration> {
        (self.keepalive_interval > 0).then(|| Duration::from_secs(self.keepalive_interval))
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

/// Inbound TCP listener accepting `password:channel:message` lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub host: String,
    pub port: u16,
    /// Shared secret expected as the first field of every line.
    #[serde(serialize_with = "serialize_secret")]
    pub password: Secret<String>,
    /// Serve TLS instead of plain TCP.
    pub ssl: bool,
    /// PEM certificate chain (may also contain the private key).
    pub ssl_cert: Option<PathBuf>,
    /// PEM private key. Defaults to `ssl_cert` when unset.
    pub ssl_key: Option<PathBuf>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 9010,
            password: Secret::new(String::new()),
            ssl: false,
            ssl_cert: None,
            ssl_key: None,
        }
    }
}

/// Metrics export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether metrics collection is enabled.
    pub enabled: bool,
    /// Address of the Prometheus scrape endpoint.
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: SocketAddr::from(([127, 0, 0, 1], 9011)),
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(secret) => serializer.serialize_some(secret.expose_secret()),
        None => serializer.serialize_none(),
    }
}
