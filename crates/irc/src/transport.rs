use std::time::Duration;

use {async_trait::async_trait, secrecy::Secret};

use crate::{command::Command, error::Result, event::IrcEvent};

/// Everything needed to open and register a connection.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    pub server: String,
    pub port: u16,
    pub tls: bool,
    pub nickname: String,
    pub username: String,
    pub realname: String,
    pub password: Option<Secret<String>>,
    /// Upper bound for TCP connect plus TLS handshake.
    pub connect_timeout: Duration,
    /// Client keep-alive period; `None` disables the liveness check.
    pub keepalive_interval: Option<Duration>,
}

/// Opens transports. Implemented by [`crate::IrcConnector`] and by test doubles.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect and send registration. Completion of registration is reported
    /// later as [`IrcEvent::Welcome`].
    async fn connect(&self, params: &ConnectParams) -> Result<Box<dyn Transport>>;
}

/// An open, registered-or-registering connection.
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, command: Command) -> Result<()>;

    /// Wait for the next relevant event. Must be cancel-safe: dropping the
    /// future loses no inbound data. After [`IrcEvent::Disconnected`] the
    /// transport is dead and should be dropped.
    async fn next_event(&mut self) -> IrcEvent;

    /// Periodic liveness probe; an error means the connection is dead.
    async fn keepalive(&mut self) -> Result<()> {
        Ok(())
    }

    /// Our current nickname as acknowledged by the server.
    fn nickname(&self) -> &str;

    /// Send `QUIT` and shut the connection down.
    async fn close(&mut self, reason: &str) -> Result<()>;
}
