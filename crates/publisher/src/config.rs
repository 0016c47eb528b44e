use std::time::Duration;

use {herald_config::IrcConfig, herald_irc::ConnectParams};

use crate::backoff::JoinBackoff;

/// Runtime settings of the engine, derived from `[irc]`.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub connect: ConnectParams,
    pub reconnection_interval: Duration,
    /// Tick period: at most one outbound action per tick.
    pub line_sleep: Duration,
    pub fallback_channel: Option<String>,
    pub backoff: JoinBackoff,
    /// Longest accepted channel name in bytes, already clamped.
    pub channel_maxlen: usize,
}

impl From<&IrcConfig> for PublisherConfig {
    fn from(irc: &IrcConfig) -> Self {
        Self {
            connect: ConnectParams {
                server: irc.server.clone(),
                port: irc.port,
                tls: irc.ssl,
                nickname: irc.nickname.clone(),
                username: irc.username.clone(),
                realname: irc.realname.clone(),
                password: irc.server_password.clone(),
                connect_timeout: irc.connect_timeout(),
                keepalive_interval: irc.keepalive_interval(),
            },
            reconnection_interval: irc.reconnection_interval(),
            line_sleep: irc.line_sleep(),
            fallback_channel: irc.fallback_channel().map(str::to_string),
            backoff: JoinBackoff {
                max_attempts: irc.max_join_attempts,
                memory_timeout: irc.memory_timeout(),
            },
            channel_maxlen: irc.effective_channel_maxlen(),
        }
    }
}
