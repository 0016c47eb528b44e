//! TCP/TLS implementation of [`Connector`] and [`Transport`].
use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    futures::{SinkExt, StreamExt},
    rustls::ClientConfig,
    tokio::{
        io::{AsyncRead, AsyncWrite},
        net::TcpStream,
        time::{Instant, timeout},
    },
    tokio_util::codec::Framed,
    tracing::{debug, info, warn},
};

use crate::{
    codec::IrcCodec,
    command::Command,
    error::{Error, Result},
    event::{IrcEvent, classify},
    tls,
    transport::{ConnectParams, Connector, Transport},
};

trait IrcStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> IrcStream for T {}

/// Opens plain TCP or TLS connections to an IRC server.
#[derive(Default)]
pub struct IrcConnector {
    tls_config: Option<Arc<ClientConfig>>,
}

impl IrcConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this TLS client config instead of the system roots.
    #[must_use]
    pub fn with_tls_config(mut self, config: Arc<ClientConfig>) -> Self {
        self.tls_config = Some(config);
        self
    }

    async fn open_stream(&self, params: &ConnectParams) -> Result<Box<dyn IrcStream>> {
        let tcp = TcpStream::connect((params.server.as_str(), params.port)).await?;
        tcp.set_nodelay(true)?;
        if !params.tls {
            return Ok(Box::new(tcp));
        }
        let config = match &self.tls_config {
            Some(config) => Arc::clone(config),
            None => tls::client_config(None)?,
        };
        Ok(Box::new(tls::connect(tcp, &params.server, config).await?))
    }
}

#[async_trait]
impl Connector for IrcConnector {
    async fn connect(&self, params: &ConnectParams) -> Result<Box<dyn Transport>> {
        let stream = timeout(params.connect_timeout, self.open_stream(params))
            .await
            .map_err(|_| Error::Timeout("connect"))??;
        info!(
            server = %params.server,
            port = params.port,
            tls = params.tls,
            "connected, registering"
        );

        let mut transport = IrcTransport {
            framed: Framed::new(stream, IrcCodec::default()),
            nickname: params.nickname.clone(),
            keepalive_interval: params.keepalive_interval,
            last_received: Instant::now(),
            ping_token: params.server.clone(),
            closed: false,
        };
        if let Some(password) = &params.password {
            transport.send(Command::Pass(password.clone())).await?;
        }
        transport.send(Command::Nick(params.nickname.clone())).await?;
        transport
            .send(Command::User {
                username: params.username.clone(),
                realname: params.realname.clone(),
            })
            .await?;
        Ok(Box::new(transport))
    }
}

/// A live connection. Answers server `PING`s itself and tracks our nickname.
pub struct IrcTransport {
    framed: Framed<Box<dyn IrcStream>, IrcCodec>,
    nickname: String,
    keepalive_interval: Option<Duration>,
    last_received: Instant,
    ping_token: String,
    closed: bool,
}

impl IrcTransport {
    fn disconnected(&mut self, reason: impl Into<String>) -> IrcEvent {
        self.closed = true;
        IrcEvent::Disconnected {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Transport for IrcTransport {
    async fn send(&mut self, command: Command) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }
        self.framed.send(command).await
    }

    async fn next_event(&mut self) -> IrcEvent {
        if self.closed {
            return IrcEvent::Disconnected {
                reason: "connection closed".into(),
            };
        }
        loop {
            let message = match self.framed.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => return self.disconnected(e.to_string()),
                None => return self.disconnected("connection closed by server"),
            };
            self.last_received = Instant::now();

            if message.command == "PING" {
                let token = message.param(0).unwrap_or_default().to_string();
                if let Err(e) = self.framed.send(Command::Pong(token)).await {
                    return self.disconnected(e.to_string());
                }
                continue;
            }

            let Some(event) = classify(&message, &self.nickname) else {
                continue;
            };
            match &event {
                IrcEvent::Welcome { nickname } | IrcEvent::NickChanged { nickname } => {
                    self.nickname.clone_from(nickname);
                    if let Some(server) = message.source_nick() {
                        self.ping_token = server.to_string();
                    }
                },
                IrcEvent::Disconnected { .. } => self.closed = true,
                _ => {},
            }
            return event;
        }
    }

    async fn keepalive(&mut self) -> Result<()> {
        let Some(interval) = self.keepalive_interval else {
            return Ok(());
        };
        let silent_for = self.last_received.elapsed();
        if silent_for > interval * 2 {
            warn!(
                silent_secs = silent_for.as_secs(),
                "no traffic from server, giving up on connection"
            );
            self.closed = true;
            return Err(Error::Timeout("keep-alive"));
        }
        let token = self.ping_token.clone();
        self.send(Command::Ping(token)).await
    }

    fn nickname(&self) -> &str {
        &self.nickname
    }

    async fn close(&mut self, reason: &str) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!(reason, "closing connection");
        let quit = self.framed.send(Command::Quit(Some(reason.to_string()))).await;
        let shutdown = self.framed.close().await;
        quit.and(shutdown)
    }
}
