//! Accept loop and per-connection request handling.
use std::{net::SocketAddr, sync::Arc, time::Duration};

use {
    futures::StreamExt,
    herald_common::text::preview,
    herald_config::ListenerConfig,
    secrecy::{ExposeSecret, Secret},
    tokio::{
        io::{AsyncRead, AsyncWrite, AsyncWriteExt},
        net::TcpListener,
    },
    tokio_rustls::TlsAcceptor,
    tokio_util::{codec::FramedRead, sync::CancellationToken},
    tracing::{debug, error, info, warn},
};

#[cfg(feature = "metrics")]
use herald_metrics::{counter, gauge, labels, listener as listener_metrics};

use crate::{
    codec::{Line, LineCodec},
    error::{Context, Result},
    protocol::{Request, channels_reply, parse_line},
    relay::Relay,
    tls,
};

/// Bound listening socket, ready to [`serve`](Self::serve).
pub struct Listener {
    tcp: TcpListener,
    tls: Option<TlsAcceptor>,
    password: Arc<Secret<String>>,
    relay: Arc<dyn Relay>,
}

impl Listener {
    /// Bind the configured address, loading the TLS certificate first when
    /// `ssl` is enabled.
    pub async fn bind(config: &ListenerConfig, relay: Arc<dyn Relay>) -> Result<Self> {
        let tls = if config.ssl {
            let cert = config
                .ssl_cert
                .as_deref()
                .context("listener.ssl is enabled but listener.ssl_cert is not set")?;
            Some(TlsAcceptor::from(tls::server_config(
                cert,
                config.ssl_key.as_deref(),
            )?))
        } else {
            None
        };

        let tcp = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .with_context(|| format!("bind listener on {}:{}", config.host, config.port))?;
        info!(addr = %tcp.local_addr()?, tls = tls.is_some(), "listening for notifications");

        Ok(Self {
            tcp,
            tls,
            password: Arc::new(config.password.clone()),
            relay,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.tcp.local_addr()?)
    }

    /// Accept connections until `cancel` fires. Each connection is served by
    /// its own task and closed on cancellation too.
    pub async fn serve(self, cancel: CancellationToken) -> Result<()> {
        loop {
            let (stream, peer) = tokio::select! {
                () = cancel.cancelled() => break,
                accepted = self.tcp.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        if is_transient_accept_error(&e) {
                            debug!(error = %e, "accept failed");
                        } else {
                            error!(error = %e, "accept failed");
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                        continue;
                    },
                },
            };

            let connection = Connection {
                peer,
                password: Arc::clone(&self.password),
                relay: Arc::clone(&self.relay),
            };
            let acceptor = self.tls.clone();
            let cancel = cancel.child_token();
            tokio::spawn(async move {
                debug!(peer = %peer, "client connected");
                #[cfg(feature = "metrics")]
                {
                    counter!(listener_metrics::CONNECTIONS_TOTAL).increment(1);
                    gauge!(listener_metrics::CONNECTIONS_ACTIVE).increment(1.0);
                }
                match acceptor {
                    Some(acceptor) => match acceptor.accept(stream).await {
                        Ok(stream) => connection.run(stream, cancel).await,
                        Err(e) => debug!(peer = %peer, error = %e, "TLS handshake failed"),
                    },
                    None => connection.run(stream, cancel).await,
                }
                #[cfg(feature = "metrics")]
                gauge!(listener_metrics::CONNECTIONS_ACTIVE).decrement(1.0);
                debug!(peer = %peer, "client disconnected");
            });
        }
        info!("listener stopped");
        Ok(())
    }
}

struct Connection {
    peer: SocketAddr,
    password: Arc<Secret<String>>,
    relay: Arc<dyn Relay>,
}

impl Connection {
    async fn run<S>(self, stream: S, cancel: CancellationToken)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let (read, mut write) = tokio::io::split(stream);
        let mut lines = FramedRead::new(read, LineCodec::default());
        loop {
            let line = tokio::select! {
                () = cancel.cancelled() => break,
                line = lines.next() => line,
            };
            let line = match line {
                None => break,
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    debug!(peer = %self.peer, error = %e, "read failed");
                    break;
                },
            };
            #[cfg(feature = "metrics")]
            counter!(listener_metrics::LINES_TOTAL).increment(1);

            let text = match line {
                Line::Text(text) => text,
                Line::Undecodable { len } => {
                    warn!(peer = %self.peer, len, "ignoring line that is not valid UTF-8");
                    #[cfg(feature = "metrics")]
                    counter!(listener_metrics::LINES_REJECTED_TOTAL, labels::REASON => "utf8")
                        .increment(1);
                    continue;
                },
            };
            if let Err(e) = self.handle_line(&text, &mut write).await {
                debug!(peer = %self.peer, error = %e, "write failed");
                break;
            }
        }
        let _ = write.shutdown().await;
    }

    async fn handle_line<W>(&self, line: &str, write: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let request = match parse_line(line, self.password.expose_secret()) {
            Ok(request) => request,
            Err(e) => {
                warn!(peer = %self.peer, error = %e, "ignoring request line");
                #[cfg(feature = "metrics")]
                counter!(listener_metrics::LINES_REJECTED_TOTAL, labels::REASON => e.reason())
                    .increment(1);
                return Ok(());
            },
        };

        match request {
            Request::Publish { channel, message } => {
                debug!(
                    peer = %self.peer,
                    channel = %channel,
                    message = %preview(&message),
                    "received notification"
                );
                if let Err(e) = self.relay.send(&channel, &message) {
                    warn!(peer = %self.peer, channel = %channel, error = %e, "notification not queued");
                }
            },
            Request::ListChannels => {
                let names = self.relay.channels().await.unwrap_or_else(|e| {
                    warn!(peer = %self.peer, error = %e, "could not list channels");
                    Vec::new()
                });
                write.write_all(channels_reply(&names).as_bytes()).await?;
                write.flush().await?;
            },
        }
        Ok(())
    }
}

fn is_transient_accept_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::ConnectionReset
    )
}
