//! The publishing engine: one connection, one loop, one action per tick.
use std::{future::pending, sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    herald_common::text::preview,
    herald_irc::{Command, Connector, IrcEvent, Transport, channel_key},
    tokio::{
        sync::mpsc,
        time::{Instant, Interval, MissedTickBehavior, interval, interval_at, timeout},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

#[cfg(feature = "metrics")]
use herald_metrics::{counter, gauge, labels, publisher as publisher_metrics};

use crate::{
    backoff::{JoinBackoff, JoinDecision},
    config::PublisherConfig,
    error::{Error, Result},
    events::{IrcEventHandler, dispatch},
    handle::{Control, Outgoing, PublisherHandle},
    lifecycle::{Lifecycle, Phase},
    split::split_message,
    table::ChannelTable,
};

/// Notice sent to whoever kicks us.
pub const KICK_NOTICE: &str = "That was mean, I'm just a bot you know";
/// Notice sent in reply to any private message.
pub const PRIVMSG_NOTICE: &str = "I'm a bot, hence I will never answer";
/// Reason given in `QUIT` on shutdown.
pub const QUIT_REASON: &str = "herald shutting down";

/// Intervals must be non-zero.
const MIN_PERIOD: Duration = Duration::from_millis(1);

fn invite_greeting(inviter: &str) -> String {
    format!("Hello! {inviter} invited me here. I only relay notifications.")
}

/// Owns the transport, the channel table and the connection state.
///
/// Created together with its [`PublisherHandle`]; [`Publisher::run`] drives
/// everything until the handle stops it or the nickname is refused.
pub struct Publisher {
    config: PublisherConfig,
    connector: Arc<dyn Connector>,
    transport: Option<Box<dyn Transport>>,
    lifecycle: Lifecycle,
    table: ChannelTable,
    backoff: JoinBackoff,
    inbox: mpsc::UnboundedReceiver<Outgoing>,
    control: mpsc::Receiver<Control>,
    cancel: CancellationToken,
    nickname_in_use: bool,
}

impl Publisher {
    #[must_use]
    pub fn new(config: PublisherConfig, connector: Arc<dyn Connector>) -> (Self, PublisherHandle) {
        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        let (control_tx, control) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let handle = PublisherHandle {
            inbox: inbox_tx,
            control: control_tx,
            cancel: cancel.clone(),
            channel_maxlen: config.channel_maxlen,
        };
        let publisher = Self {
            table: ChannelTable::new(config.backoff.memory_timeout),
            backoff: config.backoff,
            config,
            connector,
            transport: None,
            lifecycle: Lifecycle::default(),
            inbox,
            control,
            cancel,
            nickname_in_use: false,
        };
        (publisher, handle)
    }

    /// Run until stopped.
    ///
    /// Returns `Ok(())` after [`PublisherHandle::stop`] and
    /// [`Error::NicknameInUse`] when the server refused our nickname, which
    /// retrying cannot fix.
    pub async fn run(mut self) -> Result<()> {
        info!(
            server = %self.config.connect.server,
            port = self.config.connect.port,
            nickname = %self.config.connect.nickname,
            "publisher starting"
        );
        self.connect().await;

        let mut tick = interval(self.config.line_sleep.max(MIN_PERIOD));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let reconnect_period = self.config.reconnection_interval.max(MIN_PERIOD);
        let mut reconnect = interval_at(Instant::now() + reconnect_period, reconnect_period);
        reconnect.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut keepalive = self.config.connect.keepalive_interval.map(|period| {
            let period = period.max(MIN_PERIOD);
            let mut keepalive = interval_at(Instant::now() + period, period);
            keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
            keepalive
        });

        while !self.lifecycle.is_stopped() {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                Some(control) = self.control.recv() => self.handle_control(control),
                event = next_transport_event(&mut self.transport) => {
                    dispatch(&mut self, event).await;
                },
                _ = tick.tick() => self.tick().await,
                _ = reconnect.tick() => self.check_connection().await,
                () = next_keepalive(&mut keepalive) => self.keepalive().await,
            }
        }

        self.shutdown().await;
        if self.nickname_in_use {
            Err(Error::NicknameInUse)
        } else {
            Ok(())
        }
    }

    /// One unit of outbound work.
    async fn tick(&mut self) {
        self.drain_inbox();
        if self.lifecycle.is_stopped() || !self.lifecycle.is_connected() {
            return;
        }
        let Some(name) = self.table.find_waiting_channel() else {
            return;
        };
        let Some(state) = self.table.lookup_mut(&name) else {
            return;
        };

        if state.needs_join() {
            match self.backoff.evaluate(state, Instant::now()) {
                JoinDecision::Allow => {
                    info!(channel = %name, attempt = state.join_attempts(), "joining channel");
                    #[cfg(feature = "metrics")]
                    counter!(publisher_metrics::JOIN_ATTEMPTS_TOTAL).increment(1);
                    self.send_command(Command::Join(name)).await;
                },
                JoinDecision::Block => self.reroute_head(&name),
            }
            return;
        }

        self.publish_head(&name).await;
    }

    fn drain_inbox(&mut self) {
        while let Ok(Outgoing { channel, text }) = self.inbox.try_recv() {
            self.ingest(&channel, &text);
        }
        #[cfg(feature = "metrics")]
        {
            gauge!(publisher_metrics::CHANNELS_TRACKED).set(self.table.len() as f64);
            gauge!(publisher_metrics::BACKLOG_LINES).set(self.table.backlog_len() as f64);
        }
    }

    /// Split `text` into protocol-safe chunks and queue them for `channel`.
    ///
    /// Each line of `text` becomes its own message and NUL bytes are removed,
    /// so no chunk can carry a second protocol line.
    fn ingest(&mut self, channel: &str, text: &str) {
        for line in text.split(['\r', '\n']) {
            let line = line.replace('\0', "");
            if line.is_empty() {
                continue;
            }
            match split_message(channel, line.as_bytes()) {
                Ok(chunks) if chunks.is_empty() => {},
                Ok(chunks) => {
                    let state = self.table.get(channel);
                    for chunk in chunks {
                        state.push_back(chunk);
                    }
                },
                Err(e) => {
                    warn!(channel, error = %e, message = %preview(&line), "dropping message");
                    #[cfg(feature = "metrics")]
                    counter!(publisher_metrics::LINES_DROPPED_TOTAL, labels::REASON => "split")
                        .increment(1);
                },
            }
        }
    }

    /// `name` cannot be joined right now: move its head line to the fallback
    /// channel, or drop it.
    fn reroute_head(&mut self, name: &str) {
        let Some(line) = self.table.pop(name) else {
            return;
        };
        match self.config.fallback_channel.clone() {
            Some(fallback) if channel_key(&fallback) != channel_key(name) => {
                info!(
                    channel = name,
                    fallback = %fallback,
                    message = %preview(&line),
                    "channel blocked, rerouting message"
                );
                #[cfg(feature = "metrics")]
                counter!(publisher_metrics::REROUTES_TOTAL).increment(1);
                self.ingest(&fallback, &line);
            },
            _ => {
                warn!(
                    channel = name,
                    message = %preview(&line),
                    "channel blocked, dropping message"
                );
                #[cfg(feature = "metrics")]
                counter!(publisher_metrics::LINES_DROPPED_TOTAL, labels::REASON => "blocked")
                    .increment(1);
            },
        }
    }

    async fn publish_head(&mut self, name: &str) {
        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        let Some(chunk) = self.table.pop(name) else {
            return;
        };
        match transport.send(Command::privmsg(name, chunk.clone())).await {
            Ok(()) => {
                info!(channel = name, message = %preview(&chunk), "published");
                #[cfg(feature = "metrics")]
                counter!(publisher_metrics::CHUNKS_SENT_TOTAL).increment(1);
            },
            Err(e) if e.is_rejected_line() => {
                error!(
                    channel = name,
                    error = %e,
                    message = %preview(&chunk),
                    "line rejected by codec, dropping it"
                );
                #[cfg(feature = "metrics")]
                counter!(publisher_metrics::LINES_DROPPED_TOTAL, labels::REASON => "rejected")
                    .increment(1);
            },
            Err(e) => {
                self.table.get(name).push_front(chunk);
                self.handle_disconnect(format!("send failed: {e}")).await;
            },
        }
    }

    /// Send a non-message command; I/O failures tear the connection down.
    async fn send_command(&mut self, command: Command) {
        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        let verb = command.verb();
        match transport.send(command).await {
            Ok(()) => {},
            Err(e) if e.is_rejected_line() => {
                warn!(command = verb, error = %e, "command rejected by codec");
            },
            Err(e) => self.handle_disconnect(format!("send failed: {e}")).await,
        }
    }

    /// Open a connection unless one is up, in flight, or we are stopping.
    async fn connect(&mut self) {
        if !self.lifecycle.begin_connect() {
            return;
        }
        let params = &self.config.connect;
        info!(server = %params.server, port = params.port, tls = params.tls, "connecting");

        let attempt = timeout(params.connect_timeout, self.connector.connect(params));
        let outcome = tokio::select! {
            outcome = attempt => outcome,
            () = self.cancel.cancelled() => {
                self.lifecycle.stop();
                return;
            },
        };
        match outcome {
            Ok(Ok(transport)) => {
                self.transport = Some(transport);
                self.lifecycle.connected();
            },
            Ok(Err(e)) => {
                warn!(error = %e, "connection failed");
                self.lifecycle.disconnected();
                #[cfg(feature = "metrics")]
                counter!(publisher_metrics::DISCONNECTIONS_TOTAL).increment(1);
            },
            Err(_) => {
                warn!("connection attempt timed out");
                self.lifecycle.disconnected();
                #[cfg(feature = "metrics")]
                counter!(publisher_metrics::DISCONNECTIONS_TOTAL).increment(1);
            },
        }
    }

    /// Reconnection timer: retry when down, give up on stalled registration.
    async fn check_connection(&mut self) {
        self.table.prune_join_memory();
        match self.lifecycle.phase() {
            Phase::Disconnected => self.connect().await,
            Phase::Connected if self.lifecycle.elapsed() >= self.config.connect.connect_timeout => {
                self.handle_disconnect("registration timed out".into()).await;
            },
            _ => {},
        }
    }

    async fn keepalive(&mut self) {
        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        if let Err(e) = transport.keepalive().await {
            self.handle_disconnect(format!("keep-alive failed: {e}")).await;
        }
    }

    async fn handle_disconnect(&mut self, reason: String) {
        let was_active = self.lifecycle.is_connected();
        self.transport = None;
        self.lifecycle.disconnected();
        self.table.leave_all();
        if was_active {
            warn!(reason = %reason, backlog = self.table.backlog_len(), "disconnected");
        } else {
            debug!(reason = %reason, "connection dropped before registration");
        }
        #[cfg(feature = "metrics")]
        {
            counter!(publisher_metrics::DISCONNECTIONS_TOTAL).increment(1);
            gauge!(publisher_metrics::CONNECTED).set(0.0);
        }
    }

    fn handle_control(&mut self, control: Control) {
        match control {
            Control::Channels(reply) => {
                let _ = reply.send(self.table.names());
            },
        }
    }

    async fn shutdown(&mut self) {
        self.lifecycle.stop();
        self.cancel.cancel();
        if let Some(mut transport) = self.transport.take() {
            match timeout(
                self.config.connect.connect_timeout,
                transport.close(QUIT_REASON),
            )
            .await
            {
                Ok(Ok(())) => {},
                Ok(Err(e)) => debug!(error = %e, "error while closing connection"),
                Err(_) => debug!("closing connection timed out"),
            }
        }
        let backlog = self.table.backlog_len();
        if backlog > 0 {
            warn!(backlog, "stopping with unsent lines");
        }
        info!("publisher stopped");
        #[cfg(feature = "metrics")]
        gauge!(publisher_metrics::CONNECTED).set(0.0);
    }
}

#[async_trait]
impl IrcEventHandler for Publisher {
    async fn on_welcome(&mut self, nickname: String) {
        self.lifecycle.welcomed();
        info!(nickname = %nickname, "registered with server");
        #[cfg(feature = "metrics")]
        {
            counter!(publisher_metrics::CONNECTIONS_TOTAL).increment(1);
            gauge!(publisher_metrics::CONNECTED).set(1.0);
        }
    }

    async fn on_join(&mut self, channel: String) {
        info!(channel = %channel, "joined channel");
        self.table.get(&channel).mark_joined();
    }

    async fn on_part(&mut self, channel: String) {
        info!(channel = %channel, "left channel");
        self.table.leave(&channel);
    }

    async fn on_kick(&mut self, channel: String, by: String) {
        info!(channel = %channel, by = %by, "kicked from channel");
        self.send_command(Command::notice(by, KICK_NOTICE)).await;
        self.table.leave(&channel);
    }

    async fn on_invite(&mut self, channel: String, by: String) {
        info!(channel = %channel, by = %by, "invited to channel");
        self.ingest(&channel, &invite_greeting(&by));
    }

    async fn on_private_message(&mut self, from: String) {
        debug!(from = %from, "answering private message");
        self.send_command(Command::notice(from, PRIVMSG_NOTICE)).await;
    }

    async fn on_nickname_in_use(&mut self) {
        error!(
            nickname = %self.config.connect.nickname,
            "nickname already in use, stopping publisher"
        );
        self.nickname_in_use = true;
        self.lifecycle.stop();
    }

    async fn on_nick_changed(&mut self, nickname: String) {
        info!(nickname = %nickname, "nickname changed");
    }

    async fn on_disconnect(&mut self, reason: String) {
        self.handle_disconnect(reason).await;
    }
}

async fn next_transport_event(transport: &mut Option<Box<dyn Transport>>) -> IrcEvent {
    match transport {
        Some(transport) => transport.next_event().await,
        None => pending().await,
    }
}

async fn next_keepalive(keepalive: &mut Option<Interval>) {
    match keepalive {
        Some(keepalive) => {
            keepalive.tick().await;
        },
        None => pending().await,
    }
}
