//! Caller-facing side of the engine.
use {
    herald_common::text::preview,
    tokio::sync::{mpsc, oneshot},
    tokio_util::sync::CancellationToken,
    tracing::warn,
};

#[cfg(feature = "metrics")]
use herald_metrics::{counter, publisher as publisher_metrics};

use crate::error::{Error, Result};

/// A message submitted for publishing.
#[derive(Debug)]
pub(crate) struct Outgoing {
    pub channel: String,
    pub text: String,
}

/// Requests answered by the engine loop.
#[derive(Debug)]
pub(crate) enum Control {
    Channels(oneshot::Sender<Vec<String>>),
}

/// Cheap, cloneable handle to a running [`crate::Publisher`].
#[derive(Debug, Clone)]
pub struct PublisherHandle {
    pub(crate) inbox: mpsc::UnboundedSender<Outgoing>,
    pub(crate) control: mpsc::Sender<Control>,
    pub(crate) cancel: CancellationToken,
    pub(crate) channel_maxlen: usize,
}

impl PublisherHandle {
    /// Queue `text` for `channel` and return immediately.
    ///
    /// Channel names that are empty, longer than the configured maximum, or
    /// that contain a comma, whitespace or a control character are logged and
    /// rejected. A comma would make `JOIN` and `PRIVMSG` address several
    /// targets at once.
    pub fn send(&self, channel: impl Into<String>, text: impl Into<String>) -> Result<()> {
        let channel = channel.into();
        let text = text.into();
        if let Err(e) = validate_channel(&channel, self.channel_maxlen) {
            warn!(error = %e, message = %preview(&text), "rejecting message");
            #[cfg(feature = "metrics")]
            counter!(publisher_metrics::MESSAGES_REJECTED_TOTAL).increment(1);
            return Err(e);
        }
        self.inbox
            .send(Outgoing { channel, text })
            .map_err(|_| Error::Stopped)?;
        #[cfg(feature = "metrics")]
        counter!(publisher_metrics::MESSAGES_RECEIVED_TOTAL).increment(1);
        Ok(())
    }

    /// Names of the channels the engine currently tracks.
    pub async fn channels(&self) -> Result<Vec<String>> {
        let (tx, rx) = oneshot::channel();
        self.control
            .send(Control::Channels(tx))
            .await
            .map_err(|_| Error::Stopped)?;
        rx.await.map_err(|_| Error::Stopped)
    }

    /// Ask the engine to quit. Idempotent; wait on [`crate::Publisher::run`]
    /// for the actual shutdown.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

fn validate_channel(channel: &str, maxlen: usize) -> Result<()> {
    if channel.is_empty() {
        return Err(Error::invalid_channel(channel, "empty name"));
    }
    if channel.len() > maxlen {
        return Err(Error::invalid_channel(channel, "name too long"));
    }
    if channel.contains(',') {
        return Err(Error::invalid_channel(channel, "name contains a comma"));
    }
    if channel.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::invalid_channel(
            channel,
            "name contains whitespace or control characters",
        ));
    }
    Ok(())
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn handle(maxlen: usize) -> (PublisherHandle, mpsc::UnboundedReceiver<Outgoing>) {
        let (inbox, rx) = mpsc::unbounded_channel();
        let (control, _control_rx) = mpsc::channel(1);
        let handle = PublisherHandle {
            inbox,
            control,
            cancel: CancellationToken::new(),
            channel_maxlen: maxlen,
        };
        (handle, rx)
    }

    #[rstest]
    #[case("#chan", true)]
    #[case("alice", true)]
    #[case("", false)]
    #[case("#ten-bytes", true)]
    #[case("#eleven-byt", false)]
    #[case("#a b", false)]
    #[case("#a\r\nQUIT", false)]
    #[case("#a,#b", false)]
    #[case("alice,bob", false)]
    fn channel_validation(#[case] channel: &str, #[case] accepted: bool) {
        assert_eq!(validate_channel(channel, 10).is_ok(), accepted);
    }

    #[test]
    fn send_queues_without_blocking() {
        let (handle, mut rx) = handle(100);
        handle.send("#chan", "hello").unwrap();
        let queued = rx.try_recv().unwrap();
        assert_eq!((queued.channel.as_str(), queued.text.as_str()), ("#chan", "hello"));
    }

    #[test]
    fn rejected_channel_is_not_queued() {
        let (handle, mut rx) = handle(4);
        let err = handle.send("#toolong", "hello").unwrap_err();
        assert!(matches!(err, Error::InvalidChannel { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn multi_target_name_is_not_queued() {
        let (handle, mut rx) = handle(100);
        let err = handle.send("#a,#b", "hello").unwrap_err();
        assert!(matches!(err, Error::InvalidChannel { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn send_after_engine_gone_fails() {
        let (handle, rx) = handle(100);
        drop(rx);
        assert!(matches!(handle.send("#chan", "x"), Err(Error::Stopped)));
    }

    #[test]
    fn stop_is_idempotent() {
        let (handle, _rx) = handle(100);
        let other = handle.clone();
        assert!(!handle.is_stopped());
        handle.stop();
        other.stop();
        assert!(handle.is_stopped() && other.is_stopped());
    }

    #[tokio::test]
    async fn channels_after_engine_gone_fails() {
        let (handle, _rx) = handle(100);
        assert!(matches!(handle.channels().await, Err(Error::Stopped)));
    }
}
