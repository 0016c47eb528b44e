//! Where accepted lines go.
use {async_trait::async_trait, herald_publisher::PublisherHandle};

use crate::error::Result;

/// Destination of parsed requests.
#[async_trait]
pub trait Relay: Send + Sync + 'static {
    /// Queue `message` for `channel`. Must not block.
    fn send(&self, channel: &str, message: &str) -> Result<()>;

    /// Names of the channels currently tracked.
    async fn channels(&self) -> Result<Vec<String>>;
}

#[async_trait]
impl Relay for PublisherHandle {
    fn send(&self, channel: &str, message: &str) -> Result<()> {
        Ok(PublisherHandle::send(self, channel, message)?)
    }

    async fn channels(&self) -> Result<Vec<String>> {
        Ok(PublisherHandle::channels(self).await?)
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        herald_config::IrcConfig,
        herald_irc::IrcConnector,
        herald_publisher::{Publisher, PublisherConfig},
        std::sync::Arc,
    };

    #[tokio::test]
    async fn publisher_handle_relays_until_engine_is_gone() {
        let config = PublisherConfig::from(&IrcConfig::default());
        let (publisher, handle) = Publisher::new(config, Arc::new(IrcConnector::new()));
        let relay: &dyn Relay = &handle;
        relay.send("#chan", "queued").unwrap();
        assert!(relay.send("#bad channel", "x").is_err());

        drop(publisher);
        let err = relay.channels().await.unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Publisher(herald_publisher::Error::Stopped)
        ));
    }
}
