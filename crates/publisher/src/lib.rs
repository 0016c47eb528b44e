//! IRC publishing engine for herald.
//!
//! Accepts `(channel, text)` pairs through a [`PublisherHandle`], splits them
//! into line-sized chunks, and publishes them over a single IRC connection
//! one action per tick, rotating fairly between channels. Channels are joined
//! on demand with bounded retries; lines for channels that cannot be joined
//! go to an optional fallback channel.

pub mod backoff;
pub mod channel;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod handle;
pub mod lifecycle;
pub mod split;
pub mod table;

pub use {
    backoff::{JoinBackoff, JoinDecision},
    channel::ChannelState,
    config::PublisherConfig,
    engine::Publisher,
    error::{Error, Result},
    events::IrcEventHandler,
    handle::PublisherHandle,
    lifecycle::{Lifecycle, Phase},
    split::{SplitError, max_chunk, split_message},
    table::ChannelTable,
};
