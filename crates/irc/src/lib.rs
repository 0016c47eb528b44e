//! Minimal IRC client transport.
//!
//! Parses inbound RFC 1459 lines into [`Message`]s, classifies the ones a
//! publishing bot cares about into [`IrcEvent`]s, and writes outbound
//! [`Command`]s through a length-checked line codec. [`IrcConnector`] opens
//! plain TCP or TLS connections and performs registration.

pub mod client;
pub mod codec;
pub mod command;
pub mod error;
pub mod event;
pub mod message;
pub mod tls;
pub mod transport;

pub use {
    client::{IrcConnector, IrcTransport},
    codec::{IrcCodec, MAX_INBOUND_LINE},
    command::{Command, LINE_LIMIT, PRIVMSG_OVERHEAD},
    error::{Error, Result},
    event::{IrcEvent, classify},
    herald_common::names::{channel_key, is_channel_name},
    message::Message,
    transport::{ConnectParams, Connector, Transport},
};
