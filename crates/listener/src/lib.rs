//! Inbound front-end for herald.
//!
//! Accepts TCP (optionally TLS) connections carrying newline-terminated
//! `password:channel:message` lines and hands them to a [`Relay`], normally
//! the publisher. `password::channels` lists the tracked channels.

pub mod codec;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod server;
pub mod tls;

pub use {
    error::{Error, Result},
    protocol::{LineError, Request, channels_reply, parse_line},
    relay::Relay,
    server::Listener,
};
