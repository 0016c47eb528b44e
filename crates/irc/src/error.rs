use herald_common::FromMessage;

use crate::command::LINE_LIMIT;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Tls(#[from] rustls::Error),

    #[error(transparent)]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    #[error("{0} timed out")]
    Timeout(&'static str),

    #[error("connection closed")]
    Closed,

    #[error("outbound line contains CR, LF or NUL")]
    InvalidLine,

    #[error("outbound line is {len} bytes, limit is {LINE_LIMIT}")]
    LineTooLong { len: usize },

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    /// The codec refused the line itself; the connection is still usable.
    #[must_use]
    pub fn is_rejected_line(&self) -> bool {
        matches!(self, Self::InvalidLine | Self::LineTooLong { .. })
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

herald_common::impl_context!();
