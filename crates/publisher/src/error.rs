use herald_common::FromMessage;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid channel {channel:?}: {reason}")]
    InvalidChannel {
        channel: String,
        reason: &'static str,
    },

    #[error("the configured nickname is already in use")]
    NicknameInUse,

    #[error("publisher is stopped")]
    Stopped,

    #[error(transparent)]
    Irc(#[from] herald_irc::Error),

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

    #[must_use]
    pub fn invalid_channel(channel: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidChannel {
            channel: channel.into(),
            reason,
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

herald_common::impl_context!();
