//! The `password:channel:message` line protocol.
use subtle::ConstantTimeEq;

/// Control command listing the tracked channels.
pub const LIST_CHANNELS: &str = "channels";

/// One accepted request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `password:channel:message`
    Publish { channel: String, message: String },
    /// `password::channels`
    ListChannels,
}

/// Why a line was ignored. Never carries the password.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineError {
    #[error("expected 3 colon-separated fields, found {found}")]
    FieldCount { found: usize },

    #[error("wrong password")]
    BadPassword,

    #[error("unknown command {0:?}")]
    UnknownCommand(String),
}

impl LineError {
    /// Metric label for this rejection.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::FieldCount { .. } => "field_count",
            Self::BadPassword => "password",
            Self::UnknownCommand(_) => "command",
        }
    }
}

/// Parse one trimmed line.
///
/// The line is split on its first two colons only, so the message may
/// itself contain colons. Channel and message are passed on untouched.
pub fn parse_line(line: &str, password: &str) -> Result<Request, LineError> {
    let mut fields = line.splitn(3, ':');
    let (Some(given), Some(channel), Some(message)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(LineError::FieldCount {
            found: line.split(':').count(),
        });
    };

    if !bool::from(given.as_bytes().ct_eq(password.as_bytes())) {
        return Err(LineError::BadPassword);
    }

    if channel.is_empty() {
        return match message {
            LIST_CHANNELS => Ok(Request::ListChannels),
            other => Err(LineError::UnknownCommand(other.to_string())),
        };
    }

    Ok(Request::Publish {
        channel: channel.to_string(),
        message: message.to_string(),
    })
}

/// Reply body for [`Request::ListChannels`]: one name per line, then an
/// empty line.
#[must_use]
pub fn channels_reply(names: &[String]) -> String {
    let mut reply = String::with_capacity(names.iter().map(|n| n.len() + 1).sum::<usize>() + 1);
    for name in names {
        reply.push_str(name);
        reply.push('\n');
    }
    reply.push('\n');
    reply
}
