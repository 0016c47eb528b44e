//! Outbound commands.
use std::fmt;

use secrecy::{ExposeSecret, Secret};

/// Maximum length of a protocol line, CRLF included.
pub const LINE_LIMIT: usize = 512;

/// Bytes of `PRIVMSG <target> :<text>\r\n` that are neither target nor text.
pub const PRIVMSG_OVERHEAD: usize = "PRIVMSG ".len() + " :".len() + "\r\n".len();

/// A client-to-server command, rendered without the trailing CRLF.
#[derive(Clone)]
pub enum Command {
    Pass(Secret<String>),
    Nick(String),
    User { username: String, realname: String },
    Join(String),
    Privmsg { target: String, text: String },
    Notice { target: String, text: String },
    Ping(String),
    Pong(String),
    Quit(Option<String>),
}

impl Command {
    #[must_use]
    pub fn privmsg(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Privmsg {
            target: target.into(),
            text: text.into(),
        }
    }

    #[must_use]
    pub fn notice(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Notice {
            target: target.into(),
            text: text.into(),
        }
    }

    /// Command word, for logging without exposing arguments.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Pass(_) => "PASS",
            Self::Nick(_) => "NICK",
            Self::User { .. } => "USER",
            Self::Join(_) => "JOIN",
            Self::Privmsg { .. } => "PRIVMSG",
            Self::Notice { .. } => "NOTICE",
            Self::Ping(_) => "PING",
            Self::Pong(_) => "PONG",
            Self::Quit(_) => "QUIT",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass(password) => write!(f, "PASS {}", password.expose_secret()),
            Self::Nick(nick) => write!(f, "NICK {nick}"),
            Self::User { username, realname } => write!(f, "USER {username} 0 * :{realname}"),
            Self::Join(channel) => write!(f, "JOIN {channel}"),
            Self::Privmsg { target, text } => write!(f, "PRIVMSG {target} :{text}"),
            Self::Notice { target, text } => write!(f, "NOTICE {target} :{text}"),
            Self::Ping(token) => write!(f, "PING :{token}"),
            Self::Pong(token) => write!(f, "PONG :{token}"),
            Self::Quit(None) => write!(f, "QUIT"),
            Self::Quit(Some(reason)) => write!(f, "QUIT :{reason}"),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass(_) => f.write_str("Pass([REDACTED])"),
            other => write!(f, "Command({other})"),
        }
    }
}
