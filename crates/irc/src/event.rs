//! Classification of inbound messages into the events a publisher reacts to.
use crate::{is_channel_name, message::Message};

/// Something the server told us that matters to the publisher.
///
/// Membership events are only produced when they concern our own nickname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrcEvent {
    /// Registration completed (numeric 001); carries the nickname the
    /// server assigned.
    Welcome { nickname: String },
    Join { channel: String },
    Part { channel: String },
    Kick { channel: String, by: String },
    Invite { channel: String, by: String },
    /// A message addressed to us rather than to a channel. The text is
    /// intentionally not carried.
    PrivateMessage { from: String },
    /// Numeric 433.
    NicknameInUse,
    NickChanged { nickname: String },
    Disconnected { reason: String },
}

fn is_me(nick: Option<&str>, own_nick: &str) -> bool {
    nick.is_some_and(|n| n.eq_ignore_ascii_case(own_nick))
}

/// Map a parsed message to an event; anything uninteresting yields `None`.
#[must_use]
pub fn classify(message: &Message, own_nick: &str) -> Option<IrcEvent> {
    let source = message.source_nick();
    match message.command.as_str() {
        "001" => Some(IrcEvent::Welcome {
            nickname: message.param(0).unwrap_or(own_nick).to_string(),
        }),
        "433" => Some(IrcEvent::NicknameInUse),
        "JOIN" if is_me(source, own_nick) => Some(IrcEvent::Join {
            channel: message.param(0)?.to_string(),
        }),
        "PART" if is_me(source, own_nick) => Some(IrcEvent::Part {
            channel: message.param(0)?.to_string(),
        }),
        "KICK" if is_me(message.param(1), own_nick) => Some(IrcEvent::Kick {
            channel: message.param(0)?.to_string(),
            by: source?.to_string(),
        }),
        "INVITE" => Some(IrcEvent::Invite {
            channel: message.param(1)?.to_string(),
            by: source?.to_string(),
        }),
        "PRIVMSG" if message.param(0).is_some_and(|t| !is_channel_name(t)) => {
            Some(IrcEvent::PrivateMessage {
                from: source?.to_string(),
            })
        },
        "NICK" if is_me(source, own_nick) => Some(IrcEvent::NickChanged {
            nickname: message.param(0)?.to_string(),
        }),
        "ERROR" => Some(IrcEvent::Disconnected {
            reason: message.param(0).unwrap_or("server error").to_string(),
        }),
        _ => None,
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn event(line: &str) -> Option<IrcEvent> {
        classify(&line.parse().unwrap(), "herald")
    }

    #[rstest]
    #[case(":srv 001 herald_ :Welcome", Some(IrcEvent::Welcome { nickname: "herald_".into() }))]
    #[case(":srv 433 * herald :Nickname is already in use", Some(IrcEvent::NicknameInUse))]
    #[case(":herald!h@host JOIN #chan", Some(IrcEvent::Join { channel: "#chan".into() }))]
    #[case(":Herald!h@host JOIN :#chan", Some(IrcEvent::Join { channel: "#chan".into() }))]
    #[case(":alice!a@host JOIN #chan", None)]
    #[case(":herald!h@host PART #chan :bye", Some(IrcEvent::Part { channel: "#chan".into() }))]
    #[case(":alice!a@host PART #chan", None)]
    #[case(
        ":op!o@host KICK #chan herald :out",
        Some(IrcEvent::Kick { channel: "#chan".into(), by: "op".into() })
    )]
    #[case(":op!o@host KICK #chan alice", None)]
    #[case(
        ":bob!b@host INVITE herald :#ops",
        Some(IrcEvent::Invite { channel: "#ops".into(), by: "bob".into() })
    )]
    #[case(
        ":bob!b@host PRIVMSG herald :hi",
        Some(IrcEvent::PrivateMessage { from: "bob".into() })
    )]
    #[case(":bob!b@host PRIVMSG #chan :hi", None)]
    #[case(
        ":herald!h@host NICK :herald2",
        Some(IrcEvent::NickChanged { nickname: "herald2".into() })
    )]
    #[case(
        "ERROR :Closing link",
        Some(IrcEvent::Disconnected { reason: "Closing link".into() })
    )]
    #[case(":srv 372 herald :- motd", None)]
    fn classifies(#[case] line: &str, #[case] expected: Option<IrcEvent>) {
        assert_eq!(event(line), expected);
    }
}
