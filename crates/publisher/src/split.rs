//! Cutting text into chunks that fit on one `PRIVMSG` line.
use {
    herald_irc::{LINE_LIMIT, PRIVMSG_OVERHEAD},
    tracing::error,
};

/// Bytes left for target plus text once the `PRIVMSG` envelope is paid for.
pub const MAX_PAYLOAD: usize = LINE_LIMIT - PRIVMSG_OVERHEAD;

/// Chunk sizes at or below this are refused outright.
pub const MIN_CHUNK: usize = 5;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SplitError {
    #[error("channel name of {len} bytes leaves no room for text")]
    ChannelTooLong { len: usize },
}

/// Largest chunk, in bytes, that can be sent to `channel` in one line.
pub fn max_chunk(channel: &str) -> Result<usize, SplitError> {
    MAX_PAYLOAD
        .checked_sub(channel.len())
        .filter(|max| *max > MIN_CHUNK)
        .ok_or(SplitError::ChannelTooLong { len: channel.len() })
}

/// Cut `text` into ordered chunks of at most [`max_chunk`] bytes, never
/// inside a multi-byte character.
///
/// Bytes from the first undecodable sequence onwards are dropped and logged.
/// Empty text yields no chunks.
pub fn split_message(channel: &str, text: &[u8]) -> Result<Vec<String>, SplitError> {
    let max = max_chunk(channel)?;
    let mut chunks = Vec::with_capacity(text.len().div_ceil(max));
    let mut rest = text;

    while !rest.is_empty() {
        let window = &rest[..rest.len().min(max)];
        let valid = match std::str::from_utf8(window) {
            Ok(valid) => valid,
            Err(e) => std::str::from_utf8(&window[..e.valid_up_to()]).unwrap_or_default(),
        };
        if valid.is_empty() {
            error!(
                channel,
                dropped_bytes = rest.len(),
                "undecodable bytes in message, dropping the remainder"
            );
            break;
        }
        chunks.push(valid.to_string());
        rest = &rest[valid.len()..];
    }

    Ok(chunks)
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn assert_well_formed(channel: &str, text: &str, chunks: &[String]) {
        let max = max_chunk(channel).unwrap();
        assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= max));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = split_message("#chan1", b"Hello, world").unwrap();
        assert_eq!(chunks, ["Hello, world"]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(split_message("#chan", b"").unwrap().is_empty());
    }

    #[test]
    fn two_thousand_bytes_to_five_byte_channel() {
        let text: String = ('a'..='z').cycle().take(2000).collect();
        let chunks = split_message("#abcd", text.as_bytes()).unwrap();
        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks[0].len(), 495);
        assert_well_formed("#abcd", &text, &chunks);
    }

    #[rstest]
    #[case::two_byte('é')]
    #[case::three_byte('€')]
    #[case::four_byte('🦀')]
    fn never_cuts_inside_a_character(#[case] ch: char) {
        for prefix in 0..4 {
            let text = format!("{}{}", "x".repeat(prefix), ch.to_string().repeat(400));
            let chunks = split_message("#chan", text.as_bytes()).unwrap();
            assert_well_formed("#chan", &text, &chunks);
        }
    }

    #[rstest]
    #[case(MAX_PAYLOAD - MIN_CHUNK, false)]
    #[case(MAX_PAYLOAD - MIN_CHUNK - 1, true)]
    #[case(MAX_PAYLOAD + 3, false)]
    fn rejects_channels_close_to_the_limit(#[case] len: usize, #[case] accepted: bool) {
        let channel = format!("#{}", "c".repeat(len - 1));
        let result = split_message(&channel, b"text");
        assert_eq!(result.is_ok(), accepted, "{result:?}");
    }

    #[test]
    fn undecodable_tail_is_dropped() {
        let mut text = b"valid ".to_vec();
        text.extend_from_slice(&[0xff, 0xfe]);
        text.extend_from_slice(b" more");
        let chunks = split_message("#chan", &text).unwrap();
        assert_eq!(chunks, ["valid "]);
    }
}
