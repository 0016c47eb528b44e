//! Line codec: inbound `\n`-terminated lines, outbound CRLF-terminated commands.
use {
    bytes::{BufMut, BytesMut},
    tokio_util::codec::{Decoder, Encoder},
    tracing::{debug, warn},
};

use crate::{
    command::{Command, LINE_LIMIT},
    error::Error,
    message::Message,
};

/// Inbound lines longer than this are discarded.
pub const MAX_INBOUND_LINE: usize = 8 * 1024;

/// Decodes [`Message`]s and encodes [`Command`]s.
///
/// Inbound bytes that are not valid UTF-8 are replaced with U+FFFD instead
/// of failing the stream.
#[derive(Debug, Default)]
pub struct IrcCodec {
    /// Bytes already scanned for a newline.
    next_index: usize,
    /// Skipping the tail of an overlong line.
    discarding: bool,
}

impl Decoder for IrcCodec {
    type Error = Error;
    type Item = Message;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Message>, Error> {
        loop {
            let Some(offset) = buf[self.next_index..].iter().position(|b| *b == b'\n') else {
                if buf.len() > MAX_INBOUND_LINE {
                    if !self.discarding {
                        warn!(
                            limit = MAX_INBOUND_LINE,
                            "discarding overlong inbound line"
                        );
                    }
                    buf.clear();
                    self.discarding = true;
                }
                self.next_index = buf.len();
                return Ok(None);
            };

            let end = self.next_index + offset;
            self.next_index = 0;
            let raw = buf.split_to(end + 1);
            if std::mem::take(&mut self.discarding) || end > MAX_INBOUND_LINE {
                continue;
            }

            let text = String::from_utf8_lossy(&raw[..end]);
            let text = text.trim_end_matches('\r');
            if text.trim().is_empty() {
                continue;
            }
            match text.parse::<Message>() {
                Ok(message) => return Ok(Some(message)),
                Err(e) => debug!(error = %e, "ignoring unparsable line"),
            }
        }
    }
}

impl Encoder<Command> for IrcCodec {
    type Error = Error;

    fn encode(&mut self, command: Command, dst: &mut BytesMut) -> Result<(), Error> {
        let line = command.to_string();
        if line.contains(['\r', '\n', '\0']) {
            return Err(Error::InvalidLine);
        }
        let len = line.len() + 2;
        if len > LINE_LIMIT {
            return Err(Error::LineTooLong { len });
        }
        dst.reserve(len);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
