//! Newline-delimited request lines.
use {bytes::BytesMut, tokio_util::codec::Decoder, tracing::warn};

/// Request lines longer than this are discarded.
pub const MAX_REQUEST_LINE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// A non-empty line with surrounding whitespace removed.
    Text(String),
    /// The line was not valid UTF-8.
    Undecodable { len: usize },
}

/// Splits the inbound stream on `\n`. A final line without terminator is
/// still delivered at end of stream; blank lines are skipped.
#[derive(Debug, Default)]
pub struct LineCodec {
    next_index: usize,
    discarding: bool,
}

impl LineCodec {
    fn line(raw: &[u8]) -> Option<Line> {
        match std::str::from_utf8(raw) {
            Ok(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| Line::Text(text.to_string()))
            },
            Err(_) => Some(Line::Undecodable { len: raw.len() }),
        }
    }
}

impl Decoder for LineCodec {
    type Error = std::io::Error;
    type Item = Line;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Line>, Self::Error> {
        loop {
            let Some(offset) = buf[self.next_index..].iter().position(|b| *b == b'\n') else {
                if buf.len() > MAX_REQUEST_LINE {
                    if !self.discarding {
                        warn!(limit = MAX_REQUEST_LINE, "discarding overlong request line");
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
            if std::mem::take(&mut self.discarding) || end > MAX_REQUEST_LINE {
                continue;
            }
            if let Some(line) = Self::line(&raw[..end]) {
                return Ok(Some(line));
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Line>, Self::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        let raw = buf.split();
        if std::mem::take(&mut self.discarding) {
            return Ok(None);
        }
        Ok(Self::line(&raw))
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(input: &[u8]) -> Vec<Line> {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from(input);
        let mut lines = Vec::new();
        while let Some(line) = codec.decode(&mut buf).unwrap() {
            lines.push(line);
        }
        while let Some(line) = codec.decode_eof(&mut buf).unwrap() {
            lines.push(line);
        }
        lines
    }

    fn text(s: &str) -> Line {
        Line::Text(s.into())
    }

    #[test]
    fn splits_trims_and_skips_blank_lines() {
        assert_eq!(decode_all(b"  pw:#a:one \r\n\n\r\npw:#b:two\n"), [
            text("pw:#a:one"),
            text("pw:#b:two")
        ]);
    }

    #[test]
    fn unterminated_last_line_is_kept() {
        assert_eq!(decode_all(b"pw:#a:one\npw:#a:two"), [
            text("pw:#a:one"),
            text("pw:#a:two")
        ]);
    }

    #[test]
    fn invalid_utf8_is_reported_not_fatal() {
        assert_eq!(decode_all(b"pw:#a:\xff\xfe\npw:#a:ok\n"), [
            Line::Undecodable { len: 8 },
            text("pw:#a:ok")
        ]);
    }

    #[test]
    fn overlong_line_is_skipped() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from(vec![b'x'; MAX_REQUEST_LINE + 10].as_slice());
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"tail\npw:#a:ok\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(text("pw:#a:ok")));
    }
}
