use std::fmt::{self, Display, Formatter};

use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidPayload,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::ChunksError(err) => Display::fmt(err, f),
            Error::InvalidPayload => f.write_str("malformed event stream"),
        }
    }
}

/// A type for reading server-sent events from a chunk stream.
pub struct Sse {
    buf: String,
    // Trailing bytes of an UTF-8 sequence split across chunks.
    pending: Vec<u8>,
    // A CR ended the last chunk; it may be the first half of a CRLF.
    pending_cr: bool,
    chunks: Chunks,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: String::new(),
            pending: Vec::new(),
            pending_cr: false,
            chunks,
        }
    }

    /// Returns the data of the next event, with multiple `data` lines
    /// joined by a line feed.
    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // Read more data from the stream first.
            let mut has_more_data = false;
            if let Some(bytes) =
                self.chunks.next_chunk().await.map_err(Error::ChunksError)?
            {
                self.push_bytes(&bytes)?;
                has_more_data = true;
            } else if self.pending_cr {
                self.pending_cr = false;
                self.buf.push('\n');
            }

            // There are data in the buffer, try to parse an event. If the data
            // is not enough to parse an event, we need to read more.
            if let Some(event) = self.try_parse_event()? {
                return Ok(Some(event));
            }

            // Abort if no more data available.
            if !has_more_data {
                return Ok(None);
            }
        }
    }

    fn push_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.pending.extend_from_slice(bytes);
        let valid_len = match str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            // An incomplete sequence at the end, wait for the next chunk.
            Err(err) if err.error_len().is_none() => err.valid_up_to(),
            Err(_) => return Err(Error::InvalidPayload),
        };
        let rest = self.pending.split_off(valid_len);
        let valid = std::mem::replace(&mut self.pending, rest);
        let Ok(s) = String::from_utf8(valid) else {
            return Err(Error::InvalidPayload);
        };
        self.push_text(&s);
        Ok(())
    }

    /// Appends `text` with CRLF and lone CR line endings turned into LF.
    fn push_text(&mut self, mut text: &str) {
        if self.pending_cr {
            self.pending_cr = false;
            self.buf.push('\n');
            text = text.strip_prefix('\n').unwrap_or(text);
        }
        if let Some(rest) = text.strip_suffix('\r') {
            self.pending_cr = true;
            text = rest;
        }
        if text.contains('\r') {
            self.buf.push_str(&text.replace("\r\n", "\n").replace('\r', "\n"));
        } else {
            self.buf.push_str(text);
        }
    }

    fn try_parse_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            if self.buf.is_empty() {
                return Ok(None);
            }

            // The buffer only holds LF line endings. For the event body,
            // only `data` fields and comments are recognized. A line without
            // a colon is a field name with an empty value.
            //
            // event         = *( comment / field ) end-of-line
            // field         = 1*name-char [ colon [ space ] *any-char ] end-of-line
            // end-of-line   = ( cr lf / cr / lf )
            let Some(eol_idx) = self.buf.find("\n\n") else {
                return Ok(None);
            };

            let mut data = String::new();
            for line in self.buf[0..eol_idx].split('\n') {
                if line.starts_with(':') {
                    continue;
                }
                let (name, value) = match line.split_once(':') {
                    Some((name, value)) => {
                        (name, value.strip_prefix(' ').unwrap_or(value))
                    }
                    None => (line, ""),
                };
                if name == "data" {
                    data.push_str(value);
                    data.push('\n');
                }
            }

            // Consume the bytes from the buffer.
            self.buf.drain(0..eol_idx + 2);

            // An event without data is not dispatched.
            if data.pop().is_some() {
                return Ok(Some(data));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[tokio::test]
    async fn test_normal_events() {
        let chunks = Chunks::replay([
            Bytes::from_static(b"data: hello\n\n"),
            Bytes::from_static(b"data: bye\r\n\r\n"),
        ]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "bye");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_quirk_streaming() {
        let chunks = Chunks::replay([
            Bytes::from_static(b"data:"),
            Bytes::from_static(b" hello\r"),
            Bytes::from_static(b"\n\r\n"),
        ]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_split_utf8_and_comments() {
        let text = "data: caf\u{e9}\n\n".as_bytes();
        let split = text.len() - 3;
        let chunks = Chunks::replay([
            Bytes::from_static(b": keep-alive\n\n"),
            Bytes::copy_from_slice(&text[..split]),
            Bytes::copy_from_slice(&text[split..]),
        ]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "caf\u{e9}");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cr_line_endings() {
        let chunks = Chunks::replay([
            Bytes::from_static(b"data: a\rdata: b\r"),
            Bytes::from_static(b"\rdata: c\r\n\r"),
            Bytes::from_static(b"\ndata: d\r\r"),
        ]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "a\nb");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "c");
        // The final CR only counts once the stream ends.
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "d");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fields_without_colon() {
        let chunks = Chunks::replay([Bytes::from_static(
            b"retry\n\ndata\ndata: x\n\ndata\n\n",
        )]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "\nx");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_data() {
        let chunks = Chunks::replay([Bytes::from_static(b"xxxxxx\n\n")]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap(), None);

        let chunks = Chunks::replay([Bytes::from_static(b"xxxxxx\n")]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap(), None);

        let chunks =
            Chunks::replay([Bytes::from_static(b"data: \xff\xfe\n\n")]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap_err(), Error::InvalidPayload);
    }
}
