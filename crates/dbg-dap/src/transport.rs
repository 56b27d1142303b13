use std::io::{self, BufRead, Read, Write};

use tracing::{debug, warn};

pub const CONTENT_LENGTH: &str = "Content-Length:";
const HEADER_TERMINATOR: &str = "\r\n\r\n";

enum Header {
    Length(usize),
    Missing,
    Closed,
}

/// Reads `Content-Length` framed messages from the client.
pub struct FrameReader<R> {
    reader: R,
}

impl<R: BufRead> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Returns the next message body, or `None` once the session has ended.
    ///
    /// Header blocks without a usable `Content-Length` are skipped and the
    /// scan continues with the next block.
    pub fn read_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            let len = match self.read_header() {
                Ok(Header::Length(len)) => len,
                Ok(Header::Missing) => {
                    warn!("Skipping header block without Content-Length");
                    continue;
                }
                Ok(Header::Closed) => return None,
                Err(e) => {
                    debug!(error = %e, "Input stream failed while reading header");
                    return None;
                }
            };

            // Grows with the bytes actually received, never with the declared length.
            let mut body = Vec::new();
            match (&mut self.reader).take(len as u64).read_to_end(&mut body) {
                Ok(read) if read == len => return Some(body),
                Ok(read) => {
                    debug!(expected = len, read, "Input stream ended inside a message body");
                    return None;
                }
                Err(e) => {
                    debug!(error = %e, expected = len, "Input stream failed inside a message body");
                    return None;
                }
            }
        }
    }

    fn read_header(&mut self) -> io::Result<Header> {
        let mut content_length = None;
        let mut line = Vec::new();
        loop {
            line.clear();
            if self.reader.read_until(b'\n', &mut line)? == 0 {
                return Ok(Header::Closed);
            }

            let text = String::from_utf8_lossy(&line);
            let text = text.trim_end_matches(['\r', '\n']);
            if text.is_empty() {
                return Ok(content_length.map_or(Header::Missing, Header::Length));
            }

            if let Some(value) = text.strip_prefix(CONTENT_LENGTH) {
                match value.trim().parse() {
                    Ok(len) => content_length = Some(len),
                    Err(e) => warn!(error = %e, header = %text, "Ignoring malformed Content-Length"),
                }
            }
        }
    }
}

/// Writes one complete frame and flushes it.
///
/// Callers serialize access to the writer; a frame is never split across calls.
pub fn write_frame<W: Write + ?Sized>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    write!(
        writer,
        "{} {}{}",
        CONTENT_LENGTH,
        payload.len(),
        HEADER_TERMINATOR
    )?;
    writer.write_all(payload)?;
    writer.flush()
}
