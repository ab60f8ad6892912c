//! Blocking line transport over the server byte stream.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::terminal::config::MAX_LINE_SIZE;

/// The server terminates lines with a carriage return.
pub const LINE_DELIMITER: u8 = b'\r';

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to resolve {target}: {source}")]
    Resolve { target: String, source: io::Error },
    #[error("no address for {target} accepted the connection: {source}")]
    Connect { target: String, source: io::Error },
    #[error("read failed: {0}")]
    Read(io::Error),
    #[error("write failed: {0}")]
    Write(io::Error),
}

/// Reads `\r`-delimited lines, truncating anything longer than the limit.
pub struct LineReader<R> {
    inner: BufReader<R>,
    limit: usize,
}

impl<R: Read> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_limit(reader, MAX_LINE_SIZE)
    }

    pub fn with_limit(reader: R, limit: usize) -> Self {
        Self {
            inner: BufReader::new(reader),
            limit: limit.max(2),
        }
    }

    /// Returns the next line including its delimiter, or `None` at end of
    /// stream. At most `limit - 1` bytes are kept; the rest of an oversized
    /// line is consumed and dropped.
    pub fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        let keep = self.limit - 1;
        let mut line: Vec<u8> = Vec::new();
        let mut read_any = false;

        loop {
            let available = match self.inner.fill_buf() {
                Ok(buf) => buf,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Read(err)),
            };
            if available.is_empty() {
                break;
            }
            read_any = true;

            let (chunk, done) = match available.iter().position(|b| *b == LINE_DELIMITER) {
                Some(idx) => (&available[..=idx], true),
                None => (available, false),
            };
            let room = keep.saturating_sub(line.len());
            line.extend_from_slice(&chunk[..chunk.len().min(room)]);
            let consumed = chunk.len();
            self.inner.consume(consumed);
            if done {
                break;
            }
        }

        if !read_any {
            return Ok(None);
        }
        trace!(target: "castle::transport", bytes = line.len(), "read line");
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }
}

pub struct LineWriter<W> {
    inner: W,
}

impl<W: Write> LineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { inner: writer }
    }

    /// Writes one outbound message verbatim; callers include the newline.
    pub fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        self.inner
            .write_all(line.as_bytes())
            .and_then(|_| self.inner.flush())
            .map_err(TransportError::Write)
    }
}

/// Unblocks a reader parked inside a blocking read.
pub trait Interrupt: Send + Sync {
    fn interrupt(&self);
}

impl Interrupt for TcpStream {
    fn interrupt(&self) {
        if let Err(err) = self.shutdown(Shutdown::Both) {
            debug!(target: "castle::transport", error = %err, "socket shutdown failed");
        }
    }
}

/// A connected transport split into its reading half, writing half and an
/// interrupt handle for the reader.
pub struct Connection<R, W> {
    pub reader: LineReader<R>,
    pub writer: LineWriter<W>,
    pub interrupt: Box<dyn Interrupt>,
}

impl<R: Read, W: Write> Connection<R, W> {
    pub fn new(reader: R, writer: W, interrupt: Box<dyn Interrupt>) -> Self {
        Self {
            reader: LineReader::new(reader),
            writer: LineWriter::new(writer),
            interrupt,
        }
    }
}

impl Connection<TcpStream, TcpStream> {
    pub fn connect(host: &str, port: u16) -> Result<Self, TransportError> {
        let target = format!("{host}:{port}");
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|source| TransportError::Resolve {
                target: target.clone(),
                source,
            })?;

        let mut last_err =
            io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses");
        for addr in addrs {
            match TcpStream::connect(addr) {
                Ok(stream) => {
                    info!(target: "castle::transport", %addr, "connected");
                    let reader = stream.try_clone().map_err(|source| TransportError::Connect {
                        target: target.clone(),
                        source,
                    })?;
                    let interrupt = stream.try_clone().map_err(|source| {
                        TransportError::Connect {
                            target: target.clone(),
                            source,
                        }
                    })?;
                    return Ok(Connection::new(reader, stream, Box::new(interrupt)));
                }
                Err(err) => {
                    debug!(target: "castle::transport", %addr, error = %err, "connect attempt failed");
                    last_err = err;
                }
            }
        }
        Err(TransportError::Connect {
            target,
            source: last_err,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn splits_on_carriage_return_and_keeps_delimiter() {
        let mut reader = LineReader::new(Cursor::new(b"first\n\rsecond\r\ntail".to_vec()));
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("first\n\r"));
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("second\r"));
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("\ntail"));
        assert_eq!(reader.read_line().unwrap(), None);
    }

    #[test]
    fn oversized_lines_are_truncated_not_carried_over() {
        let mut input = vec![b'x'; 40];
        input.push(LINE_DELIMITER);
        input.extend_from_slice(b"next\r");
        let mut reader = LineReader::with_limit(Cursor::new(input), 16);

        let first = reader.read_line().unwrap().unwrap();
        assert_eq!(first, "x".repeat(15));
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("next\r"));
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut reader = LineReader::new(Cursor::new(vec![b'a', 0xff, b'\r']));
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("a\u{fffd}\r"));
    }

    #[test]
    fn writer_sends_bytes_verbatim() {
        let mut writer = LineWriter::new(Vec::new());
        writer.write_line("set style 12\n").unwrap();
        writer.write_line("quit\n").unwrap();
        assert_eq!(writer.inner, b"set style 12\nquit\n");
    }
}
