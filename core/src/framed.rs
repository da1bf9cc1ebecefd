/*
 * framed.rs
 * Copyright (C) 2026 oaproxy contributors
 *
 * This file is part of oaproxy, a local authenticating SMTP/IMAP proxy.
 *
 * oaproxy is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * oaproxy is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with oaproxy.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Line/opaque-mode framing over one half of a connection.
//!
//! `FramedStream` owns a single growable read buffer. Bytes land in that
//! buffer and stay there until a caller consumes them, so a `read_line`
//! future dropped mid-poll (e.g. the losing arm of a `tokio::select!`)
//! never loses data: nothing was ever outside `self.buf`.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::MediatorError;

/// A readable/writable byte endpoint with line- and opaque-mode reads.
pub struct FramedStream<S> {
    stream: S,
    buf: BytesMut,
    max_line: usize,
    eof: bool,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, max_line: usize) -> Self {
        Self {
            stream,
            buf: BytesMut::with_capacity(max_line.min(4096)),
            max_line,
            eof: false,
        }
    }

    /// True while the internal buffer still holds unread bytes, i.e. there
    /// may be a complete pipelined command/reply waiting without another
    /// socket read.
    pub fn pending(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Fill the buffer with at least one more chunk from the socket.
    /// Returns `Ok(0)` on clean EOF.
    async fn fill(&mut self) -> Result<usize, MediatorError> {
        if self.buf.capacity() - self.buf.len() < 1024 {
            self.buf.reserve(4096);
        }
        let n = self.stream.read_buf(&mut self.buf).await?;
        if n == 0 {
            self.eof = true;
        }
        Ok(n)
    }

    /// Find `\n` in the current buffer, if present.
    fn find_newline(&self) -> Option<usize> {
        self.buf.iter().position(|&b| b == b'\n')
    }

    /// Read the next line, including its terminator when one was present.
    /// A line exceeding `max_line` bytes without a terminator is returned
    /// truncated, and parsing continues on the next call with whatever
    /// bytes remain — this never surfaces as an error.
    pub async fn read_line(&mut self) -> Result<Bytes, MediatorError> {
        loop {
            if let Some(idx) = self.find_newline() {
                return Ok(self.buf.split_to(idx + 1).freeze());
            }
            if self.buf.len() >= self.max_line {
                return Ok(self.buf.split_to(self.max_line).freeze());
            }
            if self.eof {
                if self.buf.is_empty() {
                    return Err(MediatorError::PeerClosed);
                }
                let rest = self.buf.split_to(self.buf.len());
                return Ok(rest.freeze());
            }
            if self.fill().await? == 0 {
                if self.buf.is_empty() {
                    return Err(MediatorError::PeerClosed);
                }
                let rest = self.buf.split_to(self.buf.len());
                return Ok(rest.freeze());
            }
        }
    }

    /// Opaque-mode read used only during SMTP DATA relay: yields whatever
    /// is currently available, up to `max` bytes, performing at most one
    /// socket read if the buffer is empty.
    pub async fn read_raw(&mut self, max: usize) -> Result<Bytes, MediatorError> {
        if self.buf.is_empty() {
            if self.eof {
                return Err(MediatorError::PeerClosed);
            }
            if self.fill().await? == 0 {
                return Err(MediatorError::PeerClosed);
            }
        }
        let n = max.min(self.buf.len());
        Ok(self.buf.split_to(n).freeze())
    }

    pub async fn write_all(&mut self, data: &[u8]) -> Result<(), MediatorError> {
        self.stream.write_all(data).await?;
        Ok(())
    }

    /// Flush any buffered-but-unread bytes to `sink`. Used when handing a
    /// connection off from a framed mode to pure byte relay, so that a
    /// command read past the one being acted on isn't lost.
    pub async fn drain_buffered<W>(&mut self, sink: &mut W) -> Result<(), MediatorError>
    where
        W: AsyncWrite + Unpin,
    {
        if !self.buf.is_empty() {
            sink.write_all(&self.buf).await?;
            self.buf.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn reads_lines_split_across_reads() {
        let data = b"EHLO a\r\nQUIT\r\n".to_vec();
        let mut f = FramedStream::new(Cursor::new(data), 1024);
        assert_eq!(&f.read_line().await.unwrap()[..], b"EHLO a\r\n");
        assert_eq!(&f.read_line().await.unwrap()[..], b"QUIT\r\n");
        assert!(matches!(f.read_line().await, Err(MediatorError::PeerClosed)));
    }

    #[tokio::test]
    async fn pending_reports_buffered_pipelined_commands() {
        let data = b"tg1 NOOP\r\ntg2 NOOP\r\n".to_vec();
        let mut f = FramedStream::new(Cursor::new(data), 1024);
        let _ = f.read_line().await.unwrap();
        assert!(f.pending());
    }

    #[tokio::test]
    async fn truncates_overlong_line_without_error() {
        let mut data = vec![b'a'; 20];
        data.extend_from_slice(b"\r\n");
        let mut f = FramedStream::new(Cursor::new(data), 10);
        let first = f.read_line().await.unwrap();
        assert_eq!(first.len(), 10);
        let second = f.read_line().await.unwrap();
        assert_eq!(second.len(), 10);
        assert_eq!(&second[8..], b"\r\n");
    }
}
