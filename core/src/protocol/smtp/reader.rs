/*
 * reader.rs
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

//! Client-facing SMTP command recognition: `AUTH PLAIN` and `DATA`, plus the
//! rolling `\r\n.\r\n` scanner that bounds SMTP DATA mode.

use bytes::Bytes;

pub const MAX_LINE: usize = 2048;

/// The two commands the mediator needs to recognize; anything else passes
/// through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpCommandKind {
    Other,
    AuthPlain,
    Data,
}

/// One parsed client command line.
#[derive(Debug, Clone)]
pub struct SmtpCommand {
    pub kind: SmtpCommandKind,
    /// Raw line, including its CRLF/LF terminator when present.
    pub line: Bytes,
    /// For `AuthPlain`, the inline credential payload (may be empty if the
    /// client sent a bare `AUTH PLAIN` and expects a `334` challenge).
    pub data: Bytes,
}

fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Case-insensitively match `keyword` at the start of `body`, requiring that
/// what follows is either end-of-input or whitespace.
fn matches_keyword(body: &[u8], keyword: &[u8]) -> bool {
    if body.len() < keyword.len() {
        return false;
    }
    let (head, rest) = body.split_at(keyword.len());
    head.eq_ignore_ascii_case(keyword) && rest.first().map_or(true, |b| b.is_ascii_whitespace())
}

/// Parse one already-framed SMTP command line. `body` (the line with its
/// CRLF/LF stripped) starts at offset 0 of `line`, so offsets computed
/// against `body` index directly into `line`.
pub fn parse_command(line: Bytes) -> SmtpCommand {
    let body_len = strip_terminator(&line).len();
    let body = &line[..body_len];

    const AUTH_PLAIN: &[u8] = b"AUTH PLAIN";
    if matches_keyword(body, AUTH_PLAIN) {
        let rest = &body[AUTH_PLAIN.len()..];
        let leading_ws = rest.len() - rest.trim_ascii_start().len();
        let data_start = AUTH_PLAIN.len() + leading_ws;
        return SmtpCommand {
            kind: SmtpCommandKind::AuthPlain,
            data: line.slice(data_start..body_len),
            line,
        };
    }
    if matches_keyword(body, b"DATA") {
        return SmtpCommand {
            kind: SmtpCommandKind::Data,
            line,
            data: Bytes::new(),
        };
    }
    SmtpCommand {
        kind: SmtpCommandKind::Other,
        line,
        data: Bytes::new(),
    }
}

/// Rolling scanner for the SMTP DATA terminator `\r\n.\r\n`, robust across
/// arbitrary chunk boundaries. `matched` is how many leading bytes of the
/// pattern are currently matched by the tail of everything scanned so far.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataTerminatorScanner {
    matched: u8,
}

const TERMINATOR: &[u8] = b"\r\n.\r\n";

impl DataTerminatorScanner {
    pub fn new() -> Self {
        Self { matched: 0 }
    }

    /// Feed one chunk of client bytes. Returns `Some(offset)` when the
    /// terminator completes inside this chunk, where `offset` is the index
    /// one past the final `\n` of the terminator (i.e. bytes `chunk[..offset]`
    /// belong to DATA mode and `chunk[offset..]` belong to the next command).
    pub fn feed(&mut self, chunk: &[u8]) -> Option<usize> {
        for (i, &b) in chunk.iter().enumerate() {
            loop {
                if b == TERMINATOR[self.matched as usize] {
                    self.matched += 1;
                    if self.matched as usize == TERMINATOR.len() {
                        self.matched = 0;
                        return Some(i + 1);
                    }
                    break;
                } else if self.matched == 0 {
                    break;
                } else {
                    // Re-derive how much of the pattern the mismatching byte
                    // itself could still start (only `\r` can restart it).
                    self.matched = 0;
                    if b == TERMINATOR[0] {
                        self.matched = 1;
                    }
                    break;
                }
            }
        }
        None
    }
}
