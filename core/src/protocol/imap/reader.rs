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

//! Client-facing IMAP command recognition: tag, command keyword, and the
//! `LOGIN` parameter string (quoted or atom form).

use bytes::Bytes;

pub const MAX_LINE: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImapCommandKind {
    Other,
    Login,
}

/// One parsed client command line.
#[derive(Debug, Clone)]
pub struct ImapCommand {
    pub kind: ImapCommandKind,
    pub line: Bytes,
    /// Maximal leading alphanumeric run (may be empty if the line didn't
    /// start with one — the line is still forwarded as `Other`).
    pub tag: Bytes,
    /// For `Login`, everything after the command keyword up to (excluding)
    /// the trailing CRLF/LF.
    pub param: Bytes,
}

fn is_tag_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
}

fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Parse one already-framed IMAP client command line.
pub fn parse_command(line: Bytes) -> ImapCommand {
    let body_len = strip_terminator(&line).len();
    let body = &line[..body_len];

    let tag_len = body.iter().take_while(|&&b| is_tag_char(b)).count();
    let tag = line.slice(0..tag_len);

    if tag_len == 0 || tag_len == body.len() {
        return ImapCommand {
            kind: ImapCommandKind::Other,
            tag,
            param: Bytes::new(),
            line,
        };
    }
    // Skip the single separating space(s) between tag and command keyword.
    let after_tag = &body[tag_len..];
    let ws = after_tag.len() - after_tag.trim_ascii_start().len();
    let cmd_start = tag_len + ws;
    let cmd_region = &body[cmd_start..];
    let cmd_len = cmd_region
        .iter()
        .take_while(|&&b| !b.is_ascii_whitespace())
        .count();
    let keyword = &cmd_region[..cmd_len];

    if keyword.eq_ignore_ascii_case(b"LOGIN") {
        let rest = &cmd_region[cmd_len..];
        let rest_ws = rest.len() - rest.trim_ascii_start().len();
        let param_start = cmd_start + cmd_len + rest_ws;
        return ImapCommand {
            kind: ImapCommandKind::Login,
            param: line.slice(param_start..body_len),
            tag,
            line,
        };
    }
    ImapCommand {
        kind: ImapCommandKind::Other,
        tag,
        param: Bytes::new(),
        line,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImapStringError;

impl std::fmt::Display for ImapStringError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed IMAP string")
    }
}

impl std::error::Error for ImapStringError {}

/// Parse the first argument of a `LOGIN` parameter string (quoted or atom
/// form) into its unescaped bytes. Returns the value and the number of
/// input bytes consumed (so the caller can find the second argument).
pub fn parse_imap_string(bytes: &[u8]) -> Result<(Vec<u8>, usize), ImapStringError> {
    if bytes.first() == Some(&b'"') {
        let mut out = Vec::new();
        let mut i = 1;
        loop {
            match bytes.get(i) {
                None => return Err(ImapStringError),
                Some(b'"') => return Ok((out, i + 1)),
                Some(b'\\') => {
                    let escaped = bytes.get(i + 1).ok_or(ImapStringError)?;
                    out.push(*escaped);
                    i += 2;
                }
                Some(&b) => {
                    out.push(b);
                    i += 1;
                }
            }
        }
    }

    let len = bytes
        .iter()
        .take_while(|&&b| !is_atom_stop(b))
        .count();
    if len == 0 {
        return Err(ImapStringError);
    }
    Ok((bytes[..len].to_vec(), len))
}

fn is_atom_stop(b: u8) -> bool {
    b.is_ascii_control() || matches!(b, b' ' | b'(' | b')' | b'{' | b'%' | b'*' | b'"' | b'\\')
}
