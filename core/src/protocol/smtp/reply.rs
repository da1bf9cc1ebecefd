/*
 * reply.rs
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

//! Upstream-facing SMTP reply parsing: the 3-digit code, the continuation
//! marker, and the `AUTH` capability line the mediator rewrites.

use bytes::Bytes;

pub const MAX_LINE: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpReplyKind {
    Other,
    AuthCap,
}

/// One parsed server reply line.
#[derive(Debug, Clone)]
pub struct SmtpReply {
    pub raw: Bytes,
    /// `None` when the line didn't start with exactly 3 digits.
    pub code: Option<u16>,
    /// `true` if the separator after the code is SPACE (last line of the
    /// reply); `false` for `-` (continuation). Meaningless when `code` is
    /// `None`.
    pub is_last: bool,
    pub kind: SmtpReplyKind,
}

/// Parse one already-framed server reply line.
pub fn parse_reply(raw: Bytes) -> SmtpReply {
    let body_len = super_strip_terminator_len(&raw);
    let body = &raw[..body_len];

    if body.len() < 4 || !body[..3].iter().all(|b| b.is_ascii_digit()) {
        return SmtpReply {
            raw,
            code: None,
            is_last: false,
            kind: SmtpReplyKind::Other,
        };
    }
    let code: u16 = std::str::from_utf8(&body[..3]).unwrap().parse().unwrap();
    let is_last = match body[3] {
        b' ' => true,
        b'-' => false,
        _ => {
            return SmtpReply {
                raw,
                code: None,
                is_last: false,
                kind: SmtpReplyKind::Other,
            };
        }
    };
    let text = &body[4..];
    let kind = if text.len() >= 5 && text[..4].eq_ignore_ascii_case(b"AUTH") && text[4] == b' ' {
        SmtpReplyKind::AuthCap
    } else {
        SmtpReplyKind::Other
    };
    SmtpReply {
        raw,
        code: Some(code),
        is_last,
        kind,
    }
}

fn super_strip_terminator_len(line: &[u8]) -> usize {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    line.len()
}

/// Rewrite an `AUTH ...` capability line to advertise only `AUTH PLAIN`,
/// preserving the code and continuation marker byte-for-byte.
pub fn rewrite_auth_cap(reply: &SmtpReply) -> Bytes {
    let code = reply.code.expect("rewrite_auth_cap called on unparsed reply");
    let sep = if reply.is_last { b' ' } else { b'-' };
    let mut out = Vec::with_capacity(14);
    out.extend_from_slice(format!("{:03}", code).as_bytes());
    out.push(sep);
    out.extend_from_slice(b"AUTH PLAIN\r\n");
    Bytes::from(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_last_line() {
        let r = parse_reply(Bytes::from_static(b"250 SIZE 35882577\r\n"));
        assert_eq!(r.code, Some(250));
        assert!(r.is_last);
        assert_eq!(r.kind, SmtpReplyKind::Other);
    }

    #[test]
    fn parses_continuation() {
        let r = parse_reply(Bytes::from_static(b"250-smtp.example.com at your service.\r\n"));
        assert_eq!(r.code, Some(250));
        assert!(!r.is_last);
    }

    #[test]
    fn classifies_auth_capability() {
        let r = parse_reply(Bytes::from_static(b"250-AUTH LOGIN DIGEST XOAUTH2\r\n"));
        assert_eq!(r.kind, SmtpReplyKind::AuthCap);
        assert_eq!(&rewrite_auth_cap(&r)[..], b"250-AUTH PLAIN\r\n");
    }

    #[test]
    fn auth_cap_rewrite_preserves_code_and_marker() {
        let r = parse_reply(Bytes::from_static(b"250 AUTH PLAIN LOGIN\r\n"));
        assert_eq!(&rewrite_auth_cap(&r)[..], b"250 AUTH PLAIN\r\n");
    }

    #[test]
    fn rejects_non_digit_code() {
        let r = parse_reply(Bytes::from_static(b"abc some text\r\n"));
        assert_eq!(r.code, None);
        assert_eq!(r.kind, SmtpReplyKind::Other);
    }

    #[test]
    fn does_not_misclassify_authfoo_as_auth_cap() {
        let r = parse_reply(Bytes::from_static(b"250-AUTHFOO\r\n"));
        assert_eq!(r.kind, SmtpReplyKind::Other);
    }
}
