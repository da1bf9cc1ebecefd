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

//! Upstream-facing IMAP reply parsing: tagged/untagged/continuation
//! classification and the `CAPABILITY` payload rewrite.

use bytes::Bytes;

pub const MAX_LINE: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImapReplyType {
    Tagged,
    Untagged,
    Continuation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImapReplyKind {
    Other,
    Capability,
}

/// One parsed server reply line.
#[derive(Debug, Clone)]
pub struct ImapReply {
    pub raw: Bytes,
    pub reply_type: ImapReplyType,
    pub kind: ImapReplyKind,
    /// For `Capability`, the space-separated token list after the keyword,
    /// up to (excluding) the trailing CRLF/LF.
    pub payload: Bytes,
}

fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Parse one already-framed server reply line.
pub fn parse_reply(raw: Bytes) -> ImapReply {
    let body_len = strip_terminator(&raw).len();
    let body = &raw[..body_len];

    let reply_type = match body.first() {
        Some(b'*') => ImapReplyType::Untagged,
        Some(b'+') => ImapReplyType::Continuation,
        _ => ImapReplyType::Tagged,
    };

    if reply_type != ImapReplyType::Untagged {
        return ImapReply {
            raw: raw.clone(),
            reply_type,
            kind: ImapReplyKind::Other,
            payload: Bytes::new(),
        };
    }

    // body is "* " followed by the rest; find the first post-marker token.
    let after_marker = &body[1..];
    let ws = after_marker.len() - after_marker.trim_ascii_start().len();
    let token_start = 1 + ws;
    let token_region = &body[token_start..];
    let token_len = token_region
        .iter()
        .take_while(|&&b| !b.is_ascii_whitespace())
        .count();
    let token = &token_region[..token_len];

    if token.eq_ignore_ascii_case(b"CAPABILITY") {
        let rest = &token_region[token_len..];
        let rest_ws = rest.len() - rest.trim_ascii_start().len();
        let payload_start = token_start + token_len + rest_ws;
        return ImapReply {
            payload: raw.slice(payload_start..body_len),
            raw,
            reply_type,
            kind: ImapReplyKind::Capability,
        };
    }
    ImapReply {
        raw,
        reply_type,
        kind: ImapReplyKind::Other,
        payload: Bytes::new(),
    }
}

/// Delete every capability token case-insensitively prefixed with `AUTH=` or
/// equal to `LOGINDISABLED`, preserving relative order and inter-token
/// spacing of what remains. Output is always `<= input` length (tokens are
/// only removed, never added).
pub fn rewrite_capability(reply: &ImapReply) -> Bytes {
    let body = strip_terminator(&reply.raw);
    let prefix_len = body.len() - reply.payload.len();
    let prefix = &body[..prefix_len];

    let mut out = Vec::with_capacity(body.len() + 2);
    out.extend_from_slice(prefix);

    let payload = &reply.payload[..];
    for (i, token) in payload.split(|&b| b == b' ').enumerate() {
        if token.is_empty() {
            continue;
        }
        if is_stripped_token(token) {
            continue;
        }
        if i > 0 && !out.is_empty() && !out.ends_with(b" ") {
            out.push(b' ');
        }
        out.extend_from_slice(token);
    }
    out.extend_from_slice(b"\r\n");
    Bytes::from(out)
}

fn is_stripped_token(token: &[u8]) -> bool {
    (token.len() >= 5 && token[..5].eq_ignore_ascii_case(b"AUTH="))
        || token.eq_ignore_ascii_case(b"LOGINDISABLED")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_untagged_capability() {
        let r = parse_reply(Bytes::from_static(
            b"* CAPABILITY IMAP4rev1 AUTH=PLAIN IDLE\r\n",
        ));
        assert_eq!(r.reply_type, ImapReplyType::Untagged);
        assert_eq!(r.kind, ImapReplyKind::Capability);
        assert_eq!(&r.payload[..], b"IMAP4rev1 AUTH=PLAIN IDLE");
    }

    #[test]
    fn classifies_tagged_reply() {
        let r = parse_reply(Bytes::from_static(b"tg1 OK LOGIN completed\r\n"));
        assert_eq!(r.reply_type, ImapReplyType::Tagged);
        assert_eq!(r.kind, ImapReplyKind::Other);
    }

    #[test]
    fn classifies_continuation() {
        let r = parse_reply(Bytes::from_static(b"+ OK\r\n"));
        assert_eq!(r.reply_type, ImapReplyType::Continuation);
    }

    #[test]
    fn rewrite_strips_auth_and_logindisabled_tokens() {
        let r = parse_reply(Bytes::from_static(
            b"* CAPABILITY IMAP4rev1 auth=plain UNSELECT AUTH=XOAUTH2 IDLE logindisabled NAMESPACE\r\n",
        ));
        let rewritten = rewrite_capability(&r);
        assert_eq!(
            &rewritten[..],
            b"* CAPABILITY IMAP4rev1 UNSELECT IDLE NAMESPACE\r\n"
        );
    }

    #[test]
    fn non_capability_untagged_reply_is_other() {
        let r = parse_reply(Bytes::from_static(b"* 5 EXISTS\r\n"));
        assert_eq!(r.kind, ImapReplyKind::Other);
    }
}
