/*
 * codec.rs
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

//! RFC 4648 base64 (standard alphabet, `=` padding), used to wrap/unwrap the
//! SASL payloads carried on the wire (`AUTH PLAIN <b64>`, `AUTH XOAUTH2 <b64>`,
//! IMAP `LOGIN`/`AUTHENTICATE` arguments).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Encode `data` with the standard alphabet and `=` padding.
pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode a standard-alphabet, padded base64 string.
pub fn decode(data: &[u8]) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_bytes() {
        let samples: &[&[u8]] = &[b"", b"a", b"ab", b"abc", b"\x00user\x00pass", b"\x01\x02\xff"];
        for s in samples {
            assert_eq!(decode(encode(s).as_bytes()).unwrap(), s.to_vec());
        }
    }

    #[test]
    fn matches_known_vector() {
        assert_eq!(
            encode(b"\x00user1@example.com\x00pass123"),
            "AHVzZXIxQGV4YW1wbGUuY29tAHBhc3MxMjM="
        );
    }

    #[test]
    fn rejects_invalid_input() {
        assert!(decode(b"not valid base64!!").is_err());
    }
}
