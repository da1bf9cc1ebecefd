/*
 * plain.rs
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

//! PLAIN credential layout (RFC 4616): `authzid NUL authcid NUL password`.
//! The proxy only ever reads this; it never sends it onward.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainCredentialsError;

impl std::fmt::Display for PlainCredentialsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed PLAIN credentials")
    }
}

impl std::error::Error for PlainCredentialsError {}

/// Split decoded PLAIN credentials into `(authzid, authcid, password)`.
/// The proxy only uses `authcid` (the username to look up); `password` is
/// discarded once the account provider takes over authentication.
pub fn parse_plain_credentials(
    decoded: &[u8],
) -> Result<(String, String, String), PlainCredentialsError> {
    let mut nuls = decoded.iter().enumerate().filter(|(_, &b)| b == 0).map(|(i, _)| i);
    let first = nuls.next().ok_or(PlainCredentialsError)?;
    let second = nuls.next().ok_or(PlainCredentialsError)?;

    let authzid = String::from_utf8_lossy(&decoded[..first]).into_owned();
    let authcid = String::from_utf8_lossy(&decoded[first + 1..second]).into_owned();
    let password = String::from_utf8_lossy(&decoded[second + 1..]).into_owned();
    if authcid.is_empty() {
        return Err(PlainCredentialsError);
    }
    Ok((authzid, authcid, password))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_three_fields() {
        let (authzid, authcid, password) =
            parse_plain_credentials(b"\x00user1@example.com\x00pass123").unwrap();
        assert_eq!(authzid, "");
        assert_eq!(authcid, "user1@example.com");
        assert_eq!(password, "pass123");
    }

    #[test]
    fn rejects_missing_separator() {
        assert!(parse_plain_credentials(b"justastring").is_err());
    }

    #[test]
    fn rejects_empty_authcid() {
        assert!(parse_plain_credentials(b"\x00\x00pass123").is_err());
    }
}
