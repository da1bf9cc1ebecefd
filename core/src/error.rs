/*
 * error.rs
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

//! Mediator-level errors. These terminate one session; they never propagate
//! past the connection supervisor.

use std::fmt;
use std::io;

/// Fatal-to-the-session error. Recoverable conditions (bad credentials,
/// unknown account, token failure) are not represented here: they are
/// handled in place by sending a protocol-level denial and continuing the
/// loop.
#[derive(Debug)]
pub enum MediatorError {
    /// Read or write failed on the client or upstream transport.
    Transport(io::Error),
    /// The peer closed its end cleanly with no more data.
    PeerClosed,
}

impl MediatorError {
    pub fn transport(err: io::Error) -> Self {
        Self::Transport(err)
    }
}

impl fmt::Display for MediatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediatorError::Transport(e) => write!(f, "transport error: {}", e),
            MediatorError::PeerClosed => write!(f, "peer closed connection"),
        }
    }
}

impl std::error::Error for MediatorError {}

impl From<io::Error> for MediatorError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            MediatorError::PeerClosed
        } else {
            MediatorError::Transport(err)
        }
    }
}
