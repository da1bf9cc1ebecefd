/*
 * lib.rs
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

//! Mediation engine for the oaproxy SMTP/IMAP authenticating proxy.
//!
//! A connection is accepted on a cleartext local port, dialed to an upstream
//! server over implicit TLS, and handed to a protocol-specific mediator that
//! relays bytes in both directions while substituting legacy plaintext
//! credentials (`AUTH PLAIN`, IMAP `LOGIN`) for an `XOAUTH2` bearer-token
//! exchange looked up through an [`account::AccountProvider`].

pub mod account;
pub mod codec;
pub mod error;
pub mod framed;
pub mod net;
pub mod protocol;
pub mod sasl;
pub mod supervisor;

pub use account::{Account, AccountProvider, TokenError};
pub use error::MediatorError;
