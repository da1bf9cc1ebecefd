/*
 * mod.rs
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

//! SASL pieces the mediators actually need: parsing a client's `AUTH PLAIN`
//! payload and building the upstream `XOAUTH2` initial response. The proxy
//! never negotiates a mechanism — the client side only ever speaks PLAIN
//! (SMTP) or LOGIN (IMAP), and the upstream side only ever speaks XOAUTH2 —
//! so there is no mechanism-selection machinery here.

mod plain;
mod xoauth2;

pub use plain::{parse_plain_credentials, PlainCredentialsError};
pub use xoauth2::xoauth2_initial_response;
