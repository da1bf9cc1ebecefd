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

//! SMTP mediation: client-facing `AUTH PLAIN`/`DATA` recognition, upstream
//! reply rewriting, and the duplex loop wiring the two together.

mod mediator;
mod reader;
mod reply;

pub use mediator::run;
pub use reader::{parse_command, DataTerminatorScanner, SmtpCommand, SmtpCommandKind, MAX_LINE};
pub use reply::{parse_reply, rewrite_auth_cap, SmtpReply, SmtpReplyKind};
