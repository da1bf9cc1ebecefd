/*
 * mediator.rs
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

//! IMAP mediator: a single duplex loop (no separate pre-/post-auth phase)
//! that rewrites `CAPABILITY` replies and substitutes `LOGIN` with
//! `AUTHENTICATE XOAUTH2`, relaying everything else untouched.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::account::{AccountProvider, TokenError};
use crate::codec;
use crate::error::MediatorError;
use crate::framed::FramedStream;
use crate::sasl::xoauth2_initial_response;

use super::reader::{parse_command, parse_imap_string, ImapCommandKind};
use super::reply::{parse_reply, rewrite_capability, ImapReplyKind};

/// Drive one IMAP client/upstream pair to completion.
pub async fn run<C, U>(
    client: &mut FramedStream<C>,
    upstream: &mut FramedStream<U>,
    accounts: &dyn AccountProvider,
    conn_id: u64,
) -> Result<(), MediatorError>
where
    C: AsyncRead + AsyncWrite + Unpin,
    U: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            result = upstream.read_line() => {
                let line = result?;
                handle_server_line(client, line, conn_id).await?;
                while upstream.pending() {
                    let line = upstream.read_line().await?;
                    handle_server_line(client, line, conn_id).await?;
                }
            }
            result = client.read_line() => {
                let line = result?;
                handle_client_line(client, upstream, line, accounts, conn_id).await?;
                while client.pending() {
                    let line = client.read_line().await?;
                    handle_client_line(client, upstream, line, accounts, conn_id).await?;
                }
            }
        }
    }
}

async fn handle_server_line<C>(
    client: &mut FramedStream<C>,
    line: bytes::Bytes,
    conn_id: u64,
) -> Result<(), MediatorError>
where
    C: AsyncRead + AsyncWrite + Unpin,
{
    let reply = parse_reply(line);
    if reply.kind == ImapReplyKind::Capability {
        debug!(conn_id, "rewriting CAPABILITY reply");
        client.write_all(&rewrite_capability(&reply)).await
    } else {
        client.write_all(&reply.raw).await
    }
}

async fn handle_client_line<C, U>(
    client: &mut FramedStream<C>,
    upstream: &mut FramedStream<U>,
    line: bytes::Bytes,
    accounts: &dyn AccountProvider,
    conn_id: u64,
) -> Result<(), MediatorError>
where
    C: AsyncRead + AsyncWrite + Unpin,
    U: AsyncRead + AsyncWrite + Unpin,
{
    let cmd = parse_command(line);
    match cmd.kind {
        ImapCommandKind::Login => handle_login(client, upstream, &cmd.tag, &cmd.param, accounts, conn_id).await,
        ImapCommandKind::Other => upstream.write_all(&cmd.line).await,
    }
}

async fn handle_login<C, U>(
    client: &mut FramedStream<C>,
    upstream: &mut FramedStream<U>,
    tag: &[u8],
    param: &[u8],
    accounts: &dyn AccountProvider,
    conn_id: u64,
) -> Result<(), MediatorError>
where
    C: AsyncRead + AsyncWrite + Unpin,
    U: AsyncRead + AsyncWrite + Unpin,
{
    let tag = String::from_utf8_lossy(tag).into_owned();
    let username = match parse_imap_string(param) {
        Ok((bytes, _)) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => {
            client
                .write_all(format!("{} BAD Syntax error in username\r\n", tag).as_bytes())
                .await?;
            return Ok(());
        }
    };

    let account = accounts.find(&username).await;
    let account = match account {
        Some(a) => a,
        None => {
            info!(conn_id, user = %username, "IMAP LOGIN: unknown account");
            client
                .write_all(format!("{} NO Invalid username\r\n", tag).as_bytes())
                .await?;
            return Ok(());
        }
    };
    match accounts.token(&account).await {
        Ok(token) => {
            info!(conn_id, user = %username, "IMAP LOGIN substituted with AUTHENTICATE XOAUTH2");
            let initial = xoauth2_initial_response(&username, &token);
            let b64 = codec::encode(&initial);
            upstream
                .write_all(format!("{} AUTHENTICATE XOAUTH2 {}\r\n", tag, b64).as_bytes())
                .await
        }
        Err(TokenError::NotFound) => {
            client
                .write_all(format!("{} NO Invalid username\r\n", tag).as_bytes())
                .await
        }
        Err(TokenError::CredentialRejected) => {
            warn!(conn_id, user = %username, "IMAP account not authorized");
            client
                .write_all(format!("{} NO Account not authorized for IMAP\r\n", tag).as_bytes())
                .await
        }
        Err(TokenError::Unavailable) => {
            warn!(conn_id, user = %username, "token acquisition failed");
            client
                .write_all(format!("{} NO Error obtaining access token\r\n", tag).as_bytes())
                .await
        }
    }
}
