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

//! SMTP mediator: the full-duplex loop that substitutes `AUTH PLAIN` with
//! `AUTH XOAUTH2` and rewrites the server's advertised AUTH mechanisms,
//! while otherwise relaying bytes untouched in both directions.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::account::{AccountProvider, TokenError};
use crate::codec;
use crate::error::MediatorError;
use crate::framed::FramedStream;
use crate::sasl::{parse_plain_credentials, xoauth2_initial_response};

use super::reader::{self, parse_command, DataTerminatorScanner, SmtpCommandKind};
use super::reply::{parse_reply, rewrite_auth_cap, SmtpReplyKind};

#[derive(Debug, Clone, Copy)]
enum Mode {
    Cmd,
    Data,
}

/// Drive one SMTP client/upstream pair to completion. Returns once either
/// side closes or a transport error occurs; recoverable auth failures are
/// handled in place and never end the session.
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
    let mut mode = Mode::Cmd;
    let mut scanner = DataTerminatorScanner::new();

    loop {
        tokio::select! {
            result = upstream.read_line() => {
                let line = result?;
                handle_server_line(client, upstream, line, &mut mode, conn_id).await?;
                while upstream.pending() {
                    let line = upstream.read_line().await?;
                    handle_server_line(client, upstream, line, &mut mode, conn_id).await?;
                }
            }
            result = read_client(client, &mut mode, reader::MAX_LINE) => {
                let chunk = result?;
                handle_client_chunk(client, upstream, chunk, &mut mode, &mut scanner, accounts, conn_id).await?;
                while client.pending() {
                    let chunk = read_client(client, &mut mode, reader::MAX_LINE).await?;
                    handle_client_chunk(client, upstream, chunk, &mut mode, &mut scanner, accounts, conn_id).await?;
                }
            }
        }
    }
}

enum ClientChunk {
    Line(bytes::Bytes),
    Raw(bytes::Bytes),
}

async fn read_client<C>(
    client: &mut FramedStream<C>,
    mode: &mut Mode,
    max: usize,
) -> Result<ClientChunk, MediatorError>
where
    C: AsyncRead + AsyncWrite + Unpin,
{
    match mode {
        Mode::Cmd => Ok(ClientChunk::Line(client.read_line().await?)),
        Mode::Data => Ok(ClientChunk::Raw(client.read_raw(max).await?)),
    }
}

async fn handle_server_line<C, U>(
    client: &mut FramedStream<C>,
    _upstream: &mut FramedStream<U>,
    line: bytes::Bytes,
    mode: &mut Mode,
    conn_id: u64,
) -> Result<(), MediatorError>
where
    C: AsyncRead + AsyncWrite + Unpin,
    U: AsyncRead + AsyncWrite + Unpin,
{
    let reply = parse_reply(line);
    if reply.kind == SmtpReplyKind::AuthCap {
        debug!(conn_id, "rewriting AUTH capability advertisement to PLAIN only");
        client.write_all(&rewrite_auth_cap(&reply)).await?;
    } else {
        client.write_all(&reply.raw).await?;
    }
    if reply.code == Some(354) {
        debug!(conn_id, "server accepted DATA, entering DATA mode");
        *mode = Mode::Data;
    }
    Ok(())
}

async fn handle_client_chunk<C, U>(
    client: &mut FramedStream<C>,
    upstream: &mut FramedStream<U>,
    chunk: ClientChunk,
    mode: &mut Mode,
    scanner: &mut DataTerminatorScanner,
    accounts: &dyn AccountProvider,
    conn_id: u64,
) -> Result<(), MediatorError>
where
    C: AsyncRead + AsyncWrite + Unpin,
    U: AsyncRead + AsyncWrite + Unpin,
{
    match chunk {
        ClientChunk::Raw(raw) => {
            upstream.write_all(&raw).await?;
            if scanner.feed(&raw).is_some() {
                *mode = Mode::Cmd;
            }
            Ok(())
        }
        ClientChunk::Line(line) => {
            let cmd = parse_command(line);
            match cmd.kind {
                SmtpCommandKind::AuthPlain => {
                    let payload = if cmd.data.is_empty() {
                        client.write_all(b"334\r\n").await?;
                        client.read_line().await?
                    } else {
                        cmd.data
                    };
                    handle_auth_plain(client, upstream, &payload, accounts, conn_id).await
                }
                SmtpCommandKind::Data | SmtpCommandKind::Other => {
                    upstream.write_all(&cmd.line).await
                }
            }
        }
    }
}

async fn handle_auth_plain<C, U>(
    client: &mut FramedStream<C>,
    upstream: &mut FramedStream<U>,
    payload: &[u8],
    accounts: &dyn AccountProvider,
    conn_id: u64,
) -> Result<(), MediatorError>
where
    C: AsyncRead + AsyncWrite + Unpin,
    U: AsyncRead + AsyncWrite + Unpin,
{
    let trimmed = trim_crlf(payload);
    let decoded = match codec::decode(trimmed) {
        Ok(d) => d,
        Err(_) => {
            client.write_all(b"501 Syntax error in credentials\r\n").await?;
            return Ok(());
        }
    };
    let (_authzid, authcid, _password) = match parse_plain_credentials(&decoded) {
        Ok(parts) => parts,
        Err(_) => {
            client.write_all(b"501 Syntax error in credentials\r\n").await?;
            return Ok(());
        }
    };

    let account = accounts.find(&authcid).await;
    let account = match account {
        Some(a) => a,
        None => {
            info!(conn_id, user = %authcid, "SMTP AUTH PLAIN: unknown account");
            client.write_all(b"535 Invalid username or password\r\n").await?;
            return Ok(());
        }
    };
    match accounts.token(&account).await {
        Ok(token) => {
            info!(conn_id, user = %authcid, "SMTP AUTH PLAIN substituted with XOAUTH2");
            let initial = xoauth2_initial_response(&authcid, &token);
            let b64 = codec::encode(&initial);
            upstream
                .write_all(format!("AUTH XOAUTH2 {}\r\n", b64).as_bytes())
                .await
        }
        Err(TokenError::NotFound) => {
            client.write_all(b"535 Invalid username or password\r\n").await
        }
        Err(TokenError::CredentialRejected) => {
            warn!(conn_id, user = %authcid, "SMTP account not authorized");
            client.write_all(b"535 Account not authorized for SMTP\r\n").await
        }
        Err(TokenError::Unavailable) => {
            warn!(conn_id, user = %authcid, "token acquisition failed");
            client.write_all(b"451 Error obtaining access token\r\n").await
        }
    }
}

fn trim_crlf(b: &[u8]) -> &[u8] {
    let b = b.strip_suffix(b"\n").unwrap_or(b);
    let b = b.strip_suffix(b"\r").unwrap_or(b);
    let start = b.iter().position(|c| !c.is_ascii_whitespace()).unwrap_or(b.len());
    &b[start..]
}
