/*
 * supervisor.rs
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

//! Per-connection supervisor: dials the upstream, frames both sides, and
//! hands off to the protocol-appropriate mediator. Owns nothing past the
//! lifetime of one client connection.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{info, warn};

use crate::account::AccountProvider;
use crate::framed::FramedStream;
use crate::net;
use crate::protocol::{imap, smtp};

/// Which wire protocol a listening route speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Smtp,
    Imap,
}

/// Drive one accepted client connection to completion: dial the upstream,
/// wrap both sides in framed streams, and run the matching mediator.
///
/// Never returns an error to the caller — any failure (dial, handshake,
/// mediation) is logged and simply ends the connection, since the accept
/// loop must keep serving other clients regardless of one session's fate.
pub async fn handle_connection<C>(
    client: C,
    protocol: Protocol,
    upstream_host: &str,
    upstream_port: u16,
    accounts: Arc<dyn AccountProvider>,
    conn_id: u64,
) where
    C: AsyncRead + AsyncWrite + Unpin,
{
    info!(conn_id, upstream_host, upstream_port, ?protocol, "connection accepted");

    let upstream = match net::connect_implicit_tls(upstream_host, upstream_port).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(conn_id, upstream_host, upstream_port, error = %e, "upstream TLS dial failed");
            return;
        }
    };

    let max_line = smtp::MAX_LINE.max(imap::MAX_LINE);
    let mut client = FramedStream::new(client, max_line);
    let mut upstream = FramedStream::new(upstream, max_line);

    let result = match protocol {
        Protocol::Smtp => smtp::run(&mut client, &mut upstream, accounts.as_ref(), conn_id).await,
        Protocol::Imap => imap::run(&mut client, &mut upstream, accounts.as_ref(), conn_id).await,
    };

    match result {
        Ok(()) => info!(conn_id, "session ended"),
        Err(e) => info!(conn_id, error = %e, "session ended"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::InMemoryAccountProvider;
    use tokio::io::duplex;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn reports_dial_failure_without_panicking() {
        // Nothing listens on this port; the dial must fail cleanly.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (client_side, _keep_alive) = duplex(64);
        let accounts: Arc<dyn AccountProvider> = Arc::new(InMemoryAccountProvider::new());
        handle_connection(client_side, Protocol::Smtp, "127.0.0.1", port, accounts, 1).await;
    }
}
