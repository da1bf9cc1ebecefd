/*
 * net.rs
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

//! TLS dialer for the upstream connection. The proxy never negotiates
//! STARTTLS: upstream is always implicit TLS (SMTPS/IMAPS), so this module
//! is a single `connect` entry point rather than the plain/upgrade pair a
//! general-purpose mail client needs.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream as TokioTlsStream;
use tokio_rustls::rustls::client::ClientConfig;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::RootCertStore;
use tokio_rustls::TlsConnector;

/// Root store: platform native certs first, falling back to the bundled
/// Mozilla roots if the platform store can't be loaded or is empty.
fn build_root_store() -> RootCertStore {
    let mut root_store = RootCertStore::empty();
    if let Ok(certs) = rustls_native_certs::load_native_certs() {
        for cert in certs {
            let _ = root_store.add(cert);
        }
    }
    if root_store.is_empty() {
        root_store.roots = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
    }
    root_store
}

fn default_client_config() -> Arc<ClientConfig> {
    let config = ClientConfig::builder()
        .with_root_certificates(build_root_store())
        .with_no_client_auth();
    Arc::new(config)
}

static DEFAULT_CONNECTOR: std::sync::OnceLock<TlsConnector> = std::sync::OnceLock::new();

fn default_connector() -> &'static TlsConnector {
    DEFAULT_CONNECTOR.get_or_init(|| TlsConnector::from(default_client_config()))
}

/// Upstream handle: a TLS stream wrapping the TCP socket to the configured
/// `host:port`. Implements `AsyncRead + AsyncWrite` so it can be wrapped
/// directly by [`crate::framed::FramedStream`].
pub struct TlsStream {
    inner: TokioTlsStream<TcpStream>,
}

impl TlsStream {
    /// Dial `host:port` over TCP and perform the TLS handshake immediately
    /// (implicit TLS). Retries the handshake once on a transient I/O error
    /// raised while writing the ClientHello, since a freshly-opened upstream
    /// socket occasionally resets mid-handshake under load.
    pub async fn connect(host: &str, port: u16) -> io::Result<Self> {
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid upstream host name"))?;

        let mut last_err = None;
        for attempt in 0..2 {
            let tcp = TcpStream::connect((host, port)).await?;
            match default_connector().connect(server_name.clone(), tcp).await {
                Ok(inner) => return Ok(Self { inner }),
                Err(e) if attempt == 0 && is_transient(&e) => {
                    last_err = Some(e);
                    continue;
                }
                Err(e) => return Err(io::Error::new(io::ErrorKind::ConnectionRefused, e)),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            last_err.unwrap(),
        ))
    }
}

/// Transient write-side failures during the handshake (reset/aborted before
/// the server responded) are worth one retry; anything else (bad cert,
/// protocol mismatch) will just fail again.
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted | io::ErrorKind::BrokenPipe
    )
}

impl AsyncRead for TlsStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for TlsStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Dial `host:port` with implicit TLS. Thin wrapper kept for call-site
/// readability at the supervisor.
pub async fn connect_implicit_tls(host: &str, port: u16) -> io::Result<TlsStream> {
    TlsStream::connect(host, port).await
}
