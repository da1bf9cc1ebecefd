/*
 * main.rs
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

//! Accept-loop binary: reads a route config file, opens one listener per
//! route, and hands every accepted connection to the core supervisor.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use oaproxy_core::account::{AccountProvider, InMemoryAccountProvider};
use oaproxy_core::supervisor;

use config::Route;

#[derive(Parser)]
#[command(name = "oaproxy")]
#[command(about = "Local authenticating SMTP/IMAP proxy that substitutes AUTH PLAIN/LOGIN with XOAUTH2")]
struct Args {
    /// Path to the route config file (one `<SMTP|IMAP> <port> <host>[:<port>]` per line).
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("rustls crypto provider already installed");

    let args = Args::parse();

    let contents = match std::fs::read_to_string(&args.config) {
        Ok(c) => c,
        Err(e) => {
            error!(path = %args.config.display(), error = %e, "failed to read config file");
            return ExitCode::FAILURE;
        }
    };

    let routes = match config::parse_routes(&contents) {
        Ok(r) => r,
        Err(e) => {
            error!(path = %args.config.display(), error = %e, "failed to parse config file");
            return ExitCode::FAILURE;
        }
    };
    if routes.is_empty() {
        error!(path = %args.config.display(), "config file defines no routes");
        return ExitCode::FAILURE;
    }

    // The reference provider is empty: no accounts will ever authenticate.
    // A real deployment links a crate providing its own `AccountProvider`.
    let accounts: Arc<dyn AccountProvider> = Arc::new(InMemoryAccountProvider::new());
    let conn_counter = Arc::new(AtomicU64::new(0));

    let mut listeners = Vec::with_capacity(routes.len());
    for route in routes {
        match TcpListener::bind(("0.0.0.0", route.local_port)).await {
            Ok(listener) => listeners.push((listener, route)),
            Err(e) => {
                error!(port = route.local_port, error = %e, "failed to bind listener");
                return ExitCode::FAILURE;
            }
        }
    }

    for (listener, route) in listeners {
        let accounts = accounts.clone();
        let conn_counter = conn_counter.clone();
        tokio::spawn(accept_loop(listener, route, accounts, conn_counter));
    }

    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down");
    ExitCode::SUCCESS
}

async fn accept_loop(
    listener: TcpListener,
    route: Route,
    accounts: Arc<dyn AccountProvider>,
    conn_counter: Arc<AtomicU64>,
) {
    info!(
        local_port = route.local_port,
        upstream_host = %route.upstream_host,
        upstream_port = route.upstream_port,
        protocol = ?route.protocol,
        "listening"
    );
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                error!(local_port = route.local_port, error = %e, "accept failed");
                continue;
            }
        };
        let conn_id = conn_counter.fetch_add(1, Ordering::Relaxed);
        info!(conn_id, %peer, local_port = route.local_port, "client connected");

        let accounts = accounts.clone();
        let upstream_host = route.upstream_host.clone();
        let upstream_port = route.upstream_port;
        let protocol = route.protocol;
        tokio::spawn(async move {
            supervisor::handle_connection(socket, protocol, &upstream_host, upstream_port, accounts, conn_id).await;
        });
    }
}
