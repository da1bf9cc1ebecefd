/*
 * config.rs
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

//! Config file parsing: one route per non-blank, non-comment line of the
//! form `<SMTP|IMAP> <local_port> <upstream_host>[:<upstream_port>]`.

use std::fmt;

use oaproxy_core::supervisor::Protocol;

const DEFAULT_SMTP_PORT: u16 = 465;
const DEFAULT_IMAP_PORT: u16 = 993;

/// One configured listening port, paired with the upstream it proxies to.
#[derive(Debug, Clone)]
pub struct Route {
    pub protocol: Protocol,
    pub local_port: u16,
    pub upstream_host: String,
    pub upstream_port: u16,
}

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub line_no: usize,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line_no, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Parse a whole config file's contents into routes. Blank lines and lines
/// whose first non-whitespace character is `#` are skipped.
pub fn parse_routes(contents: &str) -> Result<Vec<Route>, ConfigError> {
    let mut routes = Vec::new();
    for (i, line) in contents.lines().enumerate() {
        let line_no = i + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        routes.push(parse_line(line_no, trimmed)?);
    }
    Ok(routes)
}

fn parse_line(line_no: usize, line: &str) -> Result<Route, ConfigError> {
    let mut fields = line.split_whitespace();

    let protocol = fields
        .next()
        .ok_or_else(|| err(line_no, "missing protocol"))?;
    let protocol = match protocol.to_ascii_uppercase().as_str() {
        "SMTP" => Protocol::Smtp,
        "IMAP" => Protocol::Imap,
        other => return Err(err(line_no, format!("unknown protocol '{other}'"))),
    };

    let local_port = fields
        .next()
        .ok_or_else(|| err(line_no, "missing local port"))?;
    let local_port: u16 = local_port
        .parse()
        .map_err(|_| err(line_no, format!("invalid local port '{local_port}'")))?;

    let upstream = fields
        .next()
        .ok_or_else(|| err(line_no, "missing upstream host"))?;
    if fields.next().is_some() {
        return Err(err(line_no, "too many fields"));
    }

    let default_port = match protocol {
        Protocol::Smtp => DEFAULT_SMTP_PORT,
        Protocol::Imap => DEFAULT_IMAP_PORT,
    };
    let (upstream_host, upstream_port) = match upstream.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => {
            let port: u16 = port
                .parse()
                .map_err(|_| err(line_no, format!("invalid upstream port '{port}'")))?;
            (host.to_string(), port)
        }
        _ => (upstream.to_string(), default_port),
    };
    if upstream_host.is_empty() {
        return Err(err(line_no, "empty upstream host"));
    }

    Ok(Route {
        protocol,
        local_port,
        upstream_host,
        upstream_port,
    })
}

fn err(line_no: usize, message: impl Into<String>) -> ConfigError {
    ConfigError {
        line_no,
        message: message.into(),
    }
}
