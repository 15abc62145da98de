// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Listeners for the frontend protocol.
//!
//! Three transports carry the same line-delimited JSON envelopes:
//!
//! - **pipe**: stdin/stdout, the default when PowerDNS launches the
//!   backend as a coprocess
//! - **unix**: a Unix socket, one task per accepted connection
//! - **http**: an axum server exposing the envelope on `POST /dnsapi` and
//!   Prometheus metrics on `GET /metrics`
//!
//! Within one connection requests are handled strictly in order, so
//! responses come back in request order. Protocol errors (bad framing, a
//! first message other than `initialize`) tear down only the affected
//! connection.

use crate::backend::{ConnectionState, Request, Response, Service};
use crate::constants::{HTTP_BACKEND_PATH, METRICS_SERVER_PATH};
use crate::errors::ProtocolError;
use crate::metrics;
use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Serve the pipe transport until stdin closes or shutdown.
pub async fn run_pipe(service: Arc<Service>, shutdown: watch::Receiver<bool>) {
    info!(target: "pdns", "serving on stdin/stdout");
    serve_connection(service, tokio::io::stdin(), tokio::io::stdout(), shutdown).await;
}

/// Serve a Unix socket, spawning one task per connection.
///
/// # Errors
///
/// Socket creation failures are fatal for the process.
pub async fn run_unix(
    service: Arc<Service>,
    path: &Path,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    // a stale socket file from a previous run blocks the bind
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("cannot remove stale socket {}", path.display()))?;
    }
    let listener = UnixListener::bind(path)
        .with_context(|| format!("cannot create unix socket {}", path.display()))?;
    info!(target: "pdns", socket = %path.display(), "serving on unix socket");

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _addr)) => {
                    let service = service.clone();
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        let (reader, writer) = stream.into_split();
                        serve_connection(service, reader, writer, shutdown).await;
                    });
                }
                Err(e) => {
                    warn!(target: "pdns", error = %e, "accept failed");
                }
            },
        }
    }
    Ok(())
}

/// Serve the HTTP transport (backend envelope + metrics).
///
/// # Errors
///
/// Bind failures are fatal for the process.
pub async fn run_http(
    service: Arc<Service>,
    address: &str,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let app = Router::new()
        .route(HTTP_BACKEND_PATH, post(http_handler))
        .route(METRICS_SERVER_PATH, get(metrics_handler))
        .with_state(service);

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("cannot bind HTTP listener to {address}"))?;
    info!(target: "pdns", address, "serving on HTTP");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await
        .context("HTTP server failed")?;
    Ok(())
}

/// HTTP requests are stateless: each carries a full envelope and needs no
/// `initialize` handshake (the engine must already be configured, or the
/// request itself may be an `initialize`).
async fn http_handler(
    State(service): State<Arc<Service>>,
    Json(request): Json<Request>,
) -> Json<Response> {
    let mut conn = ConnectionState::pre_initialized();
    match service.handle(request, &mut conn).await {
        Ok(response) => Json(response),
        Err(e) => Json(Response::failure(e.to_string())),
    }
}

async fn metrics_handler() -> String {
    match metrics::gather_metrics() {
        Ok(text) => text,
        Err(e) => {
            error!(target: "main", error = %e, "failed to gather metrics");
            String::from("# error gathering metrics\n")
        }
    }
}

/// Drive one stream connection: read a line, dispatch, write the response,
/// in strict order. Ends on EOF, shutdown, or a protocol error.
pub async fn serve_connection<R, W>(
    service: Arc<Service>,
    reader: R,
    writer: W,
    mut shutdown: watch::Receiver<bool>,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut writer = writer;
    let mut conn = ConnectionState::default();

    loop {
        let line = tokio::select! {
            _ = shutdown.changed() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                debug!(target: "pdns", error = %e, "connection read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match service.handle_line(&line, &mut conn).await {
            Ok(response) => {
                if let Err(e) = write_response(&mut writer, &response).await {
                    debug!(target: "pdns", error = %e, "connection write failed");
                    break;
                }
            }
            Err(protocol_error) => {
                warn!(target: "pdns", error = %protocol_error, "protocol error, closing connection");
                let goodbye = Response::failure(protocol_error.to_string());
                let _ = write_response(&mut writer, &goodbye).await;
                break;
            }
        }
    }
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
) -> Result<(), ProtocolError> {
    let mut payload = serde_json::to_vec(response).map_err(|e| ProtocolError::WriteFailed {
        reason: e.to_string(),
    })?;
    payload.push(b'\n');
    writer
        .write_all(&payload)
        .await
        .map_err(|e| ProtocolError::WriteFailed {
            reason: e.to_string(),
        })?;
    writer.flush().await.map_err(|e| ProtocolError::WriteFailed {
        reason: e.to_string(),
    })
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod server_tests;
