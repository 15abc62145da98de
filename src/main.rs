// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{anyhow, Result};
use clap::Parser;
use kvdns::backend::Service;
use kvdns::config::{split_endpoints, CliOverrides, LOG_LEVELS};
use kvdns::constants::TOKIO_WORKER_THREADS;
use kvdns::server;
use kvdns::value::parse_duration;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// PowerDNS remote backend serving authoritative zones from etcd.
#[derive(Debug, Parser)]
#[command(name = "kvdns", version, about)]
struct Args {
    /// Serve the backend protocol on a Unix socket at this path
    #[arg(long, value_name = "PATH")]
    unix: Option<PathBuf>,

    /// Serve the backend protocol over HTTP on this address (host:port)
    #[arg(long, value_name = "ADDR")]
    standalone: Option<String>,

    /// KV endpoints, separated by '|'
    #[arg(long, value_name = "A|B|...")]
    endpoints: Option<String>,

    /// YAML configuration file (endpoints, prefix, timeout)
    #[arg(long, value_name = "PATH")]
    config_file: Option<PathBuf>,

    /// Global key prefix in the KV store
    #[arg(long, value_name = "STR")]
    prefix: Option<String>,

    /// Per-call KV timeout (e.g. "2s", "500ms")
    #[arg(long, value_name = "DURATION")]
    timeout: Option<String>,

    /// Frontend protocol version (3 or 4)
    #[arg(long, value_name = "N")]
    pdns_version: Option<u32>,

    /// Components logged at error level, separated by '+'
    #[arg(long, value_name = "COMPONENTS")]
    log_error: Option<String>,

    /// Components logged at warn level, separated by '+'
    #[arg(long, value_name = "COMPONENTS")]
    log_warn: Option<String>,

    /// Components logged at info level, separated by '+'
    #[arg(long, value_name = "COMPONENTS")]
    log_info: Option<String>,

    /// Components logged at debug level, separated by '+'
    #[arg(long, value_name = "COMPONENTS")]
    log_debug: Option<String>,

    /// Components logged at trace level, separated by '+'
    #[arg(long, value_name = "COMPONENTS")]
    log_trace: Option<String>,
}

impl Args {
    fn overrides(&self) -> Result<CliOverrides> {
        let timeout = match &self.timeout {
            None => None,
            Some(text) => Some(
                parse_duration(text)
                    .ok_or_else(|| anyhow!("invalid --timeout duration '{text}'"))?,
            ),
        };
        Ok(CliOverrides {
            endpoints: self.endpoints.as_deref().map(split_endpoints),
            config_file: self.config_file.clone(),
            prefix: self.prefix.clone(),
            timeout,
            pdns_version: self.pdns_version,
        })
    }

    fn log_components(&self) -> impl Iterator<Item = (&'static str, &String)> + '_ {
        [
            &self.log_error,
            &self.log_warn,
            &self.log_info,
            &self.log_debug,
            &self.log_trace,
        ]
        .into_iter()
        .zip(LOG_LEVELS.iter().copied())
        .filter_map(|(components, level)| components.as_ref().map(|c| (level, c)))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("kvdns-backend")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

/// Initialize logging with custom format
///
/// Respects `RUST_LOG` if set, widened per-component by the `--log-<level>`
/// flags. Respects `RUST_LOG_FORMAT` for output format (json or text).
/// Logging goes to stderr: stdout belongs to the frontend protocol in pipe
/// mode.
fn initialize_logging(args: &Args) {
    let mut env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    for (level, components) in args.log_components() {
        for component in components.split('+').filter(|c| !c.is_empty()) {
            match format!("{component}={level}").parse() {
                Ok(directive) => env_filter = env_filter.add_directive(directive),
                Err(e) => eprintln!("ignoring log component '{component}': {e}"),
            }
        }
    }

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_thread_names(true)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_thread_names(true)
                .compact()
                .init();
        }
    }

    info!(target: "main", "starting kvdns backend");
}

async fn async_main(args: Args) -> Result<()> {
    initialize_logging(&args);
    let cli = args.overrides()?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let service = Arc::new(Service::new(cli.clone(), shutdown_rx.clone()));

    // the command line already names the store: connect and populate now,
    // and treat failure as fatal (exit code 1)
    if cli.endpoints.is_some() || cli.config_file.is_some() {
        service
            .ensure_engine(None)
            .await
            .map_err(|e| anyhow!("initialization failed: {e}"))?;
    } else {
        debug!(target: "main", "no store configured on the command line, waiting for initialize");
    }

    let listener = {
        let service = service.clone();
        let shutdown = shutdown_rx.clone();
        async move {
            if let Some(path) = &args.unix {
                server::run_unix(service, path, shutdown).await
            } else if let Some(address) = &args.standalone {
                server::run_http(service, address, shutdown).await
            } else {
                server::run_pipe(service, shutdown).await;
                Ok(())
            }
        }
    };

    let result: Result<()> = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            info!(target: "main", "received SIGINT, shutting down");
            result.map_err(anyhow::Error::from)
        }

        result = async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                let mut sigterm = signal(SignalKind::terminate())?;
                sigterm.recv().await;
                Ok::<(), anyhow::Error>(())
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
                Ok::<(), anyhow::Error>(())
            }
        } => {
            info!(target: "main", "received SIGTERM, shutting down");
            result
        }

        result = listener => {
            if let Err(e) = &result {
                warn!(target: "main", error = %e, "listener failed");
            }
            result
        }
    };

    let _ = shutdown_tx.send(true);
    result?;
    info!(target: "main", "graceful shutdown completed");
    Ok(())
}
