// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The frontend-facing backend service.
//!
//! Requests arrive as line-delimited JSON envelopes
//! `{"method": ..., "parameters": {...}}` and answer with
//! `{"result": <value|false>}`. Steady-state methods are `lookup`,
//! `getAllDomains` and `getAllDomainMetadata`; every connection must open
//! with `initialize`, whose parameters feed the configuration the first
//! time the engine starts.
//!
//! The engine (configuration, KV client, tree, watcher task, revision
//! watermark) starts exactly once, on the first successful `initialize` or
//! eagerly at process start when the command line already configures
//! endpoints.

use crate::config::{CliOverrides, Config};
use crate::constants::LOOKUP_TIMEOUT;
use crate::errors::{BackendError, ProtocolError};
use crate::kv::KvClient;
use crate::lookup::{self, LookupAnswer};
use crate::metrics;
use crate::tree::Tree;
use crate::watch;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::atomic::AtomicI64;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A decoded request envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    /// The method name
    pub method: String,
    /// Method parameters; an object for every method this backend handles
    #[serde(default)]
    pub parameters: Value,
}

/// A response envelope. `result` is `false` for NXDOMAIN and failures.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    /// The result value
    pub result: Value,
    /// Optional log lines for the frontend's logs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<Vec<String>>,
}

impl Response {
    /// A success response.
    #[must_use]
    pub fn ok(result: Value) -> Self {
        Self {
            result,
            log: None,
        }
    }

    /// The distinguished failure/NXDOMAIN response.
    #[must_use]
    pub fn failure(log: impl Into<Option<String>>) -> Self {
        Self {
            result: Value::Bool(false),
            log: log.into().map(|line| vec![line]),
        }
    }
}

/// Per-connection protocol state.
#[derive(Debug, Default)]
pub struct ConnectionState {
    initialized: bool,
}

impl ConnectionState {
    /// State for transports without a handshake (HTTP), where every
    /// request stands alone.
    #[must_use]
    pub fn pre_initialized() -> Self {
        Self { initialized: true }
    }
}

/// The running core: immutable after start.
pub struct Engine {
    /// The resolved configuration
    pub config: Config,
    /// The zone tree
    pub tree: Arc<Tree>,
    /// The KV client
    pub kv: Arc<dyn KvClient>,
    /// Revision watermark of the last processed watch batch
    pub current_revision: Arc<AtomicI64>,
}

impl Engine {
    /// Populate the tree and spawn the watcher.
    ///
    /// # Errors
    ///
    /// [`BackendError::Store`] when the initial population get fails.
    pub async fn start(
        config: Config,
        kv: Arc<dyn KvClient>,
        shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> Result<Arc<Self>, BackendError> {
        let tree = Arc::new(Tree::new());
        let revision = watch::initial_load(kv.as_ref(), &tree, &config).await?;
        let current_revision = Arc::new(AtomicI64::new(revision));

        tokio::spawn(watch::run(
            kv.clone(),
            tree.clone(),
            config.clone(),
            revision + 1,
            current_revision.clone(),
            shutdown,
        ));

        info!(target: "main", prefix = %config.prefix, revision, "engine started");
        Ok(Arc::new(Self {
            config,
            tree,
            kv,
            current_revision,
        }))
    }
}

/// The dispatcher shared by all listeners and connections.
pub struct Service {
    cli: CliOverrides,
    preset_kv: Option<Arc<dyn KvClient>>,
    engine: tokio::sync::OnceCell<Arc<Engine>>,
    shutdown: tokio::sync::watch::Receiver<bool>,
}

impl Service {
    /// A service that connects to the KV store from configuration.
    #[must_use]
    pub fn new(cli: CliOverrides, shutdown: tokio::sync::watch::Receiver<bool>) -> Self {
        Self {
            cli,
            preset_kv: None,
            engine: tokio::sync::OnceCell::new(),
            shutdown,
        }
    }

    /// A service bound to a pre-built KV client (tests, harnesses).
    #[must_use]
    pub fn with_kv(
        cli: CliOverrides,
        kv: Arc<dyn KvClient>,
        shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> Self {
        Self {
            cli,
            preset_kv: Some(kv),
            engine: tokio::sync::OnceCell::new(),
            shutdown,
        }
    }

    /// The engine, if it has started.
    #[must_use]
    pub fn engine(&self) -> Option<&Arc<Engine>> {
        self.engine.get()
    }

    /// Start the engine from configuration (command line and, optionally,
    /// `initialize` parameters). Idempotent; later calls return the
    /// existing engine.
    ///
    /// # Errors
    ///
    /// [`BackendError`] on configuration or store failures.
    pub async fn ensure_engine(
        &self,
        params: Option<&Map<String, Value>>,
    ) -> Result<&Arc<Engine>, BackendError> {
        self.engine
            .get_or_try_init(|| async {
                let config = Config::resolve(&self.cli, params)?;
                let kv: Arc<dyn KvClient> = match &self.preset_kv {
                    Some(kv) => kv.clone(),
                    None => Arc::new(
                        crate::kv::etcd::EtcdKv::connect(&config.endpoints, config.timeout)
                            .await?,
                    ),
                };
                Engine::start(config, kv, self.shutdown.clone()).await
            })
            .await
    }

    /// Decode and dispatch one request line.
    ///
    /// # Errors
    ///
    /// [`ProtocolError`]s are fatal for the connection; everything else is
    /// reported in-band as a `false` result.
    pub async fn handle_line(
        &self,
        line: &str,
        conn: &mut ConnectionState,
    ) -> Result<Response, ProtocolError> {
        let request: Request =
            serde_json::from_str(line).map_err(|e| ProtocolError::BadFraming {
                reason: e.to_string(),
            })?;
        self.handle(request, conn).await
    }

    /// Dispatch one decoded request.
    ///
    /// # Errors
    ///
    /// See [`Self::handle_line`].
    pub async fn handle(
        &self,
        request: Request,
        conn: &mut ConnectionState,
    ) -> Result<Response, ProtocolError> {
        if !conn.initialized && request.method != "initialize" {
            return Err(ProtocolError::NotInitialized {
                method: request.method,
            });
        }

        match request.method.as_str() {
            "initialize" => {
                let params = request.parameters.as_object();
                match self.ensure_engine(params).await {
                    Ok(_) => {
                        conn.initialized = true;
                        Ok(Response::ok(Value::Bool(true)))
                    }
                    Err(e) => {
                        warn!(target: "pdns", error = %e, "initialize failed");
                        Ok(Response::failure(e.to_string()))
                    }
                }
            }
            "lookup" => Ok(self.lookup(&request.parameters).await),
            "getAllDomains" => Ok(self.get_all_domains()),
            "getAllDomainMetadata" => Ok(Response::ok(json!({}))),
            other => {
                debug!(target: "pdns", method = other, "unhandled method");
                Ok(Response::failure(format!("unhandled method '{other}'")))
            }
        }
    }

    async fn lookup(&self, parameters: &Value) -> Response {
        let Some(engine) = self.engine.get() else {
            return Response::failure("backend not initialized".to_string());
        };
        let (Some(qname), Some(qtype)) = (
            parameters.get("qname").and_then(Value::as_str),
            parameters.get("qtype").and_then(Value::as_str),
        ) else {
            return Response::failure("lookup needs qname and qtype".to_string());
        };

        let timer = metrics::LOOKUP_DURATION_SECONDS
            .with_label_values(&[qtype])
            .start_timer();
        let answers = tokio::time::timeout(
            LOOKUP_TIMEOUT,
            run_lookup(engine.clone(), qname.to_string(), qtype.to_string()),
        )
        .await;
        timer.observe_duration();

        match answers {
            Err(_) => {
                warn!(target: "pdns", qname, qtype, "lookup timed out");
                Response::failure("lookup timed out".to_string())
            }
            Ok(None) => {
                metrics::LOOKUPS_TOTAL.with_label_values(&["miss"]).inc();
                Response::failure(None)
            }
            Ok(Some(answers)) => {
                metrics::LOOKUPS_TOTAL.with_label_values(&["hit"]).inc();
                Response::ok(serde_json::to_value(answers).unwrap_or(Value::Bool(false)))
            }
        }
    }

    fn get_all_domains(&self) -> Response {
        let Some(engine) = self.engine.get() else {
            return Response::failure("backend not initialized".to_string());
        };
        let zones: Vec<Value> = lookup::list_zones(&engine.tree)
            .into_iter()
            .map(|(zone, serial)| {
                json!({
                    "id": -1,
                    "zone": zone,
                    "kind": "native",
                    "serial": serial,
                })
            })
            .collect();
        Response::ok(Value::Array(zones))
    }
}

/// The tree walk itself is synchronous; run it on the current task.
async fn run_lookup(engine: Arc<Engine>, qname: String, qtype: String) -> Option<Vec<LookupAnswer>> {
    lookup::lookup(&engine.tree, &qname, &qtype, engine.config.pdns_version)
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod backend_tests;
