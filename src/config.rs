// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Backend configuration.
//!
//! Three sources merge into one immutable [`Config`], weakest first:
//! built-in defaults, then a YAML config file, then the frontend's
//! `initialize` parameters, then command-line flags. The merged result is
//! frozen once the engine starts; later `initialize` messages only
//! acknowledge.

use crate::constants::{DEFAULT_KEY_PREFIX, DEFAULT_PDNS_VERSION, KV_GET_TIMEOUT};
use crate::errors::BackendError;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Log levels understood by the `log-<level>` parameters and flags.
pub const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// The resolved, immutable configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Frontend protocol version (3 or 4)
    pub pdns_version: u32,
    /// Global key prefix in the KV store
    pub prefix: String,
    /// Per-call KV timeout
    pub timeout: Duration,
    /// KV endpoints
    pub endpoints: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pdns_version: DEFAULT_PDNS_VERSION,
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            timeout: KV_GET_TIMEOUT,
            endpoints: Vec::new(),
        }
    }
}

/// Values set on the command line; they win over everything else.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// `--endpoints a|b|c`
    pub endpoints: Option<Vec<String>>,
    /// `--config-file <path>`
    pub config_file: Option<PathBuf>,
    /// `--prefix <str>`
    pub prefix: Option<String>,
    /// `--timeout <duration>`
    pub timeout: Option<Duration>,
    /// `--pdns-version <n>`
    pub pdns_version: Option<u32>,
}

/// YAML config file shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ConfigFile {
    endpoints: Vec<String>,
    prefix: Option<String>,
    /// Milliseconds
    timeout: Option<u64>,
}

impl Config {
    /// Merge all configuration sources.
    ///
    /// `params` are the frontend's `initialize` parameters, when the
    /// backend is driven over a pipe; standalone listeners pass `None`.
    ///
    /// # Errors
    ///
    /// [`BackendError::Config`] on unreadable files, malformed values, or
    /// a missing endpoint list. Fatal at startup (exit code 1); over a
    /// pipe the affected connection gets a `false` result.
    pub fn resolve(cli: &CliOverrides, params: Option<&Map<String, Value>>) -> Result<Self, BackendError> {
        let mut config = Config::default();

        let file_path = cli.config_file.clone().or_else(|| {
            params
                .and_then(|p| p.get("config-file"))
                .and_then(Value::as_str)
                .map(PathBuf::from)
        });
        if let Some(path) = file_path {
            config.apply_file(&path)?;
        }

        if let Some(params) = params {
            config.apply_parameters(params)?;
        }

        if let Some(endpoints) = &cli.endpoints {
            config.endpoints.clone_from(endpoints);
        }
        if let Some(prefix) = &cli.prefix {
            config.prefix.clone_from(prefix);
        }
        if let Some(timeout) = cli.timeout {
            config.timeout = timeout;
        }
        if let Some(version) = cli.pdns_version {
            config.pdns_version = version;
        }

        if config.endpoints.is_empty() {
            return Err(BackendError::Config(
                "no KV endpoints configured (endpoints or config-file)".to_string(),
            ));
        }
        if config.pdns_version < 3 {
            return Err(BackendError::Config(format!(
                "unsupported pdns-version {}",
                config.pdns_version
            )));
        }
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), BackendError> {
        let raw = std::fs::read(path).map_err(|e| {
            BackendError::Config(format!("cannot read config file {}: {e}", path.display()))
        })?;
        let file: ConfigFile = serde_yaml::from_slice(&raw).map_err(|e| {
            BackendError::Config(format!("cannot parse config file {}: {e}", path.display()))
        })?;
        self.endpoints = file.endpoints;
        if let Some(prefix) = file.prefix {
            self.prefix = prefix;
        }
        if let Some(ms) = file.timeout {
            self.timeout = Duration::from_millis(ms);
        }
        Ok(())
    }

    fn apply_parameters(&mut self, params: &Map<String, Value>) -> Result<(), BackendError> {
        if let Some(endpoints) = params.get("endpoints") {
            let text = endpoints
                .as_str()
                .ok_or_else(|| BackendError::Config("endpoints must be a string".to_string()))?;
            self.endpoints = split_endpoints(text);
        }
        if let Some(prefix) = params.get("prefix") {
            self.prefix = prefix
                .as_str()
                .ok_or_else(|| BackendError::Config("prefix must be a string".to_string()))?
                .to_string();
        }
        if let Some(timeout) = params.get("timeout") {
            let ms = match timeout {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.parse().ok(),
                _ => None,
            }
            .ok_or_else(|| BackendError::Config("timeout must be milliseconds".to_string()))?;
            self.timeout = Duration::from_millis(ms);
        }
        if let Some(version) = params.get("pdns-version") {
            let version = match version {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.parse().ok(),
                _ => None,
            }
            .ok_or_else(|| BackendError::Config("pdns-version must be 3 or 4".to_string()))?;
            self.pdns_version = u32::try_from(version)
                .map_err(|_| BackendError::Config("pdns-version must be 3 or 4".to_string()))?;
        }
        Ok(())
    }
}

/// Split an `a|b|c` endpoint list.
#[must_use]
pub fn split_endpoints(text: &str) -> Vec<String> {
    text.split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Translate `log-<level>` parameters into `tracing` filter directives.
///
/// A parameter `log-debug = "data+kv"` yields `["data=debug", "kv=debug"]`,
/// matching the log targets used throughout the crate (`main`, `pdns`,
/// `kv`, `data`).
#[must_use]
pub fn log_directives(params: &Map<String, Value>) -> Vec<String> {
    let mut directives = Vec::new();
    for level in LOG_LEVELS {
        let Some(components) = params
            .get(&format!("log-{level}"))
            .and_then(Value::as_str)
        else {
            continue;
        };
        for component in components.split('+').filter(|c| !c.is_empty()) {
            directives.push(format!("{component}={level}"));
        }
    }
    directives
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
