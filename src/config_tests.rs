// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

use crate::config::{log_directives, split_endpoints, CliOverrides, Config};
use crate::errors::BackendError;
use serde_json::{json, Map, Value};
use std::io::Write;
use std::time::Duration;

fn params(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

#[test]
fn test_split_endpoints() {
    assert_eq!(
        split_endpoints("http://a:2379|http://b:2379"),
        vec!["http://a:2379", "http://b:2379"]
    );
    assert_eq!(split_endpoints(" a | b |"), vec!["a", "b"]);
    assert!(split_endpoints("").is_empty());
}

#[test]
fn test_resolve_from_initialize_parameters() {
    let params = params(&[
        ("endpoints", json!("http://a:2379|http://b:2379")),
        ("prefix", json!("/dns/")),
        ("timeout", json!("1500")),
        ("pdns-version", json!("3")),
    ]);
    let config = Config::resolve(&CliOverrides::default(), Some(&params)).unwrap();
    assert_eq!(config.endpoints.len(), 2);
    assert_eq!(config.prefix, "/dns/");
    assert_eq!(config.timeout, Duration::from_millis(1500));
    assert_eq!(config.pdns_version, 3);
}

#[test]
fn test_resolve_defaults() {
    let params = params(&[("endpoints", json!("http://localhost:2379"))]);
    let config = Config::resolve(&CliOverrides::default(), Some(&params)).unwrap();
    assert_eq!(config.prefix, "/DNS/");
    assert_eq!(config.timeout, Duration::from_secs(2));
    assert_eq!(config.pdns_version, 4);
}

#[test]
fn test_resolve_without_endpoints_is_fatal() {
    let result = Config::resolve(&CliOverrides::default(), None);
    assert!(matches!(result, Err(BackendError::Config(_))));
}

#[test]
fn test_cli_overrides_win_over_parameters() {
    let params = params(&[
        ("endpoints", json!("http://from-params:2379")),
        ("prefix", json!("/params/")),
    ]);
    let cli = CliOverrides {
        endpoints: Some(vec!["http://from-cli:2379".to_string()]),
        prefix: Some("/cli/".to_string()),
        timeout: Some(Duration::from_secs(5)),
        ..CliOverrides::default()
    };
    let config = Config::resolve(&cli, Some(&params)).unwrap();
    assert_eq!(config.endpoints, vec!["http://from-cli:2379"]);
    assert_eq!(config.prefix, "/cli/");
    assert_eq!(config.timeout, Duration::from_secs(5));
}

#[test]
fn test_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "endpoints:\n  - http://a:2379\nprefix: /file/\ntimeout: 750"
    )
    .unwrap();

    let cli = CliOverrides {
        config_file: Some(file.path().to_path_buf()),
        ..CliOverrides::default()
    };
    let config = Config::resolve(&cli, None).unwrap();
    assert_eq!(config.endpoints, vec!["http://a:2379"]);
    assert_eq!(config.prefix, "/file/");
    assert_eq!(config.timeout, Duration::from_millis(750));
}

#[test]
fn test_config_file_missing_is_fatal() {
    let cli = CliOverrides {
        config_file: Some("/definitely/not/here.yaml".into()),
        ..CliOverrides::default()
    };
    assert!(matches!(
        Config::resolve(&cli, None),
        Err(BackendError::Config(_))
    ));
}

#[test]
fn test_bad_parameter_types_are_config_errors() {
    let bad_timeout = params(&[
        ("endpoints", json!("http://a:2379")),
        ("timeout", json!(["nope"])),
    ]);
    assert!(Config::resolve(&CliOverrides::default(), Some(&bad_timeout)).is_err());

    let bad_endpoints = params(&[("endpoints", json!(42))]);
    assert!(Config::resolve(&CliOverrides::default(), Some(&bad_endpoints)).is_err());
}

#[test]
fn test_log_directives() {
    let params = params(&[
        ("log-debug", json!("data+kv")),
        ("log-trace", json!("pdns")),
        ("endpoints", json!("x")),
    ]);
    let mut directives = log_directives(&params);
    directives.sort();
    assert_eq!(directives, vec!["data=debug", "kv=debug", "pdns=trace"]);
}
