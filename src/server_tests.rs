// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the connection loop.

use crate::backend::Service;
use crate::config::CliOverrides;
use crate::kv::memory::MemoryKv;
use crate::kv::KvClient;
use crate::server::serve_connection;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

async fn test_service() -> Arc<Service> {
    let kv = Arc::new(MemoryKv::new());
    let entries: Vec<(&str, &str)> = vec![
        ("/DNS/-defaults-", r#"{"ttl":"1h"}"#),
        (
            "/DNS/-defaults-/SOA",
            r#"{"primary":"ns1","mail":"h","refresh":"1h","retry":"30m","expire":604800,"neg-ttl":"10m"}"#,
        ),
        ("/DNS/net.example/SOA", "{}"),
        ("/DNS/net.example/www/A", "=[192,0,2,80]"),
    ];
    for (key, value) in entries {
        kv.put(key, value.as_bytes()).await.unwrap();
    }
    let (tx, rx) = tokio::sync::watch::channel(false);
    std::mem::forget(tx);
    let cli = CliOverrides {
        endpoints: Some(vec!["memory".to_string()]),
        ..CliOverrides::default()
    };
    Arc::new(Service::with_kv(cli, kv, rx))
}

/// Run one scripted connection: send `lines`, collect response lines until
/// the server closes.
async fn converse(lines: &[&str]) -> Vec<Value> {
    let service = test_service().await;
    let (_tx, rx) = tokio::sync::watch::channel(false);

    let (client, server) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server);
    let worker = tokio::spawn(serve_connection(service, server_read, server_write, rx));

    let (client_read, mut client_write) = tokio::io::split(client);
    for line in lines {
        client_write.write_all(line.as_bytes()).await.unwrap();
        client_write.write_all(b"\n").await.unwrap();
    }
    client_write.shutdown().await.unwrap();

    let mut responses = Vec::new();
    let mut reader = BufReader::new(client_read).lines();
    while let Ok(Some(line)) = reader.next_line().await {
        responses.push(serde_json::from_str(&line).unwrap());
    }
    worker.await.unwrap();
    responses
}

#[tokio::test]
async fn test_responses_come_back_in_request_order() {
    let responses = converse(&[
        r#"{"method":"initialize","parameters":{}}"#,
        r#"{"method":"lookup","parameters":{"qname":"www.example.net.","qtype":"A"}}"#,
        r#"{"method":"lookup","parameters":{"qname":"absent.example.net.","qtype":"A"}}"#,
        r#"{"method":"getAllDomainMetadata","parameters":{}}"#,
    ])
    .await;

    assert_eq!(responses.len(), 4);
    assert_eq!(responses[0]["result"], Value::Bool(true));
    assert_eq!(
        responses[1]["result"][0]["content"],
        Value::String("192.0.2.80".to_string())
    );
    assert_eq!(responses[2]["result"], Value::Bool(false));
    assert_eq!(responses[3]["result"], serde_json::json!({}));
}

#[tokio::test]
async fn test_connection_without_initialize_is_torn_down() {
    let responses = converse(&[
        r#"{"method":"lookup","parameters":{"qname":"www.example.net.","qtype":"A"}}"#,
        // never reached: the connection closes after the protocol error
        r#"{"method":"initialize","parameters":{}}"#,
    ])
    .await;
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["result"], Value::Bool(false));
}

#[tokio::test]
async fn test_bad_json_framing_is_fatal_for_the_connection() {
    let responses = converse(&[
        r#"{"method":"initialize","parameters":{}}"#,
        "not json at all",
        r#"{"method":"getAllDomainMetadata","parameters":{}}"#,
    ])
    .await;
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[1]["result"], Value::Bool(false));
}

#[tokio::test]
async fn test_blank_lines_are_skipped() {
    let responses = converse(&[
        r#"{"method":"initialize","parameters":{}}"#,
        "",
        r#"{"method":"getAllDomainMetadata","parameters":{}}"#,
    ])
    .await;
    assert_eq!(responses.len(), 2);
}
