// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the watcher.
//!
//! These run the real watch loop against the in-memory store: seed, start
//! an engine, write, and poll lookups until the tree reflects the change.

use crate::backend::Engine;
use crate::config::Config;
use crate::kv::memory::MemoryKv;
use crate::kv::KvClient;
use crate::lookup::{list_zones, lookup};
use std::sync::Arc;
use std::time::Duration;

async fn engine_over(kv: Arc<MemoryKv>) -> Arc<Engine> {
    let config = Config {
        endpoints: vec!["memory".to_string()],
        ..Config::default()
    };
    let (tx, rx) = tokio::sync::watch::channel(false);
    // the sender must outlive the engine's watcher task
    std::mem::forget(tx);
    Engine::start(config, kv, rx).await.unwrap()
}

/// Poll until `condition` holds; the watcher applies events asynchronously.
async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within 2s");
}

async fn seed_zone(kv: &MemoryKv) {
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
}

#[tokio::test]
async fn test_put_event_updates_the_zone() {
    let kv = Arc::new(MemoryKv::new());
    seed_zone(&kv).await;
    let engine = engine_over(kv.clone()).await;

    assert!(lookup(&engine.tree, "new.example.net.", "A", 4).is_none());

    kv.put("/DNS/net.example/new/A", b"=[192,0,2,99]")
        .await
        .unwrap();
    eventually(|| lookup(&engine.tree, "new.example.net.", "A", 4).is_some()).await;

    let answers = lookup(&engine.tree, "new.example.net.", "A", 4).unwrap();
    assert_eq!(answers[0].content, "192.0.2.99");
}

#[tokio::test]
async fn test_modify_event_replaces_the_record() {
    let kv = Arc::new(MemoryKv::new());
    seed_zone(&kv).await;
    let engine = engine_over(kv.clone()).await;

    kv.put("/DNS/net.example/www/A", b"=[192,0,2,81]")
        .await
        .unwrap();
    eventually(|| {
        lookup(&engine.tree, "www.example.net.", "A", 4)
            .is_some_and(|a| a[0].content == "192.0.2.81")
    })
    .await;
}

#[tokio::test]
async fn test_delete_event_removes_the_record() {
    let kv = Arc::new(MemoryKv::new());
    seed_zone(&kv).await;
    let engine = engine_over(kv.clone()).await;

    kv.delete("/DNS/net.example/www/A");
    eventually(|| lookup(&engine.tree, "www.example.net.", "A", 4).is_none()).await;

    // the zone itself survives
    assert!(lookup(&engine.tree, "example.net.", "SOA", 4).is_some());
}

#[tokio::test]
async fn test_event_bumps_the_soa_serial() {
    let kv = Arc::new(MemoryKv::new());
    seed_zone(&kv).await;
    let engine = engine_over(kv.clone()).await;

    let before = lookup(&engine.tree, "example.net.", "SOA", 4).unwrap()[0]
        .content
        .clone();
    let rev = kv
        .put("/DNS/net.example/new/A", b"=[192,0,2,99]")
        .await
        .unwrap();
    eventually(|| {
        lookup(&engine.tree, "example.net.", "SOA", 4).unwrap()[0]
            .content
            .contains(&format!(" {rev} "))
    })
    .await;
    assert_ne!(
        before,
        lookup(&engine.tree, "example.net.", "SOA", 4).unwrap()[0].content
    );
}

#[tokio::test]
async fn test_soa_delete_demotes_the_subtree_into_the_parent_zone() {
    let kv = Arc::new(MemoryKv::new());
    seed_zone(&kv).await;
    kv.put("/DNS/net.example/sub/SOA", b"{}").await.unwrap();
    kv.put("/DNS/net.example/sub/www/TXT", b"inner")
        .await
        .unwrap();
    let engine = engine_over(kv.clone()).await;

    eventually(|| list_zones(&engine.tree).len() == 2).await;

    kv.delete("/DNS/net.example/sub/SOA");
    eventually(|| list_zones(&engine.tree).len() == 1).await;

    // the records below the demoted apex now answer from the parent zone
    let answers = lookup(&engine.tree, "www.sub.example.net.", "TXT", 4).unwrap();
    assert_eq!(answers[0].content, "\"inner\"");
    assert!(answers[0].auth);
}

#[tokio::test]
async fn test_new_zone_appears_via_full_reload() {
    let kv = Arc::new(MemoryKv::new());
    seed_zone(&kv).await;
    let engine = engine_over(kv.clone()).await;

    kv.put("/DNS/org.fresh/SOA", b"{}").await.unwrap();
    eventually(|| list_zones(&engine.tree).len() == 2).await;
    assert!(lookup(&engine.tree, "fresh.org.", "SOA", 4).is_some());
}

#[tokio::test]
async fn test_incompatible_versions_are_ignored_by_the_watcher() {
    let kv = Arc::new(MemoryKv::new());
    seed_zone(&kv).await;
    let engine = engine_over(kv.clone()).await;

    kv.put("/DNS/net.example/future/TXT@0.1.9", b"future")
        .await
        .unwrap();
    // a later compatible write proves the earlier one was skipped, not
    // merely still in flight
    kv.put("/DNS/net.example/marker/TXT", b"marker")
        .await
        .unwrap();
    eventually(|| lookup(&engine.tree, "marker.example.net.", "TXT", 4).is_some()).await;
    assert!(lookup(&engine.tree, "future.example.net.", "TXT", 4).is_none());
}

#[tokio::test]
async fn test_watermark_advances() {
    let kv = Arc::new(MemoryKv::new());
    seed_zone(&kv).await;
    let engine = engine_over(kv.clone()).await;

    let rev = kv
        .put("/DNS/net.example/new/A", b"=[192,0,2,99]")
        .await
        .unwrap();
    eventually(|| {
        engine
            .current_revision
            .load(std::sync::atomic::Ordering::SeqCst)
            >= rev
    })
    .await;
}
