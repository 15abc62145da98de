// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # kvdns - PowerDNS remote backend for etcd-stored zones
//!
//! kvdns serves authoritative DNS zones whose records live in a
//! strongly-consistent key-value store (etcd v3). A co-resident PowerDNS
//! frontend speaks line-delimited JSON to the backend over a pipe, a Unix
//! socket or HTTP; every query is answered from an in-memory zone tree
//! that a watch task keeps synchronized with the store.
//!
//! ## Overview
//!
//! - [`name`], [`key`], [`content`], [`version`] - the KV entry grammar:
//!   reversed-label names, key decomposition, content forms, schema
//!   version gating
//! - [`tree`] - the hierarchical zone tree with per-node locking
//! - [`render`] - per-QTYPE record rendering with defaults/options
//!   inheritance
//! - [`reload`] - subtree rebuilds from raw KV items
//! - [`watch`] - the KV watch loop routing change events to zone reloads
//! - [`lookup`] - the query path
//! - [`backend`], [`server`] - the frontend protocol and its listeners
//!
//! ## Data layout
//!
//! A zone `example.net` lives under reversed keys: its SOA at
//! `<prefix>net.example/SOA`, a host record at
//! `<prefix>net.example/www/A`, inheritable defaults at
//! `<prefix>net.example/-defaults-` and rendering options at
//! `<prefix>net.example/-options-`.

pub mod backend;
pub mod config;
pub mod constants;
pub mod content;
pub mod errors;
pub mod key;
pub mod kv;
pub mod lookup;
pub mod metrics;
pub mod name;
pub mod reload;
pub mod render;
pub mod server;
pub mod tree;
pub mod value;
pub mod version;
pub mod watch;
