//! # Geo Monitor Library
//!
//! Ingest geo-telemetry pushed by remote devices over a request/reply TCP
//! channel.
//!
//! This library provides the core ingestion pipeline: the listener, the
//! tolerant field extractor, the shared telemetry state a viewer can poll,
//! and the append-only persistence of every raw payload.

pub mod config;
pub mod error;
pub mod extract;
pub mod server;
pub mod state;
pub mod store;
