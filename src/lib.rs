//! pika-exporter library
//!
//! Version-aware extraction of Prometheus metrics from pika `INFO` output,
//! scraped concurrently across many instances.

pub mod client;
pub mod config;
pub mod discovery;
pub mod exporter;
pub mod metrics;
pub mod utils;
pub mod web;
