//! Scrape pipeline
//!
//! This module provides:
//! - The per-cycle completion future
//! - The Prometheus sink for INFO samples
//! - Info, key and ping collectors
//! - The `PikaExporter` collector driving a scrape cycle
//! - The daily keyspace recount task

pub mod collect;
pub mod future;
pub mod housekeeping;
pub mod orchestrator;
pub mod sink;

pub use collect::{collect_info, collect_keys, collect_ping, is_key_pattern, ProbeMetrics};
pub use future::{FutureKey, InstanceUnits, ScrapeFuture};
pub use housekeeping::{duration_until_hour, KeyspaceStatsTask};
pub use orchestrator::PikaExporter;
pub use sink::PrometheusSink;
