//! Command-line argument parsing
//!
//! Flag names follow the `--group.name` convention of Prometheus exporters.

use clap::Parser;
use std::path::PathBuf;

/// Prometheus exporter for pika
#[derive(Parser, Debug, Clone)]
#[command(name = "pika-exporter")]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    // ===== Targets =====
    /// Comma-separated pika addresses (host:port)
    #[arg(long = "pika.addr", default_value = "")]
    pub pika_addr: String,

    /// Comma-separated passwords; a single value applies to every address
    #[arg(long = "pika.password", default_value = "")]
    pub pika_password: String,

    /// Comma-separated aliases; a single value applies to every address
    #[arg(long = "pika.alias", default_value = "")]
    pub pika_alias: String,

    /// JSON file listing instances, re-read on every scrape (overrides --pika.addr)
    #[arg(long = "pika.host-file")]
    pub host_file: Option<PathBuf>,

    // ===== Metrics =====
    /// Namespace prefixed to every metric name
    #[arg(long = "namespace", default_value = "pika")]
    pub namespace: String,

    /// Comma-separated `[dbN=]pattern` list expanded with SCAN
    #[arg(long = "check.key-patterns", default_value = "")]
    pub check_key_patterns: String,

    /// Comma-separated `[dbN=]key` list
    #[arg(long = "check.keys", default_value = "")]
    pub check_keys: String,

    /// COUNT hint for SCAN when expanding key patterns
    #[arg(long = "check.scan-count", default_value_t = 100)]
    pub scan_count: usize,

    /// Local hour (0-23) for the daily `INFO KEYSPACE 1` recount; negative disables
    #[arg(long = "keyspace-stats-clock", default_value_t = -1, allow_hyphen_values = true)]
    pub keyspace_stats_clock: i32,

    // ===== Web =====
    /// Address to expose metrics on
    #[arg(long = "web.listen-address", default_value = "0.0.0.0:9121")]
    pub listen_address: String,

    /// Path under which metrics are exposed
    #[arg(long = "web.telemetry-path", default_value = "/metrics")]
    pub telemetry_path: String,

    // ===== Timeouts =====
    /// TCP connect timeout in milliseconds
    #[arg(long = "connect-timeout-ms", default_value_t = 5000)]
    pub connect_timeout_ms: u64,

    /// Read/write timeout per command in milliseconds
    #[arg(long = "request-timeout-ms", default_value_t = 5000)]
    pub request_timeout_ms: u64,

    // ===== Output =====
    /// Verbose output (debug logging)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

impl CliArgs {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        if self.pika_addr.trim().is_empty() && self.host_file.is_none() {
            return Err("one of --pika.addr or --pika.host-file is required".to_string());
        }

        if self.keyspace_stats_clock > 23 {
            return Err("--keyspace-stats-clock must be an hour between 0 and 23".to_string());
        }

        if !self.telemetry_path.starts_with('/') || self.telemetry_path == "/" {
            return Err("--web.telemetry-path must start with '/' and not be the root".to_string());
        }

        if self.connect_timeout_ms == 0 || self.request_timeout_ms == 0 {
            return Err("timeouts must be at least 1ms".to_string());
        }

        if self.verbose && self.quiet {
            return Err("--verbose and --quiet are mutually exclusive".to_string());
        }

        Ok(())
    }
}
