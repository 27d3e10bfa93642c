//! Per-instance collectors run over one established connection
//!
//! - `collect_info`: INFO ALL through the rule registry
//! - `collect_keys`: size and value of configured keys
//! - `collect_ping`: write then read one key of every data type

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{CounterVec, GaugeVec, Opts};
use tracing::{debug, error, warn};

use crate::client::{ControlPlane, ControlPlaneExt};
use crate::config::DbKeyPair;
use crate::discovery::Instance;
use crate::metrics::{parse_info, ExtractionMap, ParseContext, Registry, Sink, LABEL_ADDR, LABEL_ALIAS};
use crate::utils::{ClientError, ScrapeError};

/// Characters that make a configured key a SCAN pattern
const PATTERN_CHARS: [char; 5] = ['?', '*', '[', ']', '^'];

const PING_PREFIXES: [(&str, &str); 5] = [
    ("string", "ping_string_"),
    ("hash", "ping_hash_"),
    ("list", "ping_list_"),
    ("set", "ping_set_"),
    ("zset", "ping_zset_"),
];

/// Metrics owned by the key and ping probes
pub struct ProbeMetrics {
    key_size: GaugeVec,
    key_value: GaugeVec,
    ping: CounterVec,
}

impl ProbeMetrics {
    pub fn new(namespace: &str) -> Result<Self, prometheus::Error> {
        let size_labels = [LABEL_ADDR, LABEL_ALIAS, "db", "key", "key_type"];
        let value_labels = [LABEL_ADDR, LABEL_ALIAS, "db", "key", "key_value"];
        Ok(Self {
            key_size: GaugeVec::new(
                Opts::new("key_size", "The length or size of the checked key").namespace(namespace),
                &size_labels,
            )?,
            key_value: GaugeVec::new(
                Opts::new("key_value", "The value of the checked key").namespace(namespace),
                &value_labels,
            )?,
            ping: CounterVec::new(
                Opts::new("ping", "ping error count").namespace(namespace),
                &[LABEL_ADDR, LABEL_ALIAS, "method", "type"],
            )?,
        })
    }

    /// Drop the key series of the previous cycle
    pub fn reset_keys(&self) {
        self.key_size.reset();
        self.key_value.reset();
    }

    fn ping_failed(&self, instance: &Instance, method: &str, data_type: &str) {
        self.ping
            .with_label_values(&[instance.addr.as_str(), instance.alias.as_str(), method, data_type])
            .inc();
    }
}

impl Collector for ProbeMetrics {
    fn desc(&self) -> Vec<&Desc> {
        let mut descs = self.key_size.desc();
        descs.extend(self.key_value.desc());
        descs.extend(self.ping.desc());
        descs
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut families = self.key_size.collect();
        families.extend(self.key_value.collect());
        families.extend(self.ping.collect());
        families
    }
}

/// Run INFO ALL through every rule, emitting into `sink`
pub fn collect_info<C: ControlPlane + ?Sized>(
    conn: &mut C,
    instance: &Instance,
    registry: &Registry,
    sink: &dyn Sink,
) -> Result<(), ScrapeError> {
    let info = conn.info_all()?;
    let (version, extracts) = parse_info(&info)?;
    debug!("{} ({}) reports version {}", instance.addr, instance.alias, version);

    let context: ExtractionMap = [
        (LABEL_ADDR, instance.addr.as_str()),
        (LABEL_ALIAS, instance.alias.as_str()),
    ]
    .into_iter()
    .collect();

    registry.parse(
        sink,
        &ParseContext {
            version: &version,
            extracts: &extracts,
            context: &context,
            info: &info,
        },
    );
    Ok(())
}

pub fn is_key_pattern(key: &str) -> bool {
    key.contains(PATTERN_CHARS)
}

/// Replace glob patterns with the keys SCAN finds for them.
///
/// Plain keys pass through. A failed SELECT aborts the expansion; a failed
/// SCAN only drops that pattern.
pub fn expand_key_patterns<C: ControlPlane + ?Sized>(
    conn: &mut C,
    patterns: &[DbKeyPair],
    scan_count: usize,
) -> Result<Vec<DbKeyPair>, ClientError> {
    let mut expanded = Vec::new();
    for pair in patterns {
        if !is_key_pattern(&pair.key) {
            expanded.push(pair.clone());
            continue;
        }

        conn.select_db(&pair.db)?;
        match conn.scan(&pair.key, scan_count) {
            Ok(keys) => expanded.extend(keys.into_iter().map(|key| DbKeyPair::new(&pair.db, key))),
            Err(e) => error!("SCAN for pattern {} failed: {}", pair.key, e),
        }
    }
    Ok(expanded)
}

/// Report type, size and value of every configured key.
///
/// Per-key failures are logged and skipped; this never fails the scrape.
pub fn collect_keys<C: ControlPlane + ?Sized>(
    conn: &mut C,
    instance: &Instance,
    keys: &[DbKeyPair],
    patterns: &[DbKeyPair],
    scan_count: usize,
    metrics: &ProbeMetrics,
) -> Result<(), ScrapeError> {
    let mut all_keys = keys.to_vec();
    match expand_key_patterns(conn, patterns, scan_count) {
        Ok(expanded) => all_keys.extend(expanded),
        Err(e) => error!("Expanding key patterns on {} failed: {}", instance.addr, e),
    }
    debug!("Checking {} keys on {}", all_keys.len(), instance.addr);

    for pair in &all_keys {
        if let Err(e) = conn.select_db(&pair.db) {
            warn!("Couldn't select db {} on {}: {}", pair.db, instance.addr, e);
            continue;
        }

        let info = match conn.key_info(&pair.key) {
            Ok(info) => info,
            Err(e) => {
                warn!("Key info for {} on {} failed: {}", pair.key, instance.addr, e);
                continue;
            }
        };

        let db = format!("db{}", pair.db);
        metrics
            .key_size
            .with_label_values(&[
                instance.addr.as_str(),
                instance.alias.as_str(),
                db.as_str(),
                pair.key.as_str(),
                info.key_type.as_str(),
            ])
            .set(info.size);

        if let Ok(Some(value)) = conn.get(&pair.key) {
            metrics
                .key_value
                .with_label_values(&[
                    instance.addr.as_str(),
                    instance.alias.as_str(),
                    db.as_str(),
                    pair.key.as_str(),
                    value.as_str(),
                ])
                .set(1.0);
        }
    }
    Ok(())
}

/// Write and read back one probe key per data type, then delete them.
///
/// Failures only increment the `ping` counter; this never fails the scrape.
pub fn collect_ping<C: ControlPlane + ?Sized>(
    conn: &mut C,
    instance: &Instance,
    metrics: &ProbeMetrics,
) -> Result<(), ScrapeError> {
    let ts = chrono::Utc::now().timestamp();
    let [string, hash, list, set, zset] = PING_PREFIXES.map(|(_, prefix)| format!("{}{}", prefix, ts));

    let writes: [Result<(), ClientError>; 5] = [
        conn.set(&string, &string),
        conn.hset(&hash, &hash, &hash).map(drop),
        conn.lpush(&list, &list).map(drop),
        conn.sadd(&set, &set).map(drop),
        conn.zadd(&zset, 10.0, &zset).map(drop),
    ];
    let reads: [Result<(), ClientError>; 5] = [
        conn.get(&string).map(drop),
        conn.hget(&hash, &hash).map(drop),
        conn.lrange(&list, 0, 1).map(drop),
        conn.scard(&set).map(drop),
        conn.zcard(&zset).map(drop),
    ];

    for (method, results) in [("write", writes), ("read", reads)] {
        for ((data_type, _), result) in PING_PREFIXES.iter().zip(results) {
            if let Err(e) = result {
                metrics.ping_failed(instance, method, data_type);
                warn!(
                    "Ping {} {} on {} ({}) failed: {}",
                    method, data_type, instance.addr, instance.alias, e
                );
            }
        }
    }

    if let Err(e) = conn.del(&[string.as_str(), hash.as_str(), list.as_str(), set.as_str(), zset.as_str()]) {
        warn!("Deleting ping keys on {} ({}) failed: {}", instance.addr, instance.alias, e);
    }
    Ok(())
}
