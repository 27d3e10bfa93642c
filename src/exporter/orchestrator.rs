//! Scrape orchestration and the Prometheus collector
//!
//! Every Prometheus collection runs one scrape cycle:
//! 1. discover instances
//! 2. spawn one scoped thread per instance (connect, info, keys, ping)
//! 3. wait on the [`ScrapeFuture`] for every unit of work
//! 4. record per-instance failures in the exporter's own metrics
//!
//! One instance failing never affects the samples of another. Cycles are
//! serialized by a mutex so concurrent HTTP scrapes don't interleave.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Counter, CounterVec, GaugeVec, Histogram, HistogramOpts, HistogramVec, Opts};
use tracing::{debug, error};

use super::collect::{collect_info, collect_keys, collect_ping, ProbeMetrics};
use super::future::{FutureKey, InstanceUnits, ScrapeFuture};
use super::sink::PrometheusSink;
use crate::client::Connector;
use crate::config::ExporterConfig;
use crate::discovery::{Discovery, Instance};
use crate::metrics::{Registry, Sink, LABEL_ADDR, LABEL_ALIAS};
use crate::utils::{Result, ScrapeError};

/// Histogram buckets from 1ms to 10s
const DURATION_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.015, 0.02, 0.025, 0.03, 0.035, 0.04, 0.045, 0.05, 0.055, 0.06, 0.065,
    0.07, 0.075, 0.08, 0.085, 0.09, 0.095, 0.1, 0.11, 0.12, 0.13, 0.14, 0.15, 0.16, 0.17, 0.18,
    0.19, 0.20, 0.25, 0.5, 0.75, 1.0, 2.0, 5.0, 10.0,
];

const INSTANCE_LABELS: [&str; 2] = [LABEL_ADDR, LABEL_ALIAS];

/// Metrics about the exporter itself
struct SelfMetrics {
    collect_duration: Histogram,
    collect_count: Counter,
    scrape_duration: HistogramVec,
    scrape_errors: CounterVec,
    last_scrape_error: GaugeVec,
    scrape_count: CounterVec,
    up: GaugeVec,
}

impl SelfMetrics {
    fn new(namespace: &str) -> std::result::Result<Self, prometheus::Error> {
        let opts = |name: &str, help: &str| Opts::new(name, help).namespace(namespace);
        let histogram = |name: &str, help: &str| {
            HistogramOpts::new(name, help)
                .namespace(namespace)
                .buckets(DURATION_BUCKETS.to_vec())
        };

        Ok(Self {
            collect_duration: Histogram::with_opts(histogram(
                "exporter_collect_duration_seconds",
                "the duration of pika-exporter collect in seconds",
            ))?,
            collect_count: Counter::with_opts(opts(
                "exporter_collect_count",
                "the count of pika-exporter collect",
            ))?,
            scrape_duration: HistogramVec::new(
                histogram(
                    "exporter_scrape_duration_seconds",
                    "the each of pika scrape duration in seconds",
                ),
                &INSTANCE_LABELS,
            )?,
            scrape_errors: CounterVec::new(
                opts("exporter_scrape_errors", "the each of pika scrape error count"),
                &INSTANCE_LABELS,
            )?,
            last_scrape_error: GaugeVec::new(
                opts("exporter_last_scrape_error", "the each of pika scrape last error"),
                &[LABEL_ADDR, LABEL_ALIAS, "error"],
            )?,
            scrape_count: CounterVec::new(
                opts("exporter_scrape_count", "the each of pika scrape count"),
                &INSTANCE_LABELS,
            )?,
            up: GaugeVec::new(
                opts("up", "the each of pika connection status"),
                &INSTANCE_LABELS,
            )?,
        })
    }
}

impl Collector for SelfMetrics {
    fn desc(&self) -> Vec<&Desc> {
        let mut descs = self.collect_duration.desc();
        descs.extend(self.collect_count.desc());
        descs.extend(self.scrape_duration.desc());
        descs.extend(self.scrape_errors.desc());
        descs.extend(self.last_scrape_error.desc());
        descs.extend(self.scrape_count.desc());
        descs.extend(self.up.desc());
        descs
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut families = self.scrape_duration.collect();
        families.extend(self.scrape_errors.collect());
        families.extend(self.last_scrape_error.collect());
        families.extend(self.scrape_count.collect());
        families.extend(self.up.collect());
        families.extend(self.collect_count.collect());
        families.extend(self.collect_duration.collect());
        families
    }
}

fn fq_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}_{}", namespace, name)
    }
}

/// Scrapes every discovered pika instance on each Prometheus collection
pub struct PikaExporter {
    config: Arc<ExporterConfig>,
    discovery: Arc<dyn Discovery>,
    connector: Arc<dyn Connector>,
    registry: Registry,
    rule_descs: Vec<Desc>,
    metrics: SelfMetrics,
    probes: ProbeMetrics,
    cycle: Mutex<()>,
}

impl PikaExporter {
    pub fn new(
        config: Arc<ExporterConfig>,
        discovery: Arc<dyn Discovery>,
        connector: Arc<dyn Connector>,
        registry: Registry,
    ) -> Result<Self> {
        let namespace = config.namespace.as_str();
        let rule_descs = registry
            .descriptions()
            .iter()
            .map(|d| {
                Desc::new(
                    fq_name(namespace, &d.name),
                    d.help.clone(),
                    d.labels.clone(),
                    HashMap::new(),
                )
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            metrics: SelfMetrics::new(namespace)?,
            probes: ProbeMetrics::new(namespace)?,
            config,
            discovery,
            connector,
            registry,
            rule_descs,
            cycle: Mutex::new(()),
        })
    }

    /// Scrape every instance in parallel, emitting INFO samples into `sink`.
    ///
    /// Returns the outcome per instance; `None` means every unit succeeded.
    pub fn scrape(&self, sink: &PrometheusSink) -> HashMap<FutureKey, Option<ScrapeError>> {
        let start = Instant::now();
        let instances = self.discovery.instances();
        let future = ScrapeFuture::new();

        let results = thread::scope(|scope| {
            for instance in &instances {
                future.add();
                let (exporter, future) = (self, &future);
                let spawned = thread::Builder::new()
                    .name(format!("scrape-{}", instance.addr))
                    .spawn_scoped(scope, move || {
                        let mut units = InstanceUnits::adopt(future, FutureKey::from(instance));
                        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                            exporter.scrape_instance(instance, &mut units, sink, start)
                        }));
                        if let Err(payload) = outcome {
                            let message = panic_message(&*payload);
                            error!("Scrape of {} panicked: {}", instance.addr, message);
                            units.abandon(ScrapeError::Panicked(message));
                        }
                    });

                if let Err(e) = spawned {
                    future.done(FutureKey::from(instance), Err(ScrapeError::Spawn(e)));
                }
            }
            future.wait()
        });

        for (key, result) in &results {
            let Some(err) = result else { continue };
            let message = err.to_string();
            self.metrics
                .scrape_errors
                .with_label_values(&[key.addr.as_str(), key.alias.as_str()])
                .inc();
            self.metrics
                .last_scrape_error
                .with_label_values(&[key.addr.as_str(), key.alias.as_str(), message.as_str()])
                .set(0.0);
            error!("Scrape of {} ({}) failed: {}", key.addr, key.alias, message);
        }
        debug!("Scraped {} instances in {:?}", instances.len(), start.elapsed());
        results
    }

    fn scrape_instance(&self, instance: &Instance, units: &mut InstanceUnits<'_>, sink: &dyn Sink, start: Instant) {
        let labels = [instance.addr.as_str(), instance.alias.as_str()];
        self.metrics.scrape_count.with_label_values(&labels).inc();

        match self.connector.connect(instance) {
            Err(e) => {
                self.metrics.up.with_label_values(&labels).set(0.0);
                units.done(Err(ScrapeError::Connect(e)));
            }
            Ok(mut conn) => {
                self.metrics.up.with_label_values(&labels).set(1.0);

                units.add();
                units.add();
                units.done(collect_info(&mut *conn, instance, &self.registry, sink));
                units.done(collect_keys(
                    &mut *conn,
                    instance,
                    &self.config.keys,
                    &self.config.key_patterns,
                    self.config.scan_count,
                    &self.probes,
                ));
                units.done(collect_ping(&mut *conn, instance, &self.probes));
            }
        }

        self.metrics
            .scrape_duration
            .with_label_values(&labels)
            .observe(start.elapsed().as_secs_f64());
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Collector for PikaExporter {
    fn desc(&self) -> Vec<&Desc> {
        let mut descs: Vec<&Desc> = self.rule_descs.iter().collect();
        descs.extend(self.metrics.desc());
        descs.extend(self.probes.desc());
        descs
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let _cycle = self.cycle.lock();
        let start = Instant::now();

        self.probes.reset_keys();
        let sink = PrometheusSink::new(self.config.namespace.as_str());
        self.scrape(&sink);

        self.metrics.collect_count.inc();
        self.metrics.collect_duration.observe(start.elapsed().as_secs_f64());

        let mut families = sink.drain();
        families.extend(self.metrics.collect());
        families.extend(self.probes.collect());
        families
    }
}
