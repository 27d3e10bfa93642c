//! Sink turning INFO samples into Prometheus metric families
//!
//! One sink lives for one scrape cycle. Vectors are created lazily per
//! (metric name, label names) and drained into families at the end of the
//! cycle, so instances that disappeared leave no stale series behind.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use parking_lot::Mutex;
use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::{CounterVec, GaugeVec, Opts};
use tracing::warn;

use crate::metrics::{MetricKind, Sample, Sink};
use crate::utils::SinkError;

enum MetricVec {
    Gauge(GaugeVec),
    Counter(CounterVec),
}

impl MetricVec {
    fn kind(&self) -> MetricKind {
        match self {
            MetricVec::Gauge(_) => MetricKind::Gauge,
            MetricVec::Counter(_) => MetricKind::Counter,
        }
    }

    fn families(&self) -> Vec<MetricFamily> {
        match self {
            MetricVec::Gauge(v) => v.collect(),
            MetricVec::Counter(v) => v.collect(),
        }
    }
}

type VecKey = (String, Vec<String>);

pub struct PrometheusSink {
    namespace: String,
    vecs: Mutex<HashMap<VecKey, MetricVec>>,
}

impl PrometheusSink {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            vecs: Mutex::new(HashMap::new()),
        }
    }

    /// Take every family collected so far, leaving the sink empty
    pub fn drain(&self) -> Vec<MetricFamily> {
        let vecs = std::mem::take(&mut *self.vecs.lock());
        vecs.values()
            .flat_map(MetricVec::families)
            .filter(|family| !family.get_metric().is_empty())
            .collect()
    }

    fn create(&self, sample: &Sample) -> Result<MetricVec, SinkError> {
        let desc = &sample.description;
        let opts = Opts::new(desc.name.as_str(), desc.help.as_str()).namespace(self.namespace.as_str());
        let labels: Vec<&str> = desc.labels.iter().map(String::as_str).collect();

        Ok(match desc.kind {
            MetricKind::Gauge => MetricVec::Gauge(GaugeVec::new(opts, &labels)?),
            MetricKind::Counter => MetricVec::Counter(CounterVec::new(opts, &labels)?),
        })
    }
}

impl Sink for PrometheusSink {
    fn collect(&self, sample: Sample) -> Result<(), SinkError> {
        let desc = &sample.description;
        if sample.label_values.len() != desc.labels.len() {
            return Err(SinkError::LabelCountMismatch {
                name: desc.name.clone(),
                expected: desc.labels.len(),
                actual: sample.label_values.len(),
            });
        }

        let mut vecs = self.vecs.lock();
        let vec = match vecs.entry((desc.name.clone(), desc.labels.clone())) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(self.create(&sample)?),
        };
        if vec.kind() != desc.kind {
            return Err(SinkError::KindConflict {
                name: desc.name.clone(),
                existing: vec.kind().as_str(),
            });
        }

        let values: Vec<&str> = sample.label_values.iter().map(String::as_str).collect();
        match vec {
            MetricVec::Gauge(v) => v.get_metric_with_label_values(&values)?.set(sample.value),
            MetricVec::Counter(v) => {
                if !sample.value.is_finite() || sample.value < 0.0 {
                    warn!("metric {}: invalid counter value {}, skipping", desc.name, sample.value);
                    return Ok(());
                }
                let counter = v.get_metric_with_label_values(&values)?;
                counter.reset();
                counter.inc_by(sample.value);
            }
        }
        Ok(())
    }
}
