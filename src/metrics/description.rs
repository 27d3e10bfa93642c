//! Metric descriptions, emitted samples and the sink they flow into

use std::fmt;
use std::sync::Arc;

use crate::utils::SinkError;

/// Instance address label, present on every INFO metric
pub const LABEL_ADDR: &str = "addr";
/// Instance alias label, present on every INFO metric
pub const LABEL_ALIAS: &str = "alias";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static definition of one exposed metric
///
/// Every description starts with the `addr` and `alias` labels; further
/// labels are appended with [`label`](Self::label) / [`labels`](Self::labels).
/// Without a value field the metric is info-style and always reports 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescription {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub labels: Vec<String>,
    pub value_field: Option<String>,
}

impl MetricDescription {
    fn new(name: &str, help: &str, kind: MetricKind) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            kind,
            labels: vec![LABEL_ADDR.to_string(), LABEL_ALIAS.to_string()],
            value_field: None,
        }
    }

    pub fn gauge(name: &str, help: &str) -> Self {
        Self::new(name, help, MetricKind::Gauge)
    }

    pub fn counter(name: &str, help: &str) -> Self {
        Self::new(name, help, MetricKind::Counter)
    }

    pub fn label(mut self, label: &str) -> Self {
        self.labels.push(label.to_string());
        self
    }

    pub fn labels(mut self, labels: &[&str]) -> Self {
        self.labels.extend(labels.iter().map(|l| l.to_string()));
        self
    }

    /// Field the numeric value is read from
    pub fn value(mut self, field: &str) -> Self {
        self.value_field = Some(field.to_string());
        self
    }

    /// Gauge or counter whose name is also its value field
    pub fn field_gauge(field: &str, help: &str) -> Self {
        Self::gauge(field, help).value(field)
    }

    pub fn field_counter(field: &str, help: &str) -> Self {
        Self::counter(field, help).value(field)
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }
}

/// One observation produced while parsing an instance
#[derive(Debug, Clone)]
pub struct Sample {
    pub description: Arc<MetricDescription>,
    pub label_values: Vec<String>,
    pub value: f64,
}

impl Sample {
    pub fn name(&self) -> &str {
        &self.description.name
    }

    /// Value of a label by name
    pub fn label(&self, name: &str) -> Option<&str> {
        self.description
            .labels
            .iter()
            .position(|l| l == name)
            .and_then(|i| self.label_values.get(i))
            .map(String::as_str)
    }
}

/// Receives samples from the parsers
pub trait Sink: Sync {
    fn collect(&self, sample: Sample) -> Result<(), SinkError>;
}
