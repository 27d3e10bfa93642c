//! Parser combinators projecting INFO output into samples
//!
//! A rule's parser is a small tree:
//! - `Sequence` runs its children in order
//! - `Direct` reads labels and the value straight from the field map
//! - `Regex` scans the raw INFO text and emits once per match
//! - `VersionGate` / `FieldGate` only run their child when the instance
//!   matches a version range or a set of field values
//!
//! Leaves without their own descriptions use the ones of the enclosing rule.
//! Missing fields never fail a parse: the affected sample is skipped.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use semver::Version;
use tracing::{debug, error, info, warn};

use super::description::{MetricDescription, Sample, Sink};
use super::extract::ExtractionMap;
use super::version::VersionRange;
use crate::utils::RegistryError;

/// Everything the parsers may read for one instance
pub struct ParseContext<'a> {
    pub version: &'a Version,
    pub extracts: &'a ExtractionMap,
    /// Caller supplied fields such as `addr` and `alias`
    pub context: &'a ExtractionMap,
    pub info: &'a str,
}

impl ParseContext<'_> {
    fn lookup<'s>(&'s self, captures: Option<&'s HashMap<&str, &'s str>>, field: &str) -> Option<&'s str> {
        captures
            .and_then(|c| c.get(field).copied())
            .or_else(|| self.extracts.get(field))
            .or_else(|| self.context.get(field))
    }
}

/// Convert an INFO value to a number.
///
/// `yes`/`up`/`online` read as 1 and `no`/`down`/`offline`/`null` as 0,
/// case-insensitively. Anything else is parsed as a float; unparseable input
/// reads as 0.
pub fn convert_to_f64(value: &str) -> f64 {
    let value = value.trim();
    match value.to_ascii_lowercase().as_str() {
        "yes" | "up" | "online" => 1.0,
        "no" | "down" | "offline" | "null" => 0.0,
        other => other.parse().unwrap_or_else(|_| {
            warn!("Unable to convert value {:?} to a number, using 0", value);
            0.0
        }),
    }
}

pub enum Parser {
    Sequence(Vec<Parser>),
    Direct(DirectLeaf),
    Regex(RegexLeaf),
    VersionGate(VersionGate),
    FieldGate(FieldGate),
}

pub struct DirectLeaf {
    descriptions: Vec<Arc<MetricDescription>>,
}

pub struct RegexLeaf {
    regex: Regex,
    descriptions: Vec<Arc<MetricDescription>>,
}

pub struct VersionGate {
    range: VersionRange,
    child: Box<Parser>,
}

/// Required field values, compared case-insensitively
pub struct FieldGate {
    required: Vec<(String, String)>,
    child: Box<Parser>,
}

impl Parser {
    pub fn sequence(children: Vec<Parser>) -> Self {
        Parser::Sequence(children)
    }

    /// Direct lookup using the rule's descriptions
    pub fn direct() -> Self {
        Parser::Direct(DirectLeaf {
            descriptions: Vec::new(),
        })
    }

    /// Direct lookup with its own descriptions
    pub fn direct_with(descriptions: Vec<Arc<MetricDescription>>) -> Self {
        Parser::Direct(DirectLeaf { descriptions })
    }

    pub fn regex(pattern: &str) -> Result<Self, RegistryError> {
        Self::regex_with(pattern, Vec::new())
    }

    pub fn regex_with(
        pattern: &str,
        descriptions: Vec<Arc<MetricDescription>>,
    ) -> Result<Self, RegistryError> {
        let regex = Regex::new(pattern).map_err(|source| RegistryError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Parser::Regex(RegexLeaf {
            regex,
            descriptions,
        }))
    }

    pub fn version_gate(range: &str, child: Parser) -> Result<Self, RegistryError> {
        Ok(Parser::VersionGate(VersionGate {
            range: VersionRange::parse(range)?,
            child: Box::new(child),
        }))
    }

    pub fn field_gate(required: &[(&str, &str)], child: Parser) -> Self {
        Parser::FieldGate(FieldGate {
            required: required
                .iter()
                .map(|(f, v)| (f.to_string(), v.to_string()))
                .collect(),
            child: Box::new(child),
        })
    }

    /// Emit the samples this tree produces for one instance
    pub fn parse(&self, inherited: &[Arc<MetricDescription>], sink: &dyn Sink, ctx: &ParseContext<'_>) {
        match self {
            Parser::Sequence(children) => {
                for child in children {
                    child.parse(inherited, sink, ctx);
                }
            }
            Parser::Direct(leaf) => leaf.parse(own_or(&leaf.descriptions, inherited), sink, ctx),
            Parser::Regex(leaf) => leaf.parse(own_or(&leaf.descriptions, inherited), sink, ctx),
            Parser::VersionGate(gate) => {
                if gate.range.matches(ctx.version) {
                    gate.child.parse(inherited, sink, ctx);
                }
            }
            Parser::FieldGate(gate) => {
                if gate.passes(ctx.extracts) {
                    gate.child.parse(inherited, sink, ctx);
                }
            }
        }
    }

    /// Visit every description reachable from this tree, ignoring gates
    pub fn describe(&self, inherited: &[Arc<MetricDescription>], visit: &mut dyn FnMut(&Arc<MetricDescription>)) {
        match self {
            Parser::Sequence(children) => {
                for child in children {
                    child.describe(inherited, visit);
                }
            }
            Parser::Direct(DirectLeaf { descriptions }) | Parser::Regex(RegexLeaf { descriptions, .. }) => {
                own_or(descriptions, inherited).iter().for_each(|d| visit(d));
            }
            Parser::VersionGate(VersionGate { child, .. }) | Parser::FieldGate(FieldGate { child, .. }) => {
                child.describe(inherited, visit);
            }
        }
    }
}

fn own_or<'a>(
    own: &'a [Arc<MetricDescription>],
    inherited: &'a [Arc<MetricDescription>],
) -> &'a [Arc<MetricDescription>] {
    if own.is_empty() {
        inherited
    } else {
        own
    }
}

/// Build and emit one sample, resolving labels and value through `lookup`.
///
/// Returns without emitting when the description's value field is absent.
fn emit<'s>(
    description: &Arc<MetricDescription>,
    sink: &dyn Sink,
    lookup: impl Fn(&str) -> Option<&'s str>,
) {
    let label_values = description
        .labels
        .iter()
        .map(|label| match lookup(label) {
            Some(v) => v.to_string(),
            None => {
                debug!("metric {}: label {} not found, using empty value", description.name, label);
                String::new()
            }
        })
        .collect();

    let value = match &description.value_field {
        None => 0.0,
        Some(field) => match lookup(field) {
            Some(v) => convert_to_f64(v),
            None => {
                warn!("metric {}: value field {} not found, skipping", description.name, field);
                return;
            }
        },
    };

    let sample = Sample {
        description: Arc::clone(description),
        label_values,
        value,
    };
    if let Err(e) = sink.collect(sample) {
        error!("metric {}: collect failed: {}", description.name, e);
    }
}

impl DirectLeaf {
    fn parse(&self, descriptions: &[Arc<MetricDescription>], sink: &dyn Sink, ctx: &ParseContext<'_>) {
        for description in descriptions {
            emit(description, sink, |field| ctx.lookup(None, field));
        }
    }
}

impl RegexLeaf {
    fn parse(&self, descriptions: &[Arc<MetricDescription>], sink: &dyn Sink, ctx: &ParseContext<'_>) {
        let matches: Vec<HashMap<&str, &str>> = self
            .regex
            .captures_iter(ctx.info)
            .map(|caps| {
                self.regex
                    .capture_names()
                    .flatten()
                    .filter_map(|name| caps.name(name).map(|m| (name, m.as_str().trim())))
                    .collect()
            })
            .collect();

        if matches.is_empty() {
            info!("pattern {} found no match in INFO output", self.regex.as_str());
            return;
        }

        for captures in &matches {
            for description in descriptions {
                emit(description, sink, |field| ctx.lookup(Some(captures), field));
            }
        }
    }
}

impl FieldGate {
    fn passes(&self, extracts: &ExtractionMap) -> bool {
        self.required.iter().all(|(field, expected)| {
            extracts
                .get(field)
                .map(|actual| actual.eq_ignore_ascii_case(expected))
                .unwrap_or(false)
        })
    }
}
