//! Named metric rules and the registry evaluating them
//!
//! The registry is assembled once at startup from a list of rule builders
//! and is read-only afterwards. Each scrape evaluates every rule against one
//! instance's parse context.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use super::description::{MetricDescription, Sink};
use super::parser::{ParseContext, Parser};
use super::rules;
use crate::utils::RegistryError;

/// A parser tree plus the descriptions its leaves fall back to
pub struct MetricRule {
    parser: Parser,
    descriptions: Vec<Arc<MetricDescription>>,
}

impl MetricRule {
    pub fn new(parser: Parser) -> Self {
        Self {
            parser,
            descriptions: Vec::new(),
        }
    }

    pub fn describing(mut self, descriptions: Vec<Arc<MetricDescription>>) -> Self {
        self.descriptions = descriptions;
        self
    }

    /// Rule with a single direct-lookup leaf for one description
    pub fn direct(description: MetricDescription) -> Self {
        Self::new(Parser::direct()).describing(vec![description.build()])
    }

    pub fn parse(&self, sink: &dyn Sink, ctx: &ParseContext<'_>) {
        self.parser.parse(&self.descriptions, sink, ctx);
    }

    pub fn describe(&self, visit: &mut dyn FnMut(&Arc<MetricDescription>)) {
        self.parser.describe(&self.descriptions, visit);
    }
}

/// Produces the named rules of one metric family
pub type RuleBuilder = fn() -> Result<Vec<(&'static str, MetricRule)>, RegistryError>;

/// Rule name to rule, ordered by name
pub struct Registry {
    rules: BTreeMap<String, MetricRule>,
}

impl Registry {
    /// Run every builder; a rule name defined twice is an error
    pub fn build(builders: &[RuleBuilder]) -> Result<Self, RegistryError> {
        let mut registry = BTreeMap::new();
        for builder in builders {
            for (name, rule) in builder()? {
                if registry.insert(name.to_string(), rule).is_some() {
                    return Err(RegistryError::DuplicateRule(name.to_string()));
                }
            }
        }
        Ok(Self { rules: registry })
    }

    /// All pika metric families
    pub fn pika() -> Result<Self, RegistryError> {
        Self::build(rules::ALL)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&MetricRule> {
        self.rules.get(name)
    }

    /// Evaluate every rule for one instance
    pub fn parse(&self, sink: &dyn Sink, ctx: &ParseContext<'_>) {
        for rule in self.rules.values() {
            rule.parse(sink, ctx);
        }
    }

    /// Every description any rule can emit, first occurrence per metric name
    pub fn descriptions(&self) -> Vec<Arc<MetricDescription>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for rule in self.rules.values() {
            rule.describe(&mut |d: &Arc<MetricDescription>| {
                if seen.insert(d.name.clone()) {
                    out.push(Arc::clone(d));
                }
            });
        }
        out
    }
}
