//! INFO parsing and metric extraction
//!
//! This module provides:
//! - Field extraction from raw `INFO ALL` text
//! - Version resolution and version range matching
//! - Parser combinators projecting fields into samples
//! - The registry of pika metric rules

pub mod description;
pub mod extract;
pub mod parser;
pub mod registry;
pub mod rules;
pub mod version;

#[cfg(test)]
pub(crate) mod fixtures;

pub use description::{MetricDescription, MetricKind, Sample, Sink, LABEL_ADDR, LABEL_ALIAS};
pub use extract::{extract, ExtractionMap};
pub use parser::{convert_to_f64, ParseContext, Parser};
pub use registry::{MetricRule, Registry, RuleBuilder};
pub use version::{resolve_version, VersionRange};

use semver::Version;

use crate::utils::VersionParseError;

/// Extract the field map of one INFO reply and resolve its version
pub fn parse_info(info: &str) -> Result<(Version, ExtractionMap), VersionParseError> {
    let extracts = extract(info);
    let version = resolve_version(&extracts)?;
    Ok((version, extracts))
}
