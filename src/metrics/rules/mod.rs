//! Pika metric families
//!
//! Each family module exposes a [`RuleBuilder`]. INFO layouts that changed
//! between pika releases are declared as `(version range, pattern)` tables;
//! supporting a new release means appending a row.

use super::parser::Parser;
use super::registry::RuleBuilder;
use crate::utils::RegistryError;

pub mod binlog;
pub mod cpu;
pub mod keyspace;
pub mod replication;
pub mod server;

/// Every family, in registration order
pub const ALL: &[RuleBuilder] = &[
    server::rules,
    cpu::rules,
    keyspace::rules,
    binlog::rules,
    replication::rules,
];

/// One schema generation of a versioned INFO layout
pub type VersionedPattern = (&'static str, &'static str);

/// Sequence of version gates, each wrapping a regex leaf for its row
pub fn version_table(rows: &[VersionedPattern]) -> Result<Parser, RegistryError> {
    let gates = rows
        .iter()
        .map(|(range, pattern)| Parser::version_gate(range, Parser::regex(pattern)?))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Parser::sequence(gates))
}
