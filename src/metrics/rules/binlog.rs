//! Binlog size and offsets
//!
//! Offsets moved from one instance-wide `binlog_offset:` line to one line per
//! db in 3.1.0, gaining a `db` label.

use std::sync::Arc;

use super::VersionedPattern;
use crate::metrics::description::MetricDescription;
use crate::metrics::parser::Parser;
use crate::metrics::registry::MetricRule;
use crate::utils::RegistryError;

pub const OFFSETS: &[VersionedPattern] = &[
    (
        "<3.1.0",
        r"binlog_offset:(?P<binlog_offset_filenum>[^\s]*)\s*(?P<binlog_offset>[\d]*)",
    ),
    (
        ">=3.1.0",
        r"(?P<db>db[\d]+)\s*binlog_offset=(?P<binlog_offset_filenum>[^\s]*)\s*(?P<binlog_offset>[\d]*),*safety_purge=(?P<safety_purge>[^\s\n]*)",
    ),
];

fn instance_offsets() -> Vec<Arc<MetricDescription>> {
    vec![
        MetricDescription::field_gauge("binlog_offset_filenum", "pika serve instance binlog file num")
            .build(),
        MetricDescription::field_gauge("binlog_offset", "pika serve instance binlog offset")
            .labels(&["safety_purge", "expire_logs_days", "expire_logs_nums"])
            .build(),
    ]
}

fn per_db_offsets() -> Vec<Arc<MetricDescription>> {
    vec![
        MetricDescription::field_gauge(
            "binlog_offset_filenum",
            "pika serve instance binlog file num for each db",
        )
        .label("db")
        .build(),
        MetricDescription::field_gauge("binlog_offset", "pika serve instance binlog offset for each db")
            .labels(&["db", "safety_purge"])
            .build(),
    ]
}

pub fn rules() -> Result<Vec<(&'static str, MetricRule)>, RegistryError> {
    let mut children = vec![Parser::direct_with(vec![MetricDescription::field_gauge(
        "log_size",
        "pika serve instance total binlog size in bytes",
    )
    .build()])];

    for (&(range, pattern), descriptions) in OFFSETS.iter().zip([instance_offsets(), per_db_offsets()]) {
        children.push(Parser::version_gate(range, Parser::regex_with(pattern, descriptions)?)?);
    }

    Ok(vec![("binlog", MetricRule::new(Parser::sequence(children)))])
}
