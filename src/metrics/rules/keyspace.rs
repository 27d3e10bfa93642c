//! Per-db, per-type key counts from the Keyspace section
//!
//! The Keyspace layout changed several times:
//! - before 3.0.5: `kv keys:12`
//! - 3.0.x: `Strings: keys=12, expires=0, invaild_keys=0`
//! - 3.1.x: `db0_Strings: keys=12, expires=0, invaild_keys=0`
//! - 3.2.0 to 3.3.2: `db0 Strings_keys=12, expires=0, invaild_keys=0`
//! - 3.3.3 on: the same, with the `invalid_keys` typo fixed

use super::{version_table, VersionedPattern};
use crate::metrics::description::MetricDescription;
use crate::metrics::registry::MetricRule;
use crate::utils::RegistryError;

const V3_0_X: &str = concat!(
    r"(?P<type>\w*):\s*keys=(?P<keys>[\d]+)[,\s]*",
    r"expires=(?P<expire_keys>[\d]+)[,\s]*invaild_keys=(?P<invalid_keys>[\d]+)",
);
const V3_1_X: &str = concat!(
    r"(?P<db>db[\d]+)_\s*(?P<type>[^:]+):\s*keys=(?P<keys>[\d]+)[,\s]*",
    r"expires=(?P<expire_keys>[\d]+)[,\s]*invaild_keys=(?P<invalid_keys>[\d]+)",
);
const V3_2_X: &str = concat!(
    r"(?P<db>db[\d]+)\s*(?P<type>[^_]+)\w*keys=(?P<keys>[\d]+)[,\s]*",
    r"expires=(?P<expire_keys>[\d]+)[,\s]*invaild_keys=(?P<invalid_keys>[\d]+)",
);
const V3_3_3: &str = concat!(
    r"(?P<db>db[\d]+)\s*(?P<type>[^_]+)\w*keys=(?P<keys>[\d]+)[,\s]*",
    r"expires=(?P<expire_keys>[\d]+)[,\s]*invalid_keys=(?P<invalid_keys>[\d]+)",
);

/// Layouts carrying the key count
pub const KEYS: &[VersionedPattern] = &[
    ("<3.0.5", r"(?P<type>[^\s]*)\s*keys:(?P<keys>[\d]+)"),
    ("~3.0.5", V3_0_X),
    ("~3.1.0", V3_1_X),
    ("3.2.0 - 3.3.2", V3_2_X),
    (">=3.3.3", V3_3_3),
];

/// Layouts that also report expiring and invalid keys
pub const KEYS_ALL: &[VersionedPattern] = &[
    ("~3.0.5", V3_0_X),
    ("~3.1.0", V3_1_X),
    ("3.2.0 - 3.3.2", V3_2_X),
    (">=3.3.3", V3_3_3),
];

pub fn rules() -> Result<Vec<(&'static str, MetricRule)>, RegistryError> {
    let per_db_type = |name: &str, help: &str| {
        MetricDescription::field_gauge(name, help)
            .labels(&["db", "type"])
            .build()
    };

    Ok(vec![
        (
            "keyspace_info",
            MetricRule::new(version_table(KEYS)?).describing(vec![per_db_type(
                "keys",
                "pika serve instance total count of the db's key-type keys",
            )]),
        ),
        (
            "keyspace_info_all",
            MetricRule::new(version_table(KEYS_ALL)?).describing(vec![
                per_db_type(
                    "expire_keys",
                    "pika serve instance total count of the db's key-type expire keys",
                ),
                per_db_type(
                    "invalid_keys",
                    "pika serve instance total count of the db's key-type invalid keys",
                ),
            ]),
        ),
    ])
}
