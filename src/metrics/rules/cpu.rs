//! CPU time counters

use crate::metrics::description::MetricDescription;
use crate::metrics::registry::MetricRule;
use crate::utils::RegistryError;

const FIELDS: &[(&str, &str)] = &[
    ("used_cpu_sys", "pika serve instance total count of used cpu sys"),
    ("used_cpu_user", "pika serve instance total count of used cpu user"),
    ("used_cpu_sys_children", "pika serve instance children total count of used cpu sys"),
    ("used_cpu_user_children", "pika serve instance children total count of used cpu user"),
];

pub fn rules() -> Result<Vec<(&'static str, MetricRule)>, RegistryError> {
    Ok(FIELDS
        .iter()
        .map(|&(field, help)| (field, MetricRule::direct(MetricDescription::field_counter(field, help))))
        .collect())
}
