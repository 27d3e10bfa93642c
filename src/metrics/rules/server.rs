//! Server identity and process metrics

use crate::metrics::description::MetricDescription;
use crate::metrics::parser::Parser;
use crate::metrics::registry::MetricRule;
use crate::utils::RegistryError;

const BUILD_INFO: &str = concat!(
    r"pika_version:(?P<pika_version>[^\n]*)[\s\S]*",
    r"pika_git_sha:(?P<pika_git_sha>[^\n]*)[\s\S]*",
    r"pika_build_compile_date:(?P<pika_build_compile_date>[^\n]*)[\s\S]*",
    r"os:(?P<os>[^\n]*)[\s\S]*",
    r"arch_bits:(?P<arch_bits>[^\n]*)",
);

const SERVER_INFO: &str = concat!(
    r"process_id:(?P<process_id>[^\n]*)[\s\S]*",
    r"tcp_port:(?P<tcp_port>[^\n]*)[\s\S]*",
    r"config_file:(?P<config_file>[^\n]*)[\s\S]*",
    r"server_id:(?P<server_id>[^\n]*)[\s\S]*",
    r"role:(?P<role>[^\n]*)",
);

pub fn rules() -> Result<Vec<(&'static str, MetricRule)>, RegistryError> {
    Ok(vec![
        (
            "build_info",
            MetricRule::new(Parser::regex(BUILD_INFO)?).describing(vec![
                MetricDescription::gauge("build_info", "pika binary file build info")
                    .labels(&["os", "arch_bits", "pika_version", "pika_git_sha", "pika_build_compile_date"])
                    .build(),
            ]),
        ),
        (
            "server_info",
            MetricRule::new(Parser::regex(SERVER_INFO)?).describing(vec![
                MetricDescription::gauge("server_info", "pika serve instance info")
                    .labels(&["process_id", "tcp_port", "config_file", "server_id", "role"])
                    .build(),
            ]),
        ),
        (
            "uptime_in_seconds",
            MetricRule::direct(MetricDescription::field_gauge(
                "uptime_in_seconds",
                "pika serve instance uptime in seconds",
            )),
        ),
        (
            "thread_num",
            MetricRule::direct(MetricDescription::field_gauge(
                "thread_num",
                "pika serve instance thread num",
            )),
        ),
        (
            "sync_thread_num",
            MetricRule::direct(MetricDescription::field_gauge(
                "sync_thread_num",
                "pika serve instance sync thread num",
            )),
        ),
    ])
}
