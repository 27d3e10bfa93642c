//! Replication role, slave links and double-master state

use crate::metrics::description::MetricDescription;
use crate::metrics::parser::Parser;
use crate::metrics::registry::MetricRule;
use crate::utils::RegistryError;

const SLAVE_LINES: &str = concat!(
    r"slave\d+:ip=(?P<slave_ip>[\d.]+),port=(?P<slave_port>[\d.]+),",
    r"state=(?P<slave_state>[a-z]+),sid=(?P<slave_sid>[\d]+),lag=(?P<slave_lag>[\d]+)",
);

const PEER_MASTER: &str = concat!(
    r"the peer-master host:(?P<the_peer_master_host>[^\n]*)[\s\S]*",
    r"the peer-master port:(?P<the_peer_master_port>[^\n]*)[\s\S]*",
    r"the peer-master server_id:(?P<the_peer_master_server_id>[^\n]*)[\s\S]*",
    r"repl_state:(?P<double_master_repl_state>[^\n]*)[\s\S]*",
    r"double_master_recv_info:\s*filenum\s*(?P<double_master_recv_info_binlog_filenum>[^\s]*)",
    r"\s*offset\s*(?P<double_master_recv_info_binlog_offset>[^\n]*)",
);

const SLAVE_LABELS: &[&str] = &["slave_sid", "slave_ip", "slave_port"];
const MASTER_LABELS: &[&str] = &["master_host", "master_port"];
const PEER_LABELS: &[&str] = &[
    "the_peer_master_server_id",
    "the_peer_master_host",
    "the_peer_master_port",
];

fn master_slave_info() -> Result<MetricRule, RegistryError> {
    let connected = MetricDescription::field_gauge(
        "connected_slaves",
        "the count of connected slaves, when pika serve instance's role is master",
    )
    .build();
    let slaves = vec![
        MetricDescription::field_gauge("slave_state", "pika serve instance slave's state")
            .labels(SLAVE_LABELS)
            .build(),
        MetricDescription::field_gauge("slave_lag", "pika serve instance slave's binlog lag")
            .labels(SLAVE_LABELS)
            .build(),
    ];

    Ok(MetricRule::new(Parser::field_gate(
        &[("role", "master")],
        Parser::sequence(vec![
            Parser::direct_with(vec![connected]),
            Parser::regex_with(SLAVE_LINES, slaves)?,
        ]),
    )))
}

fn slave_info() -> Result<MetricRule, RegistryError> {
    let link = |name: &str, help: &str| {
        MetricDescription::field_gauge(name, help)
            .labels(MASTER_LABELS)
            .build()
    };

    Ok(MetricRule::new(Parser::field_gate(
        &[("role", "slave")],
        Parser::sequence(vec![
            Parser::direct_with(vec![
                link(
                    "master_link_status",
                    "connection state between slave and master, when pika serve instance's role is slave",
                ),
                link(
                    "repl_state",
                    "sync connection state between slave and master, when pika serve instance's role is slave",
                ),
                link(
                    "slave_read_only",
                    "is slave read only, when pika serve instance's role is slave",
                ),
            ]),
            Parser::version_gate(
                ">=3.0.0",
                Parser::direct_with(vec![link(
                    "slave_priority",
                    "slave priority, when pika serve instance's role is slave",
                )]),
            )?,
        ]),
    )))
}

fn double_master_info() -> Result<MetricRule, RegistryError> {
    const SUFFIX: &str = ", when pika serve instance's role is master and double_master_mode is true";
    let peer = |name: &str, help: &str, value: bool| {
        let desc = MetricDescription::gauge(name, &format!("{}{}", help, SUFFIX)).labels(PEER_LABELS);
        if value { desc.value(name) } else { desc }.build()
    };

    Ok(MetricRule::new(Parser::field_gate(
        &[("role", "master"), ("double_master_mode", "true")],
        Parser::regex_with(
            PEER_MASTER,
            vec![
                peer("double_master_info", "the peer master info", false),
                peer("double_master_repl_state", "double master sync state", true),
                peer(
                    "double_master_recv_info_binlog_filenum",
                    "double master recv binlog file num",
                    true,
                ),
                peer(
                    "double_master_recv_info_binlog_offset",
                    "double master recv binlog offset",
                    true,
                ),
            ],
        )?,
    )))
}

pub fn rules() -> Result<Vec<(&'static str, MetricRule)>, RegistryError> {
    Ok(vec![
        ("master_slave_info", master_slave_info()?),
        ("slave_info", slave_info()?),
        ("double_master_info", double_master_info()?),
    ])
}
