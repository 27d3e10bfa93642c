//! Captured `INFO ALL` replies from pika releases with distinct layouts

use super::description::tests::MemorySink;
use super::description::{LABEL_ADDR, LABEL_ALIAS};
use super::extract::{extract, ExtractionMap};
use super::parser::ParseContext;
use super::registry::{Registry, RuleBuilder};
use super::version::resolve_version;
use semver::Version;

pub(crate) const V2_3_6_MASTER: &str = "# Server
pika_version:2.3.6
pika_git_sha:b22b0561f9093057d2e2d5cc783ff630fb2c8884
pika_build_compile_date: Aug  6 2018
os:Linux 3.10.0-514.el7.x86_64 x86_64
arch_bits:64
process_id:17541
tcp_port:9221
thread_num:24
sync_thread_num:6
uptime_in_seconds:1054503
uptime_in_days:13
config_file:/data/pika/conf/pika.conf
server_id:1

# Data
db_size:4294967296
db_size_human:4096M
compression:snappy
used_memory:1310720
used_memory_human:1M
db_memtable_usage:1048576
db_tablereader_usage:262144

# Log
log_size:2684354560
log_size_human:2560M
safety_purge:write2file29
expire_logs_days:7
expire_logs_nums:10
binlog_offset:39 47321

# Clients
connected_clients:12

# Stats
total_connections_received:8012
instantaneous_ops_per_sec:35
total_commands_processed:9412345
is_bgsaving:No, , 0
is_slots_reloading:No, , 0
is_slots_cleanuping:No, , 0
is_scaning_keyspace:No
is_compact:No
compact_cron:
compact_interval:

# CPU
used_cpu_sys:1021.40
used_cpu_user:2301.08
used_cpu_sys_children:0.00
used_cpu_user_children:0.00

# Replication(MASTER)
role:master
connected_slaves:0

# Keyspace
# Time:2018-09-12 03:30:00
kv keys:1024
hash keys:20
list keys:5
zset keys:7
set keys:3
";

pub(crate) const V2_3_6_SLAVE: &str = "# Server
pika_version:2.3.6
tcp_port:9231
uptime_in_seconds:3600
config_file:/data/pika/conf/pika.conf
server_id:2

# Log
log_size:1048576
safety_purge:none
expire_logs_days:7
expire_logs_nums:10
binlog_offset:0 0

# Replication(SLAVE)
role:slave
master_host:10.0.0.11
master_port:9221
master_link_status:down
slave_read_only:1
repl_state:0
";

pub(crate) const V3_0_16_MASTER: &str = "# Server
pika_version:3.0.16
pika_git_sha:4f2a7e2d1c6c30d2a4e0b3c3b8d6e1b2f1c9a0d7
pika_build_compile_date: Mar 21 2019
os:Linux 3.10.0-862.el7.x86_64 x86_64
arch_bits:64
process_id:3092
tcp_port:9221
thread_num:12
sync_thread_num:6
uptime_in_seconds:421877
uptime_in_days:5
config_file:/data/pika/conf/pika.conf
server_id:1

# Data
db_size:805306368
db_size_human:768M
log_size:402653184
log_size_human:384M
compression:snappy
used_memory:4194304
used_memory_human:4M

# Log
safety_purge:write2file1
expire_logs_days:7
expire_logs_nums:10
binlog_offset:3 4096

# Stats
total_connections_received:351
instantaneous_ops_per_sec:4
total_commands_processed:120934
is_bgsaving:No, , 0
is_slots_reloading:No, , 0
is_slots_cleanuping:No, , 0
is_scaning_keyspace:No
is_compact:No

# CPU
used_cpu_sys:88.21
used_cpu_user:140.03
used_cpu_sys_children:0.00
used_cpu_user_children:0.00

# Replication(MASTER)
role:master
connected_slaves:2
slave0:ip=10.0.0.12,port=9221,state=online,sid=1,lag=0
slave1:ip=10.0.0.13,port=9231,state=offline,sid=2,lag=1200
double_master_mode:true
the peer-master host:10.0.1.5
the peer-master port:9221
the peer-master server_id:2
repl_state:1
double_master_recv_info: filenum 3 offset 4096

# Keyspace
# Time:2019-04-02 00:30:01
Strings: keys=3021, expires=12, invaild_keys=0
Hashes: keys=210, expires=0, invaild_keys=2
Lists: keys=17, expires=0, invaild_keys=0
Zsets: keys=5, expires=1, invaild_keys=0
Sets: keys=9, expires=0, invaild_keys=0
";

pub(crate) const V3_1_0_MASTER: &str = "# Server
pika_version:3.1.0
tcp_port:9221
uptime_in_seconds:7200
config_file:/data/pika/conf/pika.conf
server_id:1

# Data
db_size:104857600
log_size:52428800
compression:snappy

# Replication(MASTER)
role:master
connected_slaves:0
db0 binlog_offset=2 1024,safety_purge=write2file0
db1 binlog_offset=0 0,safety_purge=none

# Keyspace
# Time:2019-07-16 12:00:00
db0_Strings: keys=120, expires=4, invaild_keys=0
db0_Hashes: keys=33, expires=0, invaild_keys=0
db0_Lists: keys=8, expires=0, invaild_keys=0
db0_Zsets: keys=2, expires=0, invaild_keys=0
db0_Sets: keys=11, expires=0, invaild_keys=0
db1_Strings: keys=7, expires=0, invaild_keys=0
db1_Hashes: keys=0, expires=0, invaild_keys=0
db1_Lists: keys=0, expires=0, invaild_keys=0
db1_Zsets: keys=0, expires=0, invaild_keys=0
db1_Sets: keys=40, expires=0, invaild_keys=0
";

pub(crate) const V3_2_7_MASTER: &str = "# Server
pika_version:3.2.7
tcp_port:9221
thread_num:8
uptime_in_seconds:1209600
config_file:/data/pika/conf/pika.conf
server_id:1

# CPU
used_cpu_sys:2031.77
used_cpu_user:4410.12
used_cpu_sys_children:0.01
used_cpu_user_children:0

# Replication(MASTER)
role:master
connected_slaves:0
db0 binlog_offset=9 8192,safety_purge=write2file8

# Keyspace
# Time:2020-02-11 02:00:00
db0 Strings_keys=6021, expires=10, invaild_keys=0
db0 Hashes_keys=310, expires=0, invaild_keys=0
db0 Lists_keys=88, expires=0, invaild_keys=1
db0 Zsets_keys=14, expires=0, invaild_keys=0
db0 Sets_keys=3, expires=0, invaild_keys=0
";

pub(crate) const V3_3_5_MASTER: &str = "# Server
pika_version:3.3.5
pika_git_sha:bd30511bf82038c2c6531b3d84872c9825fe836a
pika_build_compile_date: Nov 18 2020
os:Linux 3.10.0-693.el7.x86_64 x86_64
arch_bits:64
process_id:20312
tcp_port:9221
thread_num:24
sync_thread_num:6
uptime_in_seconds:86400
uptime_in_days:2
config_file:/data/pika/conf/pika.conf
server_id:1

# Data
db_size:1048576
db_size_human:1M
log_size:536870912
log_size_human:512M
compression:snappy
used_memory:8388608
used_memory_human:8M
db_memtable_usage:4096
db_tablereader_usage:2048
db_fatal:0
db_fatal_msg:NULL

# Clients
connected_clients:3

# Stats
total_connections_received:100
instantaneous_ops_per_sec:0
total_commands_processed:2000
is_bgsaving:No, , 0
is_scaning_keyspace:No
is_compact:No
compact_cron:
compact_interval:

# CPU
used_cpu_sys:120.50
used_cpu_user:300.25
used_cpu_sys_children:0.00
used_cpu_user_children:0.00

# Replication(MASTER)
role:master
connected_slaves:0
db0 binlog_offset=14 52428,safety_purge=write2file4
db1 binlog_offset=0 0,safety_purge=none

# Keyspace
# Time:2020-11-20 10:00:00
db0 Strings_keys=500000, expires=3, invalid_keys=0
db0 Hashes_keys=1200, expires=0, invalid_keys=0
db0 Lists_keys=40, expires=0, invalid_keys=0
db0 Zsets_keys=12, expires=0, invalid_keys=0
db0 Sets_keys=7, expires=0, invalid_keys=0
";

pub(crate) const V3_3_5_SLAVE: &str = "# Server
pika_version:3.3.5
tcp_port:9231
uptime_in_seconds:600
config_file:/data/pika/conf/pika.conf
server_id:2

# Replication(SLAVE)
role:slave
master_host:10.0.0.11
master_port:9221
master_link_status:up
slave_priority:100
slave_read_only:1
db0 binlog_offset=14 52428,safety_purge=none

# Keyspace
# Time:2020-11-20 10:00:00
db0 Strings_keys=500000, expires=3, invalid_keys=0
";

pub(crate) const ALL: &[(&str, &str)] = &[
    ("2.3.6 master", V2_3_6_MASTER),
    ("2.3.6 slave", V2_3_6_SLAVE),
    ("3.0.16 master", V3_0_16_MASTER),
    ("3.1.0 master", V3_1_0_MASTER),
    ("3.2.7 master", V3_2_7_MASTER),
    ("3.3.5 master", V3_3_5_MASTER),
    ("3.3.5 slave", V3_3_5_SLAVE),
];

pub(crate) fn context() -> ExtractionMap {
    [(LABEL_ADDR, "127.0.0.1:9221"), (LABEL_ALIAS, "main")]
        .into_iter()
        .collect()
}

/// Run one rule family against a fixture
pub(crate) fn parse_with(builder: RuleBuilder, info: &str) -> MemorySink {
    let version = resolve_version(&extract(info)).expect("fixture carries a version");
    parse_at(builder, &version, info)
}

/// Run one rule family against INFO text at an explicit version
pub(crate) fn parse_at(builder: RuleBuilder, version: &Version, info: &str) -> MemorySink {
    let registry = Registry::build(&[builder]).expect("rules should build");
    let extracts = extract(info);
    let context = context();
    let sink = MemorySink::default();
    registry.parse(
        &sink,
        &ParseContext {
            version,
            extracts: &extracts,
            context: &context,
            info,
        },
    );
    sink
}
