//! Resolved exporter configuration

use std::time::Duration;

use percent_encoding::percent_decode_str;

use super::cli::CliArgs;

/// A key (or key pattern) to check, with the db it lives in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbKeyPair {
    pub db: String,
    pub key: String,
}

impl DbKeyPair {
    pub fn new(db: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            key: key.into(),
        }
    }
}

/// Query-style unescape: `%XX` sequences are decoded and `+` becomes a space
fn unescape(s: &str) -> Result<String, String> {
    let bytes = s.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .map(|hex| hex.iter().all(u8::is_ascii_hexdigit))
                .unwrap_or(false);
            if !valid {
                return Err(format!("couldn't parse db/key string: {}", s));
            }
        }
    }

    let plus_decoded = s.replace('+', " ");
    percent_decode_str(&plus_decoded)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| format!("couldn't parse db/key string: {}", s))
}

/// Parse a `[dbN=]key,...` list.
///
/// Entries without a db go to db `0`. The db fragment may carry a `db`
/// prefix, which is stripped. Keys are URL-query unescaped.
pub fn parse_key_arg(arg: &str) -> Result<Vec<DbKeyPair>, String> {
    if arg.is_empty() {
        return Ok(Vec::new());
    }

    let mut keys = Vec::new();
    for entry in arg.split(',') {
        let fragments: Vec<&str> = entry.split('=').collect();
        let pair = match fragments.as_slice() {
            [key] => DbKeyPair::new("0", unescape(key.trim())?),
            [db, key] => DbKeyPair::new(db.trim().replace("db", ""), unescape(key.trim())?),
            _ => return Err(format!("invalid key list argument: {}", entry)),
        };
        keys.push(pair);
    }
    Ok(keys)
}

/// Exporter settings after CLI validation
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub namespace: String,
    pub keys: Vec<DbKeyPair>,
    pub key_patterns: Vec<DbKeyPair>,
    pub scan_count: usize,
    /// Local hour for the daily keyspace recount; negative disables it
    pub keyspace_stats_clock: i32,
    pub listen_address: String,
    pub telemetry_path: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            namespace: "pika".to_string(),
            keys: Vec::new(),
            key_patterns: Vec::new(),
            scan_count: 100,
            keyspace_stats_clock: -1,
            listen_address: "0.0.0.0:9121".to_string(),
            telemetry_path: "/metrics".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl ExporterConfig {
    /// Build from validated CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self, String> {
        args.validate()?;

        Ok(Self {
            namespace: args.namespace.clone(),
            keys: parse_key_arg(&args.check_keys)?,
            key_patterns: parse_key_arg(&args.check_key_patterns)?,
            scan_count: args.scan_count,
            keyspace_stats_clock: args.keyspace_stats_clock,
            listen_address: args.listen_address.clone(),
            telemetry_path: args.telemetry_path.clone(),
            connect_timeout: Duration::from_millis(args.connect_timeout_ms),
            request_timeout: Duration::from_millis(args.request_timeout_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_key_arg_empty() {
        assert!(parse_key_arg("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_key_arg_default_db() {
        let keys = parse_key_arg("queue, other").unwrap();
        assert_eq!(keys, vec![DbKeyPair::new("0", "queue"), DbKeyPair::new("0", "other")]);
    }

    #[test]
    fn test_parse_key_arg_with_db() {
        let keys = parse_key_arg("db1=queue,2 = jobs").unwrap();
        assert_eq!(keys, vec![DbKeyPair::new("1", "queue"), DbKeyPair::new("2", "jobs")]);
    }

    #[test]
    fn test_parse_key_arg_unescapes() {
        let keys = parse_key_arg("db0=a%3Db,my+key").unwrap();
        assert_eq!(keys, vec![DbKeyPair::new("0", "a=b"), DbKeyPair::new("0", "my key")]);
    }

    #[test]
    fn test_parse_key_arg_errors() {
        let err = parse_key_arg("db0=a=b").unwrap_err();
        assert_eq!(err, "invalid key list argument: db0=a=b");

        let err = parse_key_arg("bad%zz").unwrap_err();
        assert_eq!(err, "couldn't parse db/key string: bad%zz");
    }

    #[test]
    fn test_from_cli() {
        let args = CliArgs::parse_from([
            "test",
            "--pika.addr",
            "127.0.0.1:9221",
            "--check.keys",
            "db1=queue",
            "--check.key-patterns",
            "user:*",
            "--connect-timeout-ms",
            "250",
        ]);
        let config = ExporterConfig::from_cli(&args).unwrap();
        assert_eq!(config.keys, vec![DbKeyPair::new("1", "queue")]);
        assert_eq!(config.key_patterns, vec![DbKeyPair::new("0", "user:*")]);
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_from_cli_rejects_invalid() {
        let args = CliArgs::parse_from(["test"]);
        assert!(ExporterConfig::from_cli(&args).is_err());

        let args = CliArgs::parse_from(["test", "--pika.addr", "a:1", "--check.keys", "x=y=z"]);
        assert!(ExporterConfig::from_cli(&args).is_err());
    }
}
