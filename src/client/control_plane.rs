//! Command trait for store communication
//!
//! `ControlPlane` is the single primitive a connection must provide: send
//! one command, read one reply. Everything the exporter issues (INFO, key
//! inspection, ping probes, SCAN) is layered on top in `ControlPlaneExt`.

use std::io;

use crate::utils::{ClientError, RespValue};

/// Type and length of a key as reported by TYPE and its length command
#[derive(Debug, Clone, PartialEq)]
pub struct KeyInfo {
    pub key_type: String,
    pub size: f64,
}

/// Raw command execution
pub trait ControlPlane {
    /// Execute a command with string arguments
    ///
    /// ```ignore
    /// let response = conn.execute(&["INFO", "ALL"])?;
    /// ```
    fn execute(&mut self, args: &[&str]) -> io::Result<RespValue>;
}

impl<T: ControlPlane + ?Sized> ControlPlane for Box<T> {
    fn execute(&mut self, args: &[&str]) -> io::Result<RespValue> {
        (**self).execute(args)
    }
}

/// Typed commands built on `ControlPlane`
pub trait ControlPlaneExt: ControlPlane {
    /// Execute and turn server error replies into `ClientError::Server`
    fn call(&mut self, args: &[&str]) -> Result<RespValue, ClientError> {
        match self.execute(args)? {
            RespValue::Error(e) => Err(ClientError::Server(e)),
            other => Ok(other),
        }
    }

    fn call_text(&mut self, command: &'static str, args: &[&str]) -> Result<String, ClientError> {
        let response = self.call(args)?;
        match response {
            RespValue::SimpleString(_) | RespValue::BulkString(_) => {
                Ok(response.into_text().unwrap_or_default())
            }
            other => Err(ClientError::UnexpectedResponse {
                command,
                actual: other.summary(),
            }),
        }
    }

    fn call_int(&mut self, command: &'static str, args: &[&str]) -> Result<i64, ClientError> {
        let response = self.call(args)?;
        match response {
            RespValue::Integer(n) => Ok(n),
            other => Err(ClientError::UnexpectedResponse {
                command,
                actual: other.summary(),
            }),
        }
    }

    fn authenticate(&mut self, password: &str) -> Result<(), ClientError> {
        self.call_text("AUTH", &["AUTH", password]).map(|_| ())
    }

    /// Full diagnostic report
    fn info_all(&mut self) -> Result<String, ClientError> {
        self.call_text("INFO", &["INFO", "ALL"])
    }

    /// INFO KEYSPACE 1 makes pika recount keys in the background
    fn info_keyspace(&mut self, recount: bool) -> Result<String, ClientError> {
        let flag = if recount { "1" } else { "0" };
        self.call_text("INFO", &["INFO", "KEYSPACE", flag])
    }

    fn select_db(&mut self, db: &str) -> Result<(), ClientError> {
        self.call_text("SELECT", &["SELECT", db]).map(|_| ())
    }

    /// Resolve TYPE then the matching length command.
    ///
    /// A failing length command leaves the size at zero.
    fn key_info(&mut self, key: &str) -> Result<KeyInfo, ClientError> {
        let key_type = self.call_text("TYPE", &["TYPE", key])?;
        let len_cmd = match key_type.as_str() {
            "none" => return Err(ClientError::KeyNotFound(key.to_string())),
            "string" => "STRLEN",
            "list" => "LLEN",
            "set" => "SCARD",
            "zset" => "ZCARD",
            "hash" => "HLEN",
            _ => {
                return Err(ClientError::UnknownKeyType {
                    key_type,
                    key: key.to_string(),
                })
            }
        };
        let size = self.call_int(len_cmd, &[len_cmd, key]).unwrap_or(0) as f64;
        Ok(KeyInfo { key_type, size })
    }

    /// GET, with a missing key as `None`
    fn get(&mut self, key: &str) -> Result<Option<String>, ClientError> {
        match self.call(&["GET", key])? {
            RespValue::Null => Ok(None),
            other => {
                let actual = other.summary();
                other
                    .into_text()
                    .map(Some)
                    .ok_or(ClientError::UnexpectedResponse {
                        command: "GET",
                        actual,
                    })
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ClientError> {
        self.call_text("SET", &["SET", key, value]).map(|_| ())
    }

    fn hset(&mut self, key: &str, field: &str, value: &str) -> Result<i64, ClientError> {
        self.call_int("HSET", &["HSET", key, field, value])
    }

    fn hget(&mut self, key: &str, field: &str) -> Result<Option<String>, ClientError> {
        match self.call(&["HGET", key, field])? {
            RespValue::Null => Ok(None),
            other => Ok(other.into_text()),
        }
    }

    fn lpush(&mut self, key: &str, element: &str) -> Result<i64, ClientError> {
        self.call_int("LPUSH", &["LPUSH", key, element])
    }

    fn lrange(&mut self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, ClientError> {
        let (start, stop) = (start.to_string(), stop.to_string());
        match self.call(&["LRANGE", key, &start, &stop])? {
            RespValue::Array(items) => Ok(items.into_iter().filter_map(|v| v.into_text()).collect()),
            other => Err(ClientError::UnexpectedResponse {
                command: "LRANGE",
                actual: other.summary(),
            }),
        }
    }

    fn sadd(&mut self, key: &str, member: &str) -> Result<i64, ClientError> {
        self.call_int("SADD", &["SADD", key, member])
    }

    fn scard(&mut self, key: &str) -> Result<i64, ClientError> {
        self.call_int("SCARD", &["SCARD", key])
    }

    fn zadd(&mut self, key: &str, score: f64, member: &str) -> Result<i64, ClientError> {
        let score = score.to_string();
        self.call_int("ZADD", &["ZADD", key, &score, member])
    }

    fn zcard(&mut self, key: &str) -> Result<i64, ClientError> {
        self.call_int("ZCARD", &["ZCARD", key])
    }

    fn del(&mut self, keys: &[&str]) -> Result<i64, ClientError> {
        let mut args = Vec::with_capacity(keys.len() + 1);
        args.push("DEL");
        args.extend_from_slice(keys);
        self.call_int("DEL", &args)
    }

    /// Walk SCAN until the cursor returns to 0, collecting every matching key
    fn scan(&mut self, pattern: &str, count: usize) -> Result<Vec<String>, ClientError> {
        let count = if count == 0 { 100 } else { count };
        let count = count.to_string();
        let mut cursor = "0".to_string();
        let mut keys = Vec::new();

        loop {
            let response = self.call(&["SCAN", &cursor, "MATCH", pattern, "COUNT", &count])?;
            let parts = match response.as_array() {
                Some(parts) if parts.len() == 2 => parts,
                _ => return Err(ClientError::InvalidScan(pattern.to_string())),
            };
            let next = parts[0]
                .as_u64()
                .ok_or_else(|| ClientError::InvalidScan(pattern.to_string()))?;
            if let Some(batch) = parts[1].as_array() {
                keys.extend(batch.iter().filter_map(|v| v.as_str().map(str::to_string)));
            }

            if next == 0 {
                break;
            }
            cursor = next.to_string();
        }

        Ok(keys)
    }
}

impl<T: ControlPlane + ?Sized> ControlPlaneExt for T {}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays canned replies and records every command it receives
    pub(crate) struct MockControlPlane {
        responses: VecDeque<RespValue>,
        pub commands: Vec<Vec<String>>,
    }

    impl MockControlPlane {
        pub(crate) fn new(responses: Vec<RespValue>) -> Self {
            Self {
                responses: responses.into(),
                commands: Vec::new(),
            }
        }
    }

    impl ControlPlane for MockControlPlane {
        fn execute(&mut self, args: &[&str]) -> io::Result<RespValue> {
            self.commands.push(args.iter().map(|s| s.to_string()).collect());
            self.responses
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "No more responses"))
        }
    }

    fn bulk(s: &str) -> RespValue {
        RespValue::BulkString(s.as_bytes().to_vec())
    }

    #[test]
    fn test_info_all() {
        let mut mock = MockControlPlane::new(vec![bulk("# Server\r\npika_version:3.3.5\r\n")]);
        assert!(mock.info_all().unwrap().contains("pika_version"));
        assert_eq!(mock.commands[0], vec!["INFO", "ALL"]);
    }

    #[test]
    fn test_server_error_surfaces() {
        let mut mock = MockControlPlane::new(vec![RespValue::Error("ERR invalid DB index".into())]);
        match mock.select_db("99") {
            Err(ClientError::Server(msg)) => assert!(msg.contains("invalid DB")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_key_info_by_type() {
        let mut mock = MockControlPlane::new(vec![
            RespValue::SimpleString("zset".into()),
            RespValue::Integer(42),
        ]);
        let info = mock.key_info("rank").unwrap();
        assert_eq!(info.key_type, "zset");
        assert_eq!(info.size, 42.0);
        assert_eq!(mock.commands[1], vec!["ZCARD", "rank"]);
    }

    #[test]
    fn test_key_info_missing_key() {
        let mut mock = MockControlPlane::new(vec![RespValue::SimpleString("none".into())]);
        assert!(matches!(mock.key_info("gone"), Err(ClientError::KeyNotFound(_))));
    }

    #[test]
    fn test_get_nil() {
        let mut mock = MockControlPlane::new(vec![RespValue::Null, bulk("v")]);
        assert_eq!(mock.get("a").unwrap(), None);
        assert_eq!(mock.get("b").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn test_scan_follows_cursor() {
        let mut mock = MockControlPlane::new(vec![
            RespValue::Array(vec![
                bulk("7"),
                RespValue::Array(vec![bulk("user:1"), bulk("user:2")]),
            ]),
            RespValue::Array(vec![bulk("0"), RespValue::Array(vec![bulk("user:3")])]),
        ]);
        let keys = mock.scan("user:*", 50).unwrap();
        assert_eq!(keys, vec!["user:1", "user:2", "user:3"]);
        assert_eq!(mock.commands[1], vec!["SCAN", "7", "MATCH", "user:*", "COUNT", "50"]);
    }

    #[test]
    fn test_scan_accepts_full_width_cursor() {
        let mut mock = MockControlPlane::new(vec![
            RespValue::Array(vec![
                bulk("18446744073709551615"),
                RespValue::Array(vec![bulk("user:1")]),
            ]),
            RespValue::Array(vec![bulk("0"), RespValue::Array(Vec::new())]),
        ]);
        let keys = mock.scan("user:*", 10).unwrap();
        assert_eq!(keys, vec!["user:1"]);
        assert_eq!(mock.commands[1][1], "18446744073709551615");
    }

    #[test]
    fn test_del_many() {
        let mut mock = MockControlPlane::new(vec![RespValue::Integer(2)]);
        assert_eq!(mock.del(&["a", "b"]).unwrap(), 2);
        assert_eq!(mock.commands[0], vec!["DEL", "a", "b"]);
    }
}
