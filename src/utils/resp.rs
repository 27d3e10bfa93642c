//! RESP2 encoder and decoder for the exporter's command connection
//!
//! Commands are always sent as arrays of bulk strings. Replies are decoded
//! from a buffered stream one value at a time.

use std::io::{self, BufRead};

/// Decoded RESP reply
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    /// +OK
    SimpleString(String),
    /// -ERR message
    Error(String),
    /// :1000
    Integer(i64),
    /// $6\r\nfoobar
    BulkString(Vec<u8>),
    /// $-1 or *-1
    Null,
    /// *2\r\n...
    Array(Vec<RespValue>),
}

impl RespValue {
    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }

    /// Text of a simple or bulk string reply
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RespValue::SimpleString(s) => Some(s),
            RespValue::BulkString(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Owned text of a string reply, replacing invalid UTF-8
    pub fn into_text(self) -> Option<String> {
        match self {
            RespValue::SimpleString(s) => Some(s),
            RespValue::BulkString(b) => Some(match String::from_utf8(b) {
                Ok(s) => s,
                Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
            }),
            _ => None,
        }
    }

    /// Integer reply, also accepting numeric strings
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RespValue::Integer(i) => Some(*i),
            RespValue::SimpleString(_) | RespValue::BulkString(_) => self.as_str()?.parse().ok(),
            _ => None,
        }
    }

    /// Unsigned integer reply or numeric string, as used by SCAN cursors
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            RespValue::Integer(i) => u64::try_from(*i).ok(),
            RespValue::SimpleString(_) | RespValue::BulkString(_) => self.as_str()?.parse().ok(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[RespValue]> {
        match self {
            RespValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Short description used in error messages
    pub fn summary(&self) -> String {
        match self {
            RespValue::SimpleString(s) => format!("+{}", s),
            RespValue::Error(e) => format!("-{}", e),
            RespValue::Integer(i) => format!(":{}", i),
            RespValue::BulkString(b) => format!("bulk({} bytes)", b.len()),
            RespValue::Null => "nil".to_string(),
            RespValue::Array(a) => format!("array({})", a.len()),
        }
    }
}

/// Command encoder with a reusable buffer
pub struct RespEncoder {
    buf: Vec<u8>,
}

impl RespEncoder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Encode a command as an array of bulk strings
    pub fn encode_command_str(&mut self, args: &[&str]) {
        self.buf.push(b'*');
        self.write_int(args.len() as i64);
        self.buf.extend_from_slice(b"\r\n");

        for arg in args {
            self.buf.push(b'$');
            self.write_int(arg.len() as i64);
            self.buf.extend_from_slice(b"\r\n");
            self.buf.extend_from_slice(arg.as_bytes());
            self.buf.extend_from_slice(b"\r\n");
        }
    }

    #[inline]
    fn write_int(&mut self, value: i64) {
        let mut buffer = itoa::Buffer::new();
        self.buf.extend_from_slice(buffer.format(value).as_bytes());
    }
}

/// Streaming reply decoder
pub struct RespDecoder<R> {
    reader: R,
    line_buf: String,
}

impl<R: BufRead> RespDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_buf: String::with_capacity(128),
        }
    }

    /// Decode the next reply from the stream
    pub fn decode(&mut self) -> io::Result<RespValue> {
        self.line_buf.clear();
        self.reader.read_line(&mut self.line_buf)?;

        if self.line_buf.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Connection closed",
            ));
        }

        let line = self.line_buf.trim_end_matches(&['\r', '\n'][..]);
        let Some(type_byte) = line.as_bytes().first().copied() else {
            return Err(invalid_data("Empty RESP line"));
        };
        let content = &line[1..];

        match type_byte {
            b'+' => Ok(RespValue::SimpleString(content.to_string())),
            b'-' => Ok(RespValue::Error(content.to_string())),
            b':' => content
                .parse()
                .map(RespValue::Integer)
                .map_err(|_| invalid_data("Invalid integer")),
            b'$' => {
                let len: i64 = content
                    .parse()
                    .map_err(|_| invalid_data("Invalid bulk string length"))?;
                if len < 0 {
                    return Ok(RespValue::Null);
                }

                let mut data = vec![0u8; len as usize];
                self.reader.read_exact(&mut data)?;
                let mut crlf = [0u8; 2];
                self.reader.read_exact(&mut crlf)?;

                Ok(RespValue::BulkString(data))
            }
            b'*' => {
                let count: i64 = content
                    .parse()
                    .map_err(|_| invalid_data("Invalid array length"))?;
                if count < 0 {
                    return Ok(RespValue::Null);
                }

                let mut elements = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    elements.push(self.decode()?);
                }
                Ok(RespValue::Array(elements))
            }
            other => Err(invalid_data(&format!(
                "Invalid RESP type byte: {}",
                other as char
            ))),
        }
    }
}

fn invalid_data(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn decode(data: &[u8]) -> RespValue {
        RespDecoder::new(Cursor::new(data)).decode().unwrap()
    }

    #[test]
    fn test_encode_info_all() {
        let mut encoder = RespEncoder::with_capacity(64);
        encoder.encode_command_str(&["INFO", "ALL"]);
        assert_eq!(encoder.as_bytes(), b"*2\r\n$4\r\nINFO\r\n$3\r\nALL\r\n");
    }

    #[test]
    fn test_encode_reuses_buffer() {
        let mut encoder = RespEncoder::with_capacity(64);
        encoder.encode_command_str(&["PING"]);
        encoder.clear();
        encoder.encode_command_str(&["SELECT", "0"]);
        assert_eq!(encoder.as_bytes(), b"*2\r\n$6\r\nSELECT\r\n$1\r\n0\r\n");
    }

    #[test]
    fn test_decode_info_bulk_with_crlf_lines() {
        let value = decode(b"$28\r\n# Server\r\npika_version:3.3.5\r\n\r\n");
        assert_eq!(value.into_text().unwrap(), "# Server\r\npika_version:3.3.5");
    }

    #[test]
    fn test_decode_error() {
        let value = decode(b"-WRONGTYPE Operation against a key\r\n");
        assert!(value.is_error());
    }

    #[test]
    fn test_decode_scan_reply() {
        let value = decode(b"*2\r\n$2\r\n17\r\n*2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n");
        let parts = value.as_array().unwrap();
        assert_eq!(parts[0].as_i64(), Some(17));
        let keys: Vec<&str> = parts[1]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(keys, vec!["foo", "bar"]);
    }

    #[test]
    fn test_decode_null_bulk() {
        assert_eq!(decode(b"$-1\r\n"), RespValue::Null);
    }

    #[test]
    fn test_decode_eof() {
        let err = RespDecoder::new(Cursor::new(&b""[..])).decode().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
