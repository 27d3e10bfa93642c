//! INFO text to field map
//!
//! Turns the `key:value` lines of an `INFO ALL` reply into an
//! [`ExtractionMap`]. Keys are lower-cased and normalized (spaces and hyphens
//! become underscores). A handful of pika fields pack several values into one
//! line; those are expanded by the composite splitters below and the packed
//! field itself is not stored.

use std::collections::HashMap;

/// Marks a section header such as `# Server`
const SECTION_MARKER: char = '#';

/// Normalized field name to raw string value for one instance and one scrape
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionMap(HashMap<String, String>);

impl ExtractionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ExtractionMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// How a splitter recognizes its field name
#[derive(Debug, Clone, Copy)]
enum KeyPattern {
    /// Field name contains the text
    Contains(&'static str),
    /// Field name equals the text
    Exact(&'static str),
    /// Text followed by one or more digits (`slave0`, `slave12`)
    Indexed(&'static str),
}

impl KeyPattern {
    fn matches(&self, key: &str) -> bool {
        match *self {
            KeyPattern::Contains(s) => key.contains(s),
            KeyPattern::Exact(s) => key == s,
            KeyPattern::Indexed(prefix) => key
                .strip_prefix(prefix)
                .map(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
                .unwrap_or(false),
        }
    }
}

struct Splitter {
    pattern: KeyPattern,
    split: fn(&str, &mut ExtractionMap),
}

/// Checked in order; the first matching splitter handles the line.
const SPLITTERS: &[Splitter] = &[
    Splitter {
        pattern: KeyPattern::Contains("binlog_offset"),
        split: split_binlog_offset,
    },
    Splitter {
        pattern: KeyPattern::Contains("is_bgsaving"),
        split: split_bgsaving,
    },
    Splitter {
        pattern: KeyPattern::Contains("is_slots_reloading"),
        split: split_slots_reloading,
    },
    Splitter {
        pattern: KeyPattern::Contains("is_slots_cleanuping"),
        split: split_slots_cleaning,
    },
    Splitter {
        pattern: KeyPattern::Indexed("slave"),
        split: split_slave,
    },
    Splitter {
        pattern: KeyPattern::Exact("time"),
        split: split_keyspace_time,
    },
    Splitter {
        pattern: KeyPattern::Contains("double_master_recv_info"),
        split: split_double_master_recv_info,
    },
];

/// Build the field map for one INFO reply. Never fails; malformed lines are skipped.
pub fn extract(info: &str) -> ExtractionMap {
    let mut map = ExtractionMap::new();

    for raw_line in info.lines() {
        let line = raw_line.trim_end_matches('\r').to_lowercase();

        let line = match line.strip_prefix(SECTION_MARKER) {
            // `# Server` is a header; `# Time:...` still carries a field
            Some(rest) if !rest.contains(':') => continue,
            Some(rest) => rest.trim_start().to_string(),
            None => line,
        };

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        let key = normalize_key(key);
        if key.is_empty() {
            continue;
        }
        let value = value.strip_prefix(' ').unwrap_or(value);
        let value = if value.is_empty() { "null" } else { value };

        match SPLITTERS.iter().find(|s| s.pattern.matches(&key)) {
            Some(splitter) => (splitter.split)(value, &mut map),
            None => map.insert(key, value),
        }
    }

    map
}

fn normalize_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// Positional parts of `value`, padded with empty strings up to `n`
fn parts<'a>(value: &'a str, sep: char, n: usize) -> Vec<&'a str> {
    let mut v: Vec<&str> = value.split(sep).take(n).collect();
    v.resize(n, "");
    v
}

fn split_binlog_offset(value: &str, map: &mut ExtractionMap) {
    let p = parts(value, ' ', 2);
    map.insert("binlog_offset_filenum", p[0]);
    map.insert("binlog_offset_value", p[1]);
}

fn split_bgsaving(value: &str, map: &mut ExtractionMap) {
    let p = parts(value, ',', 2);
    map.insert("is_bgsaving", p[0]);
    map.insert("bgsave_start_time", p[1]);
}

fn split_slots_reloading(value: &str, map: &mut ExtractionMap) {
    let p = parts(value, ',', 2);
    map.insert("is_slots_reloading", p[0]);
    map.insert("slots_reload_start_time", p[1]);
}

fn split_slots_cleaning(value: &str, map: &mut ExtractionMap) {
    let p = parts(value, ',', 2);
    map.insert("is_slots_cleaning", p[0]);
    map.insert("slots_clean_start_time", p[1]);
}

/// `ip=..,port=..,state=..,sid=..,lag=..`, read by position
fn split_slave(value: &str, map: &mut ExtractionMap) {
    const FIELDS: [&str; 5] = ["slave_ip", "slave_port", "slave_state", "slave_sid", "slave_lag"];

    let p = parts(value, ',', FIELDS.len());
    for (field, part) in FIELDS.iter().zip(p) {
        let v = part.split_once('=').map(|(_, v)| v).unwrap_or("");
        map.insert(*field, v);
    }
}

fn split_keyspace_time(value: &str, map: &mut ExtractionMap) {
    map.insert("keyspace_time", value);
}

/// `filenum 12 offset 3456`
fn split_double_master_recv_info(value: &str, map: &mut ExtractionMap) {
    let p = parts(value, ' ', 4);
    map.insert("double_master_recv_info_binlog_filenum", p[1]);
    map.insert("double_master_recv_info_binlog_offset", p[3]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fixtures;

    #[test]
    fn test_keys_are_normalized() {
        let map = extract("# Server\r\nPika Version:3.3.5\r\nDB-Size: 1024\r\nrole:Master\r\n");
        assert_eq!(map.get("pika_version"), Some("3.3.5"));
        assert_eq!(map.get("db_size"), Some("1024"));
        assert_eq!(map.get("role"), Some("master"));
        assert!(!map.contains("# server"));
        assert!(!map.contains("server"));
    }

    #[test]
    fn test_fixture_keys_have_no_spaces_or_uppercase() {
        for (_, info) in fixtures::ALL {
            let map = extract(info);
            assert!(!map.is_empty());
            for (key, _) in map.iter() {
                assert_eq!(key, key.to_lowercase());
                assert!(!key.contains(' ') && !key.contains('-'), "bad key {:?}", key);
            }
        }
    }

    #[test]
    fn test_extraction_is_idempotent() {
        for (_, info) in fixtures::ALL {
            assert_eq!(extract(info), extract(info));
        }
    }

    #[test]
    fn test_value_trims_one_leading_space_and_nulls_empty() {
        let map = extract("a:  two\nb:\nc: \n");
        assert_eq!(map.get("a"), Some(" two"));
        assert_eq!(map.get("b"), Some("null"));
        assert_eq!(map.get("c"), Some("null"));
    }

    #[test]
    fn test_first_separator_splits() {
        let map = extract("config_file:/etc/pika:a.conf\n");
        assert_eq!(map.get("config_file"), Some("/etc/pika:a.conf"));
    }

    #[test]
    fn test_lines_without_separator_are_skipped() {
        let map = extract("db0 binlog_offset=0 388,safety_purge=none\nuptime_in_days:3\n");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("uptime_in_days"), Some("3"));
    }

    #[test]
    fn test_slave_line_splits_into_five_fields() {
        let map = extract("slave0:ip=10.0.0.1,port=9221,state=online,sid=3,lag=12\r\n");
        assert_eq!(map.len(), 5);
        assert_eq!(map.get("slave_ip"), Some("10.0.0.1"));
        assert_eq!(map.get("slave_port"), Some("9221"));
        assert_eq!(map.get("slave_state"), Some("online"));
        assert_eq!(map.get("slave_sid"), Some("3"));
        assert_eq!(map.get("slave_lag"), Some("12"));
        assert!(!map.contains("slave0"));
    }

    #[test]
    fn test_slave_prefix_without_index_is_not_split() {
        let map = extract("slave_read_only:1\nslave_priority:100\n");
        assert_eq!(map.get("slave_read_only"), Some("1"));
        assert_eq!(map.get("slave_priority"), Some("100"));
        assert!(!map.contains("slave_ip"));
    }

    #[test]
    fn test_binlog_offset_split() {
        let map = extract("binlog_offset:12 4567\n");
        assert_eq!(map.get("binlog_offset_filenum"), Some("12"));
        assert_eq!(map.get("binlog_offset_value"), Some("4567"));
        assert!(!map.contains("binlog_offset"));
    }

    #[test]
    fn test_missing_parts_become_empty() {
        let map = extract("is_bgsaving:no\n");
        assert_eq!(map.get("is_bgsaving"), Some("no"));
        assert_eq!(map.get("bgsave_start_time"), Some(""));
    }

    #[test]
    fn test_section_marker_with_field_is_kept() {
        let map = extract("# Keyspace\r\n# Time:2019-12-05 15:22:49\r\n");
        assert_eq!(map.get("keyspace_time"), Some("2019-12-05 15:22:49"));
        assert!(!map.contains("time"));
        assert!(!map.contains("keyspace"));
    }

    #[test]
    fn test_double_master_recv_info() {
        let map = extract("double_master_recv_info: filenum 3 offset 1024\n");
        assert_eq!(map.get("double_master_recv_info_binlog_filenum"), Some("3"));
        assert_eq!(map.get("double_master_recv_info_binlog_offset"), Some("1024"));
    }

    #[test]
    fn test_first_splitter_in_order_wins() {
        // matches both the binlog_offset and is_bgsaving patterns
        let map = extract("is_bgsaving_binlog_offset:7 8\n");
        assert_eq!(map.get("binlog_offset_filenum"), Some("7"));
        assert!(!map.contains("is_bgsaving"));
    }

    #[test]
    fn test_last_write_wins() {
        let map = extract("role:master\nrole:slave\n");
        assert_eq!(map.get("role"), Some("slave"));
    }
}
