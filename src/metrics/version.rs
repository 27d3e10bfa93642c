//! Store version resolution and version ranges for rule gating

use std::fmt;

use semver::{Version, VersionReq};

use super::extract::ExtractionMap;
use crate::utils::{RegistryError, VersionParseError};

/// INFO field carrying the pika release
pub const VERSION_FIELD: &str = "pika_version";

/// Read and parse the self-reported pika version.
///
/// Accepts a leading `v` and two-component versions (`3.3` reads as `3.3.0`).
pub fn resolve_version(extracts: &ExtractionMap) -> Result<Version, VersionParseError> {
    let raw = extracts
        .get(VERSION_FIELD)
        .ok_or(VersionParseError::Missing(VERSION_FIELD))?;

    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);

    let (core, suffix) = match trimmed.find(|c: char| c == '-' || c == '+') {
        Some(i) => trimmed.split_at(i),
        None => (trimmed, ""),
    };
    let padded = match core.split('.').count() {
        1 => format!("{}.0.0{}", core, suffix),
        2 => format!("{}.0{}", core, suffix),
        _ => trimmed.to_string(),
    };

    Version::parse(&padded).map_err(|source| VersionParseError::Invalid {
        value: raw.to_string(),
        source,
    })
}

/// A version requirement such as `<3.1.0`, `~3.0.5` or `3.2.0 - 3.3.2`
#[derive(Debug, Clone)]
pub struct VersionRange {
    text: String,
    req: VersionReq,
}

impl VersionRange {
    pub fn parse(text: &str) -> Result<Self, RegistryError> {
        // hyphen ranges are inclusive on both ends
        let normalized = match text.split_once(" - ") {
            Some((low, high)) => format!(">={}, <={}", low.trim(), high.trim()),
            None => text.to_string(),
        };

        let req = VersionReq::parse(&normalized).map_err(|source| {
            RegistryError::InvalidVersionRange {
                range: text.to_string(),
                source,
            }
        })?;
        Ok(Self {
            text: text.to_string(),
            req,
        })
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.req.matches(version)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version_of(raw: &str) -> Result<Version, VersionParseError> {
        resolve_version(&[(VERSION_FIELD, raw)].into_iter().collect())
    }

    #[test]
    fn test_resolve_plain() {
        assert_eq!(version_of("3.3.5").unwrap(), Version::new(3, 3, 5));
    }

    #[test]
    fn test_resolve_lenient_forms() {
        assert_eq!(version_of("v2.3.6").unwrap(), Version::new(2, 3, 6));
        assert_eq!(version_of("3.2").unwrap(), Version::new(3, 2, 0));
        assert_eq!(version_of(" 3.0.16 ").unwrap(), Version::new(3, 0, 16));
        assert_eq!(version_of("3.4.0-rc1").unwrap().pre.as_str(), "rc1");
    }

    #[test]
    fn test_resolve_missing() {
        assert!(matches!(
            resolve_version(&ExtractionMap::new()),
            Err(VersionParseError::Missing(VERSION_FIELD))
        ));
    }

    #[test]
    fn test_resolve_garbage() {
        assert!(matches!(
            version_of("unknown"),
            Err(VersionParseError::Invalid { .. })
        ));
    }

    #[test]
    fn test_hyphen_range_is_inclusive() {
        let range = VersionRange::parse("3.2.0 - 3.3.2").unwrap();
        assert!(range.matches(&Version::new(3, 2, 0)));
        assert!(range.matches(&Version::new(3, 2, 7)));
        assert!(range.matches(&Version::new(3, 3, 2)));
        assert!(!range.matches(&Version::new(3, 3, 3)));
        assert!(!range.matches(&Version::new(3, 1, 9)));
        assert_eq!(range.to_string(), "3.2.0 - 3.3.2");
    }

    #[test]
    fn test_tilde_range() {
        let range = VersionRange::parse("~3.0.5").unwrap();
        assert!(range.matches(&Version::new(3, 0, 16)));
        assert!(!range.matches(&Version::new(3, 0, 4)));
        assert!(!range.matches(&Version::new(3, 1, 0)));
    }

    #[test]
    fn test_invalid_range() {
        assert!(VersionRange::parse("not a range").is_err());
    }
}
