//! Dotted version numbers and Maven-style version ranges.
//!
//! Build-tool versions (`8.1.1`), compiler versions (`1.9.22`, `2.0.0-Beta1`)
//! and JDK levels (`17`, `1.8`) all share one representation so the
//! knowledge base can compare values on any axis.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing versions or ranges.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("empty version string")]
    Empty,

    #[error("invalid version '{0}': expected dotted numeric segments")]
    Invalid(String),

    #[error("invalid version range '{range}': {message}")]
    InvalidRange { range: String, message: String },
}

/// A dotted numeric version with an optional qualifier.
///
/// Ordering compares numeric segments left to right, treating missing
/// segments as zero (`8.1` == `8.1.0`). A qualified version sorts before the
/// unqualified release (`2.0.0-RC1` < `2.0.0`), qualifiers compare
/// lexically among themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    segments: Vec<u64>,
    qualifier: Option<String>,
}

impl Version {
    /// Build a version from numeric segments.
    pub fn new(segments: &[u64]) -> Self {
        Version {
            segments: segments.to_vec(),
            qualifier: None,
        }
    }

    /// Parse a JDK level, folding the legacy `1.x` spelling onto `x`.
    ///
    /// `1.8` → `8`, `11` → `11`, `17.0.2` → `17`.
    pub fn parse_jdk(raw: &str) -> Result<Self, VersionError> {
        let v: Version = raw.parse()?;
        let level = match v.segments.as_slice() {
            [1, minor, ..] => *minor,
            [major, ..] => *major,
            [] => return Err(VersionError::Invalid(raw.to_string())),
        };
        Ok(Version::new(&[level]))
    }

    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// Major component (first segment).
    pub fn major(&self) -> u64 {
        self.segments.first().copied().unwrap_or(0)
    }

    fn segment(&self, idx: usize) -> u64 {
        self.segments.get(idx).copied().unwrap_or(0)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VersionError::Empty);
        }

        let (numeric, qualifier) = match s.find(['-', '+']) {
            Some(idx) => (&s[..idx], Some(s[idx + 1..].to_string())),
            None => (s, None),
        };

        let mut segments = Vec::new();
        for part in numeric.split('.') {
            let n = part
                .parse::<u64>()
                .map_err(|_| VersionError::Invalid(s.to_string()))?;
            segments.push(n);
        }

        Ok(Version {
            segments,
            qualifier: qualifier.filter(|q| !q.is_empty()),
        })
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        v.to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .segments
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(".");
        match &self.qualifier {
            Some(q) => write!(f, "{}-{}", joined, q),
            None => write!(f, "{}", joined),
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for idx in 0..len {
            match self.segment(idx).cmp(&other.segment(idx)) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        match (&self.qualifier, &other.qualifier) {
            (None, None) => Ordering::Equal,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl std::hash::Hash for Version {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // Trailing zero segments must hash like their absence to agree with Eq.
        let significant = self
            .segments
            .iter()
            .rposition(|s| *s != 0)
            .map_or(0, |p| p + 1);
        self.segments[..significant].hash(state);
        self.qualifier.hash(state);
    }
}

/// One end of a [`VersionRange`].
#[derive(Debug, Clone, PartialEq, Eq)]
struct Bound {
    version: Version,
    inclusive: bool,
}

/// A version interval in Maven notation.
///
/// `[8.0,8.2)` means `8.0 <= v < 8.2`; `[17,)` has no upper bound;
/// `(,2.0)` has no lower bound. A bare version `[1.9.22]` matches exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionRange {
    raw: String,
    lower: Option<Bound>,
    upper: Option<Bound>,
}

impl VersionRange {
    /// Whether `v` lies inside this range.
    pub fn contains(&self, v: &Version) -> bool {
        if let Some(lower) = &self.lower {
            match v.cmp(&lower.version) {
                Ordering::Less => return false,
                Ordering::Equal if !lower.inclusive => return false,
                _ => {}
            }
        }
        if let Some(upper) = &self.upper {
            match v.cmp(&upper.version) {
                Ordering::Greater => return false,
                Ordering::Equal if !upper.inclusive => return false,
                _ => {}
            }
        }
        true
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let invalid = |message: &str| VersionError::InvalidRange {
            range: raw.to_string(),
            message: message.to_string(),
        };

        let open = raw.chars().next().ok_or_else(|| invalid("empty range"))?;
        let close = raw.chars().last().ok_or_else(|| invalid("empty range"))?;
        if !matches!(open, '[' | '(') || !matches!(close, ']' | ')') || raw.len() < 2 {
            return Err(invalid("must be wrapped in [ ] or ( )"));
        }

        let body = &raw[1..raw.len() - 1];
        let parse_end = |text: &str, inclusive: bool| -> Result<Option<Bound>, VersionError> {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            Ok(Some(Bound {
                version: text.parse()?,
                inclusive,
            }))
        };

        let (lower, upper) = match body.split_once(',') {
            Some((lo, hi)) => (parse_end(lo, open == '[')?, parse_end(hi, close == ']')?),
            None => {
                if open != '[' || close != ']' {
                    return Err(invalid("exact versions must use [v]"));
                }
                let exact = parse_end(body, true)?.ok_or_else(|| invalid("missing version"))?;
                (Some(exact.clone()), Some(exact))
            }
        };

        if let (Some(lo), Some(hi)) = (&lower, &upper) {
            if lo.version > hi.version {
                return Err(invalid("lower bound exceeds upper bound"));
            }
        }

        Ok(VersionRange {
            raw: raw.to_string(),
            lower,
            upper,
        })
    }
}

impl TryFrom<String> for VersionRange {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionRange> for String {
    fn from(r: VersionRange) -> Self {
        r.raw
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
