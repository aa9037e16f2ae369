//! Hierarchical address type.
//!
//! Six ordered segments — org/project/environment/service/identity/instance —
//! identify where a secret lives. Segments are literals, wildcards, or
//! alternation sets; addresses compare for equality and for specificity,
//! and project onto their keyring-grouping form by wildcarding the
//! instance segment. Immutable value type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

pub const SEGMENT_COUNT: usize = 6;

const SEGMENT_NAMES: [&str; SEGMENT_COUNT] = [
    "org",
    "project",
    "environment",
    "service",
    "identity",
    "instance",
];

/// One address segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Literal(String),
    Wildcard,
    /// A set of acceptable literals, e.g. `[staging|production]`.
    Alternation(Vec<String>),
}

impl Segment {
    /// Specificity rank: literal > alternation > wildcard.
    fn rank(&self) -> u8 {
        match self {
            Self::Literal(_) => 2,
            Self::Alternation(_) => 1,
            Self::Wildcard => 0,
        }
    }

    /// Whether this segment, read as a pattern, covers `other`.
    fn covers(&self, other: &Segment) -> bool {
        match (self, other) {
            (Self::Wildcard, _) => true,
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::Alternation(set), Self::Literal(b)) => set.iter().any(|s| s == b),
            (Self::Alternation(a), Self::Alternation(b)) => {
                b.iter().all(|s| a.contains(s))
            }
            _ => false,
        }
    }

    fn parse(raw: &str, position: usize) -> Result<Self> {
        if raw == "*" {
            return Ok(Self::Wildcard);
        }
        if let Some(inner) = raw.strip_prefix('[') {
            let inner = inner
                .strip_suffix(']')
                .ok_or_else(|| malformed(position, "unterminated alternation"))?;
            let mut members: Vec<String> = inner
                .split('|')
                .map(|m| m.trim().to_string())
                .collect();
            if members.iter().any(|m| m.is_empty() || !is_literal(m)) {
                return Err(malformed(position, "invalid alternation member"));
            }
            members.sort();
            members.dedup();
            if members.is_empty() {
                return Err(malformed(position, "empty alternation"));
            }
            return Ok(Self::Alternation(members));
        }
        if raw.is_empty() || !is_literal(raw) {
            return Err(malformed(position, "invalid segment"));
        }
        Ok(Self::Literal(raw.to_string()))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => f.write_str(s),
            Self::Wildcard => f.write_str("*"),
            Self::Alternation(members) => write!(f, "[{}]", members.join("|")),
        }
    }
}

fn is_literal(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn malformed(position: usize, reason: &str) -> Error {
    Error::MalformedAddress(format!("{} segment: {}", SEGMENT_NAMES[position], reason))
}

/// Outcome of a specificity comparison.
///
/// Incomparable addresses collapse to `Equal`; the resolver only needs a
/// stable tie-break, not a full partial order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Specificity {
    More,
    Less,
    Equal,
}

/// An immutable six-segment hierarchical path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    segments: [Segment; SEGMENT_COUNT],
}

impl Address {
    /// Parse a canonical `/org/project/env/service/identity/instance` string.
    ///
    /// The org segment must be a literal.
    pub fn parse(raw: &str) -> Result<Self> {
        let rest = raw
            .strip_prefix('/')
            .ok_or_else(|| Error::MalformedAddress("must start with '/'".to_string()))?;

        let parts: Vec<&str> = rest.split('/').collect();
        if parts.len() != SEGMENT_COUNT {
            return Err(Error::MalformedAddress(format!(
                "expected {} segments, found {}",
                SEGMENT_COUNT,
                parts.len()
            )));
        }

        let mut segments = Vec::with_capacity(SEGMENT_COUNT);
        for (position, part) in parts.iter().enumerate() {
            segments.push(Segment::parse(part, position)?);
        }

        if !matches!(segments[0], Segment::Literal(_)) {
            return Err(Error::MalformedAddress(
                "org segment must be a literal".to_string(),
            ));
        }

        let segments: [Segment; SEGMENT_COUNT] = segments
            .try_into()
            .map_err(|_| Error::MalformedAddress("segment arity".to_string()))?;
        Ok(Self { segments })
    }

    /// The org this address belongs to.
    pub fn org(&self) -> &str {
        match &self.segments[0] {
            Segment::Literal(s) => s,
            // Parse guarantees a literal org.
            _ => "",
        }
    }

    pub fn segment(&self, index: usize) -> &Segment {
        &self.segments[index]
    }

    /// Whether the project segment is a literal (pattern queries on a
    /// wildcard project need the registry's contains search mode).
    pub fn project_is_literal(&self) -> bool {
        matches!(self.segments[1], Segment::Literal(_))
    }

    /// True when every segment is a literal.
    pub fn is_exact(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// This address with the instance segment forced to the wildcard:
    /// the key under which a family of credential versions shares a keyring.
    pub fn with_wildcard_instance(&self) -> Address {
        let mut segments = self.segments.clone();
        segments[SEGMENT_COUNT - 1] = Segment::Wildcard;
        Address { segments }
    }

    /// Segment-by-segment specificity, left to right, first difference wins.
    pub fn compare_specificity(&self, other: &Address) -> Specificity {
        for (mine, theirs) in self.segments.iter().zip(other.segments.iter()) {
            let (a, b) = (mine.rank(), theirs.rank());
            if a > b {
                return Specificity::More;
            }
            if a < b {
                return Specificity::Less;
            }
        }
        Specificity::Equal
    }

    /// Whether this address, read as a pattern, contains `other`.
    pub fn contains(&self, other: &Address) -> bool {
        self.segments
            .iter()
            .zip(other.segments.iter())
            .all(|(mine, theirs)| mine.covers(theirs))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
