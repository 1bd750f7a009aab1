//! Loose package version ordering
//!
//! Repository version strings are not semver: `1.21`, `2022.9.24`,
//! `1.2rc1`, and `0.1.0.post3` all occur in real indexes. Versions are
//! compared segment-wise: digit runs compare numerically, letter runs
//! compare lexically, and a trailing letter run ranks below a bare
//! prefix (`1.2rc1 < 1.2`), while a trailing digit run ranks above it
//! (`1.2.1 > 1.2`).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Segment {
    // Text before Number: at equal positions a digit run outranks a
    // letter run, which the derived Ord gives us for free.
    Text(String),
    Number(u64),
}

/// A package version with a total order
#[derive(Debug, Clone)]
pub struct PackageVersion {
    raw: String,
    segments: Vec<Segment>,
}

impl PackageVersion {
    /// Parse a version string. Never fails; unrecognized characters act
    /// as separators.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let mut segments = Vec::new();
        let mut chars = s.chars().peekable();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_digit() {
                let mut run = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        run.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                // Oversized digit runs saturate rather than wrap
                let value = run.parse::<u64>().unwrap_or(u64::MAX);
                segments.push(Segment::Number(value));
            } else if c.is_ascii_alphabetic() {
                let mut run = String::new();
                while let Some(&a) = chars.peek() {
                    if a.is_ascii_alphabetic() {
                        run.push(a.to_ascii_lowercase());
                        chars.next();
                    } else {
                        break;
                    }
                }
                segments.push(Segment::Text(run));
            } else {
                chars.next();
            }
        }
        Self {
            raw: s.to_string(),
            segments,
        }
    }

    /// The original version string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let common = self.segments.len().min(other.segments.len());
        for (a, b) in self.segments[..common].iter().zip(&other.segments[..common]) {
            match a.cmp(b) {
                Ordering::Equal => {}
                non_eq => return non_eq,
            }
        }
        // Equal prefix: an extra digit segment extends the version
        // upward, an extra letter segment marks a pre-release below it.
        match self.segments.len().cmp(&other.segments.len()) {
            Ordering::Equal => Ordering::Equal,
            Ordering::Greater => match self.segments[common] {
                Segment::Number(_) => Ordering::Greater,
                Segment::Text(_) => Ordering::Less,
            },
            Ordering::Less => match other.segments[common] {
                Segment::Number(_) => Ordering::Less,
                Segment::Text(_) => Ordering::Greater,
            },
        }
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Eq for PackageVersion {}

impl FromStr for PackageVersion {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
