//! Version parsing, ordering, ranges and constraints
//!
//! Versions follow the generic Maven-style scheme: a version string is split
//! into numeric and qualifier items on `.`, `-`, `_` and on every transition
//! between digits and letters. Numbers compare numerically, well-known
//! qualifiers compare by release maturity and unknown qualifiers sort after
//! all known ones.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::CoreError;

/// Rank shared by `""`, `ga`, `final` and `release`; equal to a missing item.
const RELEASE_RANK: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Item {
    /// Decimal digits without leading zeros
    Number(String),
    /// Well-known qualifier, ordered by rank
    Qualifier(u8),
    /// Any other qualifier, lower-cased
    Other(String),
}

impl Item {
    fn from_token(token: &str) -> Self {
        if !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()) {
            let trimmed = token.trim_start_matches('0');
            let digits = if trimmed.is_empty() { "0" } else { trimmed };
            return Item::Number(digits.to_string());
        }

        let lower = token.to_ascii_lowercase();
        match lower.as_str() {
            "alpha" | "a" => Item::Qualifier(0),
            "beta" | "b" => Item::Qualifier(1),
            "milestone" | "m" => Item::Qualifier(2),
            "rc" | "cr" => Item::Qualifier(3),
            "snapshot" => Item::Qualifier(4),
            "" | "ga" | "final" | "release" => Item::Qualifier(RELEASE_RANK),
            "sp" => Item::Qualifier(6),
            _ => Item::Other(lower),
        }
    }

    fn is_zero(&self) -> bool {
        matches!(self, Item::Number(n) if n == "0")
    }

    fn is_null(&self) -> bool {
        self.is_zero() || matches!(self, Item::Qualifier(RELEASE_RANK))
    }

    /// Compare against the implicit padding item of a shorter version
    fn compare_to_null(&self) -> Ordering {
        match self {
            Item::Number(n) if n == "0" => Ordering::Equal,
            Item::Number(_) => Ordering::Greater,
            Item::Qualifier(rank) => rank.cmp(&RELEASE_RANK),
            Item::Other(_) => Ordering::Greater,
        }
    }

    fn compare(&self, other: &Item) -> Ordering {
        match (self, other) {
            (Item::Number(a), Item::Number(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Item::Number(_), _) => Ordering::Greater,
            (_, Item::Number(_)) => Ordering::Less,
            (Item::Qualifier(a), Item::Qualifier(b)) => a.cmp(b),
            (Item::Qualifier(_), Item::Other(_)) => Ordering::Less,
            (Item::Other(_), Item::Qualifier(_)) => Ordering::Greater,
            (Item::Other(a), Item::Other(b)) => a.cmp(b),
        }
    }
}

fn tokenize(input: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut previous_digit: Option<bool> = None;

    for (idx, ch) in input.char_indices() {
        if matches!(ch, '.' | '-' | '_') {
            tokens.push(&input[start..idx]);
            start = idx + ch.len_utf8();
            previous_digit = None;
            continue;
        }

        let digit = ch.is_ascii_digit();
        if previous_digit.is_some_and(|previous| previous != digit) {
            tokens.push(&input[start..idx]);
            start = idx;
        }
        previous_digit = Some(digit);
    }
    tokens.push(&input[start..]);

    tokens
}

fn normalize(tokens: Vec<&str>) -> Vec<Item> {
    let mut items: Vec<Item> = Vec::with_capacity(tokens.len());

    for token in tokens {
        let item = Item::from_token(token);
        // "1.0-rc1" and "1-rc1" are the same version
        if !matches!(item, Item::Number(_)) {
            while items.len() > 1 && items.last().is_some_and(Item::is_zero) {
                items.pop();
            }
        }
        items.push(item);
    }

    while items.len() > 1 && items.last().is_some_and(Item::is_null) {
        items.pop();
    }

    items
}

/// A parsed version that keeps its original spelling for display
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    items: Vec<Item>,
}

impl Version {
    /// Parse a version string such as `1.0`, `2.1-SNAPSHOT` or `3.0.0-rc1`
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let trimmed = input.trim();
        if trimmed.is_empty()
            || trimmed.contains(char::is_whitespace)
            || trimmed.contains([',', '[', ']', '(', ')'])
        {
            return Err(CoreError::InvalidVersion(input.to_string()));
        }

        Ok(Self {
            raw: trimmed.to_string(),
            items: normalize(tokenize(trimmed)),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.items.hash(state);
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.items.len().max(other.items.len());
        for idx in 0..len {
            let ordering = match (self.items.get(idx), other.items.get(idx)) {
                (Some(a), Some(b)) => a.compare(b),
                (Some(a), None) => a.compare_to_null(),
                (None, Some(b)) => b.compare_to_null().reverse(),
                (None, None) => Ordering::Equal,
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// One end of a version range
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bound {
    pub version: Version,
    pub inclusive: bool,
}

/// A single interval such as `[1.0,2.0)`, `(,1.5]` or `[1.2]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    lower: Option<Bound>,
    upper: Option<Bound>,
}

impl VersionRange {
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let s = input.trim();
        let invalid = || CoreError::InvalidVersionRange(input.to_string());

        if s.len() < 2 {
            return Err(invalid());
        }
        let lower_inclusive = match s.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Err(invalid()),
        };
        let upper_inclusive = match s.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(invalid()),
        };
        let body = &s[1..s.len() - 1];

        let Some((lower, upper)) = body.split_once(',') else {
            // A single version must be written as [1.0]
            if !lower_inclusive || !upper_inclusive {
                return Err(invalid());
            }
            let version = Version::parse(body).map_err(|_| invalid())?;
            return Ok(Self::exact(version));
        };

        if upper.contains(',') {
            return Err(invalid());
        }

        let lower = match lower.trim() {
            "" => None,
            v => Some(Bound {
                version: Version::parse(v).map_err(|_| invalid())?,
                inclusive: lower_inclusive,
            }),
        };
        let upper = match upper.trim() {
            "" => None,
            v => Some(Bound {
                version: Version::parse(v).map_err(|_| invalid())?,
                inclusive: upper_inclusive,
            }),
        };

        if let (Some(l), Some(u)) = (&lower, &upper) {
            match l.version.cmp(&u.version) {
                Ordering::Greater => return Err(invalid()),
                Ordering::Equal if !(l.inclusive && u.inclusive) => return Err(invalid()),
                _ => {}
            }
        }

        Ok(Self { lower, upper })
    }

    /// Range matching exactly one version
    pub fn exact(version: Version) -> Self {
        Self {
            lower: Some(Bound {
                version: version.clone(),
                inclusive: true,
            }),
            upper: Some(Bound {
                version,
                inclusive: true,
            }),
        }
    }

    pub fn lower_bound(&self) -> Option<&Bound> {
        self.lower.as_ref()
    }

    pub fn upper_bound(&self) -> Option<&Bound> {
        self.upper.as_ref()
    }

    pub fn contains(&self, version: &Version) -> bool {
        if let Some(lower) = &self.lower {
            match version.cmp(&lower.version) {
                Ordering::Less => return false,
                Ordering::Equal if !lower.inclusive => return false,
                _ => {}
            }
        }
        if let Some(upper) = &self.upper {
            match version.cmp(&upper.version) {
                Ordering::Greater => return false,
                Ordering::Equal if !upper.inclusive => return false,
                _ => {}
            }
        }
        true
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(l), Some(u)) = (&self.lower, &self.upper) {
            if l.inclusive && u.inclusive && l.version == u.version {
                return write!(f, "[{}]", l.version);
            }
        }

        let open = match &self.lower {
            Some(b) if b.inclusive => '[',
            _ => '(',
        };
        let close = match &self.upper {
            Some(b) if b.inclusive => ']',
            _ => ')',
        };
        let lower = self.lower.as_ref().map(|b| b.version.as_str()).unwrap_or("");
        let upper = self.upper.as_ref().map(|b| b.version.as_str()).unwrap_or("");
        write!(f, "{}{},{}{}", open, lower, upper, close)
    }
}

/// Either a preferred ("soft") version or a union of ("hard") ranges
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionConstraint {
    version: Option<Version>,
    ranges: Vec<VersionRange>,
}

impl VersionConstraint {
    /// Parse `1.0`, `[1.0,2.0)` or a union such as `[1.0,2.0),[3.0,)`
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let s = input.trim();
        if !(s.starts_with('[') || s.starts_with('(')) {
            return Ok(Self::from_version(Version::parse(s)?));
        }

        let invalid = || CoreError::InvalidVersionRange(input.to_string());
        let mut ranges = Vec::new();
        let mut rest = s;

        while !rest.is_empty() {
            let end = rest.find([']', ')']).ok_or_else(invalid)?;
            ranges.push(VersionRange::parse(&rest[..=end])?);

            rest = rest[end + 1..].trim_start();
            if let Some(next) = rest.strip_prefix(',') {
                rest = next.trim_start();
                if rest.is_empty() {
                    return Err(invalid());
                }
            } else if !rest.is_empty() {
                return Err(invalid());
            }
        }

        Ok(Self {
            version: None,
            ranges,
        })
    }

    pub fn from_version(version: Version) -> Self {
        Self {
            version: Some(version),
            ranges: Vec::new(),
        }
    }

    pub fn from_range(range: VersionRange) -> Self {
        Self {
            version: None,
            ranges: vec![range],
        }
    }

    /// The preferred version of a soft constraint
    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    pub fn ranges(&self) -> &[VersionRange] {
        &self.ranges
    }

    /// Whether this constraint is made of ranges rather than a single version
    pub fn is_range(&self) -> bool {
        !self.ranges.is_empty()
    }

    pub fn contains_version(&self, version: &Version) -> bool {
        if self.ranges.is_empty() {
            return self.version.as_ref() == Some(version);
        }
        self.ranges.iter().any(|range| range.contains(version))
    }
}

impl FromStr for VersionConstraint {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ranges.is_empty() {
            return match &self.version {
                Some(version) => write!(f, "{}", version),
                None => Ok(()),
            };
        }
        let parts: Vec<String> = self.ranges.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}
