use crate::error::{LinkedInError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const FSD_PROFILE_PREFIX: [&str; 3] = ["urn", "li", "fsd_profile"];
pub const MEMBER_PREFIX: [&str; 3] = ["urn", "li", "member"];
pub const MSG_CONVERSATION_PREFIX: [&str; 3] = ["urn", "li", "msg_conversation"];

/// A LinkedIn resource identifier.
///
/// The canonical form is `prefix:id`, where the prefix is itself a colon
/// separated namespace (`urn:li:fsd_profile`) and the id is either a bare
/// token or a parenthesised tuple such as
/// `(urn:li:fsd_profile:ACoAAB,2-MTcwMDAwMA==)`.
///
/// The original string is kept verbatim so that `to_string` reproduces the
/// parsed input byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Urn {
    raw: String,
    split: Option<usize>,
}

impl Urn {
    pub fn parse(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(LinkedInError::InvalidUrn(value.to_string()));
        }

        let split = if value.ends_with(')') {
            value.find(":(").or_else(|| value.rfind(':'))
        } else {
            value.rfind(':')
        };

        Ok(Self {
            raw: value.to_string(),
            split,
        })
    }

    /// Build a URN from a prefix made of `parts` and a single id.
    pub fn from_parts(parts: &[&str], id: &str) -> Self {
        let prefix = parts.join(":");
        if prefix.is_empty() {
            return Self {
                raw: id.to_string(),
                split: None,
            };
        }
        Self {
            split: Some(prefix.len()),
            raw: format!("{prefix}:{id}"),
        }
    }

    pub fn fsd_profile(id: &str) -> Self {
        Self::from_parts(&FSD_PROFILE_PREFIX, id)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn prefix(&self) -> &str {
        match self.split {
            Some(idx) => &self.raw[..idx],
            None => "",
        }
    }

    fn raw_id(&self) -> &str {
        match self.split {
            Some(idx) => &self.raw[idx + 1..],
            None => &self.raw,
        }
    }

    pub fn is_tuple(&self) -> bool {
        let id = self.raw_id();
        id.len() >= 2 && id.starts_with('(') && id.ends_with(')')
    }

    /// The single id of this URN.
    ///
    /// Callers use this only on URNs known to carry a bare id; a tuple URN
    /// here is a programming error and is reported as `TupleUrn`.
    pub fn id(&self) -> Result<&str> {
        if self.is_tuple() {
            return Err(LinkedInError::TupleUrn(self.raw.clone()));
        }
        Ok(self.raw_id())
    }

    /// Components of a tuple id, split on top-level commas. A single-id URN
    /// yields one component.
    pub fn id_parts(&self) -> Vec<&str> {
        let id = self.raw_id();
        if !self.is_tuple() {
            return vec![id];
        }

        let inner = &id[1..id.len() - 1];
        let mut parts = Vec::new();
        let mut depth = 0usize;
        let mut start = 0usize;
        for (idx, ch) in inner.char_indices() {
            match ch {
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    parts.push(&inner[start..idx]);
                    start = idx + 1;
                }
                _ => {}
            }
        }
        parts.push(&inner[start..]);
        parts
    }

    /// The `n`th colon separated component of the prefix.
    pub fn prefix_part(&self, n: usize) -> Option<&str> {
        if self.split.is_none() {
            return None;
        }
        self.prefix().split(':').nth(n)
    }

    /// Same id, new prefix.
    pub fn with_prefix(&self, parts: &[&str]) -> Self {
        Self::from_parts(parts, self.raw_id())
    }

    /// All colon separated components of the full string.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.raw.split(':')
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Urn {
    type Err = LinkedInError;

    fn from_str(s: &str) -> Result<Self> {
        Urn::parse(s)
    }
}

impl AsRef<str> for Urn {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl Serialize for Urn {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Urn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Urn::parse(&raw).map_err(serde::de::Error::custom)
    }
}
