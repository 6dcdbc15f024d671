use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::IdentifierError;

/// Three-part task name: `Category/Subcategory/Name`.
///
/// Ordering and equality follow the string form, so sorting a set of
/// identifiers gives the same order as sorting their `to_string()` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskIdentifier {
    full: String,
    category_end: usize,
    subcategory_end: usize,
}

impl TaskIdentifier {
    pub fn new(category: &str, subcategory: &str, name: &str) -> Result<Self, IdentifierError> {
        for part in [category, subcategory, name] {
            if part.trim().is_empty() || part.contains('/') {
                return Err(IdentifierError::InvalidPart(format!(
                    "{category}/{subcategory}/{name}"
                )));
            }
        }
        let full = format!("{category}/{subcategory}/{name}");
        Ok(Self {
            category_end: category.len(),
            subcategory_end: category.len() + 1 + subcategory.len(),
            full,
        })
    }

    pub fn category(&self) -> &str {
        &self.full[..self.category_end]
    }

    pub fn subcategory(&self) -> &str {
        &self.full[self.category_end + 1..self.subcategory_end]
    }

    pub fn name(&self) -> &str {
        &self.full[self.subcategory_end + 1..]
    }

    pub fn as_str(&self) -> &str {
        &self.full
    }
}

impl FromStr for TaskIdentifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        match parts.as_slice() {
            [category, subcategory, name] => Self::new(category, subcategory, name),
            _ => Err(IdentifierError::WrongPartCount(s.to_string())),
        }
    }
}

impl fmt::Display for TaskIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl Hash for TaskIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.full.hash(state);
    }
}

// Lets maps keyed by identifier be queried with a plain `&str`.
impl Borrow<str> for TaskIdentifier {
    fn borrow(&self) -> &str {
        &self.full
    }
}

impl PartialOrd for TaskIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TaskIdentifier {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.full.cmp(&other.full)
    }
}

impl Serialize for TaskIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.full)
    }
}

impl<'de> Deserialize<'de> for TaskIdentifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse a static identifier used by built-in tasks.
///
/// Panics on malformed input; only call it with literals.
#[macro_export]
macro_rules! task_id {
    ($s:expr) => {
        <$crate::task::TaskIdentifier as ::std::str::FromStr>::from_str($s)
            .unwrap_or_else(|e| panic!("invalid task identifier literal {}: {}", $s, e))
    };
}
