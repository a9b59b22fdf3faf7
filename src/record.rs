//! Extracted records

use std::fmt;

use serde::{Serialize, Serializer};

/// Marker written in place of any field whose extraction failed
pub const SENTINEL: &str = "skip";

/// A single extracted value, or the sentinel when the lookup missed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Field {
    Value(String),
    #[default]
    Missing,
}

impl Field {
    pub fn is_missing(&self) -> bool {
        matches!(self, Field::Missing)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Field::Value(v) => v,
            Field::Missing => SENTINEL,
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Field::Value(v) => Some(v),
            Field::Missing => None,
        }
    }
}

impl From<Option<String>> for Field {
    fn from(value: Option<String>) -> Self {
        value.map_or(Field::Missing, Field::Value)
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Field::Value(value.to_string())
    }
}

impl PartialEq<&str> for Field {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A fixed-shape row produced by one extraction pass over one card.
pub trait Record: Serialize {
    /// Header row for tabular output
    const HEADERS: &'static [&'static str];

    /// Values in `HEADERS` order
    fn row(&self) -> Vec<String>;

    /// True iff at least one required field is missing
    fn has_error(&self) -> bool;

    /// Promoted cards are deduplicated but never written out
    fn is_promoted(&self) -> bool {
        false
    }
}
