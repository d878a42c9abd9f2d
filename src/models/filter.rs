//! Metadata filter language.
//!
//! A [`MetadataFilter`] is pure data: a boolean expression tree over a
//! record's key/value metadata. [`MetadataFilter::evaluate`] is the single
//! in-memory evaluator and defines the semantics; storage backends that push
//! filters down into their native query language must match it exactly.
//!
//! | Variant | True when |
//! |---------|-----------|
//! | `Equals` | key present and value equal |
//! | `Contains` | key present and value contains the substring (case-sensitive) |
//! | `HasKey` | key present, any value (including `""`) |
//! | `In` | key present and value is a member of the set |
//! | `And` / `Or` / `Not` | boolean composition |
//!
//! A missing key makes every leaf false.
//!
//! # Example
//!
//! ```rust
//! use embedstore::MetadataFilter;
//! use std::collections::BTreeMap;
//!
//! let filter = MetadataFilter::equals("type", "doc").and(MetadataFilter::equals("lang", "en"));
//!
//! let mut metadata = BTreeMap::new();
//! metadata.insert("type".to_string(), "doc".to_string());
//! metadata.insert("lang".to_string(), "en".to_string());
//! assert!(filter.evaluate(&metadata));
//! ```

use super::Metadata;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Boolean predicate over record metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataFilter {
    /// Key present with exactly this value.
    Equals {
        /// Metadata key.
        key: String,
        /// Expected value.
        value: String,
    },
    /// Key present and its value contains `substring`.
    Contains {
        /// Metadata key.
        key: String,
        /// Case-sensitive substring.
        substring: String,
    },
    /// Key present, regardless of value.
    HasKey {
        /// Metadata key.
        key: String,
    },
    /// Key present and its value is one of `values`.
    In {
        /// Metadata key.
        key: String,
        /// Accepted values; an empty set matches nothing.
        values: BTreeSet<String>,
    },
    /// Both sides match.
    And(Box<Self>, Box<Self>),
    /// Either side matches.
    Or(Box<Self>, Box<Self>),
    /// The inner filter does not match.
    Not(Box<Self>),
}

impl MetadataFilter {
    /// Creates an `Equals` filter.
    #[must_use]
    pub fn equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equals {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Creates a `Contains` filter.
    #[must_use]
    pub fn contains(key: impl Into<String>, substring: impl Into<String>) -> Self {
        Self::Contains {
            key: key.into(),
            substring: substring.into(),
        }
    }

    /// Creates a `HasKey` filter.
    #[must_use]
    pub fn has_key(key: impl Into<String>) -> Self {
        Self::HasKey { key: key.into() }
    }

    /// Creates an `In` filter.
    #[must_use]
    pub fn is_in<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::In {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Combines with `other` using logical AND.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// Combines with `other` using logical OR.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Negates the filter.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Evaluates the filter against a metadata map.
    ///
    /// Pure and total: no I/O, no panics, short-circuiting `And`/`Or`.
    #[must_use]
    pub fn evaluate(&self, metadata: &Metadata) -> bool {
        match self {
            Self::Equals { key, value } => metadata.get(key).is_some_and(|v| v == value),
            Self::Contains { key, substring } => metadata
                .get(key)
                .is_some_and(|v| v.contains(substring.as_str())),
            Self::HasKey { key } => metadata.contains_key(key),
            Self::In { key, values } => metadata.get(key).is_some_and(|v| values.contains(v)),
            Self::And(left, right) => left.evaluate(metadata) && right.evaluate(metadata),
            Self::Or(left, right) => left.evaluate(metadata) || right.evaluate(metadata),
            Self::Not(inner) => !inner.evaluate(metadata),
        }
    }

    /// Checks that every key in the tree is non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a leaf with an empty key.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Equals { key, .. }
            | Self::Contains { key, .. }
            | Self::HasKey { key }
            | Self::In { key, .. } => {
                if key.is_empty() {
                    return Err(Error::Validation(format!(
                        "filter key must not be empty in {self}"
                    )));
                }
                Ok(())
            },
            Self::And(left, right) | Self::Or(left, right) => {
                left.validate()?;
                right.validate()
            },
            Self::Not(inner) => inner.validate(),
        }
    }
}

impl std::ops::Not for MetadataFilter {
    type Output = Self;

    fn not(self) -> Self::Output {
        self.negate()
    }
}

impl fmt::Display for MetadataFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals { key, value } => write!(f, "{key:?} = {value:?}"),
            Self::Contains { key, substring } => write!(f, "{key:?} contains {substring:?}"),
            Self::HasKey { key } => write!(f, "has {key:?}"),
            Self::In { key, values } => {
                write!(f, "{key:?} in [")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v:?}")?;
                }
                write!(f, "]")
            },
            Self::And(left, right) => write!(f, "({left} and {right})"),
            Self::Or(left, right) => write!(f, "({left} or {right})"),
            Self::Not(inner) => write!(f, "not {inner}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn meta(pairs: &[(&str, &str)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test_case(MetadataFilter::equals("type", "doc"), true ; "equals match")]
    #[test_case(MetadataFilter::equals("type", "Doc"), false ; "equals is case sensitive")]
    #[test_case(MetadataFilter::contains("title", "Rust"), true ; "contains match")]
    #[test_case(MetadataFilter::contains("title", "rust"), false ; "contains is case sensitive")]
    #[test_case(MetadataFilter::contains("title", ""), true ; "contains empty substring")]
    #[test_case(MetadataFilter::has_key("empty"), true ; "has key with empty value")]
    #[test_case(MetadataFilter::is_in("lang", ["en", "de"]), true ; "in match")]
    #[test_case(MetadataFilter::is_in("lang", ["fr"]), false ; "in miss")]
    #[test_case(MetadataFilter::is_in("lang", Vec::<String>::new()), false ; "in empty set")]
    fn test_leaf_predicates(filter: MetadataFilter, expected: bool) {
        let metadata = meta(&[
            ("type", "doc"),
            ("title", "Learning Rust"),
            ("lang", "en"),
            ("empty", ""),
        ]);
        assert_eq!(filter.evaluate(&metadata), expected);
    }

    #[test_case(MetadataFilter::equals("missing", "") ; "equals")]
    #[test_case(MetadataFilter::contains("missing", "") ; "contains")]
    #[test_case(MetadataFilter::has_key("missing") ; "has key")]
    #[test_case(MetadataFilter::is_in("missing", [""]) ; "in")]
    fn test_missing_key_is_false(filter: MetadataFilter) {
        assert!(!filter.evaluate(&meta(&[("type", "doc")])));
    }

    #[test]
    fn test_composition() {
        let docs = [
            meta(&[("type", "doc"), ("lang", "en")]),
            meta(&[("type", "doc"), ("lang", "es")]),
            meta(&[("type", "code"), ("lang", "en")]),
        ];
        let filter = MetadataFilter::equals("type", "doc").and(MetadataFilter::equals("lang", "en"));
        let matches: Vec<bool> = docs.iter().map(|m| filter.evaluate(m)).collect();
        assert_eq!(matches, vec![true, false, false]);

        let filter = MetadataFilter::equals("type", "code").or(MetadataFilter::equals("lang", "es"));
        let matches: Vec<bool> = docs.iter().map(|m| filter.evaluate(m)).collect();
        assert_eq!(matches, vec![false, true, true]);

        let filter = !MetadataFilter::equals("lang", "en");
        let matches: Vec<bool> = docs.iter().map(|m| filter.evaluate(m)).collect();
        assert_eq!(matches, vec![false, true, false]);
    }

    #[test]
    fn test_not_of_missing_key_is_true() {
        let filter = MetadataFilter::equals("archived", "true").negate();
        assert!(filter.evaluate(&Metadata::new()));
    }

    #[test]
    fn test_validate() {
        assert!(MetadataFilter::equals("k", "").validate().is_ok());
        let nested = MetadataFilter::has_key("a").and(MetadataFilter::has_key("").negate());
        assert!(matches!(nested.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_json_roundtrip_shape() {
        let filter = MetadataFilter::equals("type", "doc")
            .and(MetadataFilter::is_in("lang", ["en", "es"]).negate());
        let json = serde_json::to_string(&filter).unwrap();
        assert!(json.contains("\"and\""));
        assert!(json.contains("\"equals\""));
        let parsed: MetadataFilter = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, filter);

        let parsed: MetadataFilter =
            serde_json::from_str(r#"{"has_key":{"key":"archived"}}"#).unwrap();
        assert_eq!(parsed, MetadataFilter::has_key("archived"));
    }

    #[test]
    fn test_display() {
        let filter = MetadataFilter::equals("a", "1").or(MetadataFilter::is_in("b", ["x", "y"]));
        assert_eq!(filter.to_string(), r#"("a" = "1" or "b" in ["x", "y"])"#);
    }
}
