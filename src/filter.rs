//! Metadata filter trees
//!
//! A [`Filter`] is a boolean query over payload fields: `must` clauses AND
//! together, `must_not` clauses exclude, `should` clauses express a soft
//! preference. Filters merge structurally by concatenating clause lists, and
//! an empty filter means "no restriction" - it must be passed to the index as
//! absent, never as a match-nothing query.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SearchError};

/// Payload fields whose `should` clauses encode a soft preference guessed by
/// the intent layer. Combined with a `must` list most indexes treat `should`
/// as "at least one must match", which turns the guess into a hard filter and
/// can zero out results, so these clauses are stripped before querying.
const SOFT_PREFERENCE_FIELDS: [&str; 2] = ["content_type", "lang"];

/// A single condition on a named payload field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Clause {
    /// Field equals the given value exactly
    Match { key: String, value: Value },
    /// Field equals any of the given values
    MatchAny { key: String, values: Vec<Value> },
    /// Field contains the given text (substring/phrase match)
    MatchText { key: String, text: String },
    /// Numeric field within the given bounds (inclusive)
    Range {
        key: String,
        gte: Option<f64>,
        lte: Option<f64>,
    },
}

impl Clause {
    pub fn key(&self) -> &str {
        match self {
            Clause::Match { key, .. }
            | Clause::MatchAny { key, .. }
            | Clause::MatchText { key, .. }
            | Clause::Range { key, .. } => key,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.key().is_empty() {
            return Err(SearchError::InvalidFilter(
                "clause with empty field name".to_string(),
            ));
        }
        match self {
            Clause::MatchAny { key, values } if values.is_empty() => Err(
                SearchError::InvalidFilter(format!("match_any on '{}' with no values", key)),
            ),
            Clause::Range {
                key,
                gte: None,
                lte: None,
            } => Err(SearchError::InvalidFilter(format!(
                "range on '{}' with no bounds",
                key
            ))),
            Clause::Range {
                key,
                gte: Some(lo),
                lte: Some(hi),
            } if lo > hi => Err(SearchError::InvalidFilter(format!(
                "range on '{}' with gte {} > lte {}",
                key, lo, hi
            ))),
            _ => Ok(()),
        }
    }
}

/// Boolean filter tree over payload metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Clause>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<Clause>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<Clause>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn must(mut self, clause: Clause) -> Self {
        self.must.push(clause);
        self
    }

    pub fn must_not(mut self, clause: Clause) -> Self {
        self.must_not.push(clause);
        self
    }

    pub fn should(mut self, clause: Clause) -> Self {
        self.should.push(clause);
        self
    }

    /// True when no clause list has any entries
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.must_not.is_empty() && self.should.is_empty()
    }

    /// Structural merge: concatenates the clause lists of both filters
    pub fn merge(mut self, other: Filter) -> Filter {
        self.must.extend(other.must);
        self.must_not.extend(other.must_not);
        self.should.extend(other.should);
        self
    }

    /// Convert to the form handed to the index: `None` for an empty filter,
    /// never a match-nothing query
    pub fn into_query_filter(self) -> Option<Filter> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }

    /// Drop `should` clauses when every one of them targets a soft-preference
    /// field (content type, language). Mixed `should` lists are the caller's
    /// hard intent and pass through untouched.
    pub fn strip_soft_should(mut self) -> Filter {
        if !self.should.is_empty()
            && self
                .should
                .iter()
                .all(|c| SOFT_PREFERENCE_FIELDS.contains(&c.key()))
        {
            self.should.clear();
        }
        self
    }

    /// Reject malformed clauses before they reach the index
    pub fn validate(&self) -> Result<()> {
        for clause in self
            .must
            .iter()
            .chain(self.must_not.iter())
            .chain(self.should.iter())
        {
            clause.validate()?;
        }
        Ok(())
    }
}

/// Merge two optional filters; `None` is the identity element
pub fn merge_filters(a: Option<Filter>, b: Option<Filter>) -> Option<Filter> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.merge(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}
