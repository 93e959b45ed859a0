//! Expression types
//!
//! An expression is immutable once built. Every node owns its children, so
//! cloning a tree is a structural deep copy with no shared state.

use regex::Regex;
use replay_core::{Location, Response};
use serde::{Deserialize, Serialize};
use dashmap::DashMap;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Expression errors
#[derive(Debug, Error)]
pub enum ExpressionError {
    #[error("invalid regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid expression: {0}")]
    Invalid(String),
}

/// Result type for expression operations
pub type ExpressionResult<T> = Result<T, ExpressionError>;

/// Expression node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expression {
    /// All children must be true (AND)
    And {
        #[serde(default)]
        children: Vec<Expression>,
    },

    /// Any child must be true (OR)
    Or {
        #[serde(default)]
        children: Vec<Expression>,
    },

    /// Child must be false (NOT)
    Not { child: Box<Expression> },

    /// Predicate over the response
    Leaf(Leaf),
}

impl Expression {
    /// Create an AND expression
    pub fn and(children: Vec<Expression>) -> Self {
        Expression::And { children }
    }

    /// Create an OR expression
    pub fn or(children: Vec<Expression>) -> Self {
        Expression::Or { children }
    }

    /// Create a NOT expression
    pub fn not(child: Expression) -> Self {
        Expression::Not {
            child: Box::new(child),
        }
    }

    /// Create a leaf expression
    pub fn leaf(predicate: Predicate) -> Self {
        Expression::Leaf(Leaf::new(predicate))
    }

    /// Leaf that is always `value`
    pub fn constant(value: bool) -> Self {
        Self::leaf(Predicate::Constant { value })
    }

    /// Leaf matching a status code
    pub fn status_code(code: u16) -> Self {
        Self::leaf(Predicate::StatusCode { code })
    }

    /// Leaf matching a regex against the header or body text
    pub fn regex(location: Location, pattern: impl Into<String>) -> Self {
        Self::leaf(Predicate::Regex {
            location,
            pattern: pattern.into(),
            case_exact: false,
        })
    }

    /// Leaf delegating to an embedder-defined predicate
    pub fn custom(predicate: impl ResponsePredicate + 'static) -> Self {
        Self::leaf(Predicate::Custom(CustomPredicate::new(predicate)))
    }

    /// Short name of the node kind, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Expression::And { .. } => "and",
            Expression::Or { .. } => "or",
            Expression::Not { .. } => "not",
            Expression::Leaf(_) => "leaf",
        }
    }

    /// Check that every regex in the tree compiles
    ///
    /// Evaluation treats an invalid pattern as a non-match; this lets a
    /// caller reject such a script before running it.
    pub fn validate(&self) -> ExpressionResult<()> {
        match self {
            Expression::And { children } | Expression::Or { children } => {
                children.iter().try_for_each(Expression::validate)
            }
            Expression::Not { child } => child.validate(),
            Expression::Leaf(leaf) => leaf.predicate.validate(),
        }
    }
}

/// Leaf node: a predicate plus an inversion flag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leaf {
    /// Test applied to the response
    pub predicate: Predicate,

    /// Negate the predicate result
    #[serde(default)]
    pub inverse: bool,
}

impl Leaf {
    /// Create a non-inverted leaf
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            inverse: false,
        }
    }

    /// Return this leaf with the inversion flag set
    pub fn inverted(mut self) -> Self {
        self.inverse = true;
        self
    }
}

impl From<Leaf> for Expression {
    fn from(leaf: Leaf) -> Self {
        Expression::Leaf(leaf)
    }
}

/// Leaf predicate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Always the given value
    Constant { value: bool },

    /// Status code equals `code`
    StatusCode { code: u16 },

    /// Text length is within `approx` percent of `length`
    Length {
        #[serde(default)]
        location: Location,
        length: usize,
        #[serde(default)]
        approx: u32,
    },

    /// Pattern found in the header or body text
    Regex {
        #[serde(default)]
        location: Location,
        pattern: String,
        #[serde(default)]
        case_exact: bool,
    },

    /// URL matches an include pattern and no exclude pattern
    Url {
        #[serde(default)]
        include: Vec<String>,
        #[serde(default)]
        exclude: Vec<String>,
    },

    /// Response time strictly above (or below) `millis`
    ResponseTime {
        millis: u64,
        #[serde(default = "default_greater_than")]
        greater_than: bool,
    },

    /// Embedder-defined predicate
    #[serde(skip)]
    Custom(CustomPredicate),
}

fn default_greater_than() -> bool {
    true
}

impl Predicate {
    fn validate(&self) -> ExpressionResult<()> {
        match self {
            Predicate::Regex {
                pattern,
                case_exact,
                ..
            } => compile_cached(pattern, *case_exact).map(|_| ()),
            Predicate::Url { include, exclude } => include
                .iter()
                .chain(exclude)
                .try_for_each(|pattern| compile_cached(pattern, true).map(|_| ())),
            _ => Ok(()),
        }
    }
}

/// Compile a pattern, case-insensitive unless `case_exact`
pub fn compile(pattern: &str, case_exact: bool) -> ExpressionResult<Regex> {
    regex::RegexBuilder::new(pattern)
        .case_insensitive(!case_exact)
        .build()
        .map_err(|source| ExpressionError::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        })
}

/// Compiled patterns shared by every expression, keyed by pattern and case mode
static PATTERNS: OnceLock<DashMap<(String, bool), Regex>> = OnceLock::new();

/// Compile a pattern once per process
///
/// Invalid patterns are not cached, so every attempt reports the error.
pub(crate) fn compile_cached(pattern: &str, case_exact: bool) -> ExpressionResult<Regex> {
    let patterns = PATTERNS.get_or_init(DashMap::new);
    let key = (pattern.to_string(), case_exact);
    if let Some(regex) = patterns.get(&key) {
        return Ok(regex.clone());
    }

    let regex = compile(pattern, case_exact)?;
    patterns.insert(key, regex.clone());
    Ok(regex)
}

/// Domain-specific test over a response
///
/// Implementations must be pure: evaluating the same response twice gives
/// the same answer and has no side effects on the script run.
pub trait ResponsePredicate: fmt::Debug + Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Decide the predicate for a response
    fn is_true(&self, response: &Response) -> bool;

    /// Independent copy of this predicate, used when an expression is cloned
    fn box_clone(&self) -> Box<dyn ResponsePredicate>;
}

/// Owned handle to an embedder-defined predicate
#[derive(Debug)]
pub struct CustomPredicate(Box<dyn ResponsePredicate>);

impl CustomPredicate {
    /// Wrap a predicate
    pub fn new(predicate: impl ResponsePredicate + 'static) -> Self {
        Self(Box::new(predicate))
    }

    /// Name of the wrapped predicate
    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// Decide the wrapped predicate for a response
    pub fn is_true(&self, response: &Response) -> bool {
        self.0.is_true(response)
    }
}

impl Clone for CustomPredicate {
    fn clone(&self) -> Self {
        Self(self.0.box_clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers() {
        let and = Expression::and(vec![Expression::constant(true), Expression::status_code(200)]);
        assert!(matches!(and, Expression::And { ref children } if children.len() == 2));

        let or = Expression::or(vec![]);
        assert_eq!(or.kind(), "or");

        let not = Expression::not(Expression::constant(false));
        assert!(matches!(not, Expression::Not { .. }));
    }

    #[test]
    fn test_leaf_inverted() {
        let leaf = Leaf::new(Predicate::StatusCode { code: 500 }).inverted();
        assert!(leaf.inverse);
        let expr: Expression = leaf.into();
        assert_eq!(expr.kind(), "leaf");
    }

    #[test]
    fn test_validate_accepts_valid_patterns() {
        let expr = Expression::and(vec![
            Expression::regex(Location::Body, "Welcome, .*"),
            Expression::leaf(Predicate::Url {
                include: vec!["https?://example\\.com/.*".to_string()],
                exclude: vec!["logout".to_string()],
            }),
        ]);
        assert!(expr.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_nested_invalid_regex() {
        let expr = Expression::or(vec![
            Expression::constant(false),
            Expression::not(Expression::regex(Location::Head, "([unclosed")),
        ]);
        let err = expr.validate().unwrap_err();
        assert!(matches!(err, ExpressionError::InvalidRegex { ref pattern, .. } if pattern == "([unclosed"));
    }

    #[test]
    fn test_compile_case_sensitivity() {
        assert!(compile("hello", false).unwrap().is_match("HELLO"));
        assert!(!compile("hello", true).unwrap().is_match("HELLO"));
    }

    #[test]
    fn test_validate_fills_pattern_cache() {
        let expr = Expression::and(vec![
            Expression::regex(Location::Head, "x-cache-[a-z]+"),
            Expression::leaf(Predicate::Url {
                include: vec!["^https://cache\\.test/".to_string()],
                exclude: vec![],
            }),
        ]);
        expr.validate().unwrap();

        let patterns = PATTERNS.get().unwrap();
        assert!(patterns.contains_key(&("x-cache-[a-z]+".to_string(), false)));
        assert!(patterns.contains_key(&("^https://cache\\.test/".to_string(), true)));
    }

    #[test]
    fn test_cache_keeps_case_modes_apart() {
        let loose = compile_cached("cache-mode", false).unwrap();
        let exact = compile_cached("cache-mode", true).unwrap();
        assert!(loose.is_match("CACHE-MODE"));
        assert!(!exact.is_match("CACHE-MODE"));

        assert!(compile_cached("cache-mode", false).unwrap().is_match("CACHE-MODE"));
    }

    #[test]
    fn test_invalid_pattern_not_cached() {
        assert!(compile_cached("(cache-unclosed", false).is_err());
        assert!(compile_cached("(cache-unclosed", false).is_err());
        assert!(!PATTERNS
            .get_or_init(DashMap::new)
            .contains_key(&("(cache-unclosed".to_string(), false)));
    }
}
