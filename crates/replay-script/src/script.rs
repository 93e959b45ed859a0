//! Script definition
//!
//! A Script is a titled sequence of statements plus default variable
//! bindings, stored as JSON.

use replay_expression::ExpressionResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::statement::Statement;

/// A loaded script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    /// Human-readable name
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Default variable bindings; run configuration may override them
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, String>,

    /// Top-level statement sequence
    #[serde(default)]
    pub statements: Vec<Statement>,
}

impl Script {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            variables: BTreeMap::new(),
            statements: Vec::new(),
        }
    }

    /// Parse a script from JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn with_statement(mut self, statement: impl Into<Statement>) -> Self {
        self.statements.push(statement.into());
        self
    }

    /// Check every pattern in the script before running it
    pub fn validate(&self) -> ExpressionResult<()> {
        self.statements.iter().try_for_each(Statement::validate)
    }

    /// Number of statements including nested branches
    pub fn statement_count(&self) -> usize {
        fn count(statements: &[Statement]) -> usize {
            statements
                .iter()
                .map(|s| match s {
                    Statement::Conditional(c) => 1 + count(&c.then) + count(&c.otherwise),
                    _ => 1,
                })
                .sum()
        }
        count(&self.statements)
    }
}
