//! Expression evaluation
//!
//! Evaluation is synchronous and side-effect free. Composites short-circuit
//! left to right, so a child after the deciding one is never evaluated.

use replay_core::{Location, Response};
use tracing::{debug, trace, warn};

use crate::expression::{compile_cached, Expression, Leaf, Predicate};

/// Evaluate an expression against a response
pub fn evaluate(expression: &Expression, response: &Response) -> bool {
    match expression {
        Expression::And { children } => eval_and(children, response),
        Expression::Or { children } => eval_or(children, response),
        Expression::Not { child } => !evaluate(child, response),
        Expression::Leaf(leaf) => eval_leaf(leaf, response),
    }
}

impl Expression {
    /// Evaluate this expression against a response
    pub fn evaluate(&self, response: &Response) -> bool {
        evaluate(self, response)
    }
}

fn eval_and(children: &[Expression], response: &Response) -> bool {
    trace!(count = children.len(), "Evaluating AND expression");
    for child in children {
        if !evaluate(child, response) {
            return false;
        }
    }
    true
}

fn eval_or(children: &[Expression], response: &Response) -> bool {
    trace!(count = children.len(), "Evaluating OR expression");
    for child in children {
        if evaluate(child, response) {
            return true;
        }
    }
    false
}

fn eval_leaf(leaf: &Leaf, response: &Response) -> bool {
    let result = eval_predicate(&leaf.predicate, response);
    trace!(result, inverse = leaf.inverse, "Leaf result");
    result != leaf.inverse
}

fn eval_predicate(predicate: &Predicate, response: &Response) -> bool {
    match predicate {
        Predicate::Constant { value } => *value,
        Predicate::StatusCode { code } => response.status_code == *code,
        Predicate::Length {
            location,
            length,
            approx,
        } => eval_length(response.text(*location), *length, *approx),
        Predicate::Regex {
            location,
            pattern,
            case_exact,
        } => eval_regex(response, *location, pattern, *case_exact),
        Predicate::Url { include, exclude } => eval_url(&response.url, include, exclude),
        Predicate::ResponseTime {
            millis,
            greater_than,
        } => {
            if *greater_than {
                response.response_time_ms > *millis
            } else {
                response.response_time_ms < *millis
            }
        }
        Predicate::Custom(custom) => {
            debug!(predicate = custom.name(), "Evaluating custom predicate");
            custom.is_true(response)
        }
    }
}

fn eval_length(text: &str, length: usize, approx: u32) -> bool {
    let actual = text.len();
    let tolerance = length.saturating_mul(approx as usize) / 100;
    actual.abs_diff(length) <= tolerance
}

fn eval_regex(response: &Response, location: Location, pattern: &str, case_exact: bool) -> bool {
    match compile_cached(pattern, case_exact) {
        Ok(re) => re.is_match(response.text(location)),
        Err(e) => {
            warn!(error = %e, "Invalid regex in expression, treating as no match");
            false
        }
    }
}

fn eval_url(url: &str, include: &[String], exclude: &[String]) -> bool {
    let matches = |pattern: &String| match compile_cached(pattern, true) {
        Ok(re) => re.is_match(url),
        Err(e) => {
            warn!(error = %e, "Invalid URL pattern in expression, treating as no match");
            false
        }
    };

    include.iter().any(matches) && !exclude.iter().any(matches)
}
