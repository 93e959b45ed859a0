//! Expression Engine
//!
//! Boolean expressions decide conditionals in a replay script. An expression
//! is a closed tree of AND/OR/NOT composites over leaf predicates, evaluated
//! against the most recent captured [`Response`](replay_core::Response).
//!
//! # Semantics
//!
//! - **And** evaluates children left to right and stops at the first false
//!   child. An empty AND is true.
//! - **Or** evaluates children left to right and stops at the first true
//!   child. An empty OR is false.
//! - **Not** negates its child.
//! - **Leaf** applies a [`Predicate`] to the response, optionally inverted.
//!
//! Trees are plain owned values: `Clone` produces a fully independent deep
//! copy, and evaluation only ever borrows.
//!
//! # Key Types
//!
//! - [`Expression`] - A node of the expression tree
//! - [`Predicate`] - A leaf test over a response
//! - [`ResponsePredicate`] - Extension point for embedder-defined leaves

pub mod eval;
pub mod expression;

pub use eval::evaluate;
pub use expression::{
    compile, CustomPredicate, Expression, ExpressionError, ExpressionResult, Leaf, Predicate,
    ResponsePredicate,
};
