//! Core types for replay scripts
//!
//! This crate provides the types shared by expressions, transformations and
//! automation backends: the captured [`Response`] that expressions evaluate
//! against, and the [`Location`] selector for its header or body text.

mod response;

pub use response::{Location, Response};
