//! Script Engine
//!
//! Executes replay scripts: ordered statements that launch automation
//! clients, navigate them, branch on the captured response and rewrite it.
//!
//! # Statements
//!
//! - Client launch, navigate and close
//! - Conditionals over [`Expression`](replay_expression::Expression) trees
//! - Response transformations (regex and literal replacement)
//!
//! # Failures
//!
//! A run stops at the first failure. Statements fail with
//! [`ActionFailure`], transformations with [`TransformFailure`]; both leave
//! through [`ScriptError`].
//!
//! # Key Types
//!
//! - [`Statement`] - A single step in a script
//! - [`Runtime`] - Per-run variables, proxy and client table
//! - [`ScriptExecutor`] - Executes scripts

mod client;
pub mod error;
pub mod executor;
pub mod runtime;
pub mod script;
pub mod statement;
pub mod transform;

pub use error::{ActionError, ActionFailure, ScriptError, ScriptResult, TransformFailure};
pub use executor::{RunSummary, ScriptExecutor};
pub use runtime::{Runtime, RuntimeBuilder, SubstitutionMode};
pub use script::Script;
pub use statement::{ClientClose, ClientLaunch, ClientNavigate, Conditional, Statement, TransformStep};
pub use transform::Transformation;
