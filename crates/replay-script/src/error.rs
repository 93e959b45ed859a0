//! Script failures
//!
//! Two failure kinds leave a script run: [`ActionFailure`] from statements
//! and [`TransformFailure`] from response transformations. Both carry a copy
//! of the node that failed. Backend errors never escape on their own; they
//! are wrapped as the cause of an action failure.

use replay_backend::{CapabilityError, ClientError, RegistryError};
use thiserror::Error;

use crate::statement::Statement;
use crate::transform::Transformation;

/// Result type for script execution
pub type ScriptResult<T> = Result<T, ScriptError>;

/// Cause of an action failure
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("invalid capability, expected key=value: {line}")]
    InvalidCapabilitySyntax { line: String },

    #[error("unsupported backend type: {backend}")]
    UnsupportedBackendType { backend: String },

    #[error("failed to launch {backend}: {source}")]
    BackendLaunchFailure {
        backend: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to navigate to {url}: {source}")]
    NavigationFailure {
        url: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to close {handle}: {source}")]
    CloseFailure {
        handle: String,
        #[source]
        source: ClientError,
    },

    #[error("no client registered for window {handle}")]
    UnknownWindow { handle: String },

    #[error("{0}")]
    Message(String),
}

impl From<CapabilityError> for ActionError {
    fn from(err: CapabilityError) -> Self {
        match err {
            CapabilityError::InvalidSyntax { line } => ActionError::InvalidCapabilitySyntax { line },
        }
    }
}

impl From<RegistryError> for ActionError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnsupportedBackendType(backend) => {
                ActionError::UnsupportedBackendType { backend }
            }
        }
    }
}

/// A statement failed
#[derive(Debug, Error)]
#[error("{} failed: {}", .statement.kind(), .cause)]
pub struct ActionFailure {
    /// The statement that failed
    pub statement: Box<Statement>,

    /// What went wrong
    #[source]
    pub cause: ActionError,
}

impl ActionFailure {
    /// Wrap a cause with the statement that raised it
    pub fn new(statement: Statement, cause: ActionError) -> Self {
        Self {
            statement: Box::new(statement),
            cause,
        }
    }

    /// Failure carrying only a message
    pub fn message(statement: Statement, message: impl Into<String>) -> Self {
        Self::new(statement, ActionError::Message(message.into()))
    }
}

/// A transformation failed
#[derive(Debug, Error)]
#[error("{} transformation failed: {message}", .transformation.kind())]
pub struct TransformFailure {
    /// The transformation that failed
    pub transformation: Transformation,

    /// What went wrong
    pub message: String,
}

impl TransformFailure {
    pub fn new(transformation: Transformation, message: impl Into<String>) -> Self {
        Self {
            transformation,
            message: message.into(),
        }
    }
}

/// Failure that aborted a script run
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error(transparent)]
    Action(#[from] ActionFailure),

    #[error(transparent)]
    Transform(#[from] TransformFailure),
}

impl ScriptError {
    /// The action failure, if this is one
    pub fn as_action(&self) -> Option<&ActionFailure> {
        match self {
            ScriptError::Action(failure) => Some(failure),
            ScriptError::Transform(_) => None,
        }
    }

    /// The transform failure, if this is one
    pub fn as_transform(&self) -> Option<&TransformFailure> {
        match self {
            ScriptError::Transform(failure) => Some(failure),
            ScriptError::Action(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::ClientLaunch;
    use replay_core::Location;
    use std::error::Error as _;

    #[test]
    fn test_capability_error_conversion() {
        let err: ActionError = CapabilityError::InvalidSyntax {
            line: "a".to_string(),
        }
        .into();
        assert!(matches!(err, ActionError::InvalidCapabilitySyntax { ref line } if line == "a"));
    }

    #[test]
    fn test_registry_error_conversion() {
        let err: ActionError = RegistryError::UnsupportedBackendType("Lynx".to_string()).into();
        assert_eq!(err.to_string(), "unsupported backend type: Lynx");
    }

    #[test]
    fn test_action_failure_display_and_source() {
        let launch = ClientLaunch::new("win1", "NoSuchBrowser");
        let failure = ActionFailure::new(
            Statement::ClientLaunch(launch),
            ActionError::UnsupportedBackendType {
                backend: "NoSuchBrowser".to_string(),
            },
        );

        assert_eq!(
            failure.to_string(),
            "client_launch failed: unsupported backend type: NoSuchBrowser"
        );
        assert!(failure.source().is_some());
        assert!(matches!(*failure.statement, Statement::ClientLaunch(ref l) if l.window_handle == "win1"));
    }

    #[test]
    fn test_navigation_failure_keeps_cause_chain() {
        let err = ActionError::NavigationFailure {
            url: "http://x/".to_string(),
            source: ClientError::Closed,
        };
        assert_eq!(err.source().map(|s| s.to_string()), Some("client is closed".to_string()));
    }

    #[test]
    fn test_script_error_kinds_stay_distinct() {
        let transform = TransformFailure::new(
            Transformation::ReplaceString {
                location: Location::Body,
                find: String::new(),
                replace: "x".to_string(),
            },
            "empty search string",
        );
        let err: ScriptError = transform.into();

        assert!(err.as_action().is_none());
        assert!(err.as_transform().is_some());
        assert_eq!(
            err.to_string(),
            "replace_string transformation failed: empty search string"
        );
    }
}
