//! Statement types
//!
//! Statements are the steps of a script. Each carries an `enabled` flag;
//! disabled statements are skipped by the executor without side effects.

use replay_expression::{Expression, ExpressionResult};
use serde::{Deserialize, Serialize};

use crate::runtime::SubstitutionMode;
use crate::transform::Transformation;

fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

/// Script statement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Statement {
    /// Start a client and bind it to a window handle
    ClientLaunch(ClientLaunch),

    /// Load a URL in an existing client
    ClientNavigate(ClientNavigate),

    /// Close a client and drop its binding
    ClientClose(ClientClose),

    /// Branch on an expression
    Conditional(Conditional),

    /// Rewrite the last captured response
    Transform(TransformStep),
}

impl Statement {
    /// Whether the statement runs when reached
    pub fn enabled(&self) -> bool {
        match self {
            Statement::ClientLaunch(s) => s.enabled,
            Statement::ClientNavigate(s) => s.enabled,
            Statement::ClientClose(s) => s.enabled,
            Statement::Conditional(s) => s.enabled,
            Statement::Transform(s) => s.enabled,
        }
    }

    /// Statement kind name
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::ClientLaunch(_) => "client_launch",
            Statement::ClientNavigate(_) => "client_navigate",
            Statement::ClientClose(_) => "client_close",
            Statement::Conditional(_) => "conditional",
            Statement::Transform(_) => "transform",
        }
    }

    /// Check every expression and transformation pattern in this statement
    pub fn validate(&self) -> ExpressionResult<()> {
        match self {
            Statement::Conditional(conditional) => {
                conditional.condition.validate()?;
                for statement in conditional.then.iter().chain(&conditional.otherwise) {
                    statement.validate()?;
                }
                Ok(())
            }
            Statement::Transform(step) => step.transformation.validate(),
            _ => Ok(()),
        }
    }
}

impl From<ClientLaunch> for Statement {
    fn from(statement: ClientLaunch) -> Self {
        Statement::ClientLaunch(statement)
    }
}

impl From<ClientNavigate> for Statement {
    fn from(statement: ClientNavigate) -> Self {
        Statement::ClientNavigate(statement)
    }
}

impl From<ClientClose> for Statement {
    fn from(statement: ClientClose) -> Self {
        Statement::ClientClose(statement)
    }
}

impl From<Conditional> for Statement {
    fn from(statement: Conditional) -> Self {
        Statement::Conditional(statement)
    }
}

impl From<TransformStep> for Statement {
    fn from(statement: TransformStep) -> Self {
        Statement::Transform(statement)
    }
}

/// Launch a client
///
/// `capabilities` holds newline-separated `key=value` overrides applied on
/// top of the defaults. An empty `url` or `profile_path` counts as unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientLaunch {
    /// Name the client is bound to in the runtime
    pub window_handle: String,

    /// Backend type name, matched case-insensitively
    #[serde(alias = "browser_type")]
    pub backend: String,

    /// Initial URL, may contain `{{variable}}` placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Capability overrides, one `key=value` per line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<String>,

    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_path: Option<String>,

    /// How variable values are inserted into `url`
    #[serde(default)]
    pub substitution: SubstitutionMode,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub enabled: bool,
}

impl ClientLaunch {
    /// Headless launch with no URL, profile or overrides
    pub fn new(window_handle: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            window_handle: window_handle.into(),
            backend: backend.into(),
            url: None,
            capabilities: None,
            headless: true,
            profile_path: None,
            substitution: SubstitutionMode::default(),
            enabled: true,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_capabilities(mut self, capabilities: impl Into<String>) -> Self {
        self.capabilities = Some(capabilities.into());
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_profile_path(mut self, profile_path: impl Into<String>) -> Self {
        self.profile_path = Some(profile_path.into());
        self
    }

    pub fn with_substitution(mut self, substitution: SubstitutionMode) -> Self {
        self.substitution = substitution;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Navigate an existing client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientNavigate {
    pub window_handle: String,

    /// Target URL, may contain `{{variable}}` placeholders
    pub url: String,

    #[serde(default)]
    pub substitution: SubstitutionMode,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub enabled: bool,
}

impl ClientNavigate {
    pub fn new(window_handle: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            window_handle: window_handle.into(),
            url: url.into(),
            substitution: SubstitutionMode::default(),
            enabled: true,
        }
    }
}

/// Close a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientClose {
    pub window_handle: String,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub enabled: bool,
}

impl ClientClose {
    pub fn new(window_handle: impl Into<String>) -> Self {
        Self {
            window_handle: window_handle.into(),
            enabled: true,
        }
    }
}

/// If/then/else on the last captured response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conditional {
    pub condition: Expression,

    #[serde(default)]
    pub then: Vec<Statement>,

    #[serde(default, rename = "else")]
    pub otherwise: Vec<Statement>,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub enabled: bool,
}

impl Conditional {
    pub fn new(condition: Expression) -> Self {
        Self {
            condition,
            then: Vec::new(),
            otherwise: Vec::new(),
            enabled: true,
        }
    }

    pub fn then(mut self, statement: impl Into<Statement>) -> Self {
        self.then.push(statement.into());
        self
    }

    pub fn otherwise(mut self, statement: impl Into<Statement>) -> Self {
        self.otherwise.push(statement.into());
        self
    }
}

/// Apply a transformation to the last captured response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformStep {
    pub transformation: Transformation,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub enabled: bool,
}

impl TransformStep {
    pub fn new(transformation: Transformation) -> Self {
        Self {
            transformation,
            enabled: true,
        }
    }
}
