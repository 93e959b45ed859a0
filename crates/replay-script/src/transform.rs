//! Response transformations
//!
//! A transformation rewrites part of the last captured response, e.g. to
//! mask a nonce before comparing against a recorded body.

use replay_core::{Location, Response};
use replay_expression::{compile, ExpressionResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ScriptResult, TransformFailure};
use crate::runtime::Runtime;
use crate::statement::TransformStep;

/// A rewrite of one part of a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transformation {
    /// Replace every regex match; `replacement` may use `$1` style groups
    RegexReplace {
        #[serde(default)]
        location: Location,
        pattern: String,
        #[serde(default)]
        replacement: String,
        #[serde(default)]
        case_exact: bool,
    },

    /// Replace every literal occurrence
    ReplaceString {
        #[serde(default)]
        location: Location,
        find: String,
        #[serde(default)]
        replace: String,
    },
}

impl Transformation {
    pub fn kind(&self) -> &'static str {
        match self {
            Transformation::RegexReplace { .. } => "regex_replace",
            Transformation::ReplaceString { .. } => "replace_string",
        }
    }

    /// Check that the pattern compiles
    pub fn validate(&self) -> ExpressionResult<()> {
        match self {
            Transformation::RegexReplace {
                pattern, case_exact, ..
            } => compile(pattern, *case_exact).map(|_| ()),
            Transformation::ReplaceString { .. } => Ok(()),
        }
    }

    /// Produce the transformed response
    pub fn apply(&self, response: &Response) -> Result<Response, TransformFailure> {
        let mut transformed = response.clone();

        match self {
            Transformation::RegexReplace {
                location,
                pattern,
                replacement,
                case_exact,
            } => {
                let regex = compile(pattern, *case_exact)
                    .map_err(|e| TransformFailure::new(self.clone(), e.to_string()))?;
                let text = transformed.text_mut(*location);
                *text = regex.replace_all(text.as_str(), replacement.as_str()).into_owned();
            }
            Transformation::ReplaceString {
                location,
                find,
                replace,
            } => {
                if find.is_empty() {
                    return Err(TransformFailure::new(self.clone(), "empty search string"));
                }
                let text = transformed.text_mut(*location);
                *text = text.replace(find.as_str(), replace);
            }
        }

        Ok(transformed)
    }
}

impl TransformStep {
    /// Rewrite the runtime's last response
    pub async fn invoke(&self, runtime: &Runtime) -> ScriptResult<()> {
        let response = runtime.last_response().ok_or_else(|| {
            TransformFailure::new(self.transformation.clone(), "no response captured yet")
        })?;

        let transformed = self.transformation.apply(&response)?;
        debug!(kind = self.transformation.kind(), "Transformed last response");
        runtime.set_last_response(transformed);
        Ok(())
    }
}
