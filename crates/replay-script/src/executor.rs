//! Script executor
//!
//! Runs statements in order against a [`Runtime`]. Disabled statements are
//! skipped. The first failure aborts the run; [`ScriptExecutor::run`] then
//! tears down every client before returning it.

use replay_core::Response;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info, trace, warn};

use crate::error::ScriptResult;
use crate::runtime::Runtime;
use crate::script::Script;
use crate::statement::{Conditional, Statement};

/// Counters for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Statements that ran
    pub executed: usize,
    /// Disabled statements that were skipped
    pub skipped: usize,
    /// Window handle bound by the most recent launch
    pub last_window: Option<String>,
}

/// Script executor
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptExecutor;

impl ScriptExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Run a whole script, then close every client the run opened
    pub async fn run(&self, script: &Script, runtime: &Runtime) -> ScriptResult<RunSummary> {
        info!(title = %script.title, statements = script.statements.len(), "Running script");

        let result = self.execute(&script.statements, runtime).await;
        runtime.teardown().await;

        match &result {
            Ok(summary) => info!(
                title = %script.title,
                executed = summary.executed,
                skipped = summary.skipped,
                "Script finished"
            ),
            Err(e) => warn!(title = %script.title, "Script aborted: {}", e),
        }
        result
    }

    /// Execute statements without tearing down
    pub async fn execute(
        &self,
        statements: &[Statement],
        runtime: &Runtime,
    ) -> ScriptResult<RunSummary> {
        let mut summary = RunSummary::default();
        self.execute_sequence(statements, runtime, &mut summary)
            .await?;
        Ok(summary)
    }

    fn execute_sequence<'a>(
        &'a self,
        statements: &'a [Statement],
        runtime: &'a Runtime,
        summary: &'a mut RunSummary,
    ) -> Pin<Box<dyn Future<Output = ScriptResult<()>> + Send + 'a>> {
        Box::pin(async move {
            debug!("Executing {} statements", statements.len());

            for (i, statement) in statements.iter().enumerate() {
                if !statement.enabled() {
                    trace!(index = i, kind = statement.kind(), "Skipping disabled statement");
                    summary.skipped += 1;
                    continue;
                }

                trace!(index = i, kind = statement.kind(), "Executing statement");
                self.execute_statement(statement, runtime, summary).await?;
            }

            Ok(())
        })
    }

    async fn execute_statement(
        &self,
        statement: &Statement,
        runtime: &Runtime,
        summary: &mut RunSummary,
    ) -> ScriptResult<()> {
        summary.executed += 1;

        match statement {
            Statement::ClientLaunch(launch) => {
                let handle = launch.invoke(runtime).await?;
                summary.last_window = Some(handle);
            }
            Statement::ClientNavigate(navigate) => navigate.invoke(runtime).await?,
            Statement::ClientClose(close) => close.invoke(runtime).await?,
            Statement::Conditional(conditional) => {
                self.execute_conditional(conditional, runtime, summary)
                    .await?
            }
            Statement::Transform(step) => step.invoke(runtime).await?,
        }

        Ok(())
    }

    async fn execute_conditional(
        &self,
        conditional: &Conditional,
        runtime: &Runtime,
        summary: &mut RunSummary,
    ) -> ScriptResult<()> {
        let response = runtime.last_response().unwrap_or_else(Response::default);

        if conditional.condition.evaluate(&response) {
            debug!("Condition matched, executing then");
            self.execute_sequence(&conditional.then, runtime, summary)
                .await
        } else {
            debug!("Condition didn't match, executing else");
            self.execute_sequence(&conditional.otherwise, runtime, summary)
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::{ClientLaunch, TransformStep};
    use crate::transform::Transformation;
    use replay_backend::BackendRegistry;
    use replay_core::Location;
    use replay_expression::Expression;
    use std::sync::Arc;

    fn runtime() -> Runtime {
        Runtime::new(Arc::new(BackendRegistry::new()))
    }

    fn mask(find: &str) -> Statement {
        TransformStep::new(Transformation::ReplaceString {
            location: Location::Body,
            find: find.to_string(),
            replace: "*".to_string(),
        })
        .into()
    }

    #[tokio::test]
    async fn test_empty_sequence() {
        let summary = ScriptExecutor::new().execute(&[], &runtime()).await.unwrap();
        assert_eq!(summary, RunSummary::default());
    }

    #[tokio::test]
    async fn test_disabled_statements_skipped() {
        let statements: Vec<Statement> = vec![
            ClientLaunch::new("win1", "NoSuchBrowser")
                .with_enabled(false)
                .into(),
            {
                let mut step = TransformStep::new(Transformation::ReplaceString {
                    location: Location::Body,
                    find: String::new(),
                    replace: String::new(),
                });
                step.enabled = false;
                step.into()
            },
        ];

        let summary = ScriptExecutor::new()
            .execute(&statements, &runtime())
            .await
            .unwrap();
        assert_eq!(summary.executed, 0);
        assert_eq!(summary.skipped, 2);
    }

    #[tokio::test]
    async fn test_conditional_branches() {
        let rt = runtime();
        rt.set_last_response(Response::new("http://x/", 200).with_body("a b"));

        let statements: Vec<Statement> = vec![Conditional::new(Expression::status_code(200))
            .then(mask("a"))
            .otherwise(mask("b"))
            .into()];

        let summary = ScriptExecutor::new()
            .execute(&statements, &rt)
            .await
            .unwrap();

        assert_eq!(summary.executed, 2);
        assert_eq!(rt.last_response().unwrap().body, "* b");
    }

    #[tokio::test]
    async fn test_conditional_without_response_uses_empty() {
        let rt = runtime();
        let statements: Vec<Statement> = vec![Conditional::new(Expression::status_code(0))
            .then(ClientLaunch::new("w", "Http").with_enabled(false))
            .into()];

        let summary = ScriptExecutor::new()
            .execute(&statements, &rt)
            .await
            .unwrap();
        assert_eq!(summary.executed, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn test_first_failure_aborts() {
        let rt = runtime();
        rt.set_last_response(Response::new("http://x/", 200).with_body("abc"));

        let statements = vec![mask(""), mask("abc")];
        let err = ScriptExecutor::new()
            .execute(&statements, &rt)
            .await
            .unwrap_err();

        assert!(err.as_transform().is_some());
        assert_eq!(rt.last_response().unwrap().body, "abc");
    }
}
