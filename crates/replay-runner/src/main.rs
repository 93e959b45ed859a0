//! Replay runner
//!
//! Usage: `replay-runner <config-dir> <script.json>`
//!
//! Loads `replay.yaml` from the config directory, runs the script against
//! the built-in backends and exits non-zero if the run failed.

use anyhow::{bail, Context, Result};
use replay_backend::BackendRegistry;
use replay_config::RunConfig;
use replay_script::{Runtime, Script, ScriptExecutor};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const USAGE: &str = "usage: replay-runner <config-dir> <script.json>";

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut args = std::env::args().skip(1);
    let (config_dir, script_path) = match (args.next(), args.next(), args.next()) {
        (Some(config_dir), Some(script), None) => (PathBuf::from(config_dir), PathBuf::from(script)),
        _ => bail!(USAGE),
    };

    let config = RunConfig::load(&config_dir)
        .with_context(|| format!("failed to load configuration from {}", config_dir.display()))?;

    let json = tokio::fs::read_to_string(&script_path)
        .await
        .with_context(|| format!("failed to read {}", script_path.display()))?;
    let script = Script::from_json(&json)
        .with_context(|| format!("failed to parse {}", script_path.display()))?;
    script
        .validate()
        .with_context(|| format!("invalid pattern in {}", script_path.display()))?;

    let registry = Arc::new(BackendRegistry::with_builtins(&config.webdriver));
    info!(backends = ?registry.names(), "Backends registered");

    let runtime = build_runtime(registry, &script, &config);
    let summary = ScriptExecutor::new().run(&script, &runtime).await?;

    info!(
        executed = summary.executed,
        skipped = summary.skipped,
        "Run complete"
    );
    Ok(())
}

/// Runtime for one run; configured variables override script defaults
fn build_runtime(registry: Arc<BackendRegistry>, script: &Script, config: &RunConfig) -> Runtime {
    let mut builder = Runtime::builder(registry)
        .variables(script.variables.clone())
        .variables(config.variables.clone())
        .launch_timeout(config.launch_timeout())
        .navigation_timeout(config.navigation_timeout());

    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(proxy.clone());
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_config_overrides_script_variables() {
        let script = Script::new("t")
            .with_variable("base", "http://script")
            .with_variable("user", "alice");
        let mut config = RunConfig::default();
        config.variables.insert("base".to_string(), "http://config".to_string());
        config.proxy = Some("127.0.0.1:8080".to_string());
        config.navigation_timeout_secs = 0;

        let runtime = build_runtime(Arc::new(BackendRegistry::new()), &script, &config);

        assert_eq!(runtime.variable("base").as_deref(), Some("http://config"));
        assert_eq!(runtime.variable("user").as_deref(), Some("alice"));
        assert_eq!(runtime.proxy().as_deref(), Some("127.0.0.1:8080"));
        assert_eq!(config.launch_timeout(), Some(Duration::from_secs(120)));
    }
}
