//! Run configuration
//!
//! Parsed from `replay.yaml` in the config directory:
//!
//! ```yaml
//! proxy: !env_var REPLAY_PROXY 127.0.0.1:8080
//! variables:
//!   base: http://localhost:3000
//!   password: !secret app_password
//! launch_timeout_secs: 120
//! navigation_timeout_secs: 60
//! webdriver:
//!   chrome: http://selenium:4444
//! ```

use replay_backend::WebDriverEndpoints;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::loader::YamlLoader;
use crate::secrets::scalar_to_string;

/// File name looked up in the config directory
pub const RUN_CONFIG_FILE: &str = "replay.yaml";

/// Settings for one script run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Proxy address as `host:port`
    #[serde(default)]
    pub proxy: Option<String>,

    /// Initial variable bindings
    #[serde(default, deserialize_with = "scalar_map")]
    pub variables: BTreeMap<String, String>,

    /// Seconds a backend may take to launch; 0 waits forever
    #[serde(default = "default_launch_timeout")]
    pub launch_timeout_secs: u64,

    /// Seconds a navigation may take; 0 waits forever
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,

    #[serde(default)]
    pub webdriver: WebDriverEndpoints,
}

fn default_launch_timeout() -> u64 {
    120
}

fn default_navigation_timeout() -> u64 {
    60
}

fn scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, value)| match scalar_to_string(&value) {
            Some(text) => Ok((key, text)),
            None => Err(serde::de::Error::custom(format!(
                "variable '{}' must be a scalar",
                key
            ))),
        })
        .collect()
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            variables: BTreeMap::new(),
            launch_timeout_secs: default_launch_timeout(),
            navigation_timeout_secs: default_navigation_timeout(),
            webdriver: WebDriverEndpoints::default(),
        }
    }
}

impl RunConfig {
    /// Load `replay.yaml` from a config directory; a missing file gives the
    /// defaults
    pub fn load(config_dir: impl AsRef<Path>) -> ConfigResult<Self> {
        let config_dir = config_dir.as_ref();
        if !config_dir.join(RUN_CONFIG_FILE).is_file() {
            debug!(dir = %config_dir.display(), "No run configuration, using defaults");
            return Ok(Self::default());
        }

        let yaml = YamlLoader::new(config_dir)?.load_file(RUN_CONFIG_FILE)?;
        Self::from_yaml(yaml)
    }

    /// Build from an already loaded YAML value
    pub fn from_yaml(yaml: Value) -> ConfigResult<Self> {
        if yaml.is_null() {
            return Ok(Self::default());
        }

        let mut config: Self =
            serde_yaml::from_value(yaml).map_err(|e| ConfigError::InvalidValue {
                key: RUN_CONFIG_FILE.to_string(),
                reason: e.to_string(),
            })?;

        if config.proxy.as_deref().is_some_and(str::is_empty) {
            config.proxy = None;
        }
        config.validate()?;
        Ok(config)
    }

    /// Check the proxy address and variable names
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(proxy) = &self.proxy {
            validate_proxy(proxy)?;
        }

        for name in self.variables.keys() {
            if name.is_empty() || name.contains("{{") || name.contains("}}") {
                return Err(ConfigError::InvalidValue {
                    key: format!("variables.{}", name),
                    reason: "variable names must be non-empty and free of braces".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn launch_timeout(&self) -> Option<Duration> {
        (self.launch_timeout_secs > 0).then(|| Duration::from_secs(self.launch_timeout_secs))
    }

    pub fn navigation_timeout(&self) -> Option<Duration> {
        (self.navigation_timeout_secs > 0)
            .then(|| Duration::from_secs(self.navigation_timeout_secs))
    }
}

fn validate_proxy(proxy: &str) -> ConfigResult<()> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        key: "proxy".to_string(),
        reason: format!("{}: {}", reason, proxy),
    };

    let (host, port) = proxy
        .rsplit_once(':')
        .ok_or_else(|| invalid("expected host:port"))?;
    if host.is_empty() {
        return Err(invalid("missing host"));
    }
    port.parse::<u16>()
        .map_err(|_| invalid("port must be a number between 0 and 65535"))?;
    Ok(())
}
