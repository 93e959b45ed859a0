//! secrets.yaml lookup
//!
//! Secrets keep credentials such as proxy passwords or login tokens out of
//! the run configuration and scripts. Scalar values are stored as strings.

use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// File name looked up in the config directory
pub const SECRETS_FILE: &str = "secrets.yaml";

/// Secrets loaded from secrets.yaml
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    values: BTreeMap<String, String>,
    path: Option<PathBuf>,
}

impl Secrets {
    /// Load `secrets.yaml` from `config_dir`; a missing file gives no secrets
    pub fn load(config_dir: &Path) -> ConfigResult<Self> {
        let path = config_dir.join(SECRETS_FILE);
        if !path.is_file() {
            debug!(path = %path.display(), "No secrets file");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::ReadFile {
            path: path.clone(),
            source,
        })?;
        let raw: BTreeMap<String, Value> =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::ParseYaml {
                path: path.clone(),
                source,
            })?;

        let mut values = BTreeMap::new();
        for (key, value) in raw {
            let text = scalar_to_string(&value).ok_or_else(|| ConfigError::InvalidValue {
                key: key.clone(),
                reason: "secret must be a scalar".to_string(),
            })?;
            values.insert(key, text);
        }

        debug!(count = values.len(), path = %path.display(), "Loaded secrets");
        Ok(Self {
            values,
            path: Some(path),
        })
    }

    /// Secrets from in-memory pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            path: None,
        }
    }

    pub fn get(&self, key: &str) -> ConfigResult<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::SecretNotFound {
                key: key.to_string(),
            })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// File the secrets came from, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// String form of a YAML scalar; `None` for sequences, mappings and tags
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_scalars() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(SECRETS_FILE),
            "proxy_password: hunter2\nport: 8080\nverbose: true\nempty:\n",
        )
        .unwrap();

        let secrets = Secrets::load(dir.path()).unwrap();
        assert_eq!(secrets.get("proxy_password").unwrap(), "hunter2");
        assert_eq!(secrets.get("port").unwrap(), "8080");
        assert_eq!(secrets.get("verbose").unwrap(), "true");
        assert_eq!(secrets.get("empty").unwrap(), "");
        assert_eq!(secrets.len(), 4);
        assert!(secrets.path().is_some());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let secrets = Secrets::load(dir.path()).unwrap();
        assert!(secrets.is_empty());
        assert!(secrets.path().is_none());
    }

    #[test]
    fn test_nested_value_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(SECRETS_FILE), "nested:\n  a: 1\n").unwrap();

        assert!(matches!(
            Secrets::load(dir.path()),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "nested"
        ));
    }

    #[test]
    fn test_missing_key() {
        let secrets = Secrets::from_pairs([("token", "abc")]);
        assert!(secrets.contains("token"));
        assert!(matches!(
            secrets.get("other"),
            Err(ConfigError::SecretNotFound { .. })
        ));
    }
}
