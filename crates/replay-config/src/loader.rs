//! YAML loader with custom tags
//!
//! - `!include path` - Replace the node with another YAML file, resolved
//!   relative to the including file
//! - `!secret key` - Substitute a value from secrets.yaml
//! - `!env_var NAME [default]` - Substitute an environment variable, falling
//!   back to the default when one is given

use serde_yaml::value::TaggedValue;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::error::{ConfigError, ConfigResult};
use crate::secrets::Secrets;

/// YAML loader for one config directory
pub struct YamlLoader {
    config_dir: PathBuf,
    secrets: Secrets,
    /// Files currently being loaded, outermost first
    include_stack: Vec<PathBuf>,
}

impl YamlLoader {
    /// Loader reading secrets.yaml from `config_dir`
    pub fn new(config_dir: impl Into<PathBuf>) -> ConfigResult<Self> {
        let config_dir = config_dir.into();
        let secrets = Secrets::load(&config_dir)?;
        Ok(Self::with_secrets(config_dir, secrets))
    }

    pub fn with_secrets(config_dir: impl Into<PathBuf>, secrets: Secrets) -> Self {
        Self {
            config_dir: config_dir.into(),
            secrets,
            include_stack: Vec::new(),
        }
    }

    /// Load a file, relative paths resolving against the config directory
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> ConfigResult<Value> {
        let path = self.config_dir.join(path.as_ref());
        self.load_path(path)
    }

    /// Parse YAML text; includes resolve against the directory of `source`
    pub fn load_str(&mut self, content: &str, source: &Path) -> ConfigResult<Value> {
        let value: Value = serde_yaml::from_str(content).map_err(|e| ConfigError::ParseYaml {
            path: source.to_path_buf(),
            source: e,
        })?;
        self.resolve(value, source)
    }

    pub fn secrets(&self) -> &Secrets {
        &self.secrets
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    fn load_path(&mut self, path: PathBuf) -> ConfigResult<Value> {
        let key = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if self.include_stack.contains(&key) {
            return Err(ConfigError::CircularInclude { path });
        }

        debug!(path = %path.display(), depth = self.include_stack.len(), "Loading YAML");
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::ReadFile {
            path: path.clone(),
            source,
        })?;

        self.include_stack.push(key);
        let result = self.load_str(&content, &path);
        self.include_stack.pop();
        result
    }

    fn resolve(&mut self, value: Value, source: &Path) -> ConfigResult<Value> {
        match value {
            Value::Tagged(tagged) => self.resolve_tag(*tagged, source),
            Value::Mapping(map) => {
                let mut resolved = Mapping::with_capacity(map.len());
                for (key, value) in map {
                    resolved.insert(key, self.resolve(value, source)?);
                }
                Ok(Value::Mapping(resolved))
            }
            Value::Sequence(items) => items
                .into_iter()
                .map(|item| self.resolve(item, source))
                .collect::<ConfigResult<Vec<_>>>()
                .map(Value::Sequence),
            other => Ok(other),
        }
    }

    fn resolve_tag(&mut self, tagged: TaggedValue, source: &Path) -> ConfigResult<Value> {
        let tag = tagged.tag.to_string();
        trace!(tag = %tag, "Resolving tag");

        match tag.as_str() {
            "!include" => {
                let target = tag_argument(&tag, &tagged.value)?;
                if target.is_empty() {
                    return Err(ConfigError::InvalidIncludePath {
                        path: target.to_string(),
                        reason: "path is empty".to_string(),
                    });
                }
                let base = source.parent().unwrap_or(&self.config_dir);
                let path = base.join(target);
                self.load_path(path)
            }
            "!secret" => {
                let key = tag_argument(&tag, &tagged.value)?;
                Ok(Value::String(self.secrets.get(key)?.to_string()))
            }
            "!env_var" => {
                let argument = tag_argument(&tag, &tagged.value)?;
                let (name, default) = match argument.split_once(char::is_whitespace) {
                    Some((name, default)) => (name, Some(default.trim())),
                    None => (argument, None),
                };
                match (std::env::var(name), default) {
                    (Ok(value), _) => Ok(Value::String(value)),
                    (Err(_), Some(default)) => Ok(Value::String(default.to_string())),
                    (Err(_), None) => Err(ConfigError::EnvVarNotFound {
                        var: name.to_string(),
                    }),
                }
            }
            _ => Err(ConfigError::InvalidValue {
                key: tag,
                reason: "unsupported tag".to_string(),
            }),
        }
    }
}

/// The string argument of a tag
fn tag_argument<'v>(tag: &str, value: &'v Value) -> ConfigResult<&'v str> {
    value.as_str().ok_or_else(|| ConfigError::InvalidValue {
        key: tag.to_string(),
        reason: "argument must be a string".to_string(),
    })
}

/// Load a file from a config directory with tag processing
pub fn load_yaml(config_dir: impl Into<PathBuf>, file: impl AsRef<Path>) -> ConfigResult<Value> {
    YamlLoader::new(config_dir)?.load_file(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn get<'v>(value: &'v Value, key: &str) -> &'v Value {
        value.get(key).unwrap()
    }

    #[test]
    fn test_plain_yaml() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "replay.yaml", "proxy: 127.0.0.1:8080\nlist: [a, b]\n");

        let value = load_yaml(dir.path(), "replay.yaml").unwrap();
        assert_eq!(get(&value, "proxy").as_str(), Some("127.0.0.1:8080"));
        assert_eq!(get(&value, "list").as_sequence().unwrap().len(), 2);
    }

    #[test]
    fn test_include_relative_to_including_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "conf/replay.yaml", "variables: !include vars/base.yaml\n");
        write(dir.path(), "conf/vars/base.yaml", "base: http://localhost\n");

        let value = load_yaml(dir.path(), "conf/replay.yaml").unwrap();
        let variables = get(&value, "variables");
        assert_eq!(get(variables, "base").as_str(), Some("http://localhost"));
    }

    #[test]
    fn test_include_inside_sequence() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "replay.yaml", "items:\n  - !include one.yaml\n  - two\n");
        write(dir.path(), "one.yaml", "one\n");

        let value = load_yaml(dir.path(), "replay.yaml").unwrap();
        let items = get(&value, "items").as_sequence().unwrap();
        assert_eq!(items[0].as_str(), Some("one"));
        assert_eq!(items[1].as_str(), Some("two"));
    }

    #[test]
    fn test_secret() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "secrets.yaml", "login_token: s3cr3t\n");
        write(dir.path(), "replay.yaml", "token: !secret login_token\n");

        let value = load_yaml(dir.path(), "replay.yaml").unwrap();
        assert_eq!(get(&value, "token").as_str(), Some("s3cr3t"));
    }

    #[test]
    fn test_missing_secret() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "replay.yaml", "token: !secret nope\n");

        assert!(matches!(
            load_yaml(dir.path(), "replay.yaml"),
            Err(ConfigError::SecretNotFound { .. })
        ));
    }

    #[test]
    fn test_env_var_and_default() {
        let dir = TempDir::new().unwrap();
        std::env::set_var("REPLAY_CONFIG_TEST_PROXY", "10.0.0.1:3128");
        std::env::remove_var("REPLAY_CONFIG_TEST_UNSET");
        write(
            dir.path(),
            "replay.yaml",
            "proxy: !env_var REPLAY_CONFIG_TEST_PROXY\nbase: !env_var REPLAY_CONFIG_TEST_UNSET http://fallback\n",
        );

        let value = load_yaml(dir.path(), "replay.yaml").unwrap();
        assert_eq!(get(&value, "proxy").as_str(), Some("10.0.0.1:3128"));
        assert_eq!(get(&value, "base").as_str(), Some("http://fallback"));

        std::env::remove_var("REPLAY_CONFIG_TEST_PROXY");
    }

    #[test]
    fn test_env_var_missing() {
        let dir = TempDir::new().unwrap();
        std::env::remove_var("REPLAY_CONFIG_TEST_MISSING");
        write(dir.path(), "replay.yaml", "proxy: !env_var REPLAY_CONFIG_TEST_MISSING\n");

        assert!(matches!(
            load_yaml(dir.path(), "replay.yaml"),
            Err(ConfigError::EnvVarNotFound { ref var }) if var == "REPLAY_CONFIG_TEST_MISSING"
        ));
    }

    #[test]
    fn test_circular_include() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.yaml", "b: !include b.yaml\n");
        write(dir.path(), "b.yaml", "a: !include ./a.yaml\n");

        assert!(matches!(
            load_yaml(dir.path(), "a.yaml"),
            Err(ConfigError::CircularInclude { .. })
        ));
    }

    #[test]
    fn test_same_file_included_twice_is_not_circular() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "replay.yaml", "a: !include v.yaml\nb: !include v.yaml\n");
        write(dir.path(), "v.yaml", "1\n");

        assert!(load_yaml(dir.path(), "replay.yaml").is_ok());
    }

    #[test]
    fn test_unsupported_tag() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "replay.yaml", "a: !include_dir_list stuff\n");

        assert!(matches!(
            load_yaml(dir.path(), "replay.yaml"),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "!include_dir_list"
        ));
    }

    #[test]
    fn test_missing_include() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "replay.yaml", "a: !include nowhere.yaml\n");

        assert!(matches!(
            load_yaml(dir.path(), "replay.yaml"),
            Err(ConfigError::ReadFile { .. })
        ));
    }
}
