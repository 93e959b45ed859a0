//! Run configuration loading
//!
//! Reads `replay.yaml` from a config directory. The YAML may use these tags:
//!
//! - `!include path` - Include another YAML file
//! - `!secret key` - Substitute from secrets.yaml
//! - `!env_var NAME [default]` - Environment variable substitution
//!
//! # Example
//!
//! ```ignore
//! use replay_config::RunConfig;
//!
//! let config = RunConfig::load("/etc/replay")?;
//! let timeout = config.launch_timeout();
//! ```

mod error;
mod loader;
mod run_config;
mod secrets;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_yaml, YamlLoader};
pub use run_config::{RunConfig, RUN_CONFIG_FILE};
pub use secrets::{Secrets, SECRETS_FILE};

pub use serde_yaml::Value;
