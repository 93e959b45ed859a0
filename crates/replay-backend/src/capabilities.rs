//! Capability sets
//!
//! A capability set is the generic launch configuration shared by all
//! backends. Each backend translates it into its native option format.

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::error::{CapabilityError, CapabilityResult, ClientError, ClientResult};

const ACCEPT_INSECURE_CERTS: &str = "acceptInsecureCerts";

/// Proxy applied to both plain and secure traffic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    /// Proxy for plain HTTP, `host:port`
    pub http: String,
    /// Proxy for HTTPS, `host:port`
    pub ssl: String,
}

impl ProxySettings {
    /// Use the same `host:port` for plain and secure traffic
    pub fn both(address: impl Into<String>) -> Self {
        let address = address.into();
        Self {
            http: address.clone(),
            ssl: address,
        }
    }

    /// Split the plain proxy address into host and port
    pub fn host_port(&self) -> ClientResult<(String, u16)> {
        split_host_port(&self.http)
    }
}

/// Split a `host:port` address
pub(crate) fn split_host_port(address: &str) -> ClientResult<(String, u16)> {
    let (host, port) = address.rsplit_once(':').ok_or_else(|| {
        ClientError::InvalidOption(format!("proxy address must be host:port: {}", address))
    })?;
    if host.is_empty() {
        return Err(ClientError::InvalidOption(format!(
            "proxy address has no host: {}",
            address
        )));
    }
    let port = port.parse::<u16>().map_err(|_| {
        ClientError::InvalidOption(format!("proxy port is not a number: {}", address))
    })?;
    Ok((host.to_string(), port))
}

/// Capability set handed to a backend
#[derive(Debug, Clone, PartialEq)]
pub struct Capabilities {
    /// Accept self-signed and otherwise invalid certificates
    pub accept_insecure_certs: bool,

    /// Proxy capability
    pub proxy: Option<ProxySettings>,

    /// Free-form capabilities, applied last
    pub entries: BTreeMap<String, Value>,
}

impl Capabilities {
    /// Fresh capability set with insecure certificates accepted
    pub fn new() -> Self {
        Self {
            accept_insecure_certs: true,
            proxy: None,
            entries: BTreeMap::new(),
        }
    }

    /// Set a free-form capability
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Get a free-form capability
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Route plain and secure traffic through `address`
    pub fn set_proxy(&mut self, address: impl Into<String>) {
        self.proxy = Some(ProxySettings::both(address));
    }

    /// Drop the proxy capability
    pub fn clear_proxy(&mut self) {
        self.proxy = None;
    }

    /// Apply a newline-delimited `key=value` override string
    ///
    /// Returns the number of capabilities set. Nothing is applied if any
    /// line is malformed. `acceptInsecureCerts` must be `true` or `false`
    /// and updates the typed field rather than a free-form entry.
    pub fn apply_overrides(&mut self, overrides: &str) -> CapabilityResult<usize> {
        let parsed = parse_overrides(overrides)?;

        let mut accept_insecure_certs = None;
        for (key, value) in &parsed {
            if key == ACCEPT_INSECURE_CERTS {
                let flag = value
                    .parse::<bool>()
                    .map_err(|_| CapabilityError::InvalidSyntax {
                        line: format!("{}={}", key, value),
                    })?;
                accept_insecure_certs = Some(flag);
            }
        }

        let count = parsed.len();
        for (key, value) in parsed {
            if key != ACCEPT_INSECURE_CERTS {
                self.set(key, value);
            }
        }
        if let Some(flag) = accept_insecure_certs {
            self.accept_insecure_certs = flag;
        }
        Ok(count)
    }

    /// W3C WebDriver representation
    ///
    /// Free-form entries are written after the typed fields and win on a
    /// key clash.
    pub fn to_w3c(&self) -> Map<String, Value> {
        let mut caps = Map::new();
        caps.insert(
            ACCEPT_INSECURE_CERTS.to_string(),
            Value::Bool(self.accept_insecure_certs),
        );
        if let Some(proxy) = &self.proxy {
            caps.insert(
                "proxy".to_string(),
                json!({
                    "proxyType": "manual",
                    "httpProxy": proxy.http,
                    "sslProxy": proxy.ssl,
                }),
            );
        }
        for (key, value) in &self.entries {
            caps.insert(key.clone(), value.clone());
        }
        caps
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a capability override string
///
/// Lines are separated by newlines. Blank lines are ignored; every other line
/// must contain exactly one `=`. An empty string yields no entries.
pub fn parse_overrides(overrides: &str) -> CapabilityResult<Vec<(String, String)>> {
    let mut entries = Vec::new();
    for line in overrides.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split('=').collect();
        if parts.len() != 2 {
            return Err(CapabilityError::InvalidSyntax {
                line: line.to_string(),
            });
        }
        entries.push((parts[0].to_string(), parts[1].to_string()));
    }
    Ok(entries)
}
