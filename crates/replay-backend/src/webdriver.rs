//! Remote WebDriver backends
//!
//! Desktop browsers are driven through a W3C WebDriver server (geckodriver,
//! chromedriver, msedgedriver, safaridriver) reached over HTTP. The generic
//! capability set is translated into each browser's vendor options here, so
//! the launch action never branches on browser identity.
//!
//! # Per-browser adaptation
//!
//! | Browser | Headless | Profile path | Proxy |
//! |---------|----------|--------------|-------|
//! | Firefox | `-headless` | passed whole as `-profile <path>` | `network.proxy.*` preferences; the generic `proxy` capability is removed |
//! | Chrome | `--headless=new` | split into `user-data-dir=<parent>` and `--profile-directory=<leaf>` | generic capability plus `--proxy-bypass-list=<-loopback>` |
//! | Edge | `--headless=new` | ignored | generic capability; `--proxy-bypass-list=<-loopback>` always; `webSocketUrl` enabled |
//! | Safari | ignored | ignored | generic capability |

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use replay_core::Response;

use crate::capabilities::split_host_port;
use crate::client::{AutomationClient, Backend, LaunchOptions, SharedClient};
use crate::error::{ClientError, ClientResult};

/// Browser driven through WebDriver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    Firefox,
    Chrome,
    Edge,
    Safari,
}

impl BrowserKind {
    /// Every WebDriver browser
    pub const ALL: [BrowserKind; 4] = [
        BrowserKind::Firefox,
        BrowserKind::Chrome,
        BrowserKind::Edge,
        BrowserKind::Safari,
    ];

    /// Backend type name
    pub fn name(self) -> &'static str {
        match self {
            BrowserKind::Firefox => "Firefox",
            BrowserKind::Chrome => "Chrome",
            BrowserKind::Edge => "Edge",
            BrowserKind::Safari => "Safari",
        }
    }

    /// W3C `browserName`
    pub fn browser_name(self) -> &'static str {
        match self {
            BrowserKind::Firefox => "firefox",
            BrowserKind::Chrome => "chrome",
            BrowserKind::Edge => "MicrosoftEdge",
            BrowserKind::Safari => "safari",
        }
    }

    /// Build the `alwaysMatch` capabilities for a new session
    pub fn session_capabilities(self, options: &LaunchOptions) -> ClientResult<Map<String, Value>> {
        let mut caps = options.capabilities.to_w3c();
        caps.insert(
            "browserName".to_string(),
            Value::String(self.browser_name().to_string()),
        );

        match self {
            BrowserKind::Firefox => {
                let mut args = Vec::new();
                if options.headless {
                    args.push("-headless".to_string());
                }
                if let Some(profile) = &options.profile_path {
                    args.push("-profile".to_string());
                    args.push(profile.display().to_string());
                }

                let mut prefs = Map::new();
                if let Some(proxy) = &options.proxy {
                    // geckodriver does not apply the proxy capability reliably; use prefs instead
                    let (host, port) = split_host_port(proxy)?;
                    prefs.insert("network.proxy.type".into(), json!(1));
                    prefs.insert("network.proxy.http".into(), json!(host));
                    prefs.insert("network.proxy.http_port".into(), json!(port));
                    prefs.insert("network.proxy.ssl".into(), json!(host));
                    prefs.insert("network.proxy.ssl_port".into(), json!(port));
                    prefs.insert("network.proxy.share_proxy_settings".into(), json!(true));
                    prefs.insert("network.proxy.no_proxies_on".into(), json!(""));
                    prefs.insert(
                        "network.proxy.allow_hijacking_localhost".into(),
                        json!(true),
                    );
                    caps.remove("proxy");
                }

                caps.insert(
                    "moz:firefoxOptions".to_string(),
                    json!({ "args": args, "prefs": prefs }),
                );
            }
            BrowserKind::Chrome => {
                let mut args = Vec::new();
                if options.headless {
                    args.push("--headless=new".to_string());
                }
                if let Some(profile) = &options.profile_path {
                    let (user_data_dir, profile_dir) = split_profile_path(profile)?;
                    args.push(format!("user-data-dir={}", user_data_dir));
                    args.push(format!("--profile-directory={}", profile_dir));
                }
                if options.proxy.is_some() {
                    args.push("--proxy-bypass-list=<-loopback>".to_string());
                }

                caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
            }
            BrowserKind::Edge => {
                let mut args = Vec::new();
                if options.headless {
                    args.push("--headless=new".to_string());
                }
                args.push("--proxy-bypass-list=<-loopback>".to_string());

                caps.insert("webSocketUrl".to_string(), Value::Bool(true));
                caps.insert("ms:edgeOptions".to_string(), json!({ "args": args }));
            }
            BrowserKind::Safari => {}
        }

        Ok(caps)
    }
}

/// Split a Chromium profile path into user data directory and profile name
fn split_profile_path(path: &Path) -> ClientResult<(String, String)> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| {
            ClientError::InvalidOption(format!(
                "profile path has no parent directory: {}",
                path.display()
            ))
        })?;
    let leaf = path.file_name().ok_or_else(|| {
        ClientError::InvalidOption(format!("profile path has no name: {}", path.display()))
    })?;
    Ok((
        parent.display().to_string(),
        leaf.to_string_lossy().into_owned(),
    ))
}

/// WebDriver server URL per browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverEndpoints {
    pub firefox: String,
    pub chrome: String,
    pub edge: String,
    pub safari: String,
}

impl WebDriverEndpoints {
    /// Endpoint for a browser
    pub fn endpoint(&self, kind: BrowserKind) -> &str {
        match kind {
            BrowserKind::Firefox => &self.firefox,
            BrowserKind::Chrome => &self.chrome,
            BrowserKind::Edge => &self.edge,
            BrowserKind::Safari => &self.safari,
        }
    }
}

impl Default for WebDriverEndpoints {
    fn default() -> Self {
        Self {
            firefox: "http://localhost:4444".to_string(),
            chrome: "http://localhost:9515".to_string(),
            edge: "http://localhost:9516".to_string(),
            safari: "http://localhost:4445".to_string(),
        }
    }
}

/// Backend creating sessions on a WebDriver server
pub struct WebDriverBackend {
    kind: BrowserKind,
    endpoint: String,
    http: reqwest::Client,
}

impl WebDriverBackend {
    /// Create a backend for a browser served at `endpoint`
    pub fn new(kind: BrowserKind, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self {
            kind,
            endpoint,
            http: reqwest::Client::new(),
        }
    }

    /// Browser this backend drives
    pub fn kind(&self) -> BrowserKind {
        self.kind
    }

    /// WebDriver server URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Backend for WebDriverBackend {
    fn name(&self) -> &str {
        self.kind.name()
    }

    async fn launch(&self, options: LaunchOptions) -> ClientResult<SharedClient> {
        let caps = self.kind.session_capabilities(&options)?;
        let payload = json!({ "capabilities": { "alwaysMatch": Value::Object(caps) } });

        info!(
            backend = self.kind.name(),
            endpoint = %self.endpoint,
            headless = options.headless,
            "Creating WebDriver session"
        );

        let response = self
            .http
            .post(format!("{}/session", self.endpoint))
            .json(&payload)
            .send()
            .await?;
        let value = read_reply(response).await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::Launch {
                backend: self.kind.name().to_string(),
                message: "new session reply has no sessionId".to_string(),
            })?
            .to_string();

        debug!(backend = self.kind.name(), %session_id, "WebDriver session created");

        Ok(Arc::new(WebDriverClient {
            kind: self.kind,
            endpoint: self.endpoint.clone(),
            session_id,
            http: self.http.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

/// Unwrap a WebDriver reply, turning error replies into `ClientError::WebDriver`
async fn read_reply(response: reqwest::Response) -> ClientResult<Value> {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    if !status.is_success() {
        let message = body
            .pointer("/value/message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| status.to_string());
        return Err(ClientError::WebDriver {
            status: status.as_u16(),
            message,
        });
    }

    Ok(body.get("value").cloned().unwrap_or(Value::Null))
}

/// A live WebDriver session
#[derive(Debug)]
pub struct WebDriverClient {
    kind: BrowserKind,
    endpoint: String,
    session_id: String,
    http: reqwest::Client,
    closed: AtomicBool,
}

impl WebDriverClient {
    /// Session id assigned by the server
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn session_url(&self) -> String {
        format!("{}/session/{}", self.endpoint, self.session_id)
    }
}

#[async_trait]
impl AutomationClient for WebDriverClient {
    fn backend(&self) -> &str {
        self.kind.name()
    }

    async fn navigate(&self, url: &str) -> ClientResult<Option<Response>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Closed);
        }

        debug!(session_id = %self.session_id, url, "WebDriver navigate");
        let response = self
            .http
            .post(format!("{}/url", self.session_url()))
            .json(&json!({ "url": url }))
            .send()
            .await?;
        read_reply(response).await?;

        // The browser owns the HTTP exchange; nothing is captured here
        Ok(None)
    }

    async fn close(&self) -> ClientResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        debug!(session_id = %self.session_id, "Deleting WebDriver session");
        let response = self.http.delete(self.session_url()).send().await?;
        read_reply(response).await?;
        Ok(())
    }
}
