//! Backend and client contracts

use async_trait::async_trait;
use replay_core::Response;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::capabilities::Capabilities;
use crate::error::ClientResult;

/// Shared handle to a live client
pub type SharedClient = Arc<dyn AutomationClient>;

/// Everything a backend needs to launch a client
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Generic capability set
    pub capabilities: Capabilities,

    /// Run without a visible window
    pub headless: bool,

    /// Browser profile location; interpretation is backend-specific
    pub profile_path: Option<PathBuf>,

    /// Proxy address (`host:port`), already applied to `capabilities`
    pub proxy: Option<String>,
}

impl LaunchOptions {
    /// Headless launch with the given capabilities
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            headless: true,
            profile_path: None,
            proxy: None,
        }
    }
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self::new(Capabilities::new())
    }
}

/// A pluggable producer of live automation clients
///
/// Launching may start a process or perform a session handshake; callers
/// bound it with a timeout.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Name the backend was registered under
    fn name(&self) -> &str;

    /// Produce a live client or fail
    async fn launch(&self, options: LaunchOptions) -> ClientResult<SharedClient>;
}

/// A live automation client
#[async_trait]
pub trait AutomationClient: Send + Sync + fmt::Debug {
    /// Name of the backend that produced this client
    fn backend(&self) -> &str;

    /// Load `url`
    ///
    /// Clients that observe the HTTP exchange return the captured response.
    async fn navigate(&self, url: &str) -> ClientResult<Option<Response>>;

    /// Release the underlying process or session
    ///
    /// Only the first call releases anything; later calls return `Ok(())`.
    async fn close(&self) -> ClientResult<()>;
}
