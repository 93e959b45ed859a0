//! Per-run execution state
//!
//! A [`Runtime`] belongs to exactly one script run. It holds the variable
//! bindings, the proxy address, the window handle to client table and the
//! last captured response. Clients are shared handles; whichever component
//! closes a client last is the one that tears it down.

use dashmap::DashMap;
use replay_backend::{
    Backend, BackendRegistry, ClientError, ClientResult, LaunchOptions, SharedClient,
};
use replay_core::Response;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// How variable values are inserted by [`Runtime::substitute`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubstitutionMode {
    /// Values are inserted verbatim
    #[default]
    Raw,
    /// Values are percent-encoded before insertion
    UrlEncode,
}

/// Builder for [`Runtime`]
pub struct RuntimeBuilder {
    registry: Arc<BackendRegistry>,
    proxy: Option<String>,
    variables: HashMap<String, String>,
    launch_timeout: Option<Duration>,
    navigation_timeout: Option<Duration>,
}

impl RuntimeBuilder {
    /// Proxy address as `host:port`; empty means none
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        let proxy = proxy.into();
        self.proxy = (!proxy.is_empty()).then_some(proxy);
        self
    }

    pub fn variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn variables<I, K, V>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.variables
            .extend(variables.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Bound on a single backend launch; `None` waits forever
    pub fn launch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.launch_timeout = timeout;
        self
    }

    /// Bound on a single navigation; `None` waits forever
    pub fn navigation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn build(self) -> Runtime {
        Runtime {
            registry: self.registry,
            proxy: RwLock::new(self.proxy),
            variables: self.variables.into_iter().collect(),
            clients: DashMap::new(),
            retired: Mutex::new(Vec::new()),
            last_response: RwLock::new(None),
            launch_timeout: self.launch_timeout,
            navigation_timeout: self.navigation_timeout,
        }
    }
}

/// Execution state of one script run
pub struct Runtime {
    registry: Arc<BackendRegistry>,
    proxy: RwLock<Option<String>>,
    variables: DashMap<String, String>,
    clients: DashMap<String, SharedClient>,
    /// Clients displaced from the table, closed at teardown
    retired: Mutex<Vec<SharedClient>>,
    last_response: RwLock<Option<Response>>,
    launch_timeout: Option<Duration>,
    navigation_timeout: Option<Duration>,
}

impl Runtime {
    /// Runtime with no proxy, no variables and no timeouts
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self::builder(registry).build()
    }

    pub fn builder(registry: Arc<BackendRegistry>) -> RuntimeBuilder {
        RuntimeBuilder {
            registry,
            proxy: None,
            variables: HashMap::new(),
            launch_timeout: None,
            navigation_timeout: None,
        }
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    // --- Proxy ---

    /// Proxy address, if one is configured
    pub fn proxy(&self) -> Option<String> {
        self.proxy
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Set or clear the proxy; empty clears it
    pub fn set_proxy(&self, proxy: Option<String>) {
        let proxy = proxy.filter(|p| !p.is_empty());
        *self.proxy.write().unwrap_or_else(PoisonError::into_inner) = proxy;
    }

    // --- Variables ---

    pub fn set_variable(&self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn variable(&self, name: &str) -> Option<String> {
        self.variables.get(name).map(|v| v.value().clone())
    }

    /// Snapshot of all bindings
    pub fn variables(&self) -> HashMap<String, String> {
        self.variables
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Replace `{{name}}` placeholders with bound values
    ///
    /// Placeholders without a binding are left as written. Inserted values
    /// are not scanned again.
    pub fn substitute(&self, template: &str, mode: SubstitutionMode) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];

            let Some(end) = after.find("}}") else {
                rest = &rest[start..];
                break;
            };

            let name = &after[..end];
            if name.contains("{{") {
                // Unclosed opener; keep it and rescan from the next one
                out.push_str("{{");
                rest = after;
                continue;
            }

            match self.variables.get(name) {
                Some(value) => match mode {
                    SubstitutionMode::Raw => out.push_str(value.value()),
                    SubstitutionMode::UrlEncode => {
                        out.push_str(&urlencoding::encode(value.value()))
                    }
                },
                None => {
                    out.push_str("{{");
                    out.push_str(name);
                    out.push_str("}}");
                }
            }
            rest = &after[end + 2..];
        }

        out.push_str(rest);
        out
    }

    // --- Clients ---

    /// Bind a client to a handle, returning the client it displaced
    pub fn add_client(&self, handle: impl Into<String>, client: SharedClient) -> Option<SharedClient> {
        let handle = handle.into();
        let previous = self.clients.insert(handle.clone(), client);
        if previous.is_some() {
            debug!(handle = %handle, "Replaced client binding");
        }
        previous
    }

    pub fn get_client(&self, handle: &str) -> Option<SharedClient> {
        self.clients.get(handle).map(|c| c.value().clone())
    }

    /// Remove a binding without closing the client
    pub fn remove_client(&self, handle: &str) -> Option<SharedClient> {
        self.clients.remove(handle).map(|(_, client)| client)
    }

    /// Close a client and drop its binding; `false` if nothing was bound
    #[instrument(skip(self))]
    pub async fn close_client(&self, handle: &str) -> ClientResult<bool> {
        match self.remove_client(handle) {
            Some(client) => {
                client.close().await?;
                debug!(handle, "Closed client");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Keep a displaced client so teardown can close it
    pub fn retire_client(&self, client: SharedClient) {
        self.retired
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(client);
    }

    /// Bound handles, sorted
    pub fn client_handles(&self) -> Vec<String> {
        let mut handles: Vec<_> = self.clients.iter().map(|e| e.key().clone()).collect();
        handles.sort();
        handles
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Close every bound and retired client
    ///
    /// Close errors are logged, not returned. Returns how many clients were
    /// closed successfully.
    #[instrument(skip(self))]
    pub async fn teardown(&self) -> usize {
        let mut clients: Vec<(String, SharedClient)> = self
            .retired
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .map(|client| ("<retired>".to_string(), client))
            .collect();

        let handles: Vec<String> = self.clients.iter().map(|e| e.key().clone()).collect();
        for handle in handles {
            if let Some((handle, client)) = self.clients.remove(&handle) {
                clients.push((handle, client));
            }
        }

        let mut closed = 0;
        for (handle, client) in clients {
            match client.close().await {
                Ok(()) => closed += 1,
                Err(e) => warn!(handle = %handle, backend = client.backend(), "Failed to close client: {}", e),
            }
        }

        if closed > 0 {
            info!(closed, "Runtime torn down");
        }
        closed
    }

    // --- Responses ---

    pub fn last_response(&self) -> Option<Response> {
        self.last_response
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_last_response(&self, response: Response) {
        *self
            .last_response
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(response);
    }

    // --- Bounded backend calls ---

    /// Launch a client, bounded by the launch timeout
    pub(crate) async fn launch(
        &self,
        backend: &dyn Backend,
        options: LaunchOptions,
    ) -> ClientResult<SharedClient> {
        bounded(self.launch_timeout, backend.launch(options)).await
    }

    /// Navigate a client, bounded by the navigation timeout, and record the
    /// captured response
    pub(crate) async fn navigate(&self, client: &SharedClient, url: &str) -> ClientResult<()> {
        if let Some(response) = bounded(self.navigation_timeout, client.navigate(url)).await? {
            self.set_last_response(response);
        }
        Ok(())
    }
}

async fn bounded<T, F>(limit: Option<Duration>, future: F) -> ClientResult<T>
where
    F: Future<Output = ClientResult<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| ClientError::Timeout(limit))?,
        None => future.await,
    }
}
