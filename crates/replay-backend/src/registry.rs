//! Backend registry
//!
//! Maps backend type names to backends. Built-ins are registered at startup;
//! embedders add their own at runtime without recompiling the core. Lookups
//! are case-insensitive and safe to perform concurrently from many runs.

use async_trait::async_trait;
use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::client::{Backend, LaunchOptions, SharedClient};
use crate::error::{ClientResult, RegistryError, RegistryResult};
use crate::http::HttpBackend;
use crate::webdriver::{BrowserKind, WebDriverBackend, WebDriverEndpoints};

/// Future type for closure-based backends
pub type LaunchFuture = Pin<Box<dyn Future<Output = ClientResult<SharedClient>> + Send>>;

/// Launch function type for closure-based backends
pub type LaunchFn = Arc<dyn Fn(LaunchOptions) -> LaunchFuture + Send + Sync>;

/// Backend built from a launch closure
struct FnBackend {
    name: String,
    launch: LaunchFn,
}

#[async_trait]
impl Backend for FnBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn launch(&self, options: LaunchOptions) -> ClientResult<SharedClient> {
        (self.launch)(options).await
    }
}

/// Internal representation of a registered backend
struct RegisteredBackend {
    /// Name as registered, for listing
    name: String,
    backend: Arc<dyn Backend>,
}

/// The backend registry
pub struct BackendRegistry {
    /// Backends keyed by lowercased name
    backends: DashMap<String, RegisteredBackend>,
}

impl BackendRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            backends: DashMap::new(),
        }
    }

    /// Create a registry holding the built-in backends
    pub fn with_builtins(endpoints: &WebDriverEndpoints) -> Self {
        let registry = Self::new();
        for kind in BrowserKind::ALL {
            registry.register(
                kind.name(),
                Arc::new(WebDriverBackend::new(kind, endpoints.endpoint(kind))),
            );
        }
        registry.register(HttpBackend::NAME, Arc::new(HttpBackend::new()));
        registry
    }

    /// Register a backend, replacing any backend with the same name
    #[instrument(skip(self, backend))]
    pub fn register(&self, name: &str, backend: Arc<dyn Backend>) {
        let key = name.to_ascii_lowercase();
        let previous = self.backends.insert(
            key,
            RegisteredBackend {
                name: name.to_string(),
                backend,
            },
        );

        if let Some(previous) = previous {
            warn!(replaced = %previous.name, "Replacing registered backend");
        } else {
            debug!("Registered backend");
        }
    }

    /// Register a backend from a launch closure
    pub fn register_fn<F, Fut>(&self, name: &str, launch: F)
    where
        F: Fn(LaunchOptions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ClientResult<SharedClient>> + Send + 'static,
    {
        let launch: LaunchFn = Arc::new(move |options| Box::pin(launch(options)) as LaunchFuture);
        self.register(
            name,
            Arc::new(FnBackend {
                name: name.to_string(),
                launch,
            }),
        );
    }

    /// Resolve a backend type name
    pub fn resolve(&self, name: &str) -> RegistryResult<Arc<dyn Backend>> {
        self.backends
            .get(&name.to_ascii_lowercase())
            .map(|entry| entry.backend.clone())
            .ok_or_else(|| RegistryError::UnsupportedBackendType(name.to_string()))
    }

    /// Check if a backend is registered
    pub fn contains(&self, name: &str) -> bool {
        self.backends.contains_key(&name.to_ascii_lowercase())
    }

    /// Remove a backend
    #[instrument(skip(self))]
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.backends.remove(&name.to_ascii_lowercase()).is_some();
        if removed {
            debug!("Unregistered backend");
        }
        removed
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.backends.iter().map(|e| e.name.clone()).collect();
        names.sort();
        names
    }

    /// Number of registered backends
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Whether no backends are registered
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared registry used by concurrent runs
pub type SharedBackendRegistry = Arc<BackendRegistry>;
