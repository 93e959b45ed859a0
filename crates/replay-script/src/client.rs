//! Client statements
//!
//! Launching resolves the backend by name, builds the capability set, starts
//! the client, binds it to its window handle and loads the initial URL.
//! Every failure is reported as an [`ActionFailure`] carrying a copy of the
//! statement.

use replay_backend::{Capabilities, LaunchOptions};
use std::path::PathBuf;
use tracing::{debug, info, instrument};

use crate::error::{ActionError, ActionFailure};
use crate::runtime::Runtime;
use crate::statement::{ClientClose, ClientLaunch, ClientNavigate, Statement};

impl ClientLaunch {
    /// Launch the client and return the window handle it was bound to
    pub async fn invoke(&self, runtime: &Runtime) -> Result<String, ActionFailure> {
        self.launch(runtime)
            .await
            .map_err(|cause| ActionFailure::new(Statement::ClientLaunch(self.clone()), cause))
    }

    #[instrument(skip_all, fields(handle = %self.window_handle, backend = %self.backend))]
    async fn launch(&self, runtime: &Runtime) -> Result<String, ActionError> {
        let mut capabilities = Capabilities::new();

        let proxy = runtime.proxy();
        if let Some(proxy) = &proxy {
            capabilities.set_proxy(proxy);
        }
        if let Some(overrides) = &self.capabilities {
            let applied = capabilities.apply_overrides(overrides)?;
            debug!(applied, "Applied capability overrides");
        }

        let backend = runtime.registry().resolve(&self.backend)?;

        let options = LaunchOptions {
            capabilities,
            headless: self.headless,
            profile_path: self
                .profile_path
                .as_deref()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            proxy,
        };

        let client = runtime
            .launch(backend.as_ref(), options)
            .await
            .map_err(|source| ActionError::BackendLaunchFailure {
                backend: self.backend.clone(),
                source,
            })?;
        info!("Launched client");

        if let Some(previous) = runtime.add_client(self.window_handle.clone(), client.clone()) {
            runtime.retire_client(previous);
        }

        if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
            let url = runtime.substitute(url, self.substitution);
            runtime
                .navigate(&client, &url)
                .await
                .map_err(|source| ActionError::NavigationFailure {
                    url: url.clone(),
                    source,
                })?;
        }

        Ok(self.window_handle.clone())
    }
}

impl ClientNavigate {
    /// Load the URL in the bound client
    pub async fn invoke(&self, runtime: &Runtime) -> Result<(), ActionFailure> {
        self.navigate(runtime)
            .await
            .map_err(|cause| ActionFailure::new(Statement::ClientNavigate(self.clone()), cause))
    }

    async fn navigate(&self, runtime: &Runtime) -> Result<(), ActionError> {
        let client = runtime
            .get_client(&self.window_handle)
            .ok_or_else(|| ActionError::UnknownWindow {
                handle: self.window_handle.clone(),
            })?;

        let url = runtime.substitute(&self.url, self.substitution);
        debug!(handle = %self.window_handle, url = %url, "Navigating");
        runtime
            .navigate(&client, &url)
            .await
            .map_err(|source| ActionError::NavigationFailure {
                url: url.clone(),
                source,
            })
    }
}

impl ClientClose {
    /// Close the bound client; an unbound handle is a no-op
    pub async fn invoke(&self, runtime: &Runtime) -> Result<(), ActionFailure> {
        match runtime.close_client(&self.window_handle).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                debug!(handle = %self.window_handle, "No client bound, nothing to close");
                Ok(())
            }
            Err(source) => Err(ActionFailure::new(
                Statement::ClientClose(self.clone()),
                ActionError::CloseFailure {
                    handle: self.window_handle.clone(),
                    source,
                },
            )),
        }
    }
}
