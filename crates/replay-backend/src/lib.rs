//! Automation backends
//!
//! A backend produces live automation clients (browser sessions or
//! in-process HTTP clients) from a capability set plus headless, profile and
//! proxy intent. Scripts select a backend by type name through the
//! [`BackendRegistry`].
//!
//! # Built-in backends
//!
//! | Name | Client |
//! |------|--------|
//! | `Firefox` | Remote WebDriver session (geckodriver) |
//! | `Chrome` | Remote WebDriver session (chromedriver) |
//! | `Edge` | Remote WebDriver session (msedgedriver) |
//! | `Safari` | Remote WebDriver session (safaridriver) |
//! | `Http` | In-process HTTP client, no process launch |
//!
//! Names are matched case-insensitively. Embedders add their own backends
//! with [`BackendRegistry::register`] or [`BackendRegistry::register_fn`].
//!
//! # Key Types
//!
//! - [`Capabilities`] - Capability set handed to a backend
//! - [`Backend`] / [`AutomationClient`] - The contract a backend satisfies
//! - [`BackendRegistry`] - Type name to backend mapping

mod capabilities;
mod client;
mod error;
pub mod http;
mod registry;
pub mod webdriver;

pub use capabilities::{parse_overrides, Capabilities, ProxySettings};
pub use client::{AutomationClient, Backend, LaunchOptions, SharedClient};
pub use error::{
    CapabilityError, CapabilityResult, ClientError, ClientResult, RegistryError, RegistryResult,
};
pub use http::HttpBackend;
pub use registry::{BackendRegistry, LaunchFn, LaunchFuture, SharedBackendRegistry};
pub use webdriver::{BrowserKind, WebDriverBackend, WebDriverEndpoints};
