//! Offline support for the QC register web app.
//!
//! [`OfflineController`] sits between the app and the network the way a service worker does:
//! it precaches the app's static assets on install, drops caches left by older versions on
//! activate, and answers each intercepted request network-first, cache-first or straight from
//! the network depending on its URL. Cached responses live in a versioned namespace of a
//! [`ResourceCache`].

mod cache;
mod classify;
mod config;
mod controller;
mod memory;
mod network;
mod request;
mod sqlite;

pub use cache::{CacheError, ResourceCache, Result};
pub use classify::{CachePolicy, Classifier};
pub use config::{ConfigError, ControllerConfig, OfflineTemplate};
pub use controller::{ControllerBuildError, InstallError, OfflineController};
pub use memory::MemoryResourceCache;
pub use network::{HttpNetwork, Network};
pub use request::{Request, Response, ResponseKind};
pub use sqlite::SqliteResourceCache;

pub use qcsheet_net::FetchError;
pub use reqwest::Method;
