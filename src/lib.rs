//! StrayWatch - Offline Report Queue
//!
//! Offline-first reporting for stray-dog volunteers. Reports filed without
//! connectivity are queued on the device and pushed to the backend once
//! the network returns; approved reports are cached locally so the map
//! and lists keep working offline.
//!
//! # Module Structure
//!
//! - **`shared`** - Data model, error enums, configuration types
//! - **`config`** - Client configuration: defaults, TOML file, env overrides
//! - **`local_db`** - Durable key/value storage (SQLite or in-memory) and
//!   the report cache and pending queue built on it
//! - **`offline`** - `OfflineManager`, queue rules, retry policy, photo capture
//! - **`sync`** - Network monitor, cache refresher, queue drain
//! - **`remote`** - Backend and identity seams, plus the REST client
//! - **`telemetry`** - Tracing setup for binaries
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use straywatch::config::Config;
//! use straywatch::local_db::{sync::LocalStore, LocalDatabase};
//! use straywatch::offline::{photo::PassthroughCompressor, OfflineManager};
//! use straywatch::remote::{RestBackend, SessionIdentity};
//! use straywatch::sync::NetworkMonitor;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::new()?;
//! let db = LocalDatabase::open(config.store_path()).await?;
//! let store = Arc::new(LocalStore::new(Arc::new(db)));
//!
//! let manager = Arc::new(OfflineManager::new(
//!     &config,
//!     store,
//!     Arc::new(RestBackend::new(&config)?),
//!     Arc::new(SessionIdentity::new(Some("user-1".to_string()))),
//!     Arc::new(PassthroughCompressor),
//!     Arc::new(NetworkMonitor::new(true)),
//! ));
//! let _listener = manager.start().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! - Storage failures surface as `StoreError`
//! - Network failures never reach callers of `OfflineManager`; they become
//!   queue entry status, skipped refreshes or inline photos

/// Shared types and data structures
pub mod shared;

/// Client configuration
pub mod config;

/// Durable local storage
pub mod local_db;

/// Offline queueing and photo capture
pub mod offline;

/// Connectivity and synchronization
pub mod sync;

/// Backend collaborators
pub mod remote;

/// Tracing setup
pub mod telemetry;
