//! Common test utilities and helpers
//!
//! - In-memory backend with failure switches and call counters
//! - Storage that fails on demand
//! - Store, engine and draft fixtures
//! - Polling helper for background tasks

#![allow(dead_code)]

pub mod fake_backend;
pub mod fixtures;
pub mod flaky_storage;

pub use fake_backend::*;
pub use fixtures::*;
pub use flaky_storage::*;
