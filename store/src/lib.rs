//! ratesync Store
//!
//! Durable, device-local storage for the rate table, the user's currency
//! selection and installation metadata.
//!
//! The synchronizer talks to storage only through the [`RateStore`] and
//! [`SettingsStore`] traits. [`SqliteStore`] is the production backend; a
//! [`MemoryStore`] with failure injection is available behind the
//! `test-utils` feature.

pub mod error;
pub mod traits;
pub mod sqlite;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

pub use error::{StoreError, StoreResult};
pub use traits::{RateStore, SettingsStore};
pub use sqlite::SqliteStore;

#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryStore;
