//! Common library for the ASCII converter client
//!
//! This crate provides shared functionality used by the client crates,
//! including the persisted key-value store, error handling, and tracing
//! setup.

pub mod error;
pub mod storage;
pub mod telemetry;

/// Example usage of the storage module
///
/// ```rust,no_run
/// use common::storage::{FileStore, KeyValueStore, StoreConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = StoreConfig::resolve(None)?;
///     let store = FileStore::new(&config);
///     store.set("theme", "dark").await?;
///     println!("Theme: {:?}", store.get("theme").await?);
///     Ok(())
/// }
/// ```
pub fn example_usage() {}
