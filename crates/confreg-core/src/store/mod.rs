//! File-backed configuration stores.
//!
//! - `config_store` – [`ConfigStore`], one YAML file and its in-memory copy.
//! - `file_name`    – Canonical-extension handling and path resolution.
//! - `error`        – [`StoreError`], shared by stores and registries.

pub mod config_store;
pub mod error;
pub mod file_name;

pub use config_store::ConfigStore;
pub use error::StoreError;
pub use file_name::CANONICAL_EXTENSION;
