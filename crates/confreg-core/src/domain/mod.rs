//! Pure data helpers shared by stores and registries.
//!
//! Nothing in this module touches the file system.  It only manipulates
//! in-memory YAML values, which keeps it trivially unit-testable.

/// Ordered default-value set applied to newly registered stores.
pub mod defaults;

/// Dotted-path addressing (`"audio.volume"`) over nested YAML mappings.
pub mod value_path;
