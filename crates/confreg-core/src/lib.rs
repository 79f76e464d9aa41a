//! # confreg-core
//!
//! Keyed registry of human-editable configuration files.  Each managed file
//! is one YAML document on disk, held in memory by a [`ConfigStore`] and
//! addressed through an application-chosen key in a [`ConfigRegistry`].
//!
//! # Architecture overview (for beginners)
//!
//! A long-running service often wants one configuration file *per entity*:
//! one per connected session, one per player, one per tenant.  Writing that
//! by hand means repeating the same path juggling, "create the file if it is
//! missing" checks, and default-value seeding everywhere.  This crate does it
//! once:
//!
//! - **`domain`** – Pure data helpers with no file-system access: dotted
//!   value paths (`"audio.volume"`) over nested YAML mappings, and the
//!   ordered default-value set shared by a registry.
//!
//! - **`store`** – [`ConfigStore`]: one file on disk plus its in-memory
//!   contents.  Knows whether the file was freshly created (first load),
//!   can seed itself from a template on first load, and merges defaults
//!   without overwriting anything the user already set.
//!
//! - **`registry`** – [`ConfigRegistry`]: a `HashMap<K, ConfigStore>` that
//!   guarantees at most one store per key and applies the shared defaults to
//!   every newly registered store.
//!
//! - **`lifecycle`** – [`LifecycleBinding`]: reacts to "entity activated" /
//!   "entity deactivated" notifications by registering a store, or saving
//!   and dropping it.
//!
//! ```text
//! event source ──► LifecycleBinding ──► ConfigRegistry ──► ConfigStore ──► file.yml
//!                   on_activate           register           open / save
//!                   on_deactivate         deregister
//! ```
//!
//! # Threading
//!
//! Nothing in this crate locks internally.  Callers that receive lifecycle
//! notifications on several threads must wrap the binding (or registry) in a
//! mutex; `confreg-daemon` shows one way to do that.

pub mod domain;
pub mod lifecycle;
pub mod registry;
pub mod store;

// Re-export the most-used types at the crate root so callers can write
// `confreg_core::ConfigRegistry` instead of `confreg_core::registry::ConfigRegistry`.
pub use domain::defaults::DefaultSet;
pub use lifecycle::{Activation, Deactivation, FailureReporter, LifecycleBinding, TracingReporter};
pub use registry::ConfigRegistry;
pub use store::{ConfigStore, StoreError, CANONICAL_EXTENSION};

/// Re-exported so callers can build values without naming `serde_yaml` themselves.
pub use serde_yaml::{Mapping, Value};
