//! `ConfigRegistry`: keyed collection of configuration stores.
//!
//! The registry is the service's in-memory index of every open store.  Each
//! entry maps an application key (a session UUID, a user name, ...) to one
//! [`ConfigStore`] living under the registry's base directory.
//!
//! # Guarantees
//!
//! - **At most one store per key.**  `register` on an occupied key is a no-op
//!   returning `false` unless the caller explicitly asks to overwrite.
//! - **Defaults at registration.**  Every store gets the registry's current
//!   [`DefaultSet`] merged in when it is registered.  Defaults added later do
//!   not reach stores that are already registered; use
//!   [`ConfigRegistry::remerge_defaults`] for that.
//! - **No implicit saves.**  Neither `deregister` nor an overwriting
//!   `register` writes the outgoing store to disk.  Save first if the
//!   in-memory state matters.
//!
//! # HashMap choice
//!
//! A `HashMap<K, ConfigStore>` gives O(1) lookup by key.  Iteration order
//! (and therefore `save_all` order) is unspecified.

use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::{debug, info};

use crate::domain::defaults::DefaultSet;
use crate::store::{ConfigStore, StoreError};

/// Keyed collection of [`ConfigStore`]s sharing a base directory and defaults.
///
/// Not internally synchronised: wrap it in a `Mutex` if several threads
/// register or deregister concurrently.
#[derive(Debug)]
pub struct ConfigRegistry<K> {
    base_directory: PathBuf,
    defaults: DefaultSet,
    /// Optional bytes written over each newly created file before defaults merge.
    template: Option<Vec<u8>>,
    entries: HashMap<K, ConfigStore>,
}

impl<K: Eq + Hash> ConfigRegistry<K> {
    /// Creates an empty registry whose stores live under `base_directory`.
    pub fn new(base_directory: impl Into<PathBuf>) -> Self {
        Self {
            base_directory: base_directory.into(),
            defaults: DefaultSet::new(),
            template: None,
            entries: HashMap::new(),
        }
    }

    /// Creates an empty registry rooted at `base_directory/sub_directory`.
    pub fn with_sub_directory(base_directory: impl AsRef<Path>, sub_directory: &str) -> Self {
        Self::new(base_directory.as_ref().join(sub_directory))
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    // ── Registration ─────────────────────────────────────────────────────────

    pub fn is_registered(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Registers a store for `key` without overwriting an existing entry.
    ///
    /// Equivalent to `register_with(key, file_name, false)`.
    ///
    /// # Errors
    ///
    /// See [`ConfigRegistry::register_with`].
    pub fn register(&mut self, key: K, file_name: &str) -> Result<bool, StoreError> {
        self.register_with(key, file_name, false)
    }

    /// Opens `base_directory/file_name.yml` and registers it under `key`.
    ///
    /// Returns `Ok(false)` without touching anything when `key` is already
    /// registered and `overwrite` is `false`.  Otherwise the store is opened,
    /// seeded from the template (first load only), given the current
    /// defaults, inserted, and `Ok(true)` is returned.
    ///
    /// With `overwrite`, a previously registered store is dropped **without
    /// being saved**.
    ///
    /// # Errors
    ///
    /// Propagates I/O and parse errors from opening or seeding the store.
    /// On error the registry is unchanged.
    pub fn register_with(
        &mut self,
        key: K,
        file_name: &str,
        overwrite: bool,
    ) -> Result<bool, StoreError> {
        if self.entries.contains_key(&key) && !overwrite {
            return Ok(false);
        }

        let mut store = ConfigStore::open(&self.base_directory, None, file_name)?;
        if let Some(template) = &self.template {
            store.seed_from_template(template)?;
        }
        let added = store.merge_defaults(&self.defaults);

        debug!(
            path = %store.path().display(),
            first_load = store.was_first_load(),
            defaults_added = added,
            "registered config store"
        );

        if let Some(previous) = self.entries.insert(key, store) {
            debug!(
                path = %previous.path().display(),
                "discarded previously registered store without saving"
            );
        }
        Ok(true)
    }

    /// Removes and returns the store registered under `key`.  Does not save it.
    pub fn deregister(&mut self, key: &K) -> Option<ConfigStore> {
        let removed = self.entries.remove(key);
        if let Some(store) = &removed {
            debug!(path = %store.path().display(), "deregistered config store");
        }
        removed
    }

    pub fn get(&self, key: &K) -> Option<&ConfigStore> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut ConfigStore> {
        self.entries.get_mut(key)
    }

    // ── Persistence ──────────────────────────────────────────────────────────

    /// Saves every registered store, stopping at the first error.
    ///
    /// Stores saved before the failure stay saved; there is no rollback.
    ///
    /// # Errors
    ///
    /// The first [`StoreError`] returned by [`ConfigStore::save`].
    pub fn save_all(&self) -> Result<(), StoreError> {
        for store in self.entries.values() {
            store.save()?;
        }
        info!(count = self.entries.len(), "saved all registered config stores");
        Ok(())
    }

    // ── Defaults and template ────────────────────────────────────────────────

    /// Adds a default applied to stores registered from now on.
    ///
    /// Already registered stores are not affected.
    pub fn add_default(&mut self, path: impl Into<String>, value: impl Into<Value>) {
        self.defaults.insert(path, value);
    }

    pub fn defaults(&self) -> &DefaultSet {
        &self.defaults
    }

    /// Merges the *current* defaults into the store registered under `key`.
    ///
    /// Returns the number of keys added, or `None` if `key` is not registered.
    /// Memory only, like [`ConfigStore::merge_defaults`].
    pub fn remerge_defaults(&mut self, key: &K) -> Option<usize> {
        let store = self.entries.get_mut(key)?;
        Some(store.merge_defaults(&self.defaults))
    }

    /// Sets the template written over each newly created file at registration.
    ///
    /// Files that already existed are never seeded.
    pub fn set_template(&mut self, template: impl Into<Vec<u8>>) {
        self.template = Some(template.into());
    }

    pub fn template(&self) -> Option<&[u8]> {
        self.template.as_deref()
    }

    // ── Introspection ────────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered keys in unspecified order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// `(key, store)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &ConfigStore)> {
        self.entries.iter()
    }
}
