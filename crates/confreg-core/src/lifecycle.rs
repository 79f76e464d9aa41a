//! `LifecycleBinding`: opens and closes stores as entities come and go.
//!
//! The binding sits between an external event source ("session joined",
//! "session left") and a [`ConfigRegistry`].  Each entity is keyed by a
//! stable identity (typically a UUID) and its file is named after the
//! identity's `Display` form.
//!
//! # Per-identity state machine
//!
//! ```text
//!                on_activate                 on_deactivate
//! Unregistered ─────────────► Registered ─────────────────► Unregistered
//!                                 │                (always, even if the
//!                                 │                 save failed)
//!                                 └─ on_activate again: no-op
//! ```
//!
//! # Error policy
//!
//! Nothing here is fatal.  A store that cannot be opened on activation is
//! reported to the [`FailureReporter`] and the identity is deregistered, so
//! one corrupt file never blocks other entities.  A failed save on
//! deactivation is reported and the entry is removed anyway.
//!
//! # Crash gap
//!
//! Entities still active when the process dies are never deactivated, so
//! their unsaved changes are lost.  Hosts that care should call
//! `registry().save_all()` periodically.

use std::fmt::Display;
use std::hash::Hash;

use tracing::{debug, error, info, warn};

use crate::registry::ConfigRegistry;
use crate::store::StoreError;

/// Receives failures the binding recovers from locally.
#[cfg_attr(test, mockall::automock)]
pub trait FailureReporter {
    /// The store for `identity` could not be opened on activation.
    fn activation_failed(&self, identity: &str, error: &StoreError);

    /// The store for `identity` could not be saved on deactivation.
    fn save_failed(&self, identity: &str, error: &StoreError);
}

/// Reports failures through `tracing` at `error` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl FailureReporter for TracingReporter {
    fn activation_failed(&self, identity: &str, error: &StoreError) {
        error!(identity, "failed to open config on activation: {error}");
    }

    fn save_failed(&self, identity: &str, error: &StoreError) {
        error!(identity, "failed to save config on deactivation: {error}");
    }
}

/// Outcome of [`LifecycleBinding::on_activate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// A store was opened and registered.
    Registered,
    /// The identity already had a store; nothing changed.
    AlreadyActive,
    /// The store could not be opened; the failure was reported.
    Failed,
}

/// Outcome of [`LifecycleBinding::on_deactivate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deactivation {
    /// The store was saved and deregistered.
    Saved,
    /// Saving failed (and was reported); the store was deregistered anyway.
    SaveFailed,
    /// No store was registered for the identity.
    NotActive,
}

/// Registers a store when an entity activates and saves + drops it when the
/// entity deactivates.
#[derive(Debug)]
pub struct LifecycleBinding<K, R = TracingReporter> {
    registry: ConfigRegistry<K>,
    reporter: R,
}

impl<K> LifecycleBinding<K, TracingReporter>
where
    K: Eq + Hash + Clone + Display,
{
    /// Binds `registry`, reporting failures through `tracing`.
    pub fn new(registry: ConfigRegistry<K>) -> Self {
        Self::with_reporter(registry, TracingReporter)
    }
}

impl<K, R> LifecycleBinding<K, R>
where
    K: Eq + Hash + Clone + Display,
    R: FailureReporter,
{
    pub fn with_reporter(registry: ConfigRegistry<K>, reporter: R) -> Self {
        Self { registry, reporter }
    }

    /// Handles an "entity activated" notification.
    ///
    /// Registers a store named after `identity` (no overwrite).  On failure
    /// the error is reported and `identity` is deregistered so the registry
    /// never holds a half-initialised entry.
    pub fn on_activate(&mut self, identity: K) -> Activation {
        let name = identity.to_string();
        match self.registry.register(identity.clone(), &name) {
            Ok(true) => {
                info!(identity = %name, "activated config store");
                Activation::Registered
            }
            Ok(false) => {
                debug!(identity = %name, "activation ignored: already active");
                Activation::AlreadyActive
            }
            Err(e) => {
                self.reporter.activation_failed(&name, &e);
                self.registry.deregister(&identity);
                Activation::Failed
            }
        }
    }

    /// Handles an "entity deactivated" notification.
    ///
    /// Saves the identity's store if one is registered, then deregisters it
    /// whatever the save outcome.  Unknown identities are a no-op.
    pub fn on_deactivate(&mut self, identity: &K) -> Deactivation {
        let Some(store) = self.registry.get(identity) else {
            debug!(identity = %identity, "deactivation ignored: not active");
            return Deactivation::NotActive;
        };

        let outcome = match store.save() {
            Ok(()) => Deactivation::Saved,
            Err(e) => {
                self.reporter.save_failed(&identity.to_string(), &e);
                Deactivation::SaveFailed
            }
        };
        self.registry.deregister(identity);
        info!(identity = %identity, ?outcome, "deactivated config store");
        outcome
    }

    /// Deactivates every registered identity.  Returns the number of failed saves.
    pub fn deactivate_all(&mut self) -> usize {
        let identities: Vec<K> = self.registry.keys().cloned().collect();
        let failures = identities
            .iter()
            .filter(|id| self.on_deactivate(id) == Deactivation::SaveFailed)
            .count();
        if failures > 0 {
            warn!(failures, "some config stores could not be saved on shutdown");
        }
        failures
    }

    pub fn registry(&self) -> &ConfigRegistry<K> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ConfigRegistry<K> {
        &mut self.registry
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn into_registry(self) -> ConfigRegistry<K> {
        self.registry
    }
}
