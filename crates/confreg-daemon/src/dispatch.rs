//! Event dispatcher and autosave task.
//!
//! The core [`LifecycleBinding`] is not thread-safe and all of its I/O is
//! blocking.  This module adapts it to the async daemon:
//!
//! - The binding lives behind `Arc<std::sync::Mutex<...>>` ([`SharedBinding`]).
//! - Every operation runs inside `tokio::task::spawn_blocking`, holding the
//!   mutex for the duration of the file I/O, so a slow disk never stalls the
//!   async worker threads.
//! - A single dispatcher task consumes [`SessionEvent`]s one at a time, so
//!   join/leave for the same session are applied in arrival order.
//! - The autosave task takes the same mutex for `save_all`, so it never
//!   interleaves with a half-finished join or leave.
//!
//! ```text
//! stdin thread ──mpsc──► run_dispatcher ──spawn_blocking──► Mutex<LifecycleBinding>
//!                                                                   ▲
//! autosave ticker ───────────────────spawn_blocking─────────────────┘
//! ```

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use confreg_core::{Activation, Deactivation, LifecycleBinding, StoreError};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::events::SessionEvent;

/// The lifecycle binding shared between the dispatcher and autosave tasks.
pub type SharedBinding = Arc<Mutex<LifecycleBinding<Uuid>>>;

/// Wraps `binding` for sharing across tasks.
pub fn shared(binding: LifecycleBinding<Uuid>) -> SharedBinding {
    Arc::new(Mutex::new(binding))
}

/// Error type for dispatcher operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A previous holder of the binding mutex panicked.
    #[error("session binding mutex poisoned")]
    Poisoned,

    /// The blocking task running the operation panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Saving a store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What handling one event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Activated(Activation),
    Deactivated(Deactivation),
    SavedAll,
}

/// Running totals kept by [`run_dispatcher`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub activated: u64,
    pub already_active: u64,
    pub activation_failures: u64,
    pub deactivated: u64,
    pub save_failures: u64,
    pub not_active: u64,
    pub save_all_runs: u64,
    pub errors: u64,
}

impl DispatchStats {
    fn record(&mut self, outcome: EventOutcome) {
        match outcome {
            EventOutcome::Activated(Activation::Registered) => self.activated += 1,
            EventOutcome::Activated(Activation::AlreadyActive) => self.already_active += 1,
            EventOutcome::Activated(Activation::Failed) => self.activation_failures += 1,
            EventOutcome::Deactivated(Deactivation::Saved) => self.deactivated += 1,
            EventOutcome::Deactivated(Deactivation::SaveFailed) => {
                self.deactivated += 1;
                self.save_failures += 1;
            }
            EventOutcome::Deactivated(Deactivation::NotActive) => self.not_active += 1,
            EventOutcome::SavedAll => self.save_all_runs += 1,
        }
    }
}

/// Runs `f` against the locked binding on the blocking thread pool.
async fn with_binding<T, F>(binding: &SharedBinding, f: F) -> Result<T, DispatchError>
where
    F: FnOnce(&mut LifecycleBinding<Uuid>) -> T + Send + 'static,
    T: Send + 'static,
{
    let binding = Arc::clone(binding);
    tokio::task::spawn_blocking(move || -> Result<T, DispatchError> {
        let mut guard = binding.lock().map_err(|_| DispatchError::Poisoned)?;
        Ok(f(&mut *guard))
    })
    .await?
}

/// Applies one session event to the binding.
///
/// # Errors
///
/// [`DispatchError`] if the mutex is poisoned, the blocking task fails, or a
/// `SaveAll` hits a store that cannot be saved.  Join/leave failures are not
/// errors here; they are reported by the binding and show up in the outcome.
pub async fn handle_event(
    binding: &SharedBinding,
    event: SessionEvent,
) -> Result<EventOutcome, DispatchError> {
    match event {
        SessionEvent::Joined(id) => {
            let activation = with_binding(binding, move |b| b.on_activate(id)).await?;
            Ok(EventOutcome::Activated(activation))
        }
        SessionEvent::Left(id) => {
            let deactivation = with_binding(binding, move |b| b.on_deactivate(&id)).await?;
            Ok(EventOutcome::Deactivated(deactivation))
        }
        SessionEvent::SaveAll => {
            save_all(binding).await?;
            Ok(EventOutcome::SavedAll)
        }
    }
}

/// Consumes events until every sender is dropped.  Returns the final totals.
///
/// Errors from individual events are logged and counted; they never stop
/// the loop.
pub async fn run_dispatcher(
    binding: SharedBinding,
    mut events: mpsc::Receiver<SessionEvent>,
) -> DispatchStats {
    let mut stats = DispatchStats::default();
    while let Some(event) = events.recv().await {
        match handle_event(&binding, event).await {
            Ok(outcome) => stats.record(outcome),
            Err(e) => {
                error!(?event, "session event failed: {e}");
                stats.errors += 1;
            }
        }
    }
    info!(?stats, "session event stream ended");
    stats
}

/// Saves every open store.
///
/// # Errors
///
/// The first [`StoreError`] encountered, wrapped in [`DispatchError::Store`].
pub async fn save_all(binding: &SharedBinding) -> Result<(), DispatchError> {
    with_binding(binding, |b| b.registry().save_all()).await??;
    Ok(())
}

/// Saves and closes every open store.  Returns the number of failed saves.
///
/// # Errors
///
/// [`DispatchError::Poisoned`] or [`DispatchError::Join`].
pub async fn shutdown(binding: &SharedBinding) -> Result<usize, DispatchError> {
    with_binding(binding, |b| b.deactivate_all()).await
}

/// Spawns a task that calls [`save_all`] every `interval` while `running` is set.
///
/// The first save happens one full interval after the call.  A failed save is
/// logged and retried on the next tick.
pub fn spawn_autosave(
    binding: SharedBinding,
    interval: Duration,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if !running.load(Ordering::Relaxed) {
                break;
            }
            match save_all(&binding).await {
                Ok(()) => {}
                Err(e) => warn!("autosave failed: {e}"),
            }
        }
        info!("autosave stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use confreg_core::ConfigRegistry;
    use tempfile::TempDir;

    fn binding() -> (TempDir, SharedBinding) {
        let dir = TempDir::new().expect("create temp dir");
        let mut registry = ConfigRegistry::new(dir.path());
        registry.add_default("volume", 100);
        (dir, shared(LifecycleBinding::new(registry)))
    }

    #[test]
    fn test_stats_record_counts_save_failure_as_deactivation() {
        let mut stats = DispatchStats::default();
        stats.record(EventOutcome::Deactivated(Deactivation::SaveFailed));
        assert_eq!(stats.deactivated, 1);
        assert_eq!(stats.save_failures, 1);
    }

    #[tokio::test]
    async fn test_handle_join_then_leave() {
        let (dir, binding) = binding();
        let id = Uuid::new_v4();

        let joined = handle_event(&binding, SessionEvent::Joined(id)).await.unwrap();
        let left = handle_event(&binding, SessionEvent::Left(id)).await.unwrap();

        assert_eq!(joined, EventOutcome::Activated(Activation::Registered));
        assert_eq!(left, EventOutcome::Deactivated(Deactivation::Saved));
        let content = std::fs::read_to_string(dir.path().join(format!("{id}.yml"))).unwrap();
        assert_eq!(content, "volume: 100\n");
    }

    #[tokio::test]
    async fn test_handle_leave_for_unknown_session() {
        let (_dir, binding) = binding();
        let outcome = handle_event(&binding, SessionEvent::Left(Uuid::new_v4()))
            .await
            .unwrap();
        assert_eq!(outcome, EventOutcome::Deactivated(Deactivation::NotActive));
    }

    #[tokio::test]
    async fn test_save_all_keeps_sessions_open() {
        let (dir, binding) = binding();
        let id = Uuid::new_v4();
        handle_event(&binding, SessionEvent::Joined(id)).await.unwrap();

        let outcome = handle_event(&binding, SessionEvent::SaveAll).await.unwrap();

        assert_eq!(outcome, EventOutcome::SavedAll);
        assert!(binding.lock().unwrap().registry().is_registered(&id));
        let content = std::fs::read_to_string(dir.path().join(format!("{id}.yml"))).unwrap();
        assert!(content.contains("volume: 100"));
    }

    #[tokio::test]
    async fn test_poisoned_mutex_is_reported() {
        let (_dir, binding) = binding();
        let poisoner = Arc::clone(&binding);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the binding mutex");
        })
        .join();

        let err = handle_event(&binding, SessionEvent::SaveAll).await.unwrap_err();

        assert!(matches!(err, DispatchError::Poisoned));
    }
}
