//! confreg daemon entry point.
//!
//! Keeps one YAML config file per active session.  Session lifecycle events
//! arrive on standard input (`join <uuid>`, `leave <uuid>`, `save`); each
//! join opens (or creates and seeds) `<base_dir>/<uuid>.yml`, each leave
//! saves and closes it.
//!
//! # Usage
//!
//! ```text
//! confreg-daemon [OPTIONS]
//!
//! Options:
//!   --settings <PATH>       TOML settings file [default: confreg.toml]
//!   --base-dir <DIR>        Override storage.base_dir
//!   --autosave-secs <SECS>  Override autosave.interval_secs (0 disables)
//!   --init-settings         Write the effective settings to --settings and exit
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                | Description                    |
//! |-------------------------|--------------------------------|
//! | `CONFREG_SETTINGS`      | Settings file path             |
//! | `CONFREG_BASE_DIR`      | Session file directory         |
//! | `CONFREG_AUTOSAVE_SECS` | Autosave interval in seconds   |
//! | `RUST_LOG`              | Log filter (beats `logging.level`) |
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load settings, build ConfigRegistry<Uuid>
//!  └─ start services
//!       ├─ stdin reader thread  (SessionEvent → mpsc)
//!       ├─ autosave task        (save_all every N seconds)
//!       └─ dispatcher           (mpsc → LifecycleBinding)
//!  └─ on EOF or Ctrl-C: stop autosave, save + close every session
//! ```

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use confreg_core::LifecycleBinding;
use confreg_daemon::dispatch::{run_dispatcher, shared, shutdown, spawn_autosave};
use confreg_daemon::events::{spawn_stdin_source, EVENT_CHANNEL_CAPACITY};
use confreg_daemon::settings::{load_settings, save_settings, DaemonSettings};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Per-session configuration file daemon.
#[derive(Debug, Parser)]
#[command(
    name = "confreg-daemon",
    about = "Opens a YAML config file per session on join and saves it on leave",
    version
)]
struct Cli {
    /// Path of the TOML settings file.  Missing file means built-in defaults.
    #[arg(long, default_value = "confreg.toml", env = "CONFREG_SETTINGS")]
    settings: PathBuf,

    /// Directory holding the per-session files (overrides `storage.base_dir`).
    #[arg(long, env = "CONFREG_BASE_DIR")]
    base_dir: Option<PathBuf>,

    /// Seconds between autosaves, 0 to disable (overrides `autosave.interval_secs`).
    #[arg(long, env = "CONFREG_AUTOSAVE_SECS")]
    autosave_secs: Option<u64>,

    /// Write the effective settings to `--settings` and exit.
    #[arg(long)]
    init_settings: bool,
}

impl Cli {
    /// Loads the settings file and applies CLI overrides on top.
    fn effective_settings(&self) -> anyhow::Result<DaemonSettings> {
        let mut settings = load_settings(&self.settings)
            .with_context(|| format!("loading settings from {}", self.settings.display()))?;
        if let Some(dir) = &self.base_dir {
            settings.storage.base_dir = dir.clone();
        }
        if let Some(secs) = self.autosave_secs {
            settings.autosave.interval_secs = secs;
        }
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = cli.effective_settings()?;

    // Initialise structured logging.  `RUST_LOG` overrides the settings file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level)),
        )
        .init();

    if cli.init_settings {
        save_settings(&cli.settings, &settings)
            .with_context(|| format!("writing settings to {}", cli.settings.display()))?;
        info!("wrote settings to {}", cli.settings.display());
        return Ok(());
    }

    info!(
        base_dir = %settings.storage.base_dir.display(),
        defaults = settings.defaults.len(),
        "confreg daemon starting"
    );

    let registry = settings
        .build_registry()
        .context("building session registry")?;
    let binding = shared(LifecycleBinding::new(registry));

    // Shutdown flag shared with the autosave task.
    let running = Arc::new(AtomicBool::new(true));

    // ── Session event source ──────────────────────────────────────────────────
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    spawn_stdin_source(tx).context("spawning stdin reader thread")?;

    // ── Autosave ──────────────────────────────────────────────────────────────
    let autosave = match settings.autosave.interval_secs {
        0 => {
            info!("autosave disabled");
            None
        }
        secs => {
            info!("autosave every {secs}s");
            Some(spawn_autosave(
                Arc::clone(&binding),
                Duration::from_secs(secs),
                Arc::clone(&running),
            ))
        }
    };

    // ── Dispatch until end of input or Ctrl-C ─────────────────────────────────
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            // Without a signal handler only end of input can stop the daemon.
            warn!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };
    tokio::select! {
        stats = run_dispatcher(Arc::clone(&binding), rx) => {
            info!(?stats, "end of session input");
        }
        () = ctrl_c => {
            info!("shutdown signal received");
        }
    }

    running.store(false, Ordering::Relaxed);
    if let Some(task) = autosave {
        task.abort();
    }

    let failures = shutdown(&binding)
        .await
        .context("closing open sessions")?;
    if failures > 0 {
        warn!("{failures} session file(s) could not be saved on shutdown");
    }

    info!("confreg daemon stopped");
    Ok(())
}
