//! confreg-daemon library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! - **`settings`** – TOML settings file: base directory, template, autosave
//!   interval, log level, and the default values every session file gets.
//! - **`events`**   – The session event source: parses `join <uuid>` /
//!   `leave <uuid>` / `save` lines and forwards them over a channel.
//! - **`dispatch`** – Consumes session events one at a time and drives the
//!   shared [`confreg_core::LifecycleBinding`]; also runs periodic autosave.

pub mod dispatch;
pub mod events;
pub mod settings;
