//! Session event source: a line protocol on standard input.
//!
//! The host application (or an operator, or a test harness) writes one
//! command per line:
//!
//! ```text
//! join  6f1c2a4e-2b7d-4d59-9a61-3f0c1c8e9b10   # session became active
//! leave 6f1c2a4e-2b7d-4d59-9a61-3f0c1c8e9b10   # session became inactive
//! save                                          # save every open session now
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.  Malformed lines are
//! logged with `warn!` and skipped so one typo does not stop the daemon.
//!
//! # Threading
//!
//! Reading standard input is blocking, so the reader runs on a dedicated OS
//! thread and hands parsed events to the async dispatcher through a bounded
//! `tokio::sync::mpsc` channel.  The thread exits at end of input or when the
//! dispatcher drops its receiver.

use std::io::{self, BufRead};
use std::thread::JoinHandle;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Capacity of the channel between the event source and the dispatcher.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A lifecycle notification for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session became active: open (or create) its config file.
    Joined(Uuid),
    /// The session became inactive: save and close its config file.
    Left(Uuid),
    /// Save every open config file without closing any.
    SaveAll,
}

/// Why a line could not be turned into a [`SessionEvent`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseEventError {
    #[error("unknown command `{0}` (expected join, leave or save)")]
    UnknownCommand(String),

    #[error("`{0}` needs a session UUID")]
    MissingIdentity(String),

    #[error("invalid session UUID `{input}`: {reason}")]
    InvalidIdentity { input: String, reason: String },

    #[error("unexpected trailing input `{0}`")]
    TrailingInput(String),
}

/// Parses one protocol line.
///
/// Returns `Ok(None)` for blank and comment lines.
///
/// # Errors
///
/// A [`ParseEventError`] describing the first problem found.
pub fn parse_line(line: &str) -> Result<Option<SessionEvent>, ParseEventError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default();
    let argument = words.next();
    if let Some(extra) = words.next() {
        return Err(ParseEventError::TrailingInput(extra.to_string()));
    }

    let event = match command.to_ascii_lowercase().as_str() {
        "join" => SessionEvent::Joined(parse_identity(command, argument)?),
        "leave" => SessionEvent::Left(parse_identity(command, argument)?),
        "save" => match argument {
            None => SessionEvent::SaveAll,
            Some(extra) => return Err(ParseEventError::TrailingInput(extra.to_string())),
        },
        _ => return Err(ParseEventError::UnknownCommand(command.to_string())),
    };
    Ok(Some(event))
}

fn parse_identity(command: &str, argument: Option<&str>) -> Result<Uuid, ParseEventError> {
    let input = argument.ok_or_else(|| ParseEventError::MissingIdentity(command.to_string()))?;
    Uuid::parse_str(input).map_err(|e| ParseEventError::InvalidIdentity {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

/// Reads lines from `reader` and forwards parsed events to `tx`.
///
/// Stops at end of input, on a read error, or when the receiver is gone.
/// Returns the number of events forwarded.
///
/// Must be called from a plain OS thread, not from inside the async runtime,
/// because it uses `blocking_send`.
pub fn forward_lines<R: BufRead>(reader: R, tx: &mpsc::Sender<SessionEvent>) -> usize {
    let mut forwarded = 0;
    for (index, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("stopped reading session events: {e}");
                break;
            }
        };
        match parse_line(&line) {
            Ok(Some(event)) => {
                debug!(?event, "session event received");
                if tx.blocking_send(event).is_err() {
                    debug!("dispatcher gone; event source stopping");
                    break;
                }
                forwarded += 1;
            }
            Ok(None) => {}
            Err(e) => warn!(line = index + 1, "ignoring malformed session event: {e}"),
        }
    }
    forwarded
}

/// Spawns the standard-input reader thread.
///
/// # Errors
///
/// Returns an I/O error if the OS refuses to create the thread.
pub fn spawn_stdin_source(tx: mpsc::Sender<SessionEvent>) -> io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("confreg-stdin".to_string())
        .spawn(move || {
            let forwarded = forward_lines(io::stdin().lock(), &tx);
            info!(forwarded, "session event input closed");
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "6f1c2a4e-2b7d-4d59-9a61-3f0c1c8e9b10";

    fn id() -> Uuid {
        Uuid::parse_str(ID).unwrap()
    }

    // ── parse_line ────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_join_and_leave() {
        assert_eq!(parse_line(&format!("join {ID}")), Ok(Some(SessionEvent::Joined(id()))));
        assert_eq!(parse_line(&format!("leave {ID}")), Ok(Some(SessionEvent::Left(id()))));
    }

    #[test]
    fn test_parse_is_case_insensitive_and_trims() {
        assert_eq!(
            parse_line(&format!("  JOIN   {ID}  ")),
            Ok(Some(SessionEvent::Joined(id())))
        );
    }

    #[test]
    fn test_parse_save() {
        assert_eq!(parse_line("save"), Ok(Some(SessionEvent::SaveAll)));
    }

    #[test]
    fn test_parse_blank_and_comment_lines_are_skipped() {
        assert_eq!(parse_line(""), Ok(None));
        assert_eq!(parse_line("   "), Ok(None));
        assert_eq!(parse_line("# join later"), Ok(None));
    }

    #[test]
    fn test_parse_unknown_command() {
        assert_eq!(
            parse_line("kick someone"),
            Err(ParseEventError::UnknownCommand("kick".to_string()))
        );
    }

    #[test]
    fn test_parse_missing_identity() {
        assert_eq!(
            parse_line("join"),
            Err(ParseEventError::MissingIdentity("join".to_string()))
        );
    }

    #[test]
    fn test_parse_invalid_identity() {
        let err = parse_line("leave not-a-uuid").unwrap_err();
        assert!(matches!(
            err,
            ParseEventError::InvalidIdentity { ref input, .. } if input == "not-a-uuid"
        ));
    }

    #[test]
    fn test_parse_trailing_input() {
        assert_eq!(
            parse_line(&format!("join {ID} extra")),
            Err(ParseEventError::TrailingInput("extra".to_string()))
        );
        assert_eq!(
            parse_line("save now"),
            Err(ParseEventError::TrailingInput("now".to_string()))
        );
    }

    // ── forward_lines ─────────────────────────────────────────────────────────

    #[test]
    fn test_forward_lines_skips_malformed_and_forwards_valid() {
        // Arrange
        let input = format!("join {ID}\nbogus\n\n# comment\nsave\nleave {ID}\n");
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        // Act
        let forwarded = forward_lines(input.as_bytes(), &tx);

        // Assert
        assert_eq!(forwarded, 3);
        assert_eq!(rx.try_recv(), Ok(SessionEvent::Joined(id())));
        assert_eq!(rx.try_recv(), Ok(SessionEvent::SaveAll));
        assert_eq!(rx.try_recv(), Ok(SessionEvent::Left(id())));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_forward_lines_stops_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        drop(rx);

        let forwarded = forward_lines(format!("join {ID}\nsave\n").as_bytes(), &tx);

        assert_eq!(forwarded, 0);
    }
}
