//! Dotted value paths over nested YAML mappings.
//!
//! A value path such as `"audio.volume"` addresses the `volume` key inside
//! the `audio` mapping at the top level of a document:
//!
//! ```yaml
//! audio:
//!   volume: 80
//!   muted: false
//! ```
//!
//! # Rules
//!
//! - Each `.`-separated segment addresses one level of mapping.
//! - Reads return `None` when any segment is missing, or when a non-mapping
//!   value sits where a mapping is needed (`"audio.volume.max"` above).
//! - Writes create intermediate mappings on demand.  A scalar standing in the
//!   way of a write is replaced by a fresh mapping.
//! - Writing YAML `null` removes the key instead of storing a null.
//! - [`set_if_absent`] never replaces anything, not even a scalar standing
//!   where a mapping is needed.  Default merging goes through it.
//! - The empty path, and any path with an empty segment (`"a..b"`, `".a"`,
//!   `"a."`), addresses nothing: reads return `None` and writes are ignored.

use serde_yaml::{Mapping, Value};

/// Separator between path segments.
pub const SEPARATOR: char = '.';

/// Splits `path` into segments, rejecting empty paths and empty segments.
fn segments(path: &str) -> Option<Vec<&str>> {
    if path.is_empty() {
        return None;
    }
    let parts: Vec<&str> = path.split(SEPARATOR).collect();
    if parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    Some(parts)
}

/// Returns `true` if `path` is addressable (non-empty, no empty segments).
pub fn is_valid(path: &str) -> bool {
    segments(path).is_some()
}

/// Reads the value at `path`, following nested mappings.
pub fn get<'a>(root: &'a Mapping, path: &str) -> Option<&'a Value> {
    let segments = segments(path)?;
    let (last, parents) = segments.split_last()?;

    let mut current = root;
    for segment in parents {
        current = current.get(*segment)?.as_mapping()?;
    }
    current.get(*last)
}

/// Returns `true` if a value exists at `path`.
pub fn contains(root: &Mapping, path: &str) -> bool {
    get(root, path).is_some()
}

/// Writes `value` at `path`, creating intermediate mappings as needed.
///
/// Writing [`Value::Null`] removes the key.
pub fn set(root: &mut Mapping, path: &str, value: Value) {
    if value.is_null() {
        remove(root, path);
        return;
    }
    let Some(segments) = segments(path) else {
        return;
    };
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut current = root;
    for segment in parents {
        if !matches!(current.get(*segment), Some(Value::Mapping(_))) {
            current.insert(Value::String((*segment).to_string()), Value::Mapping(Mapping::new()));
        }
        current = match current.get_mut(*segment) {
            Some(Value::Mapping(child)) => child,
            _ => return,
        };
    }
    current.insert(Value::String((*last).to_string()), value);
}

/// Writes `value` at `path` only if nothing already occupies the path.
///
/// Missing intermediate mappings are created.  An existing value anywhere
/// along the path (the leaf itself, or a non-mapping standing where a
/// mapping is needed) is left untouched and `false` is returned.  A null
/// `value` or an invalid path also returns `false`.
pub fn set_if_absent(root: &mut Mapping, path: &str, value: Value) -> bool {
    if value.is_null() {
        return false;
    }
    let Some(segments) = segments(path) else {
        return false;
    };
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };

    let mut current = root;
    for segment in parents {
        match current.get(*segment) {
            None => {
                current.insert(
                    Value::String((*segment).to_string()),
                    Value::Mapping(Mapping::new()),
                );
            }
            Some(Value::Mapping(_)) => {}
            Some(_) => return false,
        }
        current = match current.get_mut(*segment) {
            Some(Value::Mapping(child)) => child,
            _ => return false,
        };
    }
    if current.contains_key(*last) {
        return false;
    }
    current.insert(Value::String((*last).to_string()), value);
    true
}

/// Removes and returns the value at `path`, if any.
///
/// Intermediate mappings left empty by the removal are kept; they still
/// appear in the file as `section: {}`.
pub fn remove(root: &mut Mapping, path: &str) -> Option<Value> {
    let segments = segments(path)?;
    let (last, parents) = segments.split_last()?;

    let mut current = root;
    for segment in parents {
        current = current.get_mut(*segment)?.as_mapping_mut()?;
    }
    current.remove(*last)
}
