//! The default-value set shared by every store in a registry.
//!
//! Defaults are `(value path, value)` pairs merged with *set-if-absent*
//! semantics: a default only fills a key the document does not already
//! contain, so a value the user edited by hand is never overwritten.
//!
//! Entries keep their insertion order (`serde_yaml::Mapping` is ordered), so
//! merged keys land in freshly created files in the order they were declared.

use serde_yaml::{Mapping, Value};

use super::value_path;

/// Ordered, append-only set of default values keyed by value path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultSet {
    entries: Mapping,
}

impl DefaultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a default for `path`, replacing any earlier value for the same path.
    ///
    /// Invalid paths (empty, or containing an empty segment) are ignored
    /// because they could never be merged into a document.
    pub fn insert(&mut self, path: impl Into<String>, value: impl Into<Value>) {
        let path = path.into();
        if !value_path::is_valid(&path) {
            tracing::warn!(path = %path, "ignoring default with an unaddressable path");
            return;
        }
        self.entries.insert(Value::String(path), value.into());
    }

    /// Returns the default registered for `path`, if any.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(path, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| k.as_str().map(|path| (path, v)))
    }

    /// Fills every path in this set that `target` does not already contain.
    ///
    /// Returns the number of keys that were added.  Existing values are never
    /// touched: a default whose path runs into a non-mapping value (for
    /// `audio.volume`, an `audio: loud` scalar or list) is skipped.  `null`
    /// defaults are skipped since writing a null removes a key rather than
    /// storing one.
    pub fn apply_to(&self, target: &mut Mapping) -> usize {
        let mut added = 0;
        for (path, value) in self.iter() {
            if value_path::set_if_absent(target, path, value.clone()) {
                added += 1;
            }
        }
        added
    }
}

impl<P, V> FromIterator<(P, V)> for DefaultSet
where
    P: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (P, V)>>(iter: I) -> Self {
        let mut set = DefaultSet::new();
        for (path, value) in iter {
            set.insert(path, value);
        }
        set
    }
}
