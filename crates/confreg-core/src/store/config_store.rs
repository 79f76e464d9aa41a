//! A single file-backed YAML configuration store.
//!
//! # Lifecycle (for beginners)
//!
//! ```text
//! ConfigStore::open(base, sub, "p1")
//!   ├─ resolve   base/sub/p1.yml        (canonical extension appended)
//!   ├─ mkdir -p  base/sub               (never deletes anything)
//!   ├─ create    p1.yml if missing      → was_first_load = true
//!   └─ load      p1.yml into memory
//!
//! get / set / merge_defaults            (memory only)
//! save()                                (memory → disk, full overwrite)
//! drop                                  (writes nothing)
//! ```
//!
//! Dropping a store never writes to disk.  Every change that should survive
//! must be followed by an explicit [`ConfigStore::save`].
//!
//! # Template seeding
//!
//! A service usually ships a hand-formatted template (comments, key order)
//! for new files.  [`ConfigStore::seed_from_template`] copies those bytes
//! over the file only when this open created it, so a user's customised file
//! is never clobbered on restart.

use std::fs::{self, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use super::error::StoreError;
use super::file_name;
use crate::domain::defaults::DefaultSet;
use crate::domain::value_path;

/// One YAML file on disk plus its in-memory contents.
#[derive(Debug)]
pub struct ConfigStore {
    /// Absolute location of the backing file.  Fixed at construction.
    path: PathBuf,
    /// `true` iff the backing file did not exist before this store opened it.
    was_first_load: bool,
    /// Set once a template has been written, so a repeated seed is a no-op.
    seeded: bool,
    contents: Mapping,
}

impl ConfigStore {
    /// Opens (creating if needed) `base/sub_directories/file_name.yml`.
    ///
    /// Missing parent directories and the file itself are created.  An
    /// existing file is loaded as-is; it is never truncated.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Io`] if a directory or the file cannot be created or read.
    /// - [`StoreError::Parse`] / [`StoreError::NotAMapping`] if the existing
    ///   content is not a YAML mapping.
    pub fn open(
        base_directory: impl AsRef<Path>,
        sub_directories: Option<&str>,
        file_name: &str,
    ) -> Result<Self, StoreError> {
        let resolved = file_name::resolve(base_directory.as_ref(), sub_directories, file_name);
        let path = file_name::absolutize(resolved.clone())
            .map_err(|source| StoreError::io(&resolved, source))?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| StoreError::io(dir, source))?;
        }
        let was_first_load = create_if_absent(&path)?;
        let contents = read_document(&path)?;

        debug!(
            path = %path.display(),
            first_load = was_first_load,
            keys = contents.len(),
            "opened config store"
        );

        Ok(Self {
            path,
            was_first_load,
            seeded: false,
            contents,
        })
    }

    /// Opens `base/file_name.yml`.  Shorthand for `open(base, None, file_name)`.
    ///
    /// # Errors
    ///
    /// Same as [`ConfigStore::open`].
    pub fn open_in(base_directory: impl AsRef<Path>, file_name: &str) -> Result<Self, StoreError> {
        Self::open(base_directory, None, file_name)
    }

    /// Absolute path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `true` iff the backing file was created by this store's `open`.
    pub fn was_first_load(&self) -> bool {
        self.was_first_load
    }

    /// The whole in-memory document.
    pub fn contents(&self) -> &Mapping {
        &self.contents
    }

    // ── Persistence ──────────────────────────────────────────────────────────

    /// Writes the in-memory contents to the backing file, replacing it entirely.
    ///
    /// An empty document is written as an empty file.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] on write failure, [`StoreError::Serialize`] if the
    /// contents cannot be rendered.  In-memory contents are untouched either way.
    pub fn save(&self) -> Result<(), StoreError> {
        let rendered = if self.contents.is_empty() {
            String::new()
        } else {
            serde_yaml::to_string(&self.contents).map_err(|source| StoreError::Serialize {
                path: self.path.clone(),
                source,
            })?
        };
        fs::write(&self.path, rendered).map_err(|source| StoreError::io(&self.path, source))?;
        debug!(path = %self.path.display(), "saved config store");
        Ok(())
    }

    /// Re-reads the backing file, discarding unsaved in-memory changes.
    ///
    /// # Errors
    ///
    /// I/O or parse errors from reading the file.  On error the in-memory
    /// contents are left as they were.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        self.contents = read_document(&self.path)?;
        Ok(())
    }

    /// Replaces the file's bytes with `template` and reloads, but only when
    /// this store created the file and has not been seeded yet.
    ///
    /// Returns `Ok(true)` if the template was written, `Ok(false)` if the call
    /// was a no-op.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] if the write fails; a parse error if `template` is
    /// not a YAML mapping.  In the parse case the file already holds the
    /// template bytes while the in-memory contents are unchanged, and a later
    /// call with a valid template is still allowed.
    pub fn seed_from_template(&mut self, template: &[u8]) -> Result<bool, StoreError> {
        if !self.can_seed() {
            return Ok(false);
        }
        fs::write(&self.path, template).map_err(|source| StoreError::io(&self.path, source))?;
        self.contents = read_document(&self.path)?;
        self.seeded = true;
        debug!(path = %self.path.display(), bytes = template.len(), "seeded config from template");
        Ok(true)
    }

    /// Like [`ConfigStore::seed_from_template`], reading the template from
    /// `reader`.  The reader is not touched when seeding would be a no-op.
    ///
    /// # Errors
    ///
    /// Same as [`ConfigStore::seed_from_template`]; a read failure on
    /// `reader` is reported as [`StoreError::Io`] against this store's path.
    pub fn seed_from_reader<R: Read>(&mut self, mut reader: R) -> Result<bool, StoreError> {
        if !self.can_seed() {
            return Ok(false);
        }
        let mut template = Vec::new();
        reader
            .read_to_end(&mut template)
            .map_err(|source| StoreError::io(&self.path, source))?;
        self.seed_from_template(&template)
    }

    fn can_seed(&self) -> bool {
        self.was_first_load && !self.seeded
    }

    // ── In-memory access ─────────────────────────────────────────────────────

    /// Fills every default the document does not already contain.
    ///
    /// Memory only; call [`ConfigStore::save`] to persist.  Returns the number
    /// of keys added.
    pub fn merge_defaults(&mut self, defaults: &DefaultSet) -> usize {
        defaults.apply_to(&mut self.contents)
    }

    /// Value at the dotted `key`, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        value_path::get(&self.contents, key)
    }

    /// Value at `key` converted to `T`.  `None` if absent or not convertible.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key)
            .and_then(|v| serde_yaml::from_value(v.clone()).ok())
    }

    pub fn contains(&self, key: &str) -> bool {
        value_path::contains(&self.contents, key)
    }

    /// Sets `key` to `value`.  Setting `Value::Null` removes the key.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        value_path::set(&mut self.contents, key, value.into());
    }

    /// Removes `key`, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        value_path::remove(&mut self.contents, key)
    }

    /// Top-level keys in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.contents.keys().filter_map(Value::as_str)
    }
}

/// Creates `path` if it does not exist.  Returns `true` if it was created.
fn create_if_absent(path: &Path) -> Result<bool, StoreError> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Reads and parses the document at `path`.
fn read_document(path: &Path) -> Result<Mapping, StoreError> {
    let bytes = fs::read(path).map_err(|source| StoreError::io(path, source))?;
    parse_document(path, &bytes)
}

/// Parses `bytes` as a top-level YAML mapping.
///
/// Empty input and comment-only input are empty documents.
fn parse_document(path: &Path, bytes: &[u8]) -> Result<Mapping, StoreError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Mapping::new());
    }
    let value: Value = serde_yaml::from_slice(bytes).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        _ => Err(StoreError::NotAMapping {
            path: path.to_path_buf(),
        }),
    }
}
