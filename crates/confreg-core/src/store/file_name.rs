//! File-name normalisation and path resolution for managed stores.
//!
//! Every managed file is YAML, so every managed file name ends in
//! [`CANONICAL_EXTENSION`].  A caller-supplied extension is never honoured as
//! the file type: `"settings.json"` becomes `settings.json.yml`.  A name that
//! already ends in `.yml` is left alone so the extension appears exactly once.

use std::io;
use std::path::{Path, PathBuf};

/// Extension appended to every managed file name (without the leading dot).
pub const CANONICAL_EXTENSION: &str = "yml";

/// Returns `name` with the canonical extension appended.
pub fn with_canonical_extension(name: &str) -> String {
    let suffix = format!(".{CANONICAL_EXTENSION}");
    if name.ends_with(&suffix) {
        name.to_string()
    } else {
        format!("{name}{suffix}")
    }
}

/// Resolves `base/sub_directories/name.yml`, or `base/name.yml` when no
/// sub-directories are given.
///
/// `sub_directories` may contain several levels (`"players/eu"`).  An empty
/// string is treated like `None`.
pub fn resolve(base: &Path, sub_directories: Option<&str>, name: &str) -> PathBuf {
    let file_name = with_canonical_extension(name);
    match sub_directories.filter(|s| !s.is_empty()) {
        Some(sub) => base.join(sub).join(file_name),
        None => base.join(file_name),
    }
}

/// Makes `path` absolute by joining it onto the current working directory.
///
/// Does not touch the file system beyond reading the working directory, so
/// it works for paths that do not exist yet.
pub fn absolutize(path: PathBuf) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name_gets_canonical_extension() {
        assert_eq!(with_canonical_extension("p1"), "p1.yml");
    }

    #[test]
    fn test_foreign_extension_is_not_honoured() {
        assert_eq!(with_canonical_extension("x.json"), "x.json.yml");
        assert_eq!(with_canonical_extension("x.yaml"), "x.yaml.yml");
    }

    #[test]
    fn test_canonical_extension_appears_exactly_once() {
        let name = with_canonical_extension("x.yml");
        assert_eq!(name, "x.yml");
        assert_eq!(name.matches(".yml").count(), 1);
    }

    #[test]
    fn test_resolve_without_sub_directories() {
        let path = resolve(Path::new("/data"), None, "p1");
        assert_eq!(path, PathBuf::from("/data/p1.yml"));
    }

    #[test]
    fn test_resolve_with_nested_sub_directories() {
        let path = resolve(Path::new("/data"), Some("players/eu"), "p1");
        assert_eq!(path, Path::new("/data").join("players/eu").join("p1.yml"));
        assert!(path.ends_with("p1.yml"));
    }

    #[test]
    fn test_resolve_treats_empty_sub_directory_as_none() {
        assert_eq!(
            resolve(Path::new("/data"), Some(""), "p1"),
            resolve(Path::new("/data"), None, "p1")
        );
    }

    #[test]
    fn test_absolutize_keeps_absolute_paths() {
        let abs = std::env::temp_dir().join("x.yml");
        assert_eq!(absolutize(abs.clone()).unwrap(), abs);
    }

    #[test]
    fn test_absolutize_joins_relative_paths_onto_cwd() {
        let path = absolutize(PathBuf::from("relative/x.yml")).unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("relative/x.yml"));
    }
}
