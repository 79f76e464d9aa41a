//! Integration tests for the registry through its public API.
//!
//! These walk through the end-to-end scenarios a session-oriented service
//! relies on:
//!
//! - Registering a fresh entity creates its file and seeds defaults.
//! - A repeated "entity joined" notification changes nothing.
//! - Defaults added after registration never override values the user set.
//! - Reopening a file never truncates it.

use confreg_core::{ConfigRegistry, ConfigStore, LifecycleBinding, Value};
use tempfile::TempDir;

// ── Scenario: first registration and idempotent re-registration ──────────────

#[test]
fn test_register_deregister_scenario_over_empty_directory() {
    // Arrange: registry over an empty directory with one default.
    let dir = TempDir::new().unwrap();
    let mut registry: ConfigRegistry<String> = ConfigRegistry::new(dir.path());
    registry.add_default("volume", 100);
    let file = dir.path().join("p1.yml");

    // Act 1: first registration creates the file; the store holds the default.
    assert!(registry.register("p1".to_string(), "p1").unwrap());
    assert!(file.is_file());
    let store = registry.get(&"p1".to_string()).unwrap();
    assert_eq!(store.get("volume"), Some(&Value::from(100)));

    // Persisting makes the default visible on disk.
    registry.save_all().unwrap();
    let saved = std::fs::read_to_string(&file).unwrap();
    assert_eq!(saved, "volume: 100\n");

    // Act 2: repeated registration without overwrite is a no-op.
    assert!(!registry.register("p1".to_string(), "p1").unwrap());
    assert_eq!(std::fs::read_to_string(&file).unwrap(), saved);

    // Act 3: deregister hands the store back; lookup then misses.
    let removed = registry.deregister(&"p1".to_string());
    assert!(removed.is_some());
    assert!(registry.get(&"p1".to_string()).is_none());
}

// ── Scenario: post-registration defaults do not override user values ─────────

#[test]
fn test_late_default_does_not_override_explicit_value() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let mut registry: ConfigRegistry<String> = ConfigRegistry::new(dir.path());
    registry.register("p2".to_string(), "p2").unwrap();

    // Act
    registry
        .get_mut(&"p2".to_string())
        .unwrap()
        .set("volume", 50);
    registry.add_default("volume", 100);
    registry.get(&"p2".to_string()).unwrap().save().unwrap();

    // Assert: reopening the same file shows the user's value.
    let reopened = ConfigStore::open_in(dir.path(), "p2").unwrap();
    assert_eq!(reopened.get_as::<i64>("volume"), Some(50));
}

// ── Open idempotence and extension handling ───────────────────────────────────

#[test]
fn test_reopen_never_truncates_existing_content() {
    let dir = TempDir::new().unwrap();
    let original = "# hand-written\nname: alice\nvolume: 3\n";
    std::fs::write(dir.path().join("alice.yml"), original).unwrap();

    for _ in 0..3 {
        let store = ConfigStore::open_in(dir.path(), "alice").unwrap();
        assert!(!store.was_first_load());
    }

    assert_eq!(
        std::fs::read_to_string(dir.path().join("alice.yml")).unwrap(),
        original
    );
}

#[test]
fn test_supplied_extension_is_not_the_file_type() {
    let dir = TempDir::new().unwrap();
    for name in ["data.json", "notes.txt", "plain", "already.yml"] {
        let store = ConfigStore::open_in(dir.path(), name).unwrap();
        let file_name = store.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(file_name.ends_with(".yml"), "{file_name}");
        assert!(!file_name.ends_with(".yml.yml"), "{file_name}");
        assert_eq!(
            store.path().extension().and_then(|e| e.to_str()),
            Some("yml"),
            "{file_name}"
        );
    }
}

#[test]
fn test_defaults_never_replace_a_hand_written_list() {
    // Arrange: the user keeps `audio` as a list; a default addresses `audio.muted`.
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("p1.yml");
    std::fs::write(&file, "audio:\n- 1\n- 2\n").unwrap();
    let mut registry: ConfigRegistry<String> = ConfigRegistry::new(dir.path());
    registry.add_default("audio.muted", false);
    registry.add_default("volume", 100);

    // Act
    registry.register("p1".to_string(), "p1").unwrap();
    registry.save_all().unwrap();

    // Assert
    let saved: confreg_core::Mapping =
        serde_yaml::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
    let expected: confreg_core::Mapping =
        serde_yaml::from_str("audio: [1, 2]\nvolume: 100\n").unwrap();
    assert_eq!(saved, expected);
}

// ── Seeding ───────────────────────────────────────────────────────────────────

#[test]
fn test_template_seeding_only_on_first_load() {
    let dir = TempDir::new().unwrap();
    let template = b"# defaults for new sessions\nvolume: 80\n";

    let mut fresh = ConfigStore::open_in(dir.path(), "s").unwrap();
    assert!(fresh.seed_from_template(template).unwrap());
    fresh.set("volume", 10);
    fresh.save().unwrap();

    let mut reopened = ConfigStore::open_in(dir.path(), "s").unwrap();
    assert!(!reopened.seed_from_template(template).unwrap());
    assert_eq!(reopened.get_as::<i64>("volume"), Some(10));
}

// ── Lifecycle binding over a shared default set ───────────────────────────────

#[test]
fn test_binding_round_trip_keeps_values_between_sessions() {
    let dir = TempDir::new().unwrap();
    let mut registry: ConfigRegistry<u64> = ConfigRegistry::new(dir.path());
    registry.add_default("audio.volume", 100);
    let mut binding = LifecycleBinding::new(registry);

    binding.on_activate(42);
    binding
        .registry_mut()
        .get_mut(&42)
        .unwrap()
        .set("audio.volume", 15);
    binding.on_deactivate(&42);

    binding.on_activate(42);
    let store = binding.registry().get(&42).unwrap();
    assert_eq!(store.get_as::<i64>("audio.volume"), Some(15));
    assert!(dir.path().join("42.yml").is_file());
}
