//! Conformance tests that run YAML fixtures against vmatch
//!
//! Run with: cargo test -p vmatch-test --test conformance --features vmatch-test/fixtures
//!
//! Note: This test file requires the `fixtures` feature to be enabled.

#![cfg(feature = "fixtures")]

use std::fs;
use std::path::{Path, PathBuf};

use vmatch_test::fixture::Fixture;

/// The fixtures directory shipped with this crate
fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Load and run all fixtures in a directory
fn run_fixtures_in_dir(dir: &Path) {
    assert!(dir.exists(), "Fixtures directory does not exist: {}", dir.display());

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| entry.expect("dir entry").path())
        .filter(|path| {
            path.extension()
                .is_some_and(|e| e == "yaml" || e == "yml")
        })
        .collect();
    paths.sort();
    assert!(!paths.is_empty(), "No fixtures in {}", dir.display());

    for path in paths {
        println!("Running fixture: {}", path.display());

        let yaml = fs::read_to_string(&path).expect("read yaml");

        // Parse potentially multiple fixtures (separated by ---)
        let fixtures = Fixture::from_yaml_multi(&yaml).unwrap_or_else(|e| {
            panic!("Failed to parse {}: {}", path.display(), e);
        });

        for fixture in fixtures {
            println!("  Running: {}", fixture.name);
            fixture.run_and_assert();
        }
    }
}

#[test]
fn test_compatibility() {
    run_fixtures_in_dir(&fixtures_dir().join("01_compatibility"));
}

#[test]
fn test_disambiguation() {
    run_fixtures_in_dir(&fixtures_dir().join("02_disambiguation"));
}

#[test]
fn test_schema() {
    run_fixtures_in_dir(&fixtures_dir().join("03_schema"));
}

#[test]
fn test_failures() {
    run_fixtures_in_dir(&fixtures_dir().join("04_failures"));
}
