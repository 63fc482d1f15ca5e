//! Locating the optional VIIRS composites and scratch directories for tests.

use std::path::PathBuf;

/// Directory holding real composites, `crates/viirs-store/testdata` unless
/// `TEST_DATA_DIR` points elsewhere.
pub fn testdata_dir() -> PathBuf {
    match std::env::var_os("TEST_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../viirs-store/testdata"),
    }
}

/// Path of a composite in [`testdata_dir`], if it has been downloaded.
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    let path = testdata_dir().join(name);
    path.exists().then_some(path)
}

/// Scratch directory removed on drop.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}
