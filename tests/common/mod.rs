//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Copy the `tests/profiles` corpus into a fresh temp directory.
///
/// Returns the temp dir guard and the path of the copied corpus root.
#[allow(dead_code)]
pub fn setup_profiles() -> Result<(TempDir, PathBuf), Box<dyn std::error::Error>> {
    let test_tempdir = TempDir::new()?;
    let test_root = test_tempdir.path().join("profiles");
    let source = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/profiles");
    copy_dir_recursive(&source, &test_root)?;
    Ok((test_tempdir, test_root))
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    if !dst.exists() {
        std::fs::create_dir_all(dst)?;
    }

    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(())
}
