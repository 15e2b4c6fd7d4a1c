//! Test utilities for modkit-lib.

use std::fs;
use std::path::{Path, PathBuf};

/// Write `content` to `root/relative_path`, creating parent directories.
///
/// Returns the full path of the written file.
pub fn write_file(root: &Path, relative_path: &str, content: &str) -> PathBuf {
  let path = root.join(relative_path);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(&path, content).unwrap();
  path
}
