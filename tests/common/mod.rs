#![allow(dead_code)]

pub use procpipe_test_utils::{builders, init_tracing, sh};

use std::path::Path;

/// File contents, or an empty string if the file does not exist.
pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}
