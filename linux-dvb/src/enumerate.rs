//! Discovery of adapters and frontends under the DVB device root.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Path of one adapter's directory.
pub fn adapter_dir(root: &Path, adapter: u32) -> PathBuf {
    root.join(format!("adapter{}", adapter))
}

/// List the adapter indices present under `root` (`adapterN` directories).
pub fn list_adapters(root: &Path) -> Result<Vec<u32>> {
    scan(root, "adapter", true)
}

/// List the frontend indices of one adapter (`frontendN` device nodes).
pub fn list_frontends(root: &Path, adapter: u32) -> Result<Vec<u32>> {
    scan(&adapter_dir(root, adapter), "frontend", false)
}

/// Parse `<prefix><digits>` into the index. Anything else is rejected.
fn parse_index(name: &str, prefix: &str) -> Option<u32> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn scan(dir: &Path, prefix: &str, want_dir: bool) -> Result<Vec<u32>> {
    let enumeration_error = |source| Error::Enumeration {
        path: dir.to_path_buf(),
        source,
    };

    let mut indices = Vec::new();
    for entry in fs::read_dir(dir).map_err(enumeration_error)? {
        let entry = entry.map_err(enumeration_error)?;
        let Some(index) = entry.file_name().to_str().and_then(|n| parse_index(n, prefix)) else {
            continue;
        };
        // Follow symlinks so udev-style links to adapters still count
        if entry.path().is_dir() != want_dir {
            log::debug!("Skipping {:?}: unexpected file type", entry.path());
            continue;
        }
        indices.push(index);
    }

    indices.sort_unstable();
    indices.dedup();
    Ok(indices)
}
