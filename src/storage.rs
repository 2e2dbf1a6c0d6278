// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Small filesystem helpers shared by the layout store and exports

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Write a file atomically using tempfile + rename
///
/// The temp file lives in the target's directory so the rename never crosses
/// filesystems. Missing parent directories are created.
pub(crate) fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    use tempfile::NamedTempFile;

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory {:?}", parent))?;

    let temp_file = NamedTempFile::new_in(parent).context("Failed to create temp file")?;
    fs::write(temp_file.path(), content)
        .with_context(|| format!("Failed to write temp file {:?}", temp_file.path()))?;
    temp_file
        .persist(path)
        .with_context(|| format!("Failed to persist file to {:?}", path))?;

    Ok(())
}

/// Make an identifier safe to use as a file name
///
/// Anything other than alphanumerics, `-`, `_` and `.` becomes `_`. A leading
/// dot is replaced too so a table id can't produce a hidden file or `..`.
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .enumerate()
        .map(|(i, c)| {
            if c.is_alphanumeric() || c == '-' || c == '_' || (c == '.' && i > 0) {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}
