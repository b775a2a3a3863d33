// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Final archive creation.
//!
//! Everything the actions left in the rig's scratch directory is packed
//! into `rig-<name>-<UTC timestamp>.tar.gz`, rooted under a single
//! directory matching the archive's own base name so it unpacks cleanly.

use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::info;

/// Create the archive for a finished rig. Returns `None` when the
/// scratch directory is empty and there is nothing to archive.
pub fn create(tmpdir: &Path, name: &str, archive_dir: &Path) -> std::io::Result<Option<PathBuf>> {
    if std::fs::read_dir(tmpdir)?.next().is_none() {
        info!("No data generated to archive for this rig.");
        return Ok(None);
    }

    let stamp = chrono::Utc::now().format("%Y-%m-%d-%H%M%S");
    let base = format!("rig-{name}-{stamp}");
    let path = archive_dir.join(format!("{base}.tar.gz"));

    let file = std::fs::File::create(&path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(&base, tmpdir)?;
    builder.into_inner()?.finish()?;

    Ok(Some(path))
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
