//! JSON artifact writers.
//!
//! Files are written through a temporary file in the target directory and
//! renamed into place, so a crash never leaves a half-written artifact.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::EmptyOutput;

/// Serialize `value` as compact JSON and atomically replace `path`
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_vec(value).context("Failed to serialize output")?;

    let parent_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp_file = NamedTempFile::new_in(parent_dir)
        .with_context(|| format!("Failed to create temporary file in {:?}", parent_dir))?;

    temp_file.write_all(&content)?;
    temp_file.as_file().sync_all()?;

    temp_file
        .persist(path)
        .with_context(|| format!("Failed to write output file: {:?}", path))?;

    debug!("Wrote {} bytes to {:?}", content.len(), path);
    Ok(())
}

/// Write the collected pool identifiers as a JSON array.
///
/// Returns the number of identifiers written. With [`EmptyOutput::Skip`]
/// an empty collection leaves `path` untouched and returns 0.
pub fn write_pools(path: &Path, identifiers: &[String], empty: EmptyOutput) -> Result<usize> {
    if identifiers.is_empty() && empty == EmptyOutput::Skip {
        info!("Nothing collected, not writing {:?}", path);
        return Ok(0);
    }

    write_json_atomic(path, identifiers)?;
    Ok(identifiers.len())
}
