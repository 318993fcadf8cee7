//! # Legacy Layout Migration
//!
//! Older versions of the store kept content files in `content/`. The
//! current layout uses `history/`. [`migrate_legacy`] moves a store from
//! the old layout to the new one, exactly once:
//!
//! 1. No legacy directory: nothing to do.
//! 2. Marker file present: migration already ran, nothing to do.
//! 3. Files on both sides: refuse with `MigrationConflict` and touch
//!    nothing; the user has to reconcile by hand.
//! 4. Otherwise copy every regular legacy file into the new directory
//!    under the same name, then write the marker.
//!
//! Legacy files are never deleted, and the marker is never removed once
//! written. A failure to write the marker is logged and tolerated; the
//! next run will find the legacy files already copied and the new
//! directory non-empty only in genuinely conflicting states.

use std::io::Read;

use tracing::{debug, info, warn};

use crate::error::{RemError, Result};
use crate::fs::ScopedFs;
use crate::model::{LEGACY_DIR, MIGRATION_MARKER, STORE_DIR};

/// Copy the legacy `content/` directory into `history/`, gated by the
/// migration marker. Safe to call on every store open.
pub fn migrate_legacy<F: ScopedFs>(fs: &F) -> Result<()> {
    let legacy_entries = match fs.read_dir(LEGACY_DIR) {
        Ok(entries) => entries,
        Err(RemError::NotFound(_)) => {
            debug!("no legacy directory, skipping migration");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    if marker_exists(fs)? {
        debug!("migration marker present, skipping migration");
        return Ok(());
    }

    let legacy_files: Vec<&str> = legacy_entries
        .iter()
        .filter(|e| !e.is_dir)
        .map(|e| e.name.as_str())
        .collect();

    let new_file_count = match fs.read_dir(STORE_DIR) {
        Ok(entries) => entries.iter().filter(|e| !e.is_dir).count(),
        Err(RemError::NotFound(_)) => 0,
        Err(e) => return Err(e),
    };

    if !legacy_files.is_empty() && new_file_count > 0 {
        return Err(RemError::MigrationConflict {
            legacy: LEGACY_DIR.to_string(),
            new: STORE_DIR.to_string(),
        });
    }

    for name in &legacy_files {
        let mut source = fs.open(&format!("{}/{}", LEGACY_DIR, name))?;
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;
        fs.write_file(&format!("{}/{}", STORE_DIR, name), &bytes, 0o644)?;
    }
    if !legacy_files.is_empty() {
        info!(files = legacy_files.len(), "migrated legacy store");
    }

    // The marker only saves work on the next open; losing it is not worth
    // failing an otherwise complete migration.
    if let Err(e) = fs.write_file(MIGRATION_MARKER, b"", 0o644) {
        warn!("failed to write migration marker: {}", e);
    }
    Ok(())
}

fn marker_exists<F: ScopedFs>(fs: &F) -> Result<bool> {
    match fs.open(MIGRATION_MARKER) {
        Ok(_) => Ok(true),
        Err(RemError::NotFound(_)) => Ok(false),
        Err(e) => Err(e),
    }
}
