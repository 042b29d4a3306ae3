//! Frozen on-disk conventions of the `.sigmf` container.
//!
//! # Layout rules
//! A container is a PAX-format tar stream.  Each recording occupies one
//! top-level directory named after the recording:
//!
//! ```text
//! <name>/                    mode 0755
//! <name>/<name>.sigmf-data   mode 0644, opaque dataset bytes
//! <name>/<name>.sigmf-meta   mode 0644, pretty-printed UTF-8 JSON
//! ```
//!
//! Entry modes are forced to the values below regardless of the host umask,
//! and mtime/uid/gid are zeroed, so packing the same recordings twice yields
//! byte-identical containers.  Recording names never contain path
//! separators.  Entries with foreign suffixes are unpacked but never paired
//! into a recording.

use std::path::{Path, PathBuf};

use crate::error::{ArchiveError, Result};

// ── Frozen suffixes ──────────────────────────────────────────────────────────
//
// These values are part of the wire contract and are never renegotiated.
// A reader that encounters an entry with neither file suffix skips it.

/// Container suffix.  Appended to a destination path that has no extension;
/// any other existing extension is rejected.
pub const SIGMF_ARCHIVE_EXT:  &str = ".sigmf";
/// Metadata entry suffix (UTF-8 JSON payload).
pub const SIGMF_METADATA_EXT: &str = ".sigmf-meta";
/// Dataset entry suffix (opaque byte payload).
pub const SIGMF_DATASET_EXT:  &str = ".sigmf-data";

// ── Entry modes ──────────────────────────────────────────────────────────────

/// Mode written for every recording directory entry.
pub const DIR_MODE:  u32 = 0o755;
/// Mode written for every metadata and dataset entry.
pub const FILE_MODE: u32 = 0o644;

// ── EntryKind ────────────────────────────────────────────────────────────────

/// Classification of a container entry by its file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Metadata,
    Dataset,
}

/// Classify a container entry path by suffix.  Directories and entries with
/// foreign suffixes return `None`.
pub fn entry_kind(path: &Path) -> Option<EntryKind> {
    let name = path.file_name()?.to_str()?;
    if name.ends_with(SIGMF_METADATA_EXT) {
        Some(EntryKind::Metadata)
    } else if name.ends_with(SIGMF_DATASET_EXT) {
        Some(EntryKind::Dataset)
    } else {
        None
    }
}

// ── Destination resolution ───────────────────────────────────────────────────

/// Apply the archive suffix rule to a destination path.
///
/// A path already ending in `.sigmf` passes through unchanged; a path with
/// no extension gets `.sigmf` appended; any other extension is an explicit
/// mismatch and fails with [`ArchiveError::File`].
pub fn resolve_archive_path<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    if path.to_string_lossy().ends_with(SIGMF_ARCHIVE_EXT) {
        return Ok(path.to_path_buf());
    }
    match path.extension() {
        None => {
            let mut resolved = path.as_os_str().to_os_string();
            resolved.push(SIGMF_ARCHIVE_EXT);
            Ok(PathBuf::from(resolved))
        }
        Some(other) => Err(ArchiveError::File(format!(
            "destination {} has extension {:?}, expected {}",
            path.display(),
            other,
            SIGMF_ARCHIVE_EXT
        ))),
    }
}
