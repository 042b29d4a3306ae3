//! Packer and extractor for `.sigmf` recording archives.
//!
//! # Packing
//! [`pack`] validates the whole batch up front, stages each recording in a
//! scratch directory, and writes one PAX tar container holding one
//! directory per recording.  [`pack_into`] does the same into a
//! caller-owned byte sink, appending after any entries the sink already
//! holds.
//!
//! # Extraction
//! [`extract`] enumerates the container up front, materializes every entry
//! to disk, and re-associates metadata with dataset files in container
//! entry order.
//!
//! ```no_run
//! use serde_json::json;
//! use sigmf_archive::{extract, pack, Metadata, Recording};
//!
//! let metadata = Metadata::from_value(json!({
//!     "global":      { "core:datatype": "cf32_le", "core:version": "1.0.0" },
//!     "captures":    [],
//!     "annotations": [],
//! }));
//! let mut recording = Recording::new(metadata);
//! recording.name = Some("night-scan".to_owned());
//! recording.data_file = Some("night-scan.bin".into());
//!
//! let path = pack(&[recording], "night-scan")?; // resolves to night-scan.sigmf
//! let recovered = extract(&path, None)?;
//! assert_eq!(recovered.len(), 1);
//! # Ok::<(), sigmf_archive::ArchiveError>(())
//! ```

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tar::{Archive, Builder, EntryType, Header};
use tempfile::TempDir;

use crate::error::{ArchiveError, Result};
use crate::format::{
    entry_kind, resolve_archive_path, EntryKind, DIR_MODE, FILE_MODE, SIGMF_DATASET_EXT,
    SIGMF_METADATA_EXT,
};
use crate::recording::{Metadata, Recording};

// ── Packer ───────────────────────────────────────────────────────────────────

/// Pack `recordings` into a fresh archive file at `path`.
///
/// The destination suffix rule applies (see
/// [`resolve_archive_path`](crate::format::resolve_archive_path)) and the
/// resolved path is returned.  The whole batch is validated before the
/// destination is created; a failure mid-write removes the partial file
/// again.
pub fn pack<P: AsRef<Path>>(recordings: &[Recording], path: P) -> Result<PathBuf> {
    let path = resolve_archive_path(path)?;
    let checked = check_recordings(recordings)?;

    let file = File::create(&path)
        .map_err(|e| ArchiveError::File(format!("cannot create {}: {e}", path.display())))?;

    if let Err(e) = append_all(Builder::new(file), &checked) {
        // Nothing is left behind on a fresh destination.
        let _ = fs::remove_file(&path);
        return Err(e);
    }
    Ok(path)
}

/// Append `recordings` to the container held in `sink`, or write a fresh
/// container when the sink does not already hold one.
///
/// The sink is never closed; it is rewound to the start on success so the
/// next read sees a complete container.  No suffix rule applies to sinks.
pub fn pack_into<S: Read + Write + Seek>(recordings: &[Recording], sink: &mut S) -> Result<()> {
    let checked = check_recordings(recordings)?;

    // A sink that does not read back as a tar stream restarts from zero.
    let end = archive_data_end(sink).unwrap_or(0);
    sink.seek(SeekFrom::Start(end))?;

    append_all(Builder::new(&mut *sink), &checked)?;

    sink.seek(SeekFrom::Start(0))?;
    Ok(())
}

/// One recording that passed pre-flight, with its required fields resolved.
struct CheckedRecording<'a> {
    name:      &'a str,
    data_file: &'a Path,
    metadata:  &'a Metadata,
}

/// Pre-flight pass over the whole batch.  The first violation aborts before
/// any archive byte is written.
fn check_recordings(recordings: &[Recording]) -> Result<Vec<CheckedRecording<'_>>> {
    let mut seen = HashSet::new();
    let mut checked = Vec::with_capacity(recordings.len());

    for rec in recordings {
        let name = match rec.name.as_deref() {
            Some(n) if !n.is_empty() => n,
            _ => {
                return Err(ArchiveError::File(
                    "recording name must be set before packing".to_owned(),
                ))
            }
        };
        if name.contains(['/', '\\']) {
            return Err(ArchiveError::File(format!(
                "recording name {name:?} must not contain path separators"
            )));
        }
        if !seen.insert(name) {
            return Err(ArchiveError::File(format!(
                "duplicate recording name {name:?} in one batch"
            )));
        }
        let data_file = match rec.data_file.as_deref() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => {
                return Err(ArchiveError::File(format!(
                    "recording {name:?} has no dataset file set"
                )))
            }
        };
        if !rec.metadata.validate() {
            return Err(ArchiveError::Validation(format!(
                "recording {name:?} has invalid metadata"
            )));
        }
        checked.push(CheckedRecording { name, data_file, metadata: &rec.metadata });
    }
    Ok(checked)
}

fn append_all<W: Write>(mut builder: Builder<W>, checked: &[CheckedRecording<'_>]) -> Result<()> {
    for rec in checked {
        append_recording(&mut builder, rec)?;
    }
    // into_inner writes the end-of-archive marker.
    builder.into_inner()?;
    Ok(())
}

/// Stage one recording in a scratch directory, then append its directory
/// entry and both file entries.  The scratch space is reclaimed on every
/// exit path when the `TempDir` drops.
fn append_recording<W: Write>(builder: &mut Builder<W>, rec: &CheckedRecording<'_>) -> Result<()> {
    let staging = TempDir::new()?;

    let meta_name = format!("{}{SIGMF_METADATA_EXT}", rec.name);
    let data_name = format!("{}{SIGMF_DATASET_EXT}", rec.name);
    let staged_meta = staging.path().join(&meta_name);
    let staged_data = staging.path().join(&data_name);

    let meta_file = File::create(&staged_meta)?;
    rec.metadata
        .dump(&meta_file)
        .map_err(|e| ArchiveError::File(format!("cannot stage metadata for {}: {e}", rec.name)))?;
    drop(meta_file);

    fs::copy(rec.data_file, &staged_data).map_err(|e| {
        ArchiveError::File(format!(
            "cannot copy dataset {} for {}: {e}",
            rec.data_file.display(),
            rec.name
        ))
    })?;

    append_dir(builder, &format!("{}/", rec.name))?;
    append_file(builder, &format!("{}/{data_name}", rec.name), &staged_data)?;
    append_file(builder, &format!("{}/{meta_name}", rec.name), &staged_meta)?;
    Ok(())
}

fn append_dir<W: Write>(builder: &mut Builder<W>, entry_path: &str) -> Result<()> {
    let mut header = Header::new_ustar();
    header.set_entry_type(EntryType::Directory);
    header.set_size(0);
    header.set_mode(DIR_MODE);
    append_entry(builder, header, entry_path, io::empty())
}

fn append_file<W: Write>(builder: &mut Builder<W>, entry_path: &str, staged: &Path) -> Result<()> {
    let file = File::open(staged)?;
    let mut header = Header::new_ustar();
    header.set_entry_type(EntryType::Regular);
    header.set_size(file.metadata()?.len());
    header.set_mode(FILE_MODE);
    append_entry(builder, header, entry_path, file)
}

/// Write one entry, spilling the path into a PAX `path` record when it does
/// not fit the ustar header fields.  mtime/uid/gid are always zero;
/// repacking the same recordings is byte-identical.
fn append_entry<W: Write, R: Read>(
    builder:    &mut Builder<W>,
    mut header: Header,
    entry_path: &str,
    data:       R,
) -> Result<()> {
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    if header.set_path(entry_path).is_err() {
        builder.append_pax_extensions([("path", entry_path.as_bytes())])?;
        header.set_path(truncated(entry_path))?;
    }
    header.set_cksum();
    builder.append(&header, data)?;
    Ok(())
}

/// Longest prefix of `path` that fits the 100-byte ustar name field.
fn truncated(path: &str) -> &str {
    let mut end = path.len().min(100);
    while !path.is_char_boundary(end) {
        end -= 1;
    }
    &path[..end]
}

/// Byte offset where the end-of-archive marker of an existing container
/// starts, i.e. where appended entries must go.
fn archive_data_end<S: Read + Seek>(sink: &mut S) -> io::Result<u64> {
    sink.seek(SeekFrom::Start(0))?;
    let mut container = Archive::new(&mut *sink);
    let mut end = 0;
    for entry in container.entries()? {
        let entry = entry?;
        let payload = entry.header().entry_size()?;
        end = entry.raw_file_position() + payload.div_ceil(512) * 512;
    }
    Ok(end)
}

// ── Extractor ────────────────────────────────────────────────────────────────

/// Extract every entry of the container at `archive_path` into `dest` and
/// rebuild the recordings in container entry order.
///
/// With `dest = None` a fresh temporary directory is created and handed to
/// the caller, never auto-deleted; its location is visible through the
/// returned recordings' `data_file` paths.  Returns zero, one, or many
/// recordings; callers wanting exactly one use
/// [`Recording::from_archive`](crate::recording::Recording::from_archive).
pub fn extract<P: AsRef<Path>>(archive_path: P, dest: Option<&Path>) -> Result<Vec<Recording>> {
    let archive_path = archive_path.as_ref();
    let dest = match dest {
        Some(dir) => {
            fs::create_dir_all(dir)
                .map_err(|e| ArchiveError::File(format!("cannot create {}: {e}", dir.display())))?;
            dir.to_path_buf()
        }
        None => TempDir::new()?.keep(),
    };

    let mut file = File::open(archive_path)
        .map_err(|e| ArchiveError::File(format!("cannot open {}: {e}", archive_path.display())))?;

    // Enumerate up front so a malformed container fails before any entry
    // touches the destination.
    let members = scan_members(&mut file)?;
    file.seek(SeekFrom::Start(0))?;
    unpack_members(&mut file, &dest)?;

    pair_recordings(&members, &dest)
}

/// One classified container entry, in container order.
struct Member {
    rel_path: PathBuf,
    kind:     Option<EntryKind>,
}

fn scan_members<R: Read>(reader: R) -> Result<Vec<Member>> {
    let mut container = Archive::new(reader);
    let mut members = Vec::new();
    for entry in container.entries().map_err(malformed)? {
        let entry = entry.map_err(malformed)?;
        let rel_path = entry.path().map_err(malformed)?.into_owned();
        // Only regular files count as recording parts; a directory named
        // like a metadata file must not be parsed.
        let kind = entry
            .header()
            .entry_type()
            .is_file()
            .then(|| entry_kind(&rel_path))
            .flatten();
        members.push(Member { rel_path, kind });
    }
    Ok(members)
}

fn unpack_members<R: Read>(reader: R, dest: &Path) -> Result<()> {
    let mut container = Archive::new(reader);
    for entry in container.entries().map_err(malformed)? {
        let mut entry = entry.map_err(malformed)?;
        let unpacked = entry.unpack_in(dest)?;
        if !unpacked {
            return Err(ArchiveError::File(format!(
                "entry {} escapes the extraction directory",
                String::from_utf8_lossy(&entry.path_bytes())
            )));
        }
    }
    Ok(())
}

/// Order-sensitive pairing: a recording is completed whenever one dataset
/// and one metadata entry have both been seen since the last completion.
/// Containers written by [`pack`] keep each recording's entries contiguous,
/// so pairing never crosses recordings; foreign containers must do the same.
fn pair_recordings(members: &[Member], dest: &Path) -> Result<Vec<Recording>> {
    let mut recordings = Vec::new();
    let mut pending_meta: Option<Metadata> = None;
    let mut pending_data: Option<PathBuf> = None;

    for member in members {
        match member.kind {
            Some(EntryKind::Dataset) => {
                pending_data = Some(dest.join(&member.rel_path));
            }
            Some(EntryKind::Metadata) => {
                let path = dest.join(&member.rel_path);
                pending_meta = Some(read_metadata(&path)?);
            }
            None => {}
        }
        match (pending_meta.take(), pending_data.take()) {
            (Some(metadata), Some(data_file)) => {
                recordings.push(Recording::from_parts(metadata, data_file));
            }
            (meta, data) => {
                pending_meta = meta;
                pending_data = data;
            }
        }
    }
    Ok(recordings)
}

fn read_metadata(path: &Path) -> Result<Metadata> {
    let bytes = fs::read(path)
        .map_err(|e| ArchiveError::File(format!("cannot read {}: {e}", path.display())))?;
    let root = serde_json::from_slice(&bytes)
        .map_err(|e| ArchiveError::Format(format!("invalid JSON in {}: {e}", path.display())))?;
    Ok(Metadata::from_value(root))
}

fn malformed(e: io::Error) -> ArchiveError {
    ArchiveError::File(format!("malformed archive: {e}"))
}
