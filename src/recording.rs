//! Recording handle and its in-memory metadata document.

use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ArchiveError, Result};

// ── Metadata keys ────────────────────────────────────────────────────────────

/// Top-level object describing the whole dataset.
pub const GLOBAL_KEY:      &str = "global";
/// Top-level array of capture segments.
pub const CAPTURES_KEY:    &str = "captures";
/// Top-level array of annotations.
pub const ANNOTATIONS_KEY: &str = "annotations";
/// Required dataset sample format, e.g. `"cf32_le"`.
pub const DATATYPE_KEY:    &str = "core:datatype";
/// Required format version the document conforms to.
pub const VERSION_KEY:     &str = "core:version";

// ── Metadata ─────────────────────────────────────────────────────────────────

/// In-memory metadata document.
///
/// Held as a raw JSON tree rather than a typed schema: the archive layer
/// only needs structural validity, and callers keep full access to
/// extension namespaces the schema does not know about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    root: Value,
}

impl Metadata {
    /// Empty skeleton with the three required top-level sections.
    /// Does not pass [`Metadata::validate`] until the global fields are set.
    pub fn new() -> Self {
        Self {
            root: json!({
                GLOBAL_KEY:      {},
                CAPTURES_KEY:    [],
                ANNOTATIONS_KEY: [],
            }),
        }
    }

    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn as_value_mut(&mut self) -> &mut Value {
        &mut self.root
    }

    /// Structural validity: `global` object carrying string `core:datatype`
    /// and `core:version`, plus `captures` and `annotations` arrays.
    /// Full schema semantics live with the caller.
    pub fn validate(&self) -> bool {
        let Some(global) = self.root.get(GLOBAL_KEY).and_then(Value::as_object) else {
            return false;
        };
        global.get(DATATYPE_KEY).is_some_and(Value::is_string)
            && global.get(VERSION_KEY).is_some_and(Value::is_string)
            && self.root.get(CAPTURES_KEY).is_some_and(Value::is_array)
            && self.root.get(ANNOTATIONS_KEY).is_some_and(Value::is_array)
    }

    /// Serialize as pretty-printed UTF-8 JSON.
    pub fn dump<W: Write>(&self, writer: W) -> io::Result<()> {
        serde_json::to_writer_pretty(writer, &self.root).map_err(io::Error::from)
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}

// ── Recording ────────────────────────────────────────────────────────────────

/// Handle pairing a metadata document with its dataset file on disk.
///
/// A recording is archivable once `name` and `data_file` are set (and
/// non-empty) and the metadata passes [`Metadata::validate`].  The packer
/// checks all three for the whole batch before writing anything.
#[derive(Debug, Clone)]
pub struct Recording {
    /// Archive entry name.  Must not contain path separators.
    pub name:      Option<String>,
    pub metadata:  Metadata,
    /// Path to the dataset bytes on disk.
    pub data_file: Option<PathBuf>,
}

impl Recording {
    pub fn new(metadata: Metadata) -> Self {
        Self { name: None, metadata, data_file: None }
    }

    /// Reconstruct a recording from an extracted metadata document and
    /// dataset path.  The name is the dataset file's stem.
    pub fn from_parts(metadata: Metadata, data_file: PathBuf) -> Self {
        let name = data_file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
        Self { name, metadata, data_file: Some(data_file) }
    }

    /// True when the metadata document is structurally valid.
    pub fn validate(&self) -> bool {
        self.metadata.validate()
    }

    /// Serialize the metadata as pretty-printed UTF-8 JSON.
    pub fn dump<W: Write>(&self, writer: W) -> io::Result<()> {
        self.metadata.dump(writer)
    }

    /// Pack just this recording into a fresh archive at `path`.
    /// The archive suffix rule applies; the resolved path is returned.
    pub fn archive<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        crate::archive::pack(std::slice::from_ref(self), path)
    }

    /// Pack just this recording into a caller-owned byte sink, appending
    /// after any entries the sink already holds.
    pub fn archive_into<S: Read + Write + Seek>(&self, sink: &mut S) -> Result<()> {
        crate::archive::pack_into(std::slice::from_ref(self), sink)
    }

    /// Read a single-recording archive.
    ///
    /// Containers holding zero or several recordings are refused; use
    /// [`crate::archive::extract`] for those.
    pub fn from_archive<P: AsRef<Path>>(path: P, dest: Option<&Path>) -> Result<Recording> {
        let mut recordings = crate::archive::extract(path, dest)?;
        if recordings.len() != 1 {
            return Err(ArchiveError::File(format!(
                "expected exactly one recording in the archive, found {}",
                recordings.len()
            )));
        }
        Ok(recordings.remove(0))
    }
}
