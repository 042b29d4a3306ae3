pub mod archive;
pub mod error;
pub mod format;
pub mod recording;

pub use archive::{extract, pack, pack_into};
pub use error::{ArchiveError, Result};
pub use format::{SIGMF_ARCHIVE_EXT, SIGMF_DATASET_EXT, SIGMF_METADATA_EXT};
pub use recording::{Metadata, Recording};
