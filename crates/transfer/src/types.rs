use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::chunked::ChunkRange;
use crate::validation::validate_file_name;
use crate::TransferError;

/// A read-only byte source of known size that can be sliced at random.
///
/// Implementations are shared with blocking reader tasks, hence
/// `Send + Sync`; reads never mutate the payload.
pub trait Payload: Send + Sync {
    /// File name recorded on the vault item.
    fn name(&self) -> &str;

    /// Total size in bytes.
    fn size(&self) -> u64;

    /// Reads exactly the bytes of `range`.
    fn read_range(&self, range: &ChunkRange) -> Result<Vec<u8>, TransferError>;
}

/// Something that yields a payload on demand (a file picker, a path...).
pub trait PayloadSource {
    fn open(&self) -> Result<Arc<dyn Payload>, TransferError>;
}

fn check_bounds(range: &ChunkRange, size: u64) -> Result<(), TransferError> {
    if range.offset > range.last_byte || range.last_byte >= size {
        return Err(TransferError::RangeOutOfBounds {
            offset: range.offset,
            last_byte: range.last_byte,
            size,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// FilePayload
// ---------------------------------------------------------------------------

/// Payload backed by a file on disk.
///
/// The size is captured when opened; each read opens its own handle, so
/// concurrent readers never share a cursor.
#[derive(Debug, Clone)]
pub struct FilePayload {
    path: PathBuf,
    name: String,
    size: u64,
}

impl FilePayload {
    /// Opens `path` and records its size. The payload name is the file name.
    pub fn open(path: &Path) -> Result<Self, TransferError> {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(TransferError::InvalidFileName(format!(
                "not a regular file: {}",
                path.display()
            )));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        validate_file_name(&name)?;
        debug!(path = %path.display(), size = metadata.len(), "opened payload file");

        Ok(Self {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
        })
    }

    /// Uploads the file under a different name.
    pub fn with_name(mut self, name: impl Into<String>) -> Result<Self, TransferError> {
        let name = name.into();
        validate_file_name(&name)?;
        self.name = name;
        Ok(self)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Payload for FilePayload {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn read_range(&self, range: &ChunkRange) -> Result<Vec<u8>, TransferError> {
        check_bounds(range, self.size)?;
        debug!(
            path = %self.path.display(),
            offset = range.offset,
            len = range.len(),
            "reading payload range"
        );
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(range.offset))?;
        let mut buf = vec![0u8; range.len() as usize];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// Opens a [`FilePayload`] from a path, optionally renaming it.
#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: PathBuf,
    pub name: Option<String>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            name: None,
        }
    }
}

impl PayloadSource for FileSource {
    fn open(&self) -> Result<Arc<dyn Payload>, TransferError> {
        let payload = FilePayload::open(&self.path)?;
        let payload = match &self.name {
            Some(name) => payload.with_name(name.clone())?,
            None => payload,
        };
        Ok(Arc::new(payload))
    }
}

// ---------------------------------------------------------------------------
// MemoryPayload
// ---------------------------------------------------------------------------

/// Payload held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryPayload {
    name: String,
    data: Vec<u8>,
}

impl MemoryPayload {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

impl Payload for MemoryPayload {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_range(&self, range: &ChunkRange) -> Result<Vec<u8>, TransferError> {
        check_bounds(range, self.size())?;
        Ok(self.data[range.offset as usize..=range.last_byte as usize].to_vec())
    }
}
