//! Byte-level I/O backends
//!
//! A volume never touches storage directly. It asks an [`IoBackend`] to open
//! a resource and then issues positioned, all-or-nothing transfers against
//! the returned [`ByteIo`] handle. Backends compose: [`ChainBackend`] runs
//! two of them in series, and [`DebugBackend`] only logs.

mod chain;
mod debug;
mod file;
mod memory;
mod mmap;
mod stack;

pub use chain::ChainBackend;
pub use debug::DebugBackend;
pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use mmap::MmapBackend;
pub use stack::StackBackend;

use crate::error::{OokError, Result};
use crate::metadata::VolumeMetadata;
use std::io;
use std::path::{Path, PathBuf};

/// Access mode requested when opening a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Existing resource, reads only
    ReadOnly,
    /// Read and write; created if the backend supports creation
    ReadWrite,
}

/// Backend implementation types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Positioned reads/writes on a regular file
    File,
    /// Memory-mapped file
    Mmap,
    /// Directory of raw 2-D slices
    Stack,
    /// In-process buffers
    Memory,
    /// Logs calls, moves no data
    Debug,
    /// Two backends in series
    Chain,
}

impl BackendKind {
    /// Parse backend kind from URL scheme
    pub fn from_url(url: &str) -> Result<Self> {
        if let Some(scheme_end) = url.find("://") {
            let scheme = &url[..scheme_end];
            match scheme {
                "file" => Ok(BackendKind::File),
                "mmap" => Ok(BackendKind::Mmap),
                "stack" => Ok(BackendKind::Stack),
                "debug" => Ok(BackendKind::Debug),
                _ => Err(OokError::invalid(format!("Unknown scheme: {}", scheme))),
            }
        } else {
            // Assume a plain file if no scheme
            Ok(BackendKind::File)
        }
    }
}

/// An open resource supporting positioned byte transfers.
///
/// Transfers are atomic in the sense that matters here: a call either moves
/// every requested byte or returns an error. There is no partial count.
pub trait ByteIo: Send {
    /// Fill `buf` with the bytes at `offset`
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Store `buf` at `offset`
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        let _ = (offset, buf);
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "backend does not support writing",
        ))
    }

    /// Whether [`ByteIo::preallocate`] does anything
    fn supports_preallocate(&self) -> bool {
        false
    }

    /// Reserve `len` bytes of backing storage
    fn preallocate(&mut self, len: u64) -> io::Result<()> {
        let _ = len;
        Ok(())
    }

    /// Release the resource
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// Opens resources for a particular kind of storage
pub trait IoBackend: Send + Sync {
    /// Open `path` in the given mode
    fn open(&self, path: &Path, mode: OpenMode) -> io::Result<Box<dyn ByteIo>>;

    /// Get the backend type
    fn kind(&self) -> BackendKind;
}

impl<B: IoBackend + ?Sized> IoBackend for Box<B> {
    fn open(&self, path: &Path, mode: OpenMode) -> io::Result<Box<dyn ByteIo>> {
        (**self).open(path, mode)
    }

    fn kind(&self) -> BackendKind {
        (**self).kind()
    }
}

/// Parse a URL (or plain path) and create the matching backend.
///
/// The slice stack needs the volume geometry to map byte offsets to slices,
/// hence the metadata argument. Returns the backend and the path part of the
/// URL.
pub fn create_backend(
    url: &str,
    metadata: &VolumeMetadata,
) -> Result<(Box<dyn IoBackend>, PathBuf)> {
    let kind = BackendKind::from_url(url)?;
    let path = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    };
    if path.is_empty() {
        return Err(OokError::invalid(format!("URL '{}' has an empty path", url)));
    }

    let backend: Box<dyn IoBackend> = match kind {
        BackendKind::File => Box::new(FileBackend::new()),
        BackendKind::Mmap => Box::new(MmapBackend::new()),
        BackendKind::Stack => Box::new(StackBackend::new(metadata.dims, metadata.voxel_bytes())),
        BackendKind::Debug => Box::new(DebugBackend::new()),
        BackendKind::Memory | BackendKind::Chain => {
            return Err(OokError::invalid(format!(
                "{:?} backends are built in code, not from URLs",
                kind
            )))
        }
    };
    Ok((backend, PathBuf::from(path)))
}
