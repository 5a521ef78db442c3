//! Backend that logs every call and performs no I/O

use super::{BackendKind, ByteIo, IoBackend, OpenMode};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// Logs each operation at `info` under the `ook::debug` target.
///
/// Reads leave the caller's buffer untouched. Chain it in front of a real
/// backend with [`super::ChainBackend`] to trace actual traffic.
#[derive(Debug, Default, Clone, Copy)]
pub struct DebugBackend;

impl DebugBackend {
    pub fn new() -> Self {
        Self
    }
}

impl IoBackend for DebugBackend {
    fn open(&self, path: &Path, mode: OpenMode) -> io::Result<Box<dyn ByteIo>> {
        info!(target: "ook::debug", "opening {} ({:?})", path.display(), mode);
        Ok(Box::new(DebugIo {
            path: path.to_path_buf(),
        }))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Debug
    }
}

struct DebugIo {
    path: PathBuf,
}

impl ByteIo for DebugIo {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        info!(
            target: "ook::debug",
            "reading {} bytes at {} from {}",
            buf.len(),
            offset,
            self.path.display()
        );
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        info!(
            target: "ook::debug",
            "writing {} bytes at {} into {}",
            buf.len(),
            offset,
            self.path.display()
        );
        Ok(())
    }

    fn supports_preallocate(&self) -> bool {
        true
    }

    fn preallocate(&mut self, len: u64) -> io::Result<()> {
        info!(
            target: "ook::debug",
            "preallocating {} bytes for {}",
            len,
            self.path.display()
        );
        Ok(())
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        info!(target: "ook::debug", "closing {}", self.path.display());
        Ok(())
    }
}
