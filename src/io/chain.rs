//! Backend that runs two other backends in series

use super::{BackendKind, ByteIo, IoBackend, OpenMode};
use std::io;
use std::path::Path;
use tracing::warn;

/// Forwards every call to `first`, then to `second`.
///
/// A failure in the first stage stops the call before the second runs.
/// Reads land in the same buffer, so the second stage's data wins. Close is
/// the exception: both stages are always closed so neither handle leaks.
pub struct ChainBackend {
    first: Box<dyn IoBackend>,
    second: Box<dyn IoBackend>,
}

impl ChainBackend {
    pub fn new(first: impl IoBackend + 'static, second: impl IoBackend + 'static) -> Self {
        Self {
            first: Box::new(first),
            second: Box::new(second),
        }
    }

    /// Chain two already-boxed backends
    pub fn from_boxed(first: Box<dyn IoBackend>, second: Box<dyn IoBackend>) -> Self {
        Self { first, second }
    }
}

impl IoBackend for ChainBackend {
    fn open(&self, path: &Path, mode: OpenMode) -> io::Result<Box<dyn ByteIo>> {
        let first = self.first.open(path, mode)?;
        let second = match self.second.open(path, mode) {
            Ok(handle) => handle,
            Err(e) => {
                if let Err(close_err) = first.close() {
                    warn!(
                        "closing first chain stage for {} failed: {}",
                        path.display(),
                        close_err
                    );
                }
                return Err(e);
            }
        };
        Ok(Box::new(ChainIo { first, second }))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Chain
    }
}

struct ChainIo {
    first: Box<dyn ByteIo>,
    second: Box<dyn ByteIo>,
}

impl ByteIo for ChainIo {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.first.read_at(offset, buf)?;
        self.second.read_at(offset, buf)
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        self.first.write_at(offset, buf)?;
        self.second.write_at(offset, buf)
    }

    fn supports_preallocate(&self) -> bool {
        self.first.supports_preallocate() || self.second.supports_preallocate()
    }

    fn preallocate(&mut self, len: u64) -> io::Result<()> {
        self.first.preallocate(len)?;
        self.second.preallocate(len)
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        let first = self.first.close();
        let second = self.second.close();
        first.and(second)
    }
}
