//! In-process backend holding each resource in a growable buffer

use super::{BackendKind, ByteIo, IoBackend, OpenMode};
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type Store = Arc<Mutex<HashMap<PathBuf, BytesMut>>>;

/// Keeps resources in memory, keyed by path.
///
/// Clones share the same store, so data written through one volume can be
/// read back through another, or inspected with [`MemoryBackend::get`].
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    store: Store,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed (or replace) a resource
    pub fn insert(&self, path: impl Into<PathBuf>, data: impl AsRef<[u8]>) {
        self.store
            .lock()
            .insert(path.into(), BytesMut::from(data.as_ref()));
    }

    /// Snapshot of a resource's current contents
    pub fn get(&self, path: impl AsRef<Path>) -> Option<Bytes> {
        self.store
            .lock()
            .get(path.as_ref())
            .map(|buf| Bytes::copy_from_slice(buf))
    }

    /// Drop a resource
    pub fn remove(&self, path: impl AsRef<Path>) -> Option<Bytes> {
        self.store.lock().remove(path.as_ref()).map(BytesMut::freeze)
    }
}

impl IoBackend for MemoryBackend {
    fn open(&self, path: &Path, mode: OpenMode) -> io::Result<Box<dyn ByteIo>> {
        let mut store = self.store.lock();
        match mode {
            OpenMode::ReadOnly if !store.contains_key(path) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no in-memory resource at {}", path.display()),
                ));
            }
            OpenMode::ReadOnly => {}
            OpenMode::ReadWrite => {
                store.entry(path.to_path_buf()).or_default();
            }
        }
        Ok(Box::new(MemoryIo {
            store: Arc::clone(&self.store),
            path: path.to_path_buf(),
            mode,
        }))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }
}

struct MemoryIo {
    store: Store,
    path: PathBuf,
    mode: OpenMode,
}

impl MemoryIo {
    fn with_buffer<R>(&self, f: impl FnOnce(&mut BytesMut) -> io::Result<R>) -> io::Result<R> {
        let mut store = self.store.lock();
        let buf = store.get_mut(&self.path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("in-memory resource {} was removed", self.path.display()),
            )
        })?;
        f(buf)
    }

    fn check_writable(&self) -> io::Result<()> {
        if self.mode == OpenMode::ReadWrite {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "resource opened read-only",
            ))
        }
    }
}

impl ByteIo for MemoryIo {
    fn read_at(&mut self, offset: u64, out: &mut [u8]) -> io::Result<()> {
        self.with_buffer(|buf| {
            let start = offset as usize;
            let end = start + out.len();
            if end > buf.len() {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("read to {} past end of {} bytes", end, buf.len()),
                ));
            }
            out.copy_from_slice(&buf[start..end]);
            Ok(())
        })
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.check_writable()?;
        self.with_buffer(|buf| {
            let start = offset as usize;
            let end = start + data.len();
            if end > buf.len() {
                buf.resize(end, 0);
            }
            buf[start..end].copy_from_slice(data);
            Ok(())
        })
    }

    fn supports_preallocate(&self) -> bool {
        self.mode == OpenMode::ReadWrite
    }

    fn preallocate(&mut self, len: u64) -> io::Result<()> {
        self.check_writable()?;
        self.with_buffer(|buf| {
            if (len as usize) > buf.len() {
                buf.resize(len as usize, 0);
            }
            Ok(())
        })
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_roundtrip_shared_between_clones() {
        let backend = MemoryBackend::new();
        let other = backend.clone();

        let mut handle = backend.open(Path::new("vol"), OpenMode::ReadWrite).unwrap();
        handle.write_at(2, &[5, 6]).unwrap();
        handle.close().unwrap();

        assert_eq!(other.get("vol").unwrap().as_ref(), &[0, 0, 5, 6]);

        let mut handle = other.open(Path::new("vol"), OpenMode::ReadOnly).unwrap();
        let mut buf = [0u8; 2];
        handle.read_at(2, &mut buf).unwrap();
        assert_eq!(buf, [5, 6]);
        assert!(handle.write_at(0, &[1]).is_err());
        assert!(handle.read_at(3, &mut buf).is_err());
    }

    #[test]
    fn test_memory_read_only_requires_resource() {
        let backend = MemoryBackend::new();
        let err = backend
            .open(Path::new("missing"), OpenMode::ReadOnly)
            .err()
            .unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_memory_preallocate() {
        let backend = MemoryBackend::new();
        let mut handle = backend.open(Path::new("p"), OpenMode::ReadWrite).unwrap();
        handle.preallocate(64).unwrap();
        assert_eq!(backend.get("p").unwrap().len(), 64);
        assert_eq!(backend.remove("p").unwrap().len(), 64);
        assert!(backend.get("p").is_none());
    }
}
