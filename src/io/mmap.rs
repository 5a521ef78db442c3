//! Memory-mapped file backend

use super::{BackendKind, ByteIo, IoBackend, OpenMode};
use memmap2::{Mmap, MmapMut, MmapOptions};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Maps the whole file and serves transfers with memory copies
#[derive(Debug, Default, Clone, Copy)]
pub struct MmapBackend;

impl MmapBackend {
    pub fn new() -> Self {
        Self
    }
}

impl IoBackend for MmapBackend {
    fn open(&self, path: &Path, mode: OpenMode) -> io::Result<Box<dyn ByteIo>> {
        let file = match mode {
            OpenMode::ReadOnly => File::open(path)?,
            OpenMode::ReadWrite => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(path)?,
        };
        let map = Mapping::new(&file, mode)?;
        Ok(Box::new(MmapIo { file, mode, map }))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Mmap
    }
}

enum Mapping {
    /// Zero-length files cannot be mapped
    Empty,
    ReadOnly(Mmap),
    ReadWrite(MmapMut),
}

impl Mapping {
    fn new(file: &File, mode: OpenMode) -> io::Result<Self> {
        if file.metadata()?.len() == 0 {
            return Ok(Mapping::Empty);
        }
        // SAFETY: the file stays open for the life of the mapping. Other
        // processes truncating it underneath us is outside what we can guard.
        #[allow(unsafe_code)]
        let map = unsafe {
            match mode {
                OpenMode::ReadOnly => Mapping::ReadOnly(MmapOptions::new().map(file)?),
                OpenMode::ReadWrite => Mapping::ReadWrite(MmapOptions::new().map_mut(file)?),
            }
        };
        Ok(map)
    }

    fn bytes(&self) -> &[u8] {
        match self {
            Mapping::Empty => &[],
            Mapping::ReadOnly(m) => &m[..],
            Mapping::ReadWrite(m) => &m[..],
        }
    }

    fn flush(&self) -> io::Result<()> {
        match self {
            Mapping::ReadWrite(m) => m.flush(),
            _ => Ok(()),
        }
    }
}

struct MmapIo {
    file: File,
    mode: OpenMode,
    map: Mapping,
}

impl MmapIo {
    /// Extend the file to `len` bytes and remap it
    fn grow(&mut self, len: u64) -> io::Result<()> {
        if self.mode != OpenMode::ReadWrite {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "mapping is read-only",
            ));
        }
        if len <= self.map.bytes().len() as u64 {
            return Ok(());
        }
        self.map.flush()?;
        self.map = Mapping::Empty;
        self.file.set_len(len)?;
        self.map = Mapping::new(&self.file, self.mode)?;
        Ok(())
    }
}

impl ByteIo for MmapIo {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let bytes = self.map.bytes();
        let start = offset as usize;
        let end = start
            .checked_add(buf.len())
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "read of {} bytes at {} beyond mapping of {} bytes",
                        buf.len(),
                        offset,
                        bytes.len()
                    ),
                )
            })?;
        buf.copy_from_slice(&bytes[start..end]);
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        let end = offset + buf.len() as u64;
        self.grow(end)?;
        match &mut self.map {
            Mapping::ReadWrite(m) => {
                m[offset as usize..end as usize].copy_from_slice(buf);
                Ok(())
            }
            // grow() succeeded, so anything but an empty write has a mutable map
            _ if buf.is_empty() => Ok(()),
            _ => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "mapping is read-only",
            )),
        }
    }

    fn supports_preallocate(&self) -> bool {
        self.mode == OpenMode::ReadWrite
    }

    fn preallocate(&mut self, len: u64) -> io::Result<()> {
        self.grow(len)
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        self.map.flush()
    }
}
