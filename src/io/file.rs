//! Plain file backend using positioned I/O

use super::{BackendKind, ByteIo, IoBackend, OpenMode};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Reads and writes a single flat file
#[derive(Debug, Default, Clone, Copy)]
pub struct FileBackend;

impl FileBackend {
    pub fn new() -> Self {
        Self
    }
}

impl IoBackend for FileBackend {
    fn open(&self, path: &Path, mode: OpenMode) -> io::Result<Box<dyn ByteIo>> {
        let writable = mode == OpenMode::ReadWrite;
        let file = match mode {
            OpenMode::ReadOnly => File::open(path)?,
            OpenMode::ReadWrite => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(path)?,
        };
        Ok(Box::new(FileIo { file, writable }))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::File
    }
}

struct FileIo {
    file: File,
    writable: bool,
}

impl ByteIo for FileIo {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        read_exact_at(&self.file, offset, buf)
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        write_all_at(&self.file, offset, buf)
    }

    fn supports_preallocate(&self) -> bool {
        true
    }

    fn preallocate(&mut self, len: u64) -> io::Result<()> {
        // never shrink an existing volume
        if self.file.metadata()?.len() < len {
            self.file.set_len(len)?;
        }
        Ok(())
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        if self.writable {
            self.file.sync_all()?;
        }
        Ok(())
    }
}

#[cfg(unix)]
pub(crate) fn read_exact_at(file: &File, offset: u64, buf: &mut [u8]) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(unix)]
pub(crate) fn write_all_at(file: &File, offset: u64, buf: &[u8]) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)
}

#[cfg(not(unix))]
pub(crate) fn read_exact_at(mut file: &File, offset: u64, buf: &mut [u8]) -> io::Result<()> {
    use std::io::{Read, Seek, SeekFrom};
    file.seek(SeekFrom::Start(offset))?;
    file.read_exact(buf)
}

#[cfg(not(unix))]
pub(crate) fn write_all_at(mut file: &File, offset: u64, buf: &[u8]) -> io::Result<()> {
    use std::io::{Seek, SeekFrom, Write};
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(buf)
}
