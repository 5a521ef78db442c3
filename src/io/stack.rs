//! Directory-of-slices backend
//!
//! Each file in the directory holds one Z slice of `Dx * Dy` voxels, raw and
//! headerless. Files are ordered by name, so `slice_000.raw`, `slice_001.raw`
//! and so on line up with increasing Z.

use super::file::{read_exact_at, write_all_at};
use super::{BackendKind, ByteIo, IoBackend, OpenMode};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Presents a stack of 2-D slice files as one linear volume
#[derive(Debug, Clone, Copy)]
pub struct StackBackend {
    dims: [u64; 3],
    voxel_bytes: usize,
}

impl StackBackend {
    /// `voxel_bytes` is element width times component count
    pub fn new(dims: [u64; 3], voxel_bytes: usize) -> Self {
        Self { dims, voxel_bytes }
    }

    fn slice_bytes(&self) -> u64 {
        self.dims[0] * self.dims[1] * self.voxel_bytes as u64
    }
}

/// Visible regular files of `dir`, sorted by name
fn list_slices(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        if entry.file_type()?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}

impl IoBackend for StackBackend {
    fn open(&self, path: &Path, mode: OpenMode) -> io::Result<Box<dyn ByteIo>> {
        let paths = list_slices(path)?;
        if paths.len() as u64 != self.dims[2] {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "{} holds {} slices, volume needs {}",
                    path.display(),
                    paths.len(),
                    self.dims[2]
                ),
            ));
        }

        let slices = paths
            .iter()
            .map(|p| match mode {
                OpenMode::ReadOnly => File::open(p),
                OpenMode::ReadWrite => OpenOptions::new().read(true).write(true).open(p),
            })
            .collect::<io::Result<Vec<_>>>()?;
        debug!("opened {} slices under {}", slices.len(), path.display());

        Ok(Box::new(StackIo {
            slices,
            slice_bytes: self.slice_bytes(),
        }))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Stack
    }
}

struct StackIo {
    slices: Vec<File>,
    slice_bytes: u64,
}

impl StackIo {
    /// Split `[offset, offset + len)` at slice boundaries.
    ///
    /// Calls `f(slice, offset_in_slice, start, end)` for each piece, where
    /// `start..end` is the matching range of the caller's buffer.
    fn for_each_piece(
        &self,
        offset: u64,
        len: usize,
        mut f: impl FnMut(&File, u64, usize, usize) -> io::Result<()>,
    ) -> io::Result<()> {
        let total = self.slice_bytes * self.slices.len() as u64;
        if offset + len as u64 > total {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("range of {} bytes at {} beyond stack of {} bytes", len, offset, total),
            ));
        }

        let mut done = 0usize;
        while done < len {
            let pos = offset + done as u64;
            let slice = (pos / self.slice_bytes) as usize;
            let within = pos % self.slice_bytes;
            let piece = ((self.slice_bytes - within) as usize).min(len - done);
            f(&self.slices[slice], within, done, done + piece)?;
            done += piece;
        }
        Ok(())
    }
}

impl ByteIo for StackIo {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let len = buf.len();
        self.for_each_piece(offset, len, |file, at, start, end| {
            read_exact_at(file, at, &mut buf[start..end])
        })
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        self.for_each_piece(offset, buf.len(), |file, at, start, end| {
            write_all_at(file, at, &buf[start..end])
        })
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}
