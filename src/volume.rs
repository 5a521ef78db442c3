//! Volume handle: brick reads and writes over a byte backend

use crate::error::{IoOp, OokError, Result};
use crate::io::{BackendKind, ByteIo, IoBackend, OpenMode};
use crate::layout::{BrickId, BrickLayout};
use crate::metadata::VolumeMetadata;
use crate::types::Element;
use crate::utils::{bytes_to_typed, typed_to_bytes};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// An open volume.
///
/// Owns its backend handle exclusively. [`Volume::close`] consumes the
/// volume; a volume dropped while still open closes its handle and logs
/// any failure.
pub struct Volume {
    handle: Option<Box<dyn ByteIo>>,
    metadata: VolumeMetadata,
    layout: BrickLayout,
    path: PathBuf,
    kind: BackendKind,
}

impl Volume {
    /// Open an existing volume for reading
    pub fn open(
        backend: &dyn IoBackend,
        path: impl AsRef<Path>,
        metadata: VolumeMetadata,
    ) -> Result<Self> {
        let volume = Self::open_with(backend, path.as_ref(), metadata, OpenMode::ReadOnly)?;
        debug!(
            "opened {} via {:?} backend: {}",
            volume.path.display(),
            volume.kind,
            metadata.summary()
        );
        Ok(volume)
    }

    /// Open (creating if needed) a volume for reading and writing.
    ///
    /// Backing storage for the whole volume is preallocated when the backend
    /// supports it. A failed preallocation is only logged.
    pub fn create(
        backend: &dyn IoBackend,
        path: impl AsRef<Path>,
        metadata: VolumeMetadata,
    ) -> Result<Self> {
        let mut volume = Self::open_with(backend, path.as_ref(), metadata, OpenMode::ReadWrite)?;
        let total = metadata.total_bytes();
        let handle = volume.handle()?;
        if handle.supports_preallocate() {
            if let Err(e) = handle.preallocate(total) {
                warn!(
                    "preallocating {} bytes for {} failed: {}",
                    total,
                    volume.path.display(),
                    e
                );
            }
        }
        debug!(
            "created {} via {:?} backend: {}",
            volume.path.display(),
            volume.kind,
            metadata.summary()
        );
        Ok(volume)
    }

    fn open_with(
        backend: &dyn IoBackend,
        path: &Path,
        metadata: VolumeMetadata,
        mode: OpenMode,
    ) -> Result<Self> {
        metadata.validate()?;
        if path.as_os_str().is_empty() {
            return Err(OokError::invalid("volume path is empty"));
        }
        let handle = backend
            .open(path, mode)
            .map_err(|source| OokError::BackendOpen {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            handle: Some(handle),
            metadata,
            layout: metadata.layout(),
            path: path.to_path_buf(),
            kind: backend.kind(),
        })
    }

    fn handle(&mut self) -> Result<&mut (dyn ByteIo + 'static)> {
        self.handle
            .as_deref_mut()
            .ok_or_else(|| OokError::invalid("volume is closed"))
    }

    fn check_id(&self, id: BrickId) -> Result<()> {
        if self.layout.contains(id) {
            Ok(())
        } else {
            Err(OokError::invalid(format!(
                "brick {:?} outside layout {:?}",
                id,
                self.layout.nbricks()
            )))
        }
    }

    /// Metadata the volume was opened with
    pub fn metadata(&self) -> &VolumeMetadata {
        &self.metadata
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Type of backend serving this volume
    pub fn backend_kind(&self) -> BackendKind {
        self.kind
    }

    pub fn layout(&self) -> &BrickLayout {
        &self.layout
    }

    /// Number of bricks
    pub fn brick_count(&self) -> usize {
        self.layout.brick_count()
    }

    /// Actual shape of a brick
    pub fn brick_extent(&self, id: impl Into<BrickId>) -> Result<[usize; 3]> {
        let id = id.into();
        self.check_id(id)?;
        Ok(self.layout.brick_extent(id))
    }

    /// Bytes in a nominal brick; the minimum buffer for [`Volume::read_brick`]
    pub fn brick_bytes(&self) -> usize {
        self.metadata.brick_bytes()
    }

    /// Bytes in a brick's actual extent, tightly packed
    pub fn extent_bytes(&self, id: impl Into<BrickId>) -> Result<usize> {
        let extent = self.brick_extent(id)?;
        Ok(extent.iter().product::<usize>() * self.metadata.voxel_bytes())
    }

    /// Zeroed buffer large enough for any brick of this volume
    pub fn alloc_brick(&self) -> Result<Vec<u8>> {
        let len = self.brick_bytes();
        let mut buf = Vec::new();
        buf.try_reserve_exact(len).map_err(|e| {
            OokError::OutOfMemory(format!("brick buffer of {} bytes: {}", len, e))
        })?;
        buf.resize(len, 0);
        Ok(buf)
    }

    /// Read one brick into `out`, tightly packed to the brick's extent.
    ///
    /// `out` must hold at least a nominal brick; bytes past the extent are
    /// left as they were. Stops at the first failing scanline, after which
    /// the contents of `out` are unspecified.
    pub fn read_brick(&mut self, id: impl Into<BrickId>, out: &mut [u8]) -> Result<()> {
        let id = id.into();
        self.check_id(id)?;
        if out.len() < self.brick_bytes() {
            return Err(OokError::invalid(format!(
                "brick buffer holds {} bytes, need {}",
                out.len(),
                self.brick_bytes()
            )));
        }

        let plan = self.layout.scanline_plan(id, self.metadata.voxel_bytes());
        trace!("reading brick {:?} with extent {:?}", id, plan.extent());
        let handle = self.handle()?;
        for line in plan {
            handle
                .read_at(line.source, &mut out[line.target..line.target + line.len])
                .map_err(|source| OokError::BackendIo {
                    op: IoOp::Read,
                    offset: line.source,
                    len: line.len,
                    source,
                })?;
        }
        Ok(())
    }

    /// Write one brick from `data`, tightly packed to the brick's extent
    pub fn write_brick(&mut self, id: impl Into<BrickId>, data: &[u8]) -> Result<()> {
        let id = id.into();
        let needed = self.extent_bytes(id)?;
        if data.len() < needed {
            return Err(OokError::invalid(format!(
                "brick data holds {} bytes, extent needs {}",
                data.len(),
                needed
            )));
        }

        let plan = self.layout.scanline_plan(id, self.metadata.voxel_bytes());
        trace!("writing brick {:?} with extent {:?}", id, plan.extent());
        let handle = self.handle()?;
        for line in plan {
            handle
                .write_at(line.source, &data[line.target..line.target + line.len])
                .map_err(|source| OokError::BackendIo {
                    op: IoOp::Write,
                    offset: line.source,
                    len: line.len,
                    source,
                })?;
        }
        Ok(())
    }

    fn check_type<T: Element>(&self) -> Result<()> {
        if T::TAG == self.metadata.element_type {
            Ok(())
        } else {
            Err(OokError::invalid(format!(
                "volume holds {} elements, not {}",
                self.metadata.element_type,
                T::TAG
            )))
        }
    }

    /// Read a brick and decode its extent
    pub fn read_brick_as<T: Element>(&mut self, id: impl Into<BrickId>) -> Result<Vec<T>> {
        self.check_type::<T>()?;
        let id = id.into();
        let mut buf = self.alloc_brick()?;
        self.read_brick(id, &mut buf)?;
        buf.truncate(self.extent_bytes(id)?);
        bytes_to_typed(&buf)
    }

    /// Encode and write a brick's extent
    pub fn write_brick_from<T: Element>(
        &mut self,
        id: impl Into<BrickId>,
        data: &[T],
    ) -> Result<()> {
        self.check_type::<T>()?;
        self.write_brick(id, &typed_to_bytes(data))
    }

    /// Close the backend handle
    pub fn close(mut self) -> Result<()> {
        debug!("closing {}", self.path.display());
        match self.handle.take() {
            Some(handle) => handle.close().map_err(OokError::BackendClose),
            None => Ok(()),
        }
    }
}

impl Drop for Volume {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            warn!("volume {} dropped without close", self.path.display());
            if let Err(e) = handle.close() {
                warn!("closing {} failed: {}", self.path.display(), e);
            }
        }
    }
}

impl std::fmt::Debug for Volume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Volume")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("metadata", &self.metadata)
            .field("open", &self.handle.is_some())
            .finish()
    }
}
