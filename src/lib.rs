//! ook - brick-oriented I/O for large 3-D volumes
//!
//! A volume is a dense 3-D array (optionally with interleaved components)
//! stored as one flat, headerless byte array. This crate presents it as a
//! grid of fixed-size bricks that can each be read or written on their own,
//! translating every brick access into scanline-sized transfers against a
//! pluggable byte backend.
//!
//! # Features
//!
//! - Brick addressing by linear id or 3-D coordinate, with partial edge bricks
//! - File, memory-mapped, slice-stack, in-memory and logging backends
//! - Backends compose (a logging stage in front of a real one)
//! - JSON sidecar metadata
//! - Typed views and per-brick kernels used by the `ook-*` tools
//!
//! # Example
//!
//! ```rust
//! use ook::{MemoryBackend, TypeTag, Volume, VolumeMetadata};
//!
//! # fn main() -> ook::Result<()> {
//! let backend = MemoryBackend::new();
//! let metadata = VolumeMetadata::new([15, 2, 1], [8, 2, 1], TypeTag::Float32, 1);
//!
//! let mut volume = Volume::create(&backend, "head.raw", metadata)?;
//! let extent = volume.brick_extent(1usize)?;
//! assert_eq!(extent, [7, 2, 1]);
//! volume.write_brick_from(1usize, &[1.0f32; 14])?;
//!
//! let mut buf = volume.alloc_brick()?;
//! volume.read_brick(1usize, &mut buf)?;
//! volume.close()?;
//! # Ok(())
//! # }
//! ```

pub mod brick;
pub mod cli;
pub mod error;
pub mod io;
pub mod layout;
pub mod metadata;
pub mod ops;
pub mod types;
pub mod utils;
pub mod volume;

// Re-exports
pub use error::{IoOp, OokError, Result};
pub use io::{
    create_backend, BackendKind, ByteIo, ChainBackend, DebugBackend, FileBackend, IoBackend,
    MemoryBackend, MmapBackend, OpenMode, StackBackend,
};
pub use layout::{BrickId, BrickLayout, Scanline, ScanlinePlan};
pub use metadata::{sidecar_path, VolumeMetadata};
pub use types::{Element, TypeTag};
pub use volume::Volume;

/// Version of the ook crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
