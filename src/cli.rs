//! Pieces shared by the command line tools

use crate::io::{create_backend, ChainBackend, DebugBackend, IoBackend};
use crate::metadata::{clamp_brick_shape, sidecar_path, VolumeMetadata, DEFAULT_BRICK_EDGE};
use crate::types::TypeTag;
use crate::utils::parse_triple;
use crate::volume::Volume;
use anyhow::{bail, Context};
use clap::{ArgAction, Args};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

/// Volume geometry and logging flags
#[derive(Args, Debug, Clone, Default)]
pub struct VolumeArgs {
    /// Voxels along X
    #[arg(short = 'x', long = "dx")]
    pub dx: Option<u64>,

    /// Voxels along Y
    #[arg(short = 'y', long = "dy")]
    pub dy: Option<u64>,

    /// Voxels along Z
    #[arg(short = 'z', long = "dz")]
    pub dz: Option<u64>,

    /// Element type (i8 u8 i16 u16 i32 u32 i64 u64 f d)
    #[arg(short = 't', long = "type")]
    pub element_type: Option<TypeTag>,

    /// Interleaved components per voxel
    #[arg(long)]
    pub components: Option<usize>,

    /// Brick shape as X,Y,Z, clamped to the volume
    #[arg(long, value_parser = parse_brick)]
    pub brick: Option<[usize; 3]>,

    /// Read the geometry from a JSON sidecar instead
    #[arg(long)]
    pub meta: Option<PathBuf>,

    /// Write a JSON sidecar next to the output
    #[arg(long)]
    pub save_meta: bool,

    /// Log every backend call
    #[arg(long)]
    pub trace: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

fn parse_brick(s: &str) -> Result<[usize; 3], String> {
    parse_triple(s).map_err(|e| e.to_string())
}

impl VolumeArgs {
    /// Geometry from the flags, with 64-voxel bricks by default
    pub fn metadata(&self) -> anyhow::Result<VolumeMetadata> {
        self.metadata_with_brick([DEFAULT_BRICK_EDGE; 3])
    }

    /// Geometry from the flags, falling back to `default_brick` (clamped)
    pub fn metadata_with_brick(&self, default_brick: [usize; 3]) -> anyhow::Result<VolumeMetadata> {
        if let Some(meta) = &self.meta {
            let mut md = VolumeMetadata::from_json_file(meta)
                .with_context(|| format!("Failed to load metadata from {}", meta.display()))?;
            if let Some(element_type) = self.element_type {
                md.element_type = element_type;
            }
            return Ok(md);
        }

        let (Some(dx), Some(dy), Some(dz)) = (self.dx, self.dy, self.dz) else {
            bail!("volume dimensions are required (-x, -y, -z or --meta)");
        };
        let Some(element_type) = self.element_type else {
            bail!("element type is required (-t or --meta)");
        };
        let dims = [dx, dy, dz];
        let brick_shape = clamp_brick_shape(self.brick.unwrap_or(default_brick), dims);

        let md = VolumeMetadata::builder()
            .dims(dims)
            .brick_shape(brick_shape)
            .element_type(element_type)
            .components(self.components.unwrap_or(1))
            .build()?;
        Ok(md)
    }

    /// Backend for `url`, with a logging stage in front under `--trace`
    pub fn backend(
        &self,
        url: &str,
        metadata: &VolumeMetadata,
    ) -> anyhow::Result<(Box<dyn IoBackend>, PathBuf)> {
        let (backend, path) =
            create_backend(url, metadata).with_context(|| format!("Bad volume location '{}'", url))?;
        if self.trace {
            let chained = ChainBackend::from_boxed(Box::new(DebugBackend::new()), backend);
            return Ok((Box::new(chained), path));
        }
        Ok((backend, path))
    }

    /// Open `url` for reading
    pub fn open(&self, url: &str, metadata: VolumeMetadata) -> anyhow::Result<Volume> {
        let (backend, path) = self.backend(url, &metadata)?;
        Volume::open(backend.as_ref(), &path, metadata)
            .with_context(|| format!("Failed to open {}", url))
    }

    /// Create `url` for writing, saving a sidecar under `--save-meta`
    pub fn create(&self, url: &str, metadata: VolumeMetadata) -> anyhow::Result<Volume> {
        let (backend, path) = self.backend(url, &metadata)?;
        let volume = Volume::create(backend.as_ref(), &path, metadata)
            .with_context(|| format!("Failed to create {}", url))?;
        if self.save_meta {
            let sidecar = sidecar_path(&path);
            metadata
                .save_json(&sidecar)
                .with_context(|| format!("Failed to write {}", sidecar.display()))?;
        }
        Ok(volume)
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "info,ook=debug",
        _ => "info,ook=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Compare a plain file's size with what the volume needs.
///
/// A short file is an error; a long one only gets a warning. Anything that
/// is not a regular file (a slice directory, a debug path) is skipped.
pub fn check_file_size(url: &str, path: &Path, metadata: &VolumeMetadata) -> anyhow::Result<()> {
    if !path.is_file() {
        return Ok(());
    }
    let actual = fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();
    let expected = metadata.total_bytes();
    if actual < expected {
        bail!(
            "{} holds {} bytes but {} needs {}",
            url,
            actual,
            metadata.summary(),
            expected
        );
    }
    if actual > expected {
        warn!(
            "{} holds {} bytes, more than the {} expected; ignoring the rest",
            url, actual, expected
        );
    }
    Ok(())
}

/// Close every volume, reporting the first failure
pub fn close_all(volumes: impl IntoIterator<Item = Volume>) -> anyhow::Result<()> {
    let mut first = None;
    for volume in volumes {
        let path = volume.path().to_path_buf();
        if let Err(e) = volume.close() {
            if first.is_none() {
                first = Some(
                    anyhow::Error::new(e).context(format!("Failed to close {}", path.display())),
                );
            }
        }
    }
    match first {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
