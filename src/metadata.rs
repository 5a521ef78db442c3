//! Volume metadata: shape, bricking and element type
//!
//! A raw volume carries no header, so everything needed to interpret it
//! lives here. Metadata can be persisted next to the data as a JSON sidecar
//! (`volume.raw` -> `volume.raw.json`).

use crate::error::{OokError, Result};
use crate::layout::BrickLayout;
use crate::types::TypeTag;
use crate::utils::format_bytes;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Brick edge used when none is given
pub const DEFAULT_BRICK_EDGE: usize = 64;

fn default_components() -> usize {
    1
}

/// Immutable description of one volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMetadata {
    /// Voxels per axis (x, y, z)
    pub dims: [u64; 3],

    /// Nominal (maximum) brick extent per axis
    pub brick_shape: [usize; 3],

    /// Scalar type of each component
    pub element_type: TypeTag,

    /// Interleaved components per voxel
    #[serde(default = "default_components")]
    pub components: usize,
}

impl VolumeMetadata {
    /// Create metadata without validating it; see [`VolumeMetadata::validate`]
    pub fn new(
        dims: [u64; 3],
        brick_shape: [usize; 3],
        element_type: TypeTag,
        components: usize,
    ) -> Self {
        Self {
            dims,
            brick_shape,
            element_type,
            components,
        }
    }

    /// Create a new metadata builder
    pub fn builder() -> VolumeMetadataBuilder {
        VolumeMetadataBuilder::default()
    }

    /// Check the invariants every open volume relies on
    pub fn validate(&self) -> Result<()> {
        for axis in 0..3 {
            if self.dims[axis] == 0 {
                return Err(OokError::invalid(format!("volume dimension {} is zero", axis)));
            }
            if self.brick_shape[axis] == 0 {
                return Err(OokError::invalid(format!("brick dimension {} is zero", axis)));
            }
            if self.brick_shape[axis] as u64 > self.dims[axis] {
                return Err(OokError::invalid(format!(
                    "brick shape {:?} exceeds volume dimensions {:?}",
                    self.brick_shape, self.dims
                )));
            }
        }
        if self.components == 0 {
            return Err(OokError::invalid("component count must be at least 1"));
        }

        let voxel_bytes = self.voxel_bytes() as u64;
        self.dims
            .iter()
            .try_fold(voxel_bytes, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| OokError::invalid("volume byte size overflows u64"))?;
        self.brick_shape
            .iter()
            .try_fold(self.voxel_bytes(), |acc, &b| acc.checked_mul(b))
            .ok_or_else(|| OokError::invalid("brick byte size overflows usize"))?;

        Ok(())
    }

    /// Bytes per voxel, all components included
    pub fn voxel_bytes(&self) -> usize {
        self.element_type.width() * self.components
    }

    /// Bytes in a nominal (full-size) brick
    pub fn brick_bytes(&self) -> usize {
        self.brick_shape.iter().product::<usize>() * self.voxel_bytes()
    }

    /// Total voxel count
    pub fn total_voxels(&self) -> u64 {
        self.dims.iter().product()
    }

    /// Size of the linear backing array in bytes
    pub fn total_bytes(&self) -> u64 {
        self.total_voxels() * self.voxel_bytes() as u64
    }

    /// Brick layout for this volume (recomputed, never cached)
    pub fn layout(&self) -> BrickLayout {
        BrickLayout::new(self.dims, self.brick_shape)
    }

    /// Whether two volumes can be processed brick-for-brick together
    pub fn is_registered_with(&self, other: &VolumeMetadata) -> bool {
        self.dims == other.dims && self.brick_shape == other.brick_shape
    }

    /// Same geometry, different element type
    pub fn with_element_type(mut self, element_type: TypeTag) -> Self {
        self.element_type = element_type;
        self
    }

    /// Load and validate metadata from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        let metadata: VolumeMetadata = serde_json::from_slice(&bytes)?;
        metadata.validate()?;
        Ok(metadata)
    }

    /// Validate and write metadata as pretty JSON
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        self.validate()?;
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Get a summary string of the volume
    pub fn summary(&self) -> String {
        let layout = self.layout();
        let nbricks = layout.nbricks();
        format!(
            "{} x {} x {} {} ({} component{}), bricks {} x {} x {} ({} x {} x {} = {}), {}",
            self.dims[0],
            self.dims[1],
            self.dims[2],
            self.element_type,
            self.components,
            if self.components == 1 { "" } else { "s" },
            self.brick_shape[0],
            self.brick_shape[1],
            self.brick_shape[2],
            nbricks[0],
            nbricks[1],
            nbricks[2],
            layout.brick_count(),
            format_bytes(self.total_bytes()),
        )
    }
}

/// Sidecar location for a raw volume: the same path with `.json` appended
pub fn sidecar_path(raw: impl AsRef<Path>) -> PathBuf {
    let mut name: OsString = raw.as_ref().as_os_str().to_owned();
    name.push(".json");
    PathBuf::from(name)
}

/// Builder for [`VolumeMetadata`]
#[derive(Debug, Default)]
pub struct VolumeMetadataBuilder {
    dims: Option<[u64; 3]>,
    brick_shape: Option<[usize; 3]>,
    element_type: Option<TypeTag>,
    components: Option<usize>,
}

impl VolumeMetadataBuilder {
    /// Set the voxel counts per axis
    pub fn dims(mut self, dims: [u64; 3]) -> Self {
        self.dims = Some(dims);
        self
    }

    /// Set the nominal brick shape
    pub fn brick_shape(mut self, brick_shape: [usize; 3]) -> Self {
        self.brick_shape = Some(brick_shape);
        self
    }

    /// Set the element type
    pub fn element_type(mut self, element_type: TypeTag) -> Self {
        self.element_type = Some(element_type);
        self
    }

    /// Set the number of interleaved components
    pub fn components(mut self, components: usize) -> Self {
        self.components = Some(components);
        self
    }

    /// Build and validate.
    ///
    /// Without an explicit brick shape, each axis gets
    /// [`DEFAULT_BRICK_EDGE`] clamped to the volume dimension.
    pub fn build(self) -> Result<VolumeMetadata> {
        let dims = self
            .dims
            .ok_or_else(|| OokError::invalid("volume dimensions are required"))?;
        let element_type = self
            .element_type
            .ok_or_else(|| OokError::invalid("element type is required"))?;
        let brick_shape = self
            .brick_shape
            .unwrap_or_else(|| clamp_brick_shape([DEFAULT_BRICK_EDGE; 3], dims));

        let metadata = VolumeMetadata::new(
            dims,
            brick_shape,
            element_type,
            self.components.unwrap_or(1),
        );
        metadata.validate()?;
        Ok(metadata)
    }
}

/// Shrink each axis of `brick_shape` so it fits inside `dims`
pub fn clamp_brick_shape(brick_shape: [usize; 3], dims: [u64; 3]) -> [usize; 3] {
    let mut out = brick_shape;
    for (b, &d) in out.iter_mut().zip(dims.iter()) {
        if *b as u64 > d {
            *b = d as usize;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_rejects_oversized_bricks() {
        let md = VolumeMetadata::new([10, 10, 10], [16, 8, 8], TypeTag::Uint8, 1);
        assert!(matches!(md.validate(), Err(OokError::InvalidArgument(_))));

        let md = VolumeMetadata::new([10, 10, 10], [10, 10, 10], TypeTag::Uint8, 1);
        assert!(md.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        assert!(VolumeMetadata::new([0, 1, 1], [1, 1, 1], TypeTag::Uint8, 1)
            .validate()
            .is_err());
        assert!(VolumeMetadata::new([4, 4, 4], [0, 1, 1], TypeTag::Uint8, 1)
            .validate()
            .is_err());
        assert!(VolumeMetadata::new([4, 4, 4], [1, 1, 1], TypeTag::Uint8, 0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_rejects_overflow() {
        let md = VolumeMetadata::new([u64::MAX, 2, 2], [1, 1, 1], TypeTag::Float64, 1);
        assert!(md.validate().is_err());
    }

    #[test]
    fn test_sizes() {
        let md = VolumeMetadata::new([32, 32, 32], [16, 16, 32], TypeTag::Uint16, 2);
        assert_eq!(md.voxel_bytes(), 4);
        assert_eq!(md.brick_bytes(), 16 * 16 * 32 * 4);
        assert_eq!(md.total_bytes(), 32 * 32 * 32 * 4);
    }

    #[test]
    fn test_builder_clamps_default_brick() {
        let md = VolumeMetadata::builder()
            .dims([128, 30, 200])
            .element_type(TypeTag::Int16)
            .build()
            .unwrap();
        assert_eq!(md.brick_shape, [64, 30, 64]);
        assert_eq!(md.components, 1);

        assert!(VolumeMetadata::builder().dims([1, 1, 1]).build().is_err());
    }

    #[test]
    fn test_sidecar_roundtrip() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("head.raw");
        let md = VolumeMetadata::new([15, 2, 1], [8, 2, 1], TypeTag::Float32, 1);

        let sidecar = sidecar_path(&raw);
        assert_eq!(sidecar, dir.path().join("head.raw.json"));

        md.save_json(&sidecar).unwrap();
        let loaded = VolumeMetadata::from_json_file(&sidecar).unwrap();
        assert_eq!(loaded, md);
    }

    #[test]
    fn test_components_default_in_json() {
        let json = r#"{"dims":[4,4,4],"brick_shape":[2,2,2],"element_type":"uint8"}"#;
        let md: VolumeMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(md.components, 1);
    }

    #[test]
    fn test_summary() {
        let md = VolumeMetadata::new([40, 40, 40], [16, 16, 16], TypeTag::Uint8, 1);
        let summary = md.summary();
        assert!(summary.starts_with("40 x 40 x 40 uint8 (1 component)"));
        assert!(summary.contains("3 x 3 x 3 = 27"));
    }
}
