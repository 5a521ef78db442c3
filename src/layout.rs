//! Brick geometry: how a volume is divided into bricks and where each
//! brick's bytes live in the linear backing array
//!
//! Everything here is pure arithmetic over validated metadata. Bricks are
//! numbered with X fastest, then Y, then Z. A brick's bytes are moved one
//! scanline (one X run of one row) at a time, since consecutive rows of a
//! brick are separated in the backing array whenever the brick is narrower
//! than the volume.

use std::iter::FusedIterator;

/// Address of a brick, either by linear id or by 3-D brick coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrickId {
    /// Linear index in `[0, brick_count)`
    Linear(usize),
    /// Per-axis brick coordinate, each in `[0, nbricks[axis])`
    Coord([usize; 3]),
}

impl From<usize> for BrickId {
    fn from(id: usize) -> Self {
        BrickId::Linear(id)
    }
}

impl From<[usize; 3]> for BrickId {
    fn from(coord: [usize; 3]) -> Self {
        BrickId::Coord(coord)
    }
}

/// Decompose a linear brick id given the number of bricks per axis
pub fn linear_to_3d(id: usize, nbricks: [usize; 3]) -> [usize; 3] {
    assert!(
        nbricks.iter().all(|&n| n > 0),
        "brick layout must be non-empty"
    );
    assert!(
        id < nbricks[0] * nbricks[1] * nbricks[2],
        "brick id {} outside layout {:?}",
        id,
        nbricks
    );
    [
        id % nbricks[0],
        (id / nbricks[0]) % nbricks[1],
        (id / (nbricks[0] * nbricks[1])) % nbricks[2],
    ]
}

/// Inverse of [`linear_to_3d`]
pub fn coords_to_linear(coord: [usize; 3], nbricks: [usize; 3]) -> usize {
    debug_assert!(coord.iter().zip(nbricks.iter()).all(|(c, n)| c < n));
    coord[0] + coord[1] * nbricks[0] + coord[2] * nbricks[0] * nbricks[1]
}

/// Brick layout of a volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrickLayout {
    dims: [u64; 3],
    brick_shape: [usize; 3],
}

impl BrickLayout {
    /// Create a layout.
    ///
    /// # Panics
    ///
    /// If any brick axis is zero or larger than the matching volume axis.
    /// Volume metadata validation rules this out before a layout is built.
    pub fn new(dims: [u64; 3], brick_shape: [usize; 3]) -> Self {
        for axis in 0..3 {
            assert!(brick_shape[axis] > 0, "brick axis {} is zero", axis);
            assert!(
                dims[axis] >= brick_shape[axis] as u64,
                "brick shape {:?} exceeds volume {:?}",
                brick_shape,
                dims
            );
        }
        Self { dims, brick_shape }
    }

    /// Volume dimensions in voxels
    pub fn dims(&self) -> [u64; 3] {
        self.dims
    }

    /// Nominal brick shape
    pub fn brick_shape(&self) -> [usize; 3] {
        self.brick_shape
    }

    /// Number of bricks along each axis: `ceil(dims / brick_shape)`
    pub fn nbricks(&self) -> [usize; 3] {
        let mut n = [0usize; 3];
        for (axis, out) in n.iter_mut().enumerate() {
            *out = self.dims[axis].div_ceil(self.brick_shape[axis] as u64) as usize;
        }
        n
    }

    /// Get the total number of bricks
    pub fn brick_count(&self) -> usize {
        self.nbricks().iter().product()
    }

    /// Whether `id` addresses a brick of this volume
    pub fn contains(&self, id: BrickId) -> bool {
        match id {
            BrickId::Linear(i) => i < self.brick_count(),
            BrickId::Coord(c) => c.iter().zip(self.nbricks().iter()).all(|(c, n)| c < n),
        }
    }

    /// 3-D coordinate of a brick
    pub fn coords(&self, id: BrickId) -> [usize; 3] {
        match id {
            BrickId::Linear(i) => linear_to_3d(i, self.nbricks()),
            BrickId::Coord(c) => {
                assert!(self.contains(id), "brick coordinate {:?} outside layout", c);
                c
            }
        }
    }

    /// Linear id of a brick
    pub fn linear_id(&self, id: BrickId) -> usize {
        match id {
            BrickId::Linear(i) => {
                assert!(self.contains(id), "brick id {} outside layout", i);
                i
            }
            BrickId::Coord(_) => coords_to_linear(self.coords(id), self.nbricks()),
        }
    }

    /// Voxel position of the brick's first voxel in the volume
    pub fn brick_origin(&self, id: BrickId) -> [u64; 3] {
        let c = self.coords(id);
        [
            (c[0] * self.brick_shape[0]) as u64,
            (c[1] * self.brick_shape[1]) as u64,
            (c[2] * self.brick_shape[2]) as u64,
        ]
    }

    /// Actual shape of a brick.
    ///
    /// Equal to the nominal shape except along axes where the brick is the
    /// last one and the volume does not divide evenly; there the extent is
    /// the remainder. Each axis is decided independently.
    pub fn brick_extent(&self, id: impl Into<BrickId>) -> [usize; 3] {
        let coord = self.coords(id.into());
        let nbricks = self.nbricks();
        let mut extent = self.brick_shape;
        for axis in 0..3 {
            let rem = (self.dims[axis] % self.brick_shape[axis] as u64) as usize;
            if coord[axis] == nbricks[axis] - 1 && rem != 0 {
                extent[axis] = rem;
            }
        }
        extent
    }

    /// Scanline transfers needed to move one brick.
    ///
    /// `voxel_bytes` is the element width times the component count.
    pub fn scanline_plan(&self, id: impl Into<BrickId>, voxel_bytes: usize) -> ScanlinePlan {
        let id = id.into();
        let extent = self.brick_extent(id);
        ScanlinePlan::new(self.dims, self.brick_origin(id), extent, voxel_bytes)
    }
}

/// One contiguous transfer between the backing array and a brick buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scanline {
    /// Byte offset in the backing array
    pub source: u64,
    /// Bytes in the run
    pub len: usize,
    /// Byte offset in the tightly packed brick buffer
    pub target: usize,
}

/// Iterator over a brick's scanlines, Z outer and Y inner
#[derive(Debug, Clone)]
pub struct ScanlinePlan {
    dims: [u64; 3],
    origin: [u64; 3],
    extent: [usize; 3],
    voxel_bytes: usize,
    y: usize,
    z: usize,
}

impl ScanlinePlan {
    fn new(dims: [u64; 3], origin: [u64; 3], extent: [usize; 3], voxel_bytes: usize) -> Self {
        Self {
            dims,
            origin,
            extent,
            voxel_bytes,
            y: 0,
            z: 0,
        }
    }

    /// Shape of the brick being planned
    pub fn extent(&self) -> [usize; 3] {
        self.extent
    }

    /// Bytes the whole plan transfers
    pub fn total_bytes(&self) -> usize {
        self.extent.iter().product::<usize>() * self.voxel_bytes
    }

    /// The transfer for row `y` of slice `z` of the brick
    pub fn scanline(&self, y: usize, z: usize) -> Scanline {
        let [dx, dy, _] = self.dims;
        let [ox, oy, oz] = self.origin;
        let [ex, ey, _] = self.extent;
        let w = self.voxel_bytes;

        let src_voxel = (oz + z as u64) * dy * dx + (oy + y as u64) * dx + ox;
        Scanline {
            source: src_voxel * w as u64,
            len: ex * w,
            target: (z * ey * ex + y * ex) * w,
        }
    }

    fn remaining(&self) -> usize {
        if self.z >= self.extent[2] {
            return 0;
        }
        (self.extent[2] - self.z) * self.extent[1] - self.y
    }
}

impl Iterator for ScanlinePlan {
    type Item = Scanline;

    fn next(&mut self) -> Option<Scanline> {
        if self.z >= self.extent[2] {
            return None;
        }
        let line = self.scanline(self.y, self.z);
        self.y += 1;
        if self.y == self.extent[1] {
            self.y = 0;
            self.z += 1;
        }
        Some(line)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

impl ExactSizeIterator for ScanlinePlan {}

impl FusedIterator for ScanlinePlan {}
