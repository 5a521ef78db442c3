//! End-to-end brick I/O against real files, maps and slice stacks

use ook::brick::brick_view;
use ook::ops::threshold;
use ook::utils::{bytes_to_typed, typed_to_bytes};
use ook::{
    create_backend, BackendKind, ChainBackend, DebugBackend, FileBackend, MmapBackend, OokError,
    StackBackend, TypeTag, Volume, VolumeMetadata,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Generating function for the reference volumes
fn value(x: usize, y: usize, z: usize) -> u32 {
    25700 + (z / 16) as u32 + (y * 8) as u32 + x as u32
}

/// 16^3 u32 volume filled from `value`
fn write_simple(path: &Path) {
    let mut data = Vec::with_capacity(16 * 16 * 16);
    for z in 0..16 {
        for y in 0..16 {
            for x in 0..16 {
                data.push(value(x, y, z));
            }
        }
    }
    fs::write(path, typed_to_bytes(&data)).unwrap();
}

/// 4^3 u16 volume, two components: (value, value % 16) at interleaved index
fn write_multicomponent(path: &Path) {
    let mut data = Vec::new();
    for z in 0..4 {
        for y in 0..4 {
            for x in (0..8).step_by(2) {
                data.push(value(x, y, z) as u16);
                data.push((value(x, y, z) % 16) as u16);
            }
        }
    }
    fs::write(path, typed_to_bytes(&data)).unwrap();
}

/// Deterministic floats in [0, 4)
fn pseudo_random(n: usize, seed: u32) -> Vec<f32> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            ((state >> 8) as f32 / (1u32 << 24) as f32) * 4.0
        })
        .collect()
}

#[test]
fn test_simple_layout_and_first_brick() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("simple.raw");
    write_simple(&path);

    let md = VolumeMetadata::new([16, 16, 16], [8, 8, 16], TypeTag::Uint32, 1);
    let mut vol = Volume::open(&FileBackend::new(), &path, md).unwrap();
    assert_eq!(vol.layout().nbricks(), [2, 2, 1]);

    let data: Vec<u32> = vol.read_brick_as(0usize).unwrap();
    let view = brick_view(&data, [8, 8, 16], 1).unwrap();
    for z in 0..16 {
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(view[[z, y, x, 0]], value(x, y, z));
            }
        }
    }

    // brick (1, 1, 0) starts at voxel (8, 8, 0)
    let data: Vec<u32> = vol.read_brick_as([1usize, 1, 0]).unwrap();
    assert_eq!(data[0], value(8, 8, 0));
    vol.close().unwrap();
}

#[test]
fn test_multicomponent_brick() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("multi.raw");
    write_multicomponent(&path);

    let md = VolumeMetadata::new([4, 4, 4], [2, 4, 2], TypeTag::Uint16, 2);
    let mut vol = Volume::open(&FileBackend::new(), &path, md).unwrap();
    assert_eq!(vol.brick_bytes(), 2 * 4 * 2 * 2 * 2);

    let data: Vec<u16> = vol.read_brick_as(0usize).unwrap();
    for z in 0..2 {
        for y in 0..4 {
            for x in (0..4).step_by(2) {
                let at = z * 4 * 2 * 2 + y * 2 * 2 + x;
                assert_eq!(data[at] as u32, value(x, y, z));
                assert_eq!(data[at + 1] as u32, value(x, y, z) % 16);
            }
        }
    }
    vol.close().unwrap();
}

#[test]
fn test_zero_volume_all_bricks() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("zero.raw");
    fs::write(&path, vec![0u8; 32 * 32 * 32 * 2]).unwrap();

    let md = VolumeMetadata::new([32, 32, 32], [16, 16, 32], TypeTag::Uint16, 1);
    let mut vol = Volume::open(&FileBackend::new(), &path, md).unwrap();
    assert_eq!(vol.brick_count(), 4);

    let mut buf = vol.alloc_brick().unwrap();
    for id in 0..vol.brick_count() {
        buf.fill(1);
        vol.read_brick(id, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0), "brick {}", id);
    }
    vol.close().unwrap();
}

#[test]
fn test_writer_full_roundtrip_and_threshold() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("write.raw");
    let thresh_path = dir.path().join("threshold.raw");
    let md = VolumeMetadata::new([4, 8, 12], [2, 4, 6], TypeTag::Float32, 1);
    let backend = FileBackend::new();

    let mut vol = Volume::create(&backend, &path, md).unwrap();
    assert_eq!(vol.brick_count(), 8);
    let mut written = Vec::new();
    for id in 0..vol.brick_count() {
        let brick = pseudo_random(2 * 4 * 6, id as u32 + 1);
        vol.write_brick_from(id, &brick).unwrap();
        written.push(brick);
    }
    vol.close().unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), 4 * 8 * 12 * 4);

    let mut vol = Volume::open(&backend, &path, md).unwrap();
    let mut out = Volume::create(&backend, &thresh_path, md.with_element_type(TypeTag::Uint8))
        .unwrap();
    for id in 0..vol.brick_count() {
        let brick: Vec<f32> = vol.read_brick_as(id).unwrap();
        assert_eq!(brick, written[id]);
        out.write_brick(id, &threshold(&brick, 0.25, 0.7)).unwrap();
    }
    vol.close().unwrap();
    out.close().unwrap();

    assert_eq!(fs::metadata(&thresh_path).unwrap().len(), 4 * 8 * 12);
    let mask = fs::read(&thresh_path).unwrap();
    assert!(mask.iter().all(|&b| b <= 1));
}

#[test]
fn test_partial_last_brick_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("thirty.raw");
    let values: Vec<f32> = (0..30).map(|i| i as f32).collect();
    fs::write(&path, typed_to_bytes(&values)).unwrap();

    let md = VolumeMetadata::new([15, 2, 1], [8, 2, 1], TypeTag::Float32, 1);
    let mut vol = Volume::open(&FileBackend::new(), &path, md).unwrap();
    assert_eq!(vol.layout().nbricks(), [2, 1, 1]);
    assert_eq!(vol.brick_extent(1usize).unwrap(), [7, 2, 1]);
    assert_eq!(vol.brick_extent([1usize, 0, 0]).unwrap(), [7, 2, 1]);

    let brick: Vec<f32> = vol.read_brick_as(1usize).unwrap();
    let expected: Vec<f32> = (8..15).chain(23..30).map(|i| i as f32).collect();
    assert_eq!(brick, expected);
    vol.close().unwrap();
}

#[test]
fn test_every_backend_roundtrips_uneven_volume() {
    let md = VolumeMetadata::new([10, 7, 5], [4, 3, 2], TypeTag::Int16, 3);
    let voxels = 10 * 7 * 5 * 3;
    let source: Vec<i16> = (0..voxels).map(|i| (i as i16).wrapping_mul(7)).collect();

    for scheme in ["file", "mmap"] {
        let dir = TempDir::new().unwrap();
        let url = format!("{}://{}", scheme, dir.path().join("vol.raw").display());
        let (backend, path) = create_backend(&url, &md).unwrap();

        // scatter the linear array into bricks via the scanline plan
        let mut vol = Volume::create(backend.as_ref(), &path, md).unwrap();
        let voxel_bytes = md.voxel_bytes();
        let linear = typed_to_bytes(&source);
        for id in 0..vol.brick_count() {
            let mut brick = vec![0u8; vol.extent_bytes(id).unwrap()];
            for line in vol.layout().scanline_plan(id, voxel_bytes) {
                let src = line.source as usize;
                brick[line.target..line.target + line.len]
                    .copy_from_slice(&linear[src..src + line.len]);
            }
            vol.write_brick(id, &brick).unwrap();
        }
        vol.close().unwrap();

        let stored: Vec<i16> = bytes_to_typed(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(stored, source, "{} backend", scheme);

        let mut vol = Volume::open(backend.as_ref(), &path, md).unwrap();
        assert_eq!(vol.backend_kind(), backend.kind());
        let mut first = vol.alloc_brick().unwrap();
        let mut second = vol.alloc_brick().unwrap();
        let last = vol.brick_count() - 1;
        vol.read_brick(last, &mut first).unwrap();
        vol.read_brick(last, &mut second).unwrap();
        assert_eq!(first, second);
        vol.close().unwrap();
    }
}

#[test]
fn test_stack_backend_volume() {
    let dir = TempDir::new().unwrap();
    // 6 x 4 u8 slices, 5 of them
    for z in 0..5u8 {
        let slice: Vec<u8> = (0..24).map(|i| z * 30 + i).collect();
        fs::write(dir.path().join(format!("img{:02}.raw", z)), slice).unwrap();
    }

    let md = VolumeMetadata::new([6, 4, 5], [4, 4, 2], TypeTag::Uint8, 1);
    let backend = StackBackend::new(md.dims, md.voxel_bytes());
    let mut vol = Volume::open(&backend, dir.path(), md).unwrap();
    assert_eq!(vol.backend_kind(), BackendKind::Stack);

    // brick (1, 0, 2): x 4..6, z 4..5
    let brick: Vec<u8> = vol.read_brick_as([1usize, 0, 2]).unwrap();
    assert_eq!(brick, vec![124, 125, 130, 131, 136, 137, 142, 143]);

    // brick 0 covers z 0..2, so its rows come from two slice files
    let brick: Vec<u8> = vol.read_brick_as(0usize).unwrap();
    assert_eq!(&brick[..4], &[0, 1, 2, 3]);
    assert_eq!(&brick[16..20], &[30, 31, 32, 33]);
    vol.close().unwrap();
}

#[test]
fn test_debug_chain_passes_data_through() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("simple.raw");
    write_simple(&path);

    let md = VolumeMetadata::new([16, 16, 16], [8, 8, 16], TypeTag::Uint32, 1);
    let chain = ChainBackend::new(DebugBackend::new(), FileBackend::new());
    let mut vol = Volume::open(&chain, &path, md).unwrap();
    assert_eq!(vol.backend_kind(), BackendKind::Chain);
    let data: Vec<u32> = vol.read_brick_as(3usize).unwrap();
    assert_eq!(data[0], value(8, 8, 0));
    vol.close().unwrap();
}

#[test]
fn test_open_errors() {
    let dir = TempDir::new().unwrap();
    let md = VolumeMetadata::new([4, 4, 4], [2, 2, 2], TypeTag::Uint8, 1);

    let err = Volume::open(&FileBackend::new(), dir.path().join("missing.raw"), md).unwrap_err();
    assert!(matches!(err, OokError::BackendOpen { .. }));
    assert!(err.is_backend());

    let err = Volume::open(&MmapBackend::new(), dir.path().join("missing.raw"), md).unwrap_err();
    assert!(matches!(err, OokError::BackendOpen { .. }));

    let bad = VolumeMetadata::new([4, 4, 4], [2, 2, 2], TypeTag::Uint8, 0);
    let err = Volume::open(&FileBackend::new(), dir.path().join("missing.raw"), bad).unwrap_err();
    assert!(matches!(err, OokError::InvalidArgument(_)));
}

#[test]
fn test_short_file_read_fails_with_offset() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("short.raw");
    fs::write(&path, vec![0u8; 100]).unwrap();

    let md = VolumeMetadata::new([8, 8, 8], [8, 8, 8], TypeTag::Uint8, 1);
    let mut vol = Volume::open(&FileBackend::new(), &path, md).unwrap();
    let mut buf = vol.alloc_brick().unwrap();
    match vol.read_brick(0usize, &mut buf).unwrap_err() {
        OokError::BackendIo { offset, len, .. } => {
            // rows 0..12 fit in 100 bytes; row 12 starts at 96
            assert_eq!(offset, 96);
            assert_eq!(len, 8);
        }
        other => panic!("unexpected error {:?}", other),
    }
    vol.close().unwrap();
}
