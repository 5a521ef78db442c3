//! Example: write a volume brick by brick, then read it back
//!
//! Run with: cargo run --example brick_roundtrip

use ook::brick::brick_view;
use ook::{sidecar_path, FileBackend, TypeTag, Volume, VolumeMetadata};

fn value(x: usize, y: usize, z: usize) -> u16 {
    (25700 + z / 16 + y * 8 + x) as u16
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("ook brick round trip");
    println!("====================\n");

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ramp.raw");

    let metadata = VolumeMetadata::builder()
        .dims([100, 60, 40])
        .brick_shape([32, 32, 32])
        .element_type(TypeTag::Uint16)
        .build()?;
    println!("Volume: {}", metadata.summary());
    metadata.save_json(sidecar_path(&path))?;

    // Write every brick from the generating formula
    let backend = FileBackend::new();
    let mut volume = Volume::create(&backend, &path, metadata)?;
    let layout = *volume.layout();
    for id in 0..volume.brick_count() {
        let origin = layout.brick_origin(id.into());
        let [ex, ey, ez] = layout.brick_extent(id);
        let mut brick = Vec::with_capacity(ex * ey * ez);
        for z in 0..ez {
            for y in 0..ey {
                for x in 0..ex {
                    brick.push(value(
                        origin[0] as usize + x,
                        origin[1] as usize + y,
                        origin[2] as usize + z,
                    ));
                }
            }
        }
        volume.write_brick_from(id, &brick)?;
    }
    volume.close()?;
    println!("Wrote {} bricks to {}", layout.brick_count(), path.display());

    // Read back and spot-check each brick's far corner
    let metadata = VolumeMetadata::from_json_file(sidecar_path(&path))?;
    let mut volume = Volume::open(&backend, &path, metadata)?;
    for id in 0..volume.brick_count() {
        let extent = volume.brick_extent(id)?;
        let origin = volume.layout().brick_origin(id.into());
        let data: Vec<u16> = volume.read_brick_as(id)?;
        let view = brick_view(&data, extent, 1)?;

        let [ex, ey, ez] = extent;
        let corner = view[[ez - 1, ey - 1, ex - 1, 0]];
        let expected = value(
            origin[0] as usize + ex - 1,
            origin[1] as usize + ey - 1,
            origin[2] as usize + ez - 1,
        );
        assert_eq!(corner, expected, "brick {}", id);
        println!("  brick {:2} extent {:?}: corner = {}", id, extent, corner);
    }
    volume.close()?;

    println!("\nAll bricks verified.");
    Ok(())
}
