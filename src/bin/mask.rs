//! ook-mask
//!
//! Keeps input voxels where an 8-bit mask is non-zero and zeroes the rest.
//! The output has the input's element type.

use anyhow::Context;
use clap::Parser;
use ook::cli::{check_file_size, close_all, init_tracing, VolumeArgs};
use ook::ops::{for_each_brick, mask_bytes};
use ook::{TypeTag, Volume};
use std::process;

/// Mask one volume with another
#[derive(Parser, Debug)]
#[command(name = "ook-mask")]
#[command(about = "Apply an 8-bit mask to a volume")]
#[command(version)]
struct Args {
    /// Input volume (path or backend URL)
    #[arg(short, long)]
    input: String,

    /// Mask volume: u8, one component, 0 removes a voxel
    #[arg(short, long)]
    mask: String,

    /// Output volume (path or backend URL)
    #[arg(short, long)]
    output: String,

    #[command(flatten)]
    volume: VolumeArgs,
}

fn run(args: &Args) -> anyhow::Result<()> {
    // whole X rows, 16 x 16 in Y and Z
    let dx = args.volume.dx.unwrap_or(1) as usize;
    let metadata = args.volume.metadata_with_brick([dx, 16, 16])?;
    let mut mask_metadata = metadata.with_element_type(TypeTag::Uint8);
    mask_metadata.components = 1;

    for (url, md) in [(&args.input, &metadata), (&args.mask, &mask_metadata)] {
        let (_, path) = args.volume.backend(url, md)?;
        check_file_size(url, &path, md)?;
    }

    let mut volumes: Vec<Volume> = Vec::with_capacity(2);
    for (url, md) in [(&args.input, metadata), (&args.mask, mask_metadata)] {
        match args.volume.open(url, md) {
            Ok(vol) => volumes.push(vol),
            Err(e) => {
                close_all(volumes)?;
                return Err(e);
            }
        }
    }
    let mut output = match args.volume.create(&args.output, metadata) {
        Ok(output) => output,
        Err(e) => {
            close_all(volumes)?;
            return Err(e);
        }
    };
    tracing::info!("masking {} with {}: {}", args.input, args.mask, metadata.summary());

    let tag = metadata.element_type;
    let components = metadata.components;
    let masked = for_each_brick(&mut volumes, &mut output, |_, extent, bricks| {
        let mut out = bricks[0].to_vec();
        mask_bytes(tag, &mut out, bricks[1], extent, components)?;
        Ok(out)
    })
    .context("Masking failed");

    let closed = close_all(volumes.into_iter().chain([output]));
    masked?;
    closed
}

fn main() {
    let args = Args::parse();
    init_tracing(args.volume.verbose);

    if let Err(e) = run(&args) {
        tracing::error!("{:#}", e);
        process::exit(1);
    }
}
