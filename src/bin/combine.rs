//! ook-combine
//!
//! Adds two registered volumes voxel by voxel into a float32 volume.

use anyhow::{bail, Context};
use clap::Parser;
use ook::cli::{check_file_size, close_all, init_tracing, VolumeArgs};
use ook::ops::{decode_as_f32, for_each_brick, sum_to_f32};
use ook::utils::typed_to_bytes;
use ook::{TypeTag, Volume};
use std::process;

/// Sum two volumes
#[derive(Parser, Debug)]
#[command(name = "ook-combine")]
#[command(about = "Sum two volumes into a float32 volume")]
#[command(version)]
struct Args {
    /// Input volumes, given twice (-i a -i b)
    #[arg(short, long, required = true)]
    input: Vec<String>,

    /// Output volume (path or backend URL)
    #[arg(short, long)]
    output: String,

    /// Element type of the second input, when it differs from -t
    #[arg(long)]
    second_type: Option<TypeTag>,

    #[command(flatten)]
    volume: VolumeArgs,
}

fn run(args: &Args) -> anyhow::Result<()> {
    let [first, second] = args.input.as_slice() else {
        bail!("exactly two inputs are needed, got {}", args.input.len());
    };

    let first_md = args.volume.metadata()?;
    let second_md = first_md.with_element_type(args.second_type.unwrap_or(first_md.element_type));
    let out_md = first_md.with_element_type(TypeTag::Float32);

    for (url, md) in [(first, &first_md), (second, &second_md)] {
        let (_, path) = args.volume.backend(url, md)?;
        check_file_size(url, &path, md)?;
    }

    let mut volumes: Vec<Volume> = Vec::with_capacity(2);
    for (url, md) in [(first, first_md), (second, second_md)] {
        match args.volume.open(url, md) {
            Ok(vol) => volumes.push(vol),
            Err(e) => {
                close_all(volumes)?;
                return Err(e);
            }
        }
    }
    let mut output = match args.volume.create(&args.output, out_md) {
        Ok(output) => output,
        Err(e) => {
            close_all(volumes)?;
            return Err(e);
        }
    };
    tracing::info!(
        "{} ({}) + {} ({}) -> {}",
        first,
        first_md.element_type,
        second,
        second_md.element_type,
        args.output
    );

    let combined = for_each_brick(&mut volumes, &mut output, |_, _, bricks| {
        let a = decode_as_f32(first_md.element_type, bricks[0])?;
        let b = decode_as_f32(second_md.element_type, bricks[1])?;
        Ok(typed_to_bytes(&sum_to_f32(&a, &b)?))
    })
    .context("Combining failed");

    let closed = close_all(volumes.into_iter().chain([output]));
    combined?;
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
