//! ook-copy
//!
//! Copies a volume brick by brick, optionally thresholding it into an
//! 8-bit mask.

use anyhow::Context;
use clap::Parser;
use ook::cli::{close_all, init_tracing, VolumeArgs};
use ook::ops::{for_each_brick, threshold_bytes};
use ook::TypeTag;
use std::process;

/// Copy (or threshold) a volume
#[derive(Parser, Debug)]
#[command(name = "ook-copy")]
#[command(about = "Copy a brick-addressed volume, optionally thresholding it")]
#[command(version)]
struct Args {
    /// Input volume (path or backend URL)
    #[arg(short, long)]
    input: String,

    /// Output volume (path or backend URL)
    #[arg(short, long)]
    output: String,

    /// Lower threshold bound; writes a u8 mask when set
    #[arg(long)]
    min: Option<f64>,

    /// Upper threshold bound; writes a u8 mask when set
    #[arg(long)]
    max: Option<f64>,

    #[command(flatten)]
    volume: VolumeArgs,
}

fn run(args: &Args) -> anyhow::Result<()> {
    let metadata = args.volume.metadata()?;
    let thresholding = args.min.is_some() || args.max.is_some();
    let lo = args.min.unwrap_or(f64::MIN);
    let hi = args.max.unwrap_or(f64::MAX);

    let out_metadata = if thresholding {
        let mut md = metadata.with_element_type(TypeTag::Uint8);
        md.components = 1;
        md
    } else {
        metadata
    };
    if thresholding && metadata.components != 1 {
        anyhow::bail!("thresholding needs a single-component volume");
    }

    let input = args.volume.open(&args.input, metadata)?;
    let mut output = match args.volume.create(&args.output, out_metadata) {
        Ok(output) => output,
        Err(e) => {
            close_all([input])?;
            return Err(e);
        }
    };
    tracing::info!("{} -> {}: {}", args.input, args.output, metadata.summary());

    let mut inputs = vec![input];
    let tag = metadata.element_type;
    let copied = for_each_brick(&mut inputs, &mut output, |_, _, bricks| {
        if thresholding {
            threshold_bytes(tag, bricks[0], lo, hi)
        } else {
            Ok(bricks[0].to_vec())
        }
    })
    .context("Copy failed");

    let closed = close_all(inputs.into_iter().chain([output]));
    copied?;
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
