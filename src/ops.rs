//! Per-brick processing kernels and the shared brick loop
//!
//! Kernels work on decoded brick contents. The `*_bytes` variants dispatch on
//! a runtime [`TypeTag`] so callers holding raw brick buffers (the command
//! line tools) need not be generic.

use crate::brick::{brick_view, brick_view_mut};
use crate::error::{OokError, Result};
use crate::types::{with_element_type, Element, TypeTag};
use crate::utils::{bytes_to_typed, typed_to_bytes};
use crate::volume::Volume;
use ndarray::{Axis, Zip};
use num_traits::AsPrimitive;
use tracing::debug;

/// Zero every voxel whose mask byte is zero.
///
/// `mask` holds one byte per voxel; all components of a masked voxel are
/// cleared.
pub fn apply_mask<T: Element>(
    values: &mut [T],
    mask: &[u8],
    extent: [usize; 3],
    components: usize,
) -> Result<()> {
    let mut values = brick_view_mut(values, extent, components)?;
    let mask = brick_view(mask, extent, 1)?;
    Zip::from(values.lanes_mut(Axis(3)))
        .and(mask.lanes(Axis(3)))
        .for_each(|mut voxel, m| {
            if m[0] == 0 {
                voxel.fill(T::default());
            }
        });
    Ok(())
}

/// 1 where `lo <= v <= hi`, else 0
pub fn threshold<T: Element>(values: &[T], lo: f64, hi: f64) -> Vec<u8> {
    values
        .iter()
        .map(|&v| {
            let v: f64 = AsPrimitive::<f64>::as_(v);
            u8::from(lo <= v && v <= hi)
        })
        .collect()
}

/// Elementwise `a + b` in single precision
pub fn sum_to_f32<A: Element, B: Element>(a: &[A], b: &[B]) -> Result<Vec<f32>> {
    if a.len() != b.len() {
        return Err(OokError::invalid(format!(
            "cannot sum {} elements with {}",
            a.len(),
            b.len()
        )));
    }
    Ok(a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let x: f32 = AsPrimitive::<f32>::as_(x);
            let y: f32 = AsPrimitive::<f32>::as_(y);
            x + y
        })
        .collect())
}

/// Decode raw elements of type `tag` and widen/narrow them to `f32`
pub fn decode_as_f32(tag: TypeTag, bytes: &[u8]) -> Result<Vec<f32>> {
    with_element_type!(tag, T => {
        let values = bytes_to_typed::<T>(bytes)?;
        Ok(values.into_iter().map(AsPrimitive::<f32>::as_).collect())
    })
}

/// [`threshold`] over raw bytes of type `tag`
pub fn threshold_bytes(tag: TypeTag, bytes: &[u8], lo: f64, hi: f64) -> Result<Vec<u8>> {
    with_element_type!(tag, T => {
        let values = bytes_to_typed::<T>(bytes)?;
        Ok(threshold(&values, lo, hi))
    })
}

/// [`apply_mask`] over raw bytes of type `tag`, in place
pub fn mask_bytes(
    tag: TypeTag,
    bytes: &mut [u8],
    mask: &[u8],
    extent: [usize; 3],
    components: usize,
) -> Result<()> {
    with_element_type!(tag, T => {
        let mut values = bytes_to_typed::<T>(bytes)?;
        apply_mask(&mut values, mask, extent, components)?;
        bytes.copy_from_slice(&typed_to_bytes(&values));
        Ok(())
    })
}

/// Run `f` over every brick of `inputs` and write its result to `output`.
///
/// All volumes must share dims and brick shape. For each brick, `f` gets the
/// linear id, the extent and one packed extent-sized slice per input, and
/// returns the packed bytes for the output brick.
pub fn for_each_brick<F>(inputs: &mut [Volume], output: &mut Volume, mut f: F) -> Result<()>
where
    F: FnMut(usize, [usize; 3], &[&[u8]]) -> Result<Vec<u8>>,
{
    if inputs.is_empty() {
        return Err(OokError::invalid("no input volumes"));
    }
    for vol in inputs.iter() {
        if !vol.metadata().is_registered_with(output.metadata()) {
            return Err(OokError::invalid(format!(
                "{} and {} differ in dims or brick shape",
                vol.path().display(),
                output.path().display()
            )));
        }
    }

    let mut buffers = inputs
        .iter()
        .map(Volume::alloc_brick)
        .collect::<Result<Vec<_>>>()?;

    let count = output.brick_count();
    for id in 0..count {
        let extent = output.brick_extent(id)?;
        let mut lens = Vec::with_capacity(inputs.len());
        for (vol, buf) in inputs.iter_mut().zip(buffers.iter_mut()) {
            vol.read_brick(id, buf)?;
            lens.push(vol.extent_bytes(id)?);
        }
        let slices: Vec<&[u8]> = buffers
            .iter()
            .zip(&lens)
            .map(|(buf, &len)| &buf[..len])
            .collect();

        let result = f(id, extent, &slices)?;
        output.write_brick(id, &result)?;
        debug!("processed brick {} / {}", id + 1, count);
    }
    Ok(())
}
