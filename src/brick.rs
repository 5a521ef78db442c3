//! Shaped views over tightly packed brick buffers
//!
//! A brick buffer stores X fastest, then Y, then Z, with components
//! interleaved per voxel. The views index it as `[z, y, x, c]`.

use crate::error::{OokError, Result};
use ndarray::{ArrayView4, ArrayViewMut4};

fn packed_len(extent: [usize; 3], components: usize) -> usize {
    extent.iter().product::<usize>() * components
}

fn shape(extent: [usize; 3], components: usize) -> (usize, usize, usize, usize) {
    (extent[2], extent[1], extent[0], components)
}

/// View the first `extent` voxels of `data` as a 4-D array.
///
/// `data` may be longer than the extent (a nominal-size buffer holding a
/// partial brick); the excess is ignored.
pub fn brick_view<T>(data: &[T], extent: [usize; 3], components: usize) -> Result<ArrayView4<'_, T>> {
    let len = packed_len(extent, components);
    if data.len() < len {
        return Err(OokError::invalid(format!(
            "brick of extent {:?} x {} needs {} elements, buffer has {}",
            extent,
            components,
            len,
            data.len()
        )));
    }
    ArrayView4::from_shape(shape(extent, components), &data[..len])
        .map_err(|e| OokError::invalid(e.to_string()))
}

/// Mutable counterpart of [`brick_view`]
pub fn brick_view_mut<T>(
    data: &mut [T],
    extent: [usize; 3],
    components: usize,
) -> Result<ArrayViewMut4<'_, T>> {
    let len = packed_len(extent, components);
    if data.len() < len {
        return Err(OokError::invalid(format!(
            "brick of extent {:?} x {} needs {} elements, buffer has {}",
            extent,
            components,
            len,
            data.len()
        )));
    }
    ArrayViewMut4::from_shape(shape(extent, components), &mut data[..len])
        .map_err(|e| OokError::invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_indexing() {
        // extent (3, 2, 2), two components: value encodes (x, y, z, c)
        let mut data = Vec::new();
        for z in 0..2 {
            for y in 0..2 {
                for x in 0..3 {
                    for c in 0..2 {
                        data.push(1000 * z + 100 * y + 10 * x + c);
                    }
                }
            }
        }
        let view = brick_view(&data, [3, 2, 2], 2).unwrap();
        assert_eq!(view.shape(), &[2, 2, 3, 2]);
        assert_eq!(view[[1, 0, 2, 1]], 1021);
        assert_eq!(view[[0, 1, 0, 0]], 100);
    }

    #[test]
    fn test_view_ignores_tail_and_rejects_short() {
        let mut data = vec![0u8; 20];
        {
            let mut view = brick_view_mut(&mut data, [2, 2, 2], 1).unwrap();
            view.fill(7);
        }
        assert!(data[..8].iter().all(|&v| v == 7));
        assert!(data[8..].iter().all(|&v| v == 0));
        assert!(brick_view(&data, [3, 3, 3], 1).is_err());
    }
}
