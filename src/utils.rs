//! Utility functions

use crate::error::{OokError, Result};
use crate::types::Element;

/// Decode native-endian bytes into typed elements
pub fn bytes_to_typed<T: Element>(bytes: &[u8]) -> Result<Vec<T>> {
    let width = T::TAG.width();
    if bytes.len() % width != 0 {
        return Err(OokError::invalid(format!(
            "{} bytes is not a whole number of {} elements",
            bytes.len(),
            T::TAG
        )));
    }
    Ok(bytes.chunks_exact(width).map(T::decode_ne).collect())
}

/// Encode typed elements as native-endian bytes
pub fn typed_to_bytes<T: Element>(data: &[T]) -> Vec<u8> {
    let width = T::TAG.width();
    let mut bytes = vec![0u8; data.len() * width];
    for (value, out) in data.iter().zip(bytes.chunks_exact_mut(width)) {
        value.encode_ne(out);
    }
    bytes
}

/// Format byte size in human-readable form
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Parse a comma-separated `X,Y,Z` triple
pub fn parse_triple(s: &str) -> Result<[usize; 3]> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(OokError::invalid(format!(
            "expected X,Y,Z but got '{}'",
            s
        )));
    }
    let mut out = [0usize; 3];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part
            .parse()
            .map_err(|_| OokError::invalid(format!("'{}' is not a count", part)))?;
    }
    Ok(out)
}
