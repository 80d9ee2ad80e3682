//! Depth-to-intensity mapping.
//!
//! Each 16-bit millimeter sample inside the reliability window becomes
//! `depth * 256 / 8000`, so the 0-8000mm band spans the full byte range.
//! Samples outside the window are black, which makes them indistinguishable
//! from zero-distance samples.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sensor::types::ReliabilityWindow;

/// Depth, in millimeters, that maps onto one step past the brightest byte.
pub const DISPLAY_RANGE_MM: u32 = 8000;

/// Number of intensity levels the display range is divided into.
const INTENSITY_LEVELS: u32 = 256;

/// Size of one raw depth sample.
pub const BYTES_PER_SAMPLE: usize = std::mem::size_of::<u16>();

/// What happens to in-window depths at or beyond [`DISPLAY_RANGE_MM`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Keep the low byte of the scaled value (8000mm wraps back to black).
    #[default]
    Wrap,
    /// Clamp to white.
    Saturate,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("raw buffer holds {available} samples, {requested} requested")]
    ShortInput { requested: usize, available: usize },

    #[error("intensity buffer holds {available} bytes, {requested} requested")]
    ShortOutput { requested: usize, available: usize },
}

/// Map a single depth sample to an intensity byte.
#[inline]
pub fn map_sample(depth: u16, window: ReliabilityWindow, overflow: OverflowPolicy) -> u8 {
    if !window.contains(depth) {
        return 0;
    }
    let scaled = u32::from(depth) * INTENSITY_LEVELS / DISPLAY_RANGE_MM;
    match overflow {
        OverflowPolicy::Wrap => scaled as u8,
        OverflowPolicy::Saturate => scaled.min(u32::from(u8::MAX)) as u8,
    }
}

/// Map the first `sample_count` little-endian samples of `raw` into
/// `out[..sample_count]`.
///
/// Bytes of `out` past `sample_count` are left untouched.
pub fn map_depth(
    raw: &[u8],
    sample_count: usize,
    window: ReliabilityWindow,
    overflow: OverflowPolicy,
    out: &mut [u8],
) -> Result<(), MapError> {
    let available = raw.len() / BYTES_PER_SAMPLE;
    if available < sample_count {
        return Err(MapError::ShortInput {
            requested: sample_count,
            available,
        });
    }
    if out.len() < sample_count {
        return Err(MapError::ShortOutput {
            requested: sample_count,
            available: out.len(),
        });
    }

    let raw = &raw[..sample_count * BYTES_PER_SAMPLE];
    let out = &mut out[..sample_count];

    // Sensor memory is usually u16-aligned; reinterpret in place when the host
    // byte order matches the wire order.
    if cfg!(target_endian = "little") {
        if let Ok(samples) = bytemuck::try_cast_slice::<u8, u16>(raw) {
            for (dst, &depth) in out.iter_mut().zip(samples) {
                *dst = map_sample(depth, window, overflow);
            }
            return Ok(());
        }
    }

    for (dst, pair) in out.iter_mut().zip(raw.chunks_exact(BYTES_PER_SAMPLE)) {
        let depth = u16::from_le_bytes([pair[0], pair[1]]);
        *dst = map_sample(depth, window, overflow);
    }
    Ok(())
}
