use serde::{Deserialize, Serialize};
use std::fmt;

/// Geometry of the frames a depth sensor delivers.
///
/// Fixed for the lifetime of a sensor connection. Every raw buffer is expected
/// to hold exactly `width * height * bytes_per_sample` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameDescription {
    pub width: u32,
    pub height: u32,
    pub bytes_per_sample: u32,
}

impl FrameDescription {
    /// Native depth geometry of a time-of-flight sensor (512x424, 16-bit).
    pub const TOF_512X424: Self = Self {
        width: 512,
        height: 424,
        bytes_per_sample: 2,
    };

    pub fn new(width: u32, height: u32, bytes_per_sample: u32) -> Self {
        Self {
            width,
            height,
            bytes_per_sample,
        }
    }

    /// Number of pixels (and depth samples) in one frame.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Expected size in bytes of one raw depth buffer.
    pub fn byte_size(&self) -> usize {
        self.pixel_count() * self.bytes_per_sample as usize
    }
}

impl Default for FrameDescription {
    fn default() -> Self {
        Self::TOF_512X424
    }
}

impl fmt::Display for FrameDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} @ {} bytes/sample",
            self.width, self.height, self.bytes_per_sample
        )
    }
}

/// Distance range, in millimeters, certified as trustworthy for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReliabilityWindow {
    pub min_depth: u16,
    pub max_depth: u16,
}

impl ReliabilityWindow {
    /// Window covering every representable depth.
    pub const FULL: Self = Self {
        min_depth: 0,
        max_depth: u16::MAX,
    };

    /// Build a window, returning `None` when `min_depth > max_depth`.
    pub fn new(min_depth: u16, max_depth: u16) -> Option<Self> {
        (min_depth <= max_depth).then_some(Self {
            min_depth,
            max_depth,
        })
    }

    pub fn contains(&self, depth: u16) -> bool {
        (self.min_depth..=self.max_depth).contains(&depth)
    }
}

/// Opaque handle returned by [`FrameSource::subscribe_frames`](super::backend::FrameSource::subscribe_frames).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One depth frame, borrowed from the sensor for the duration of a callback.
#[derive(Debug, Clone, Copy)]
pub struct DepthFrame<'a> {
    /// Raw little-endian 16-bit samples in millimeters.
    pub data: &'a [u8],
    /// Closest distance the sensor considers reliable for this frame.
    pub min_reliable_distance: u16,
    /// Farthest distance the sensor considers reliable for this frame.
    pub max_reliable_distance: u16,
    /// Sensor timestamp relative to stream start, in microseconds.
    pub relative_time_us: u64,
}

impl<'a> DepthFrame<'a> {
    /// Access the underlying sample buffer.
    pub fn lock_buffer(&self) -> &'a [u8] {
        self.data
    }
}

/// Per-event handle to a frame that may already have expired.
pub trait FrameReference {
    /// Acquire the frame. Returns `None` when the sensor has already recycled it.
    fn acquire_frame(&self) -> Option<DepthFrame<'_>>;
}
