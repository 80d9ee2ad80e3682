use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::preview::error::{PipelineError, Result};
use crate::sensor::types::FrameDescription;

/// Fixed-size 8-bit grayscale pixel target shared with the UI.
///
/// Double buffered: [`commit`](Self::commit) fills the back buffer, then swaps
/// it to the front under a lock held only for the pointer swap. Readers take an
/// `Arc` of the front buffer and never hold a lock while they work, so they
/// always see a complete frame and never stall the delivery thread.
pub struct DisplaySurface {
    width: u32,
    height: u32,
    front: Mutex<Arc<Vec<u8>>>,
    back: Mutex<Arc<Vec<u8>>>,
    /// Monotonic counter incremented on each commit, so the UI can tell when
    /// a repaint is due without comparing pixels.
    sequence: AtomicU64,
}

impl DisplaySurface {
    /// Create a black surface of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            front: Mutex::new(Arc::new(vec![0; len])),
            back: Mutex::new(Arc::new(vec![0; len])),
            sequence: AtomicU64::new(0),
        }
    }

    /// Create a surface matching a sensor's frame geometry.
    pub fn for_description(description: FrameDescription) -> Self {
        Self::new(description.width, description.height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row stride in bytes.
    pub fn stride(&self) -> usize {
        self.width as usize
    }

    /// Total number of pixels.
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of commits since creation.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    /// Replace the full surface rectangle with `pixels`.
    ///
    /// Reuses the back buffer in place. A fresh buffer is allocated only when a
    /// reader still holds the frame from two commits ago.
    pub fn commit(&self, pixels: &[u8]) -> Result<()> {
        if pixels.len() != self.len() {
            return Err(PipelineError::SurfaceSize {
                expected: self.len(),
                actual: pixels.len(),
            });
        }
        let mut back = self.back.lock();
        match Arc::get_mut(&mut back) {
            Some(buffer) => buffer.copy_from_slice(pixels),
            None => *back = Arc::new(pixels.to_vec()),
        }

        let mut front = self.front.lock();
        std::mem::swap(&mut *front, &mut *back);
        self.sequence.fetch_add(1, Ordering::Release);
        Ok(())
    }

    /// The most recently committed frame and the sequence it belongs to.
    pub fn latest(&self) -> (Arc<Vec<u8>>, u64) {
        let front = self.front.lock();
        (Arc::clone(&front), self.sequence())
    }

    /// Run `f` against the most recently committed pixels.
    pub fn read<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let (pixels, _) = self.latest();
        f(&pixels)
    }

    /// Copy the current pixels into `dst`, returning the commit sequence the
    /// copy corresponds to.
    pub fn copy_into(&self, dst: &mut [u8]) -> Result<u64> {
        let (pixels, sequence) = self.latest();
        if dst.len() != pixels.len() {
            return Err(PipelineError::SurfaceSize {
                expected: pixels.len(),
                actual: dst.len(),
            });
        }
        dst.copy_from_slice(&pixels);
        Ok(sequence)
    }

    /// Owned copy of the current pixels.
    pub fn snapshot(&self) -> Vec<u8> {
        self.latest().0.to_vec()
    }
}
