//! Per-frame depth preview pipeline.
//!
//! Runs on the sensor's delivery thread: acquire the frame, validate its
//! geometry, map depth to intensity into a reused buffer, then commit the
//! buffer to the display surface in one write. Every failure skips the frame;
//! the next arrival is the retry.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use thiserror::Error;

use crate::depth::mapper::{self, OverflowPolicy, BYTES_PER_SAMPLE};
use crate::diagnostics::stats::{DiagnosticSnapshot, DiagnosticStats};
use crate::preview::error::{PipelineError, Result};
use crate::preview::surface::DisplaySurface;
use crate::sensor::backend::FrameSource;
use crate::sensor::types::{FrameDescription, FrameReference, ReliabilityWindow, SubscriptionId};
use crate::settings::types::{DepthRangePolicy, PipelineSettings};

/// Whether the pipeline is between frames or working on one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Processing,
}

const STATE_IDLE: u8 = 0;
const STATE_PROCESSING: u8 = 1;

/// Why a frame was skipped after acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameRejection {
    #[error("raw buffer is {actual} bytes, expected {expected}")]
    ByteSize { expected: usize, actual: usize },

    #[error("frame is {frame_width}x{frame_height} but surface is {surface_width}x{surface_height}")]
    SurfaceGeometry {
        frame_width: u32,
        frame_height: u32,
        surface_width: u32,
        surface_height: u32,
    },

    #[error("inverted reliability window: {min_depth}..={max_depth}")]
    InvertedWindow { min_depth: u16, max_depth: u16 },
}

/// Result of handling one frame-arrived notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Mapped and committed to the display surface.
    Published,
    /// The frame expired before it could be acquired.
    Dropped,
    /// The frame was acquired but failed validation.
    Rejected(FrameRejection),
}

/// State touched from the delivery thread.
struct PipelineCore {
    description: FrameDescription,
    surface: Arc<DisplaySurface>,
    intensity: Mutex<Vec<u8>>,
    state: AtomicU8,
    range_policy: DepthRangePolicy,
    overflow: OverflowPolicy,
    stats: Mutex<DiagnosticStats>,
}

/// Marks the pipeline as processing until dropped.
struct ProcessingGuard<'a>(&'a AtomicU8);

impl<'a> ProcessingGuard<'a> {
    fn enter(state: &'a AtomicU8) -> Self {
        state.store(STATE_PROCESSING, Ordering::Release);
        Self(state)
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(STATE_IDLE, Ordering::Release);
    }
}

impl PipelineCore {
    fn on_frame_arrived(&self, frame_ref: &dyn FrameReference) -> FrameOutcome {
        // Held for the whole cycle so overlapping deliveries run in order.
        let mut intensity = self.intensity.lock();
        let _processing = ProcessingGuard::enter(&self.state);

        let Some(frame) = frame_ref.acquire_frame() else {
            self.stats.lock().record_drop();
            tracing::debug!("depth frame expired before acquisition");
            return FrameOutcome::Dropped;
        };
        let started = Instant::now();
        let raw = frame.lock_buffer();

        let window = self
            .validate(raw.len())
            .and_then(|()| {
                self.window_for(frame.min_reliable_distance, frame.max_reliable_distance)
            });
        let window = match window {
            Ok(window) => window,
            Err(rejection) => return self.reject(rejection),
        };

        let pixel_count = self.description.pixel_count();
        if let Err(e) = mapper::map_depth(raw, pixel_count, window, self.overflow, &mut intensity) {
            // Unreachable once the byte size has been validated.
            tracing::warn!("depth mapping failed: {e}");
            return self.reject(FrameRejection::ByteSize {
                expected: self.description.byte_size(),
                actual: raw.len(),
            });
        }

        if let Err(e) = self.surface.commit(&intensity) {
            tracing::warn!("surface commit failed: {e}");
            return self.reject(self.surface_mismatch());
        }

        self.stats
            .lock()
            .record_frame(raw.len(), started.elapsed(), frame.relative_time_us);
        FrameOutcome::Published
    }

    fn validate(&self, byte_size: usize) -> std::result::Result<(), FrameRejection> {
        let expected = self.description.byte_size();
        if byte_size != expected {
            return Err(FrameRejection::ByteSize {
                expected,
                actual: byte_size,
            });
        }
        if self.description.width != self.surface.width()
            || self.description.height != self.surface.height()
        {
            return Err(self.surface_mismatch());
        }
        Ok(())
    }

    fn window_for(
        &self,
        min_reliable: u16,
        max_reliable: u16,
    ) -> std::result::Result<ReliabilityWindow, FrameRejection> {
        let max_depth = match self.range_policy {
            DepthRangePolicy::FullRange => u16::MAX,
            DepthRangePolicy::SensorReliable => max_reliable,
        };
        ReliabilityWindow::new(min_reliable, max_depth).ok_or(FrameRejection::InvertedWindow {
            min_depth: min_reliable,
            max_depth,
        })
    }

    fn surface_mismatch(&self) -> FrameRejection {
        FrameRejection::SurfaceGeometry {
            frame_width: self.description.width,
            frame_height: self.description.height,
            surface_width: self.surface.width(),
            surface_height: self.surface.height(),
        }
    }

    fn reject(&self, rejection: FrameRejection) -> FrameOutcome {
        self.stats.lock().record_rejection();
        tracing::warn!("skipping depth frame: {rejection}");
        FrameOutcome::Rejected(rejection)
    }
}

/// Depth preview pipeline bound to one frame source and one display surface.
pub struct FramePipeline {
    source: Arc<dyn FrameSource>,
    core: Arc<PipelineCore>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl FramePipeline {
    /// Create a pipeline for `source` that publishes into `surface`.
    ///
    /// Allocates the intensity buffer once from the source's frame geometry.
    /// Nothing is subscribed or opened until [`start`](Self::start).
    pub fn new(
        source: Arc<dyn FrameSource>,
        surface: Arc<DisplaySurface>,
        settings: &PipelineSettings,
    ) -> Result<Self> {
        let description = source.frame_description();
        if description.bytes_per_sample as usize != BYTES_PER_SAMPLE {
            return Err(PipelineError::UnsupportedSampleSize(
                description.bytes_per_sample,
            ));
        }
        if description.pixel_count() == 0 {
            return Err(PipelineError::EmptyGeometry {
                width: description.width,
                height: description.height,
            });
        }
        if surface.width() != description.width || surface.height() != description.height {
            tracing::warn!(
                "display surface is {}x{} but sensor delivers {description}; frames will be skipped",
                surface.width(),
                surface.height()
            );
        }

        let core = PipelineCore {
            description,
            surface,
            intensity: Mutex::new(vec![0; description.pixel_count()]),
            state: AtomicU8::new(STATE_IDLE),
            range_policy: settings.range_policy,
            overflow: settings.overflow,
            stats: Mutex::new(DiagnosticStats::new()),
        };

        Ok(Self {
            source,
            core: Arc::new(core),
            subscription: Mutex::new(None),
        })
    }

    /// Create a pipeline with a freshly allocated surface sized to the source.
    pub fn with_own_surface(
        source: Arc<dyn FrameSource>,
        settings: &PipelineSettings,
    ) -> Result<Self> {
        let surface = Arc::new(DisplaySurface::for_description(source.frame_description()));
        Self::new(source, surface, settings)
    }

    /// Subscribe to frame delivery and open the source. Idempotent.
    pub fn start(&self) -> Result<()> {
        let mut subscription = self.subscription.lock();
        if subscription.is_some() {
            return Ok(());
        }

        let core = Arc::clone(&self.core);
        let id = self
            .source
            .subscribe_frames(Arc::new(move |frame: &dyn FrameReference| {
                core.on_frame_arrived(frame);
            }))?;

        if let Err(e) = self.source.open() {
            if let Err(unsub) = self.source.unsubscribe_frames(id) {
                tracing::warn!("failed to roll back frame subscription: {unsub}");
            }
            return Err(e.into());
        }

        *subscription = Some(id);
        tracing::info!(
            description = %self.core.description,
            "depth pipeline started"
        );
        Ok(())
    }

    /// Unsubscribe from frame delivery, then close the source. Idempotent.
    ///
    /// The source is closed even when unsubscribing fails; the first error is
    /// returned. Once this returns no frame callback references the
    /// pipeline's buffers.
    pub fn stop(&self) -> Result<()> {
        let Some(id) = self.subscription.lock().take() else {
            return Ok(());
        };
        let unsubscribed = self.source.unsubscribe_frames(id);
        if let Err(e) = &unsubscribed {
            tracing::warn!("failed to unsubscribe from frame delivery: {e}");
        }
        let closed = self.source.close();
        unsubscribed?;
        closed?;
        tracing::info!("depth pipeline stopped");
        Ok(())
    }

    /// Handle one frame-arrived notification.
    ///
    /// Normally driven by the source subscription set up in [`start`](Self::start);
    /// exposed for collaborators that deliver frames themselves.
    pub fn on_frame_arrived(&self, frame: &dyn FrameReference) -> FrameOutcome {
        self.core.on_frame_arrived(frame)
    }

    pub fn is_started(&self) -> bool {
        self.subscription.lock().is_some()
    }

    pub fn state(&self) -> PipelineState {
        match self.core.state.load(Ordering::Acquire) {
            STATE_PROCESSING => PipelineState::Processing,
            _ => PipelineState::Idle,
        }
    }

    pub fn description(&self) -> FrameDescription {
        self.core.description
    }

    /// Read-only handle to the published pixels.
    pub fn surface(&self) -> &Arc<DisplaySurface> {
        &self.core.surface
    }

    /// Length of the reused intensity buffer.
    pub fn intensity_len(&self) -> usize {
        self.core.intensity.lock().len()
    }

    /// Take a snapshot of diagnostic stats for this pipeline.
    pub fn diagnostics(&self) -> DiagnosticSnapshot {
        self.core.stats.lock().snapshot()
    }
}

impl Drop for FramePipeline {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!("depth pipeline shutdown failed: {e}");
        }
    }
}
