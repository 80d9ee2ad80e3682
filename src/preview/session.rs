use std::sync::Arc;

use crate::preview::error::Result;
use crate::preview::pipeline::FramePipeline;
use crate::preview::surface::DisplaySurface;
use crate::sensor::backend::FrameSource;
use crate::settings::types::PipelineSettings;
use crate::status::monitor::AvailabilityMonitor;
use crate::status::observable::Observable;

/// A frame source wired to its pipeline and availability monitor.
///
/// This is what the UI holds: it reads [`surface`](Self::surface) and
/// [`status_text`](Self::status_text), and calls `start`/`stop`.
pub struct PreviewSession {
    source: Arc<dyn FrameSource>,
    monitor: Arc<AvailabilityMonitor>,
    pipeline: FramePipeline,
}

impl PreviewSession {
    /// Attach the availability monitor first so it sees the transition caused
    /// by opening the source.
    pub fn new(source: Arc<dyn FrameSource>, settings: &PipelineSettings) -> Result<Self> {
        let monitor = AvailabilityMonitor::attach(source.as_ref(), settings.status.clone())?;
        let pipeline = FramePipeline::with_own_surface(Arc::clone(&source), settings)?;
        Ok(Self {
            source,
            monitor,
            pipeline,
        })
    }

    pub fn start(&self) -> Result<()> {
        self.pipeline.start()
    }

    pub fn stop(&self) -> Result<()> {
        self.pipeline.stop()
    }

    pub fn source(&self) -> &Arc<dyn FrameSource> {
        &self.source
    }

    pub fn monitor(&self) -> &Arc<AvailabilityMonitor> {
        &self.monitor
    }

    pub fn pipeline(&self) -> &FramePipeline {
        &self.pipeline
    }

    pub fn surface(&self) -> &Arc<DisplaySurface> {
        self.pipeline.surface()
    }

    pub fn status_text(&self) -> &Arc<Observable<String>> {
        self.monitor.status_text()
    }
}
