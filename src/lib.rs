pub mod depth;
pub mod diagnostics;
pub mod preview;
pub mod sensor;
pub mod settings;
pub mod status;

use std::sync::Arc;
use std::time::Duration;

use preview::session::PreviewSession;
use sensor::backend::{AvailabilityCallback, FrameCallback, FrameSource};
use sensor::types::{FrameDescription, SubscriptionId};
use settings::store::SettingsStore;
use settings::types::PipelineSettings;

/// How often the runner logs a diagnostics snapshot.
const DIAGNOSTICS_INTERVAL: Duration = Duration::from_secs(5);

/// Create the frame source for the current environment.
///
/// When `DUMMY_SENSOR=1` is set, a synthetic sensor is used instead.
pub fn create_frame_source(settings: &PipelineSettings) -> Arc<dyn FrameSource> {
    if sensor::dummy::DummySensor::is_enabled() {
        return Arc::new(sensor::dummy::DummySensor::from_settings(
            &settings.dummy_sensor,
        ));
    }
    Arc::new(NullSource)
}

/// No-op source used when no sensor backend is selected.
///
/// Never available and never delivers frames, so the UI shows the
/// "no sensor" status.
pub struct NullSource;

impl FrameSource for NullSource {
    fn frame_description(&self) -> FrameDescription {
        FrameDescription::default()
    }
    fn is_available(&self) -> bool {
        false
    }
    fn open(&self) -> sensor::error::Result<()> {
        Ok(())
    }
    fn close(&self) -> sensor::error::Result<()> {
        Ok(())
    }
    fn subscribe_frames(
        &self,
        _callback: FrameCallback,
    ) -> sensor::error::Result<SubscriptionId> {
        Ok(SubscriptionId(0))
    }
    fn unsubscribe_frames(&self, _id: SubscriptionId) -> sensor::error::Result<()> {
        Ok(())
    }
    fn watch_availability(
        &self,
        _callback: AvailabilityCallback,
    ) -> sensor::error::Result<()> {
        Ok(())
    }
}

/// Load settings from `DEPTHVIEW_SETTINGS`, falling back to defaults.
///
/// A named file that does not exist yet is created with the defaults.
pub fn load_settings() -> Result<PipelineSettings, settings::store::SettingsError> {
    match SettingsStore::from_env() {
        Some(store) => {
            tracing::info!("loading settings from {}", store.path().display());
            store.read_or_init()
        }
        None => Ok(PipelineSettings::default()),
    }
}

/// Run a headless preview until Ctrl-C, logging status changes and periodic
/// diagnostics.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = load_settings()?;
    let source = create_frame_source(&settings);
    let session = PreviewSession::new(source, &settings)?;

    let mut status_rx = session.status_text().subscribe();
    tracing::info!(status = %session.status_text().get(), "depth preview ready");

    session.start()?;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(DIAGNOSTICS_INTERVAL);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    tracing::warn!("failed to listen for Ctrl-C: {e}");
                }
                break;
            }
            changed = status_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let text = status_rx.borrow_and_update().clone();
                tracing::info!(status = %text, "status changed");
            }
            _ = ticker.tick() => {
                let snapshot = session.pipeline().diagnostics();
                let surface = session.surface();
                let mean = surface.read(|pixels| {
                    let sum: u64 = pixels.iter().map(|&p| u64::from(p)).sum();
                    sum / pixels.len().max(1) as u64
                });
                tracing::info!(
                    sequence = surface.sequence(),
                    mean_intensity = mean,
                    diagnostics = %serde_json::to_string(&snapshot)?,
                    "preview diagnostics"
                );
            }
        }
    }

    session.stop()?;
    tracing::info!("depth preview shut down");
    Ok(())
}
