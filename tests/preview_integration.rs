use std::sync::Arc;
use std::time::Duration;

use depthview_lib::depth::mapper::{map_sample, OverflowPolicy};
use depthview_lib::preview::pipeline::FramePipeline;
use depthview_lib::preview::session::PreviewSession;
use depthview_lib::preview::surface::DisplaySurface;
use depthview_lib::sensor::backend::FrameSource;
use depthview_lib::sensor::dummy::{DummySensor, DUMMY_MIN_RELIABLE_MM};
use depthview_lib::sensor::types::{FrameDescription, ReliabilityWindow};
use depthview_lib::settings::types::PipelineSettings;
use depthview_lib::status::monitor::SensorStatus;

const DESC: FrameDescription = FrameDescription {
    width: 64,
    height: 48,
    bytes_per_sample: 2,
};

fn dummy(drop_every: u64) -> Arc<DummySensor> {
    Arc::new(DummySensor::new(DESC, Duration::from_millis(5), drop_every))
}

#[test]
fn synthetic_sensor_renders_expected_bands() {
    let sensor = dummy(0);
    let session = PreviewSession::new(
        Arc::clone(&sensor) as Arc<dyn FrameSource>,
        &PipelineSettings::default(),
    )
    .unwrap();
    session.start().unwrap();
    std::thread::sleep(Duration::from_millis(60));
    session.stop().unwrap();

    let pixels = session.surface().snapshot();
    let width = DESC.width as usize;

    // Unknown band (rows 18..24) is black.
    assert!(pixels[18 * width..24 * width].iter().all(|&p| p == 0));
    // Far-field strip (9000mm) wraps past white under the default policy.
    let far_field = map_sample(9000, ReliabilityWindow::FULL, OverflowPolicy::Wrap);
    assert_eq!(far_field, 32);
    assert!((0..4).all(|x| pixels[x] == far_field));
    // Ramp pixels stay inside the 500..7500mm band.
    let lo = map_sample(DUMMY_MIN_RELIABLE_MM, ReliabilityWindow::FULL, OverflowPolicy::Wrap);
    assert!(pixels[4..width].iter().all(|&p| (lo..=240).contains(&p)));
}

#[test]
fn dropped_frames_are_counted_and_skipped() {
    let sensor = dummy(2);
    let session = PreviewSession::new(
        Arc::clone(&sensor) as Arc<dyn FrameSource>,
        &PipelineSettings::default(),
    )
    .unwrap();
    session.start().unwrap();
    std::thread::sleep(Duration::from_millis(60));
    session.stop().unwrap();

    let diagnostics = session.pipeline().diagnostics();
    let delivered = sensor.frames_delivered();
    assert_eq!(diagnostics.drop_count, delivered / 2);
    assert_eq!(diagnostics.frame_count, delivered - delivered / 2);
    assert_eq!(session.surface().sequence(), diagnostics.frame_count);
    assert_eq!(diagnostics.reject_count, 0);
}

#[test]
fn mismatched_injected_surface_is_never_written() {
    let sensor = dummy(0);
    let surface = Arc::new(DisplaySurface::new(32, 24));
    let pipeline = FramePipeline::new(
        Arc::clone(&sensor) as Arc<dyn FrameSource>,
        Arc::clone(&surface),
        &PipelineSettings::default(),
    )
    .unwrap();

    pipeline.start().unwrap();
    std::thread::sleep(Duration::from_millis(30));
    pipeline.stop().unwrap();

    assert_eq!(surface.sequence(), 0);
    assert!(pipeline.diagnostics().reject_count > 0);
}

#[test]
fn status_follows_sensor_lifecycle() {
    let sensor = dummy(0);
    let session = PreviewSession::new(
        Arc::clone(&sensor) as Arc<dyn FrameSource>,
        &PipelineSettings::default(),
    )
    .unwrap();
    assert_eq!(session.monitor().status(), SensorStatus::NoSensor);

    session.start().unwrap();
    assert_eq!(session.monitor().status(), SensorStatus::Running);

    sensor.set_available(false);
    assert_eq!(session.monitor().status(), SensorStatus::SensorLost);
    assert_eq!(session.status_text().get(), "Depth sensor not available!");

    sensor.set_available(true);
    assert_eq!(session.status_text().get(), "Running");
    session.stop().unwrap();
}

#[test]
fn pipeline_teardown_detaches_from_running_sensor() {
    let sensor = dummy(0);
    {
        let pipeline = FramePipeline::with_own_surface(
            Arc::clone(&sensor) as Arc<dyn FrameSource>,
            &PipelineSettings::default(),
        )
        .unwrap();
        pipeline.start().unwrap();
        std::thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(sensor.subscriber_count(), 0);
    assert!(!sensor.is_available());
}
