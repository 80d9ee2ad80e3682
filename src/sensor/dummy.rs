//! Synthetic depth sensor.
//!
//! Spawns a delivery thread that renders a moving depth ramp at a fixed
//! interval and hands it to every frame subscriber, the way a real sensor SDK
//! invokes its frame-arrived event.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;

use crate::sensor::backend::{AvailabilityCallback, FrameCallback, FrameSource};
use crate::sensor::error::{Result, SensorError};
use crate::sensor::types::{DepthFrame, FrameDescription, FrameReference, SubscriptionId};
use crate::settings::types::DummySensorSettings;

/// Closest distance the synthetic sensor reports as reliable.
pub const DUMMY_MIN_RELIABLE_MM: u16 = 500;
/// Farthest distance the synthetic sensor reports as reliable.
pub const DUMMY_MAX_RELIABLE_MM: u16 = 4500;

/// Depth written into the far-field band, beyond the displayable range.
const FAR_FIELD_MM: u16 = 9000;
/// Span of the moving ramp, starting at the minimum reliable distance.
const RAMP_SPAN_MM: u32 = 7000;

/// A fake depth sensor for running without hardware.
///
/// Enable via `DUMMY_SENSOR=1` environment variable.
pub struct DummySensor {
    description: FrameDescription,
    interval: Duration,
    drop_every: u64,
    shared: Arc<Shared>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

/// State shared with the delivery thread.
struct Shared {
    running: AtomicBool,
    available: AtomicBool,
    subscribers: Mutex<Vec<(SubscriptionId, FrameCallback)>>,
    watchers: Mutex<Vec<AvailabilityCallback>>,
    next_id: AtomicU64,
    delivered: AtomicU64,
}

/// Frame handed to subscribers for one delivery cycle.
struct DummyFrame<'a> {
    data: &'a [u8],
    expired: bool,
    relative_time_us: u64,
}

impl FrameReference for DummyFrame<'_> {
    fn acquire_frame(&self) -> Option<DepthFrame<'_>> {
        if self.expired {
            return None;
        }
        Some(DepthFrame {
            data: self.data,
            min_reliable_distance: DUMMY_MIN_RELIABLE_MM,
            max_reliable_distance: DUMMY_MAX_RELIABLE_MM,
            relative_time_us: self.relative_time_us,
        })
    }
}

impl DummySensor {
    /// Create a synthetic sensor. `drop_every = 0` never expires a frame.
    pub fn new(description: FrameDescription, interval: Duration, drop_every: u64) -> Self {
        Self {
            description,
            interval,
            drop_every,
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                available: AtomicBool::new(false),
                subscribers: Mutex::new(Vec::new()),
                watchers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                delivered: AtomicU64::new(0),
            }),
            thread: Mutex::new(None),
        }
    }

    /// Build a sensor from persisted settings.
    pub fn from_settings(settings: &DummySensorSettings) -> Self {
        Self::new(
            settings.description,
            Duration::from_millis(settings.frame_interval_ms),
            settings.drop_every,
        )
    }

    /// Whether the synthetic sensor is enabled via environment variable.
    pub fn is_enabled() -> bool {
        std::env::var("DUMMY_SENSOR").is_ok_and(|v| v == "1" || v == "true")
    }

    /// Number of frames handed to at least one subscriber since creation.
    pub fn frames_delivered(&self) -> u64 {
        self.shared.delivered.load(Ordering::Relaxed)
    }

    /// Number of active frame subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.lock().len()
    }

    /// Simulate the sensor being plugged in or unplugged.
    pub fn set_available(&self, available: bool) {
        self.shared.set_available(available);
    }
}

impl Shared {
    fn set_available(&self, available: bool) {
        if self.available.swap(available, Ordering::AcqRel) == available {
            return;
        }
        tracing::info!(available, "dummy sensor availability changed");
        for watcher in self.watchers.lock().iter() {
            watcher(available);
        }
    }
}

impl FrameSource for DummySensor {
    fn frame_description(&self) -> FrameDescription {
        self.description
    }

    fn is_available(&self) -> bool {
        self.shared.available.load(Ordering::Acquire)
    }

    fn open(&self) -> Result<()> {
        let mut thread = self.thread.lock();
        if thread.is_some() {
            return Ok(());
        }

        self.shared.running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let description = self.description;
        let interval = self.interval;
        let drop_every = self.drop_every;

        let handle = std::thread::Builder::new()
            .name("dummy-depth".to_string())
            .spawn(move || {
                deliver_frames(&shared, description, interval, drop_every);
            })
            .map_err(|e| {
                self.shared.running.store(false, Ordering::Release);
                SensorError::Open(format!("failed to spawn delivery thread: {e}"))
            })?;
        *thread = Some(handle);
        drop(thread);

        tracing::info!(%description, "dummy sensor opened");
        self.shared.set_available(true);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.shared.running.store(false, Ordering::Release);
        if let Some(handle) = self.thread.lock().take() {
            handle
                .join()
                .map_err(|_| SensorError::Close("delivery thread panicked".to_string()))?;
            tracing::info!("dummy sensor closed");
        }
        self.shared.set_available(false);
        Ok(())
    }

    fn subscribe_frames(&self, callback: FrameCallback) -> Result<SubscriptionId> {
        let id = SubscriptionId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        self.shared.subscribers.lock().push((id, callback));
        Ok(id)
    }

    fn unsubscribe_frames(&self, id: SubscriptionId) -> Result<()> {
        // Delivery holds this lock for the whole callback pass, so acquiring it
        // waits out any frame in flight.
        let mut subs = self.shared.subscribers.lock();
        let before = subs.len();
        subs.retain(|(sub, _)| *sub != id);
        if subs.len() == before {
            return Err(SensorError::UnknownSubscription(id.0));
        }
        Ok(())
    }

    fn watch_availability(&self, callback: AvailabilityCallback) -> Result<()> {
        self.shared.watchers.lock().push(callback);
        Ok(())
    }
}

impl Drop for DummySensor {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("dummy sensor shutdown failed: {e}");
        }
    }
}

/// Delivery loop that runs on the sensor thread.
fn deliver_frames(
    shared: &Shared,
    description: FrameDescription,
    interval: Duration,
    drop_every: u64,
) {
    let mut samples = vec![0u16; description.pixel_count()];
    let mut bytes = vec![0u8; description.byte_size()];
    let mut seq: u64 = 0;

    while shared.running.load(Ordering::Acquire) {
        seq += 1;
        fill_test_pattern(&mut samples, description, seq);
        encode_samples(&samples, &mut bytes);

        let frame = DummyFrame {
            data: &bytes,
            expired: seq.checked_rem(drop_every) == Some(0),
            relative_time_us: seq * interval.as_micros() as u64,
        };
        {
            let subs = shared.subscribers.lock();
            for (_, callback) in subs.iter() {
                callback(&frame);
            }
            if !subs.is_empty() {
                shared.delivered.fetch_add(1, Ordering::Relaxed);
            }
        }

        std::thread::sleep(interval);
    }
}

/// Moving horizontal ramp with a band of unknown (zero) samples through the
/// middle and a far-field strip on the left edge.
fn fill_test_pattern(samples: &mut [u16], description: FrameDescription, seq: u64) {
    let width = description.width.max(1) as usize;
    let height = description.height as usize;
    let band = (height * 3 / 8)..(height / 2);
    let far_field = width / 16;
    let shift = (seq as usize).wrapping_mul(4);

    for (i, sample) in samples.iter_mut().enumerate() {
        let (x, y) = (i % width, i / width);
        *sample = if band.contains(&y) {
            0
        } else if x < far_field {
            FAR_FIELD_MM
        } else {
            let phase = (x.wrapping_add(shift) % width) as u32;
            DUMMY_MIN_RELIABLE_MM + (phase * RAMP_SPAN_MM / width as u32) as u16
        };
    }
}

fn encode_samples(samples: &[u16], bytes: &mut [u8]) {
    for (chunk, sample) in bytes.chunks_exact_mut(2).zip(samples) {
        chunk.copy_from_slice(&sample.to_le_bytes());
    }
}
