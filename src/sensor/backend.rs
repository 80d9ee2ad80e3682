use std::sync::Arc;

use crate::sensor::error::Result;
use crate::sensor::types::{FrameDescription, FrameReference, SubscriptionId};

/// Callback invoked on the sensor's delivery thread for every arriving frame.
pub type FrameCallback = Arc<dyn Fn(&dyn FrameReference) + Send + Sync>;

/// Callback invoked when the sensor becomes available or unavailable.
pub type AvailabilityCallback = Box<dyn Fn(bool) + Send + Sync>;

/// Platform-agnostic depth sensor trait.
///
/// Implemented per sensor SDK. Provides frame geometry, an open/close
/// lifecycle, frame delivery and availability notifications.
pub trait FrameSource: Send + Sync {
    /// Geometry of every frame this sensor delivers.
    fn frame_description(&self) -> FrameDescription;

    /// Whether the sensor is currently connected and streaming-capable.
    fn is_available(&self) -> bool;

    /// Open the sensor and begin delivering frames to subscribers.
    fn open(&self) -> Result<()>;

    /// Stop delivery and release the sensor.
    fn close(&self) -> Result<()>;

    /// Register for frame-arrived notifications.
    ///
    /// Deliveries for one subscription are serialized; the callback fires on
    /// the sensor's internal thread.
    fn subscribe_frames(&self, callback: FrameCallback) -> Result<SubscriptionId>;

    /// Remove a frame subscription.
    ///
    /// Must not return while a callback for `id` is still executing.
    fn unsubscribe_frames(&self, id: SubscriptionId) -> Result<()>;

    /// Register for availability change notifications.
    fn watch_availability(&self, callback: AvailabilityCallback) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::error::SensorError;
    use crate::sensor::types::DepthFrame;
    use parking_lot::Mutex;

    /// Mock source for testing trait contract.
    struct MockSource {
        subscribers: Mutex<Vec<(SubscriptionId, FrameCallback)>>,
    }

    impl FrameSource for MockSource {
        fn frame_description(&self) -> FrameDescription {
            FrameDescription::new(2, 2, 2)
        }

        fn is_available(&self) -> bool {
            true
        }

        fn open(&self) -> Result<()> {
            Ok(())
        }

        fn close(&self) -> Result<()> {
            Ok(())
        }

        fn subscribe_frames(&self, callback: FrameCallback) -> Result<SubscriptionId> {
            let mut subs = self.subscribers.lock();
            let id = SubscriptionId(subs.len() as u64);
            subs.push((id, callback));
            Ok(id)
        }

        fn unsubscribe_frames(&self, id: SubscriptionId) -> Result<()> {
            let mut subs = self.subscribers.lock();
            let before = subs.len();
            subs.retain(|(sub, _)| *sub != id);
            if subs.len() == before {
                return Err(SensorError::UnknownSubscription(id.0));
            }
            Ok(())
        }

        fn watch_availability(&self, _callback: AvailabilityCallback) -> Result<()> {
            Ok(())
        }
    }

    struct StaticFrame(Vec<u8>);

    impl FrameReference for StaticFrame {
        fn acquire_frame(&self) -> Option<DepthFrame<'_>> {
            Some(DepthFrame {
                data: &self.0,
                min_reliable_distance: 500,
                max_reliable_distance: 4500,
                relative_time_us: 0,
            })
        }
    }

    #[test]
    fn mock_source_delivers_to_subscriber() {
        let source = MockSource {
            subscribers: Mutex::new(vec![]),
        };
        let seen = Arc::new(Mutex::new(0usize));
        let seen_clone = Arc::clone(&seen);
        source
            .subscribe_frames(Arc::new(move |frame: &dyn FrameReference| {
                if let Some(f) = frame.acquire_frame() {
                    *seen_clone.lock() += f.lock_buffer().len();
                }
            }))
            .unwrap();

        let frame = StaticFrame(vec![0; 8]);
        for (_, cb) in source.subscribers.lock().iter() {
            cb(&frame);
        }
        assert_eq!(*seen.lock(), 8);
    }

    #[test]
    fn mock_source_unsubscribe_unknown_id_is_error() {
        let source = MockSource {
            subscribers: Mutex::new(vec![]),
        };
        let result = source.unsubscribe_frames(SubscriptionId(7));
        assert!(matches!(result, Err(SensorError::UnknownSubscription(7))));
    }

    #[test]
    fn trait_object_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Box<dyn FrameSource>>();
        assert_send_sync::<FrameCallback>();
    }
}
