use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::sensor::backend::FrameSource;
use crate::sensor::error::Result;
use crate::status::observable::Observable;

/// Text shown for each sensor status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusMessages {
    pub running: String,
    pub no_sensor: String,
    pub sensor_unavailable: String,
}

impl Default for StatusMessages {
    fn default() -> Self {
        Self {
            running: "Running".to_string(),
            no_sensor: "No ready depth sensor found!".to_string(),
            sensor_unavailable: "Depth sensor not available!".to_string(),
        }
    }
}

/// Sensor status as seen by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorStatus {
    Running,
    /// Never connected since the monitor was created.
    NoSensor,
    /// Was connected, now lost.
    SensorLost,
}

impl SensorStatus {
    fn to_u8(self) -> u8 {
        match self {
            Self::Running => 0,
            Self::NoSensor => 1,
            Self::SensorLost => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Running,
            1 => Self::NoSensor,
            _ => Self::SensorLost,
        }
    }
}

/// Tracks sensor availability and keeps the status text in sync.
///
/// Never touches the pixel path.
pub struct AvailabilityMonitor {
    status_text: Arc<Observable<String>>,
    messages: StatusMessages,
    status: AtomicU8,
    ever_available: AtomicBool,
    /// Held across a status update and its text publication so both always
    /// describe the same transition.
    transition: Mutex<()>,
}

impl AvailabilityMonitor {
    /// Create a monitor whose initial status reflects `initially_available`.
    pub fn new(initially_available: bool, messages: StatusMessages) -> Self {
        let status = if initially_available {
            SensorStatus::Running
        } else {
            SensorStatus::NoSensor
        };
        let text = Self::message_for(&messages, status).to_string();
        Self {
            status_text: Arc::new(Observable::new(text)),
            messages,
            status: AtomicU8::new(status.to_u8()),
            ever_available: AtomicBool::new(initially_available),
            transition: Mutex::new(()),
        }
    }

    /// Create a monitor for `source`, seeded with its current availability and
    /// registered for its availability notifications.
    pub fn attach(source: &dyn FrameSource, messages: StatusMessages) -> Result<Arc<Self>> {
        let monitor = Arc::new(Self::new(source.is_available(), messages));
        let weak: Weak<Self> = Arc::downgrade(&monitor);
        source.watch_availability(Box::new(move |available| {
            if let Some(monitor) = weak.upgrade() {
                monitor.on_availability_changed(available);
            }
        }))?;
        Ok(monitor)
    }

    /// React to the sensor connecting or disconnecting.
    pub fn on_availability_changed(&self, is_available: bool) {
        let _transition = self.transition.lock();
        let status = if is_available {
            self.ever_available.store(true, Ordering::Release);
            SensorStatus::Running
        } else if self.ever_available.load(Ordering::Acquire) {
            SensorStatus::SensorLost
        } else {
            SensorStatus::NoSensor
        };

        let previous = SensorStatus::from_u8(self.status.swap(status.to_u8(), Ordering::AcqRel));
        if previous != status {
            tracing::info!(?previous, ?status, "sensor status changed");
        }
        self.status_text
            .set(Self::message_for(&self.messages, status).to_string());
    }

    pub fn status(&self) -> SensorStatus {
        SensorStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Observable status string for the UI.
    pub fn status_text(&self) -> &Arc<Observable<String>> {
        &self.status_text
    }

    fn message_for(messages: &StatusMessages, status: SensorStatus) -> &str {
        match status {
            SensorStatus::Running => &messages.running,
            SensorStatus::NoSensor => &messages.no_sensor,
            SensorStatus::SensorLost => &messages.sensor_unavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::dummy::DummySensor;
    use crate::sensor::types::FrameDescription;
    use std::time::Duration;

    #[test]
    fn starts_with_no_sensor_message_when_unavailable() {
        let monitor = AvailabilityMonitor::new(false, StatusMessages::default());
        assert_eq!(monitor.status(), SensorStatus::NoSensor);
        assert_eq!(monitor.status_text().get(), "No ready depth sensor found!");
    }

    #[test]
    fn starts_running_when_available() {
        let monitor = AvailabilityMonitor::new(true, StatusMessages::default());
        assert_eq!(monitor.status(), SensorStatus::Running);
        assert_eq!(monitor.status_text().get(), "Running");
    }

    #[test]
    fn distinguishes_never_connected_from_lost() {
        let monitor = AvailabilityMonitor::new(false, StatusMessages::default());

        monitor.on_availability_changed(false);
        assert_eq!(monitor.status(), SensorStatus::NoSensor);

        monitor.on_availability_changed(true);
        assert_eq!(monitor.status(), SensorStatus::Running);
        assert_eq!(monitor.status_text().get(), "Running");

        monitor.on_availability_changed(false);
        assert_eq!(monitor.status(), SensorStatus::SensorLost);
        assert_eq!(monitor.status_text().get(), "Depth sensor not available!");
    }

    #[test]
    fn lost_after_initially_available() {
        let monitor = AvailabilityMonitor::new(true, StatusMessages::default());
        monitor.on_availability_changed(false);
        assert_eq!(monitor.status(), SensorStatus::SensorLost);
    }

    #[test]
    fn custom_messages_are_used() {
        let messages = StatusMessages {
            running: "Streaming".to_string(),
            no_sensor: "Plug in a sensor".to_string(),
            sensor_unavailable: "Sensor unplugged".to_string(),
        };
        let monitor = AvailabilityMonitor::new(false, messages);
        assert_eq!(monitor.status_text().get(), "Plug in a sensor");
        monitor.on_availability_changed(true);
        monitor.on_availability_changed(false);
        assert_eq!(monitor.status_text().get(), "Sensor unplugged");
    }

    #[test]
    fn status_text_notifies_only_on_change() {
        let monitor = AvailabilityMonitor::new(false, StatusMessages::default());
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        monitor
            .status_text()
            .on_change(move |text| seen_clone.lock().push(text.clone()));

        monitor.on_availability_changed(true);
        monitor.on_availability_changed(true);
        monitor.on_availability_changed(false);

        assert_eq!(
            *seen.lock(),
            vec![
                "Running".to_string(),
                "Depth sensor not available!".to_string()
            ]
        );
    }

    #[test]
    fn attach_follows_source_availability() {
        let sensor = DummySensor::new(FrameDescription::new(4, 4, 2), Duration::from_millis(5), 0);
        let monitor = AvailabilityMonitor::attach(&sensor, StatusMessages::default()).unwrap();
        assert_eq!(monitor.status(), SensorStatus::NoSensor);

        sensor.set_available(true);
        assert_eq!(monitor.status(), SensorStatus::Running);

        sensor.set_available(false);
        assert_eq!(monitor.status(), SensorStatus::SensorLost);
    }

    #[test]
    fn dropped_monitor_ignores_later_events() {
        let sensor = DummySensor::new(FrameDescription::new(4, 4, 2), Duration::from_millis(5), 0);
        let monitor = AvailabilityMonitor::attach(&sensor, StatusMessages::default()).unwrap();
        drop(monitor);
        sensor.set_available(true);
    }

    #[test]
    fn concurrent_transitions_keep_status_and_text_in_step() {
        let monitor = Arc::new(AvailabilityMonitor::new(false, StatusMessages::default()));
        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let monitor = Arc::clone(&monitor);
                std::thread::spawn(move || {
                    for i in 0..500 {
                        monitor.on_availability_changed((i + worker) % 2 == 0);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let expected =
            AvailabilityMonitor::message_for(&monitor.messages, monitor.status()).to_string();
        assert_eq!(monitor.status_text().get(), expected);
    }
}
