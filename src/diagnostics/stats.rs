use serde::Serialize;
use std::time::{Duration, Instant};

/// Collects diagnostic statistics for a depth preview pipeline.
pub struct DiagnosticStats {
    frame_count: u64,
    drop_count: u64,
    reject_count: u64,
    total_bytes: u64,
    start_time: Instant,
    processing_us: u64,
    sensor_time_us: u64,
}

/// Snapshot of diagnostic stats for serialisation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticSnapshot {
    pub fps: f64,
    pub frame_count: u64,
    pub drop_count: u64,
    pub reject_count: u64,
    pub drop_rate: f64,
    pub processing_ms: f64,
    pub bandwidth_bps: u64,
    /// Sensor timestamp of the latest published frame.
    pub sensor_time_us: u64,
}

impl DiagnosticStats {
    /// Create new stats with zeroed counters.
    pub fn new() -> Self {
        Self {
            frame_count: 0,
            drop_count: 0,
            reject_count: 0,
            total_bytes: 0,
            start_time: Instant::now(),
            processing_us: 0,
            sensor_time_us: 0,
        }
    }

    /// Record a frame that was mapped and published.
    pub fn record_frame(&mut self, bytes: usize, processing: Duration, sensor_time_us: u64) {
        self.frame_count += 1;
        self.total_bytes += bytes as u64;
        self.processing_us = processing.as_micros() as u64;
        self.sensor_time_us = sensor_time_us;
    }

    /// Record a frame that expired before it could be acquired.
    pub fn record_drop(&mut self) {
        self.drop_count += 1;
    }

    /// Record a frame that failed geometry validation.
    pub fn record_rejection(&mut self) {
        self.reject_count += 1;
    }

    /// Calculate current FPS based on elapsed time.
    pub fn fps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0.0;
        }
        self.frame_count as f64 / elapsed
    }

    /// Share of arriving frames that were not published, as a percentage
    /// (0.0 - 100.0).
    pub fn drop_rate(&self) -> f64 {
        let skipped = self.drop_count + self.reject_count;
        let total = self.frame_count + skipped;
        if total == 0 {
            return 0.0;
        }
        (skipped as f64 / total as f64) * 100.0
    }

    /// Latest map-and-publish duration in milliseconds.
    pub fn processing_ms(&self) -> f64 {
        self.processing_us as f64 / 1000.0
    }

    /// Raw depth bytes consumed per second.
    pub fn bandwidth_bps(&self) -> u64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0;
        }
        (self.total_bytes as f64 / elapsed) as u64
    }

    /// Take a serialisable snapshot.
    pub fn snapshot(&self) -> DiagnosticSnapshot {
        DiagnosticSnapshot {
            fps: self.fps(),
            frame_count: self.frame_count,
            drop_count: self.drop_count,
            reject_count: self.reject_count,
            drop_rate: self.drop_rate(),
            processing_ms: self.processing_ms(),
            bandwidth_bps: self.bandwidth_bps(),
            sensor_time_us: self.sensor_time_us,
        }
    }
}

impl Default for DiagnosticStats {
    fn default() -> Self {
        Self::new()
    }
}
