use serde::{Deserialize, Serialize};

/// Fixed-rate single-channel waveform; time = index / fs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveformSeries {
    /// Uniform sampling frequency in Hz
    pub fs: f64,
    /// Samples
    pub data: Vec<f64>,
}

impl WaveformSeries {
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.fs
    }
}

/// Fixed-duration display window anchored at a rhythm episode start.
/// Derived on every navigation action, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start_time: f64,
    pub end_time: f64,
}

impl Segment {
    pub fn with_window(start_time: f64, window_s: f64) -> Self {
        Self {
            start_time,
            end_time: start_time + window_s,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}
