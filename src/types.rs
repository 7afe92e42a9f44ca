use serde::{Deserialize, Serialize};

/// One block of mono audio, samples in [-1.0, 1.0].
///
/// `sampling_freq` is the true sampling frequency: for time-expanded
/// recordings it is already multiplied by the expansion factor.
#[derive(Clone, Debug)]
pub struct AudioBlock {
    pub samples: Vec<f32>,
    pub sampling_freq: u32,
    /// Zero-based position of this block in its file.
    pub block_number: usize,
    /// Sample index of the first sample within the file
    /// (`block_number * block_length`).
    pub offset: usize,
}

impl AudioBlock {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sampling_freq as f64
    }
}

/// Acoustic parameters of one accepted call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChirpMetrics {
    pub peak_freq_hz: f64,
    pub peak_dbfs: f64,
    pub start_freq_hz: f64,
    pub end_freq_hz: f64,
    pub max_freq_hz: f64,
    pub min_freq_hz: f64,
    pub duration_ms: f64,
    pub peak_signal_index: usize,
    pub start_signal_index: usize,
    pub end_signal_index: usize,
}

impl ChirpMetrics {
    pub const HEADER: [&'static str; 10] = [
        "peak_freq_hz",
        "peak_dbfs",
        "start_freq_hz",
        "end_freq_hz",
        "max_freq_hz",
        "min_freq_hz",
        "duration_ms",
        "peak_signal_index",
        "start_signal_index",
        "end_signal_index",
    ];

    /// Shift all sample indices by `offset`, used when blocks are concatenated.
    pub fn offset_indices(&mut self, offset: usize) {
        self.peak_signal_index += offset;
        self.start_signal_index += offset;
        self.end_signal_index += offset;
    }

    pub fn bandwidth_hz(&self) -> f64 {
        self.max_freq_hz - self.min_freq_hz
    }
}

/// One frame of the dense time-frequency trace of a call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeRow {
    pub time_s: f64,
    pub frequency_hz: f64,
    pub amplitude_dbfs: f64,
    pub signal_index: usize,
}

impl ShapeRow {
    pub const HEADER: [&'static str; 4] = ["time_s", "frequency_hz", "amplitude_dbfs", "signal_index"];
}

/// Per-file totals reported by the scanner.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ScanSummary {
    pub file: String,
    pub sampling_freq: u32,
    pub blocks: usize,
    pub checked_onsets: usize,
    pub accepted_calls: usize,
    /// Metrics table path, `None` when no call was accepted.
    pub metrics_path: Option<String>,
    /// Set when the file's sampling frequency did not match the expected one.
    pub skipped: bool,
}
