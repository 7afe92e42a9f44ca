//! Scan configuration.
//!
//! Every field has a default, so a configuration file only needs to list the
//! values it changes:
//!
//! ```json
//! { "freq": { "window_size": 256, "high_pass_freq_hz": 20000.0 } }
//! ```

use crate::dsp::chirp_metrics::ChirpSearchParams;
use crate::dsp::window::{WindowFunction, DEFAULT_KAISER_BETA};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Time-domain (onset detection) settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeDomainConfig {
    /// High-pass cutoff applied to each block before onset detection.
    #[serde(alias = "time_filter_low_hz")]
    pub filter_low_hz: Option<f64>,
    /// Multiplies the block's RMS noise level to get the gate threshold.
    pub noise_threshold_factor: f32,
    /// Envelope hop is `sampling_freq / onset_jump_factor` samples.
    pub onset_jump_factor: u32,
    /// RMS frame length in samples, halved below 300 kHz.
    pub onset_frame_length: usize,
}

impl Default for TimeDomainConfig {
    fn default() -> Self {
        Self {
            filter_low_hz: Some(15_000.0),
            noise_threshold_factor: 1.2,
            onset_jump_factor: 2000,
            onset_frame_length: 512,
        }
    }
}

impl TimeDomainConfig {
    pub fn onset_jump(&self, sampling_freq: u32) -> usize {
        (sampling_freq / self.onset_jump_factor.max(1)).max(1) as usize
    }

    /// Frame length adjusted so low-rate recordings give comparable envelopes.
    pub fn effective_frame_length(&self, sampling_freq: u32) -> usize {
        if sampling_freq < 300_000 {
            (self.onset_frame_length / 2).max(1)
        } else {
            self.onset_frame_length
        }
    }
}

/// Frequency-domain (spectrum and call metrics) settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequencyDomainConfig {
    pub window_size: usize,
    /// hann, hamming, blackman, blackman-harris or kaiser.
    pub window_function: String,
    pub kaiser_beta: f64,
    #[serde(flatten)]
    pub search: ChirpSearchParams,
}

impl Default for FrequencyDomainConfig {
    fn default() -> Self {
        Self {
            window_size: 128,
            window_function: "kaiser".into(),
            kaiser_beta: DEFAULT_KAISER_BETA,
            search: ChirpSearchParams::default(),
        }
    }
}

impl FrequencyDomainConfig {
    pub fn window(&self) -> Result<WindowFunction> {
        WindowFunction::from_name(&self.window_function, self.kaiser_beta)
    }
}

/// Call shape output settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeConfig {
    pub enabled: bool,
    /// Usually finer than the metrics jump factor.
    pub jump_factor: u32,
    pub max_size: usize,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            jump_factor: 8000,
            max_size: 512,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub time: TimeDomainConfig,
    pub freq: FrequencyDomainConfig,
    pub shape: ShapeConfig,
    /// Time-expansion factor. `None` treats files below 192 kHz as x10.
    pub time_expansion: Option<u32>,
    /// Skip files whose (time-expansion corrected) rate differs.
    pub expected_sampling_freq: Option<u32>,
}

impl ScanConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: ScanConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: String) -> Result<()> {
            Err(Error::InvalidParameter(msg))
        }

        self.freq.window()?;
        let freq = &self.freq;
        if freq.window_size < 4 || freq.window_size % 2 != 0 {
            return invalid(format!(
                "window_size must be an even number >= 4, got {}",
                freq.window_size
            ));
        }
        if freq.search.jump_factor == 0 {
            return invalid("jump_factor must be positive".into());
        }
        if freq.search.max_frames_to_check == 0 {
            return invalid("max_frames_to_check must be positive".into());
        }
        if !(freq.search.dbfs_below_peak_threshold >= 0.0) {
            return invalid(format!(
                "dbfs_below_peak_threshold must be >= 0, got {}",
                freq.search.dbfs_below_peak_threshold
            ));
        }
        if freq.search.high_pass_freq_hz < 0.0 {
            return invalid("high_pass_freq_hz must not be negative".into());
        }

        let time = &self.time;
        if time.onset_jump_factor == 0 {
            return invalid("onset_jump_factor must be positive".into());
        }
        if time.onset_frame_length == 0 {
            return invalid("onset_frame_length must be positive".into());
        }
        if !(time.noise_threshold_factor >= 0.0) {
            return invalid(format!(
                "noise_threshold_factor must be >= 0, got {}",
                time.noise_threshold_factor
            ));
        }
        if let Some(low) = time.filter_low_hz {
            if !(low > 0.0) {
                return invalid(format!("filter_low_hz must be positive, got {low}"));
            }
        }

        if self.shape.jump_factor == 0 || self.shape.max_size == 0 {
            return invalid("shape jump_factor and max_size must be positive".into());
        }
        if self.time_expansion == Some(0) {
            return invalid("time_expansion must be at least 1".into());
        }
        Ok(())
    }
}
