//! Bat echolocation call detection and measurement.
//!
//! Recordings are read one second at a time, candidate onsets are found on a
//! short-time RMS envelope, and each onset is measured in the frequency domain
//! by walking windowed spectra outward until the call fades.

pub mod audio;
pub mod config;
pub mod dsp;
pub mod error;
pub mod output;
pub mod scanner;
pub mod types;

pub use config::ScanConfig;
pub use dsp::chirp_metrics::{extract_chirp_metrics, ChirpSearchParams, Rejection};
pub use dsp::chirp_shape::extract_chirp_shape;
pub use dsp::fft::{SpectralMatrix, SpectrumAnalyzer};
pub use dsp::onset::find_onsets;
pub use dsp::window::WindowFunction;
pub use error::{Error, Result};
pub use scanner::Scanner;
pub use types::{AudioBlock, ChirpMetrics, ScanSummary, ShapeRow};
