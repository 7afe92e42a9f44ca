use crate::dsp::fft::SpectrumAnalyzer;
use crate::types::{ChirpMetrics, ShapeRow};

/// Steps of context added before the start and after the end of a call.
pub const SHAPE_PADDING_STEPS: usize = 5;

/// Dense time-frequency trace of a call for plotting.
///
/// `start_index` and `stop_index` are absolute sample indices of the call
/// (usually from [`ChirpMetrics`]); `onset` stands in for either when unset.
/// The trace starts [`SHAPE_PADDING_STEPS`] steps before the start and ends
/// the same amount after the stop, with at most `max_size` rows. Every row is
/// reported, including rows past the end of the signal.
pub fn extract_chirp_shape(
    analyzer: &SpectrumAnalyzer,
    signal: &[f32],
    onset: usize,
    start_index: Option<usize>,
    stop_index: Option<usize>,
    jump_factor: u32,
    max_size: usize,
) -> Vec<ShapeRow> {
    let sampling_freq = analyzer.sampling_freq();
    let jump = (sampling_freq / jump_factor.max(1)).max(1) as usize;
    let padding = SHAPE_PADDING_STEPS * jump;

    let anchor = start_index.unwrap_or(onset).saturating_sub(padding);
    let end = stop_index.unwrap_or(onset).max(anchor) + padding;
    let size = ((end - anchor) / jump + 1).min(max_size);

    let matrix = analyzer.build_matrix(signal, anchor, size, jump);
    matrix
        .iter_rows()
        .enumerate()
        .map(|(row, spectrum)| {
            let (frequency_hz, amplitude_dbfs) = analyzer.peak_interpolation(spectrum);
            let signal_index = matrix.row_signal_index(row);
            ShapeRow {
                time_s: signal_index as f64 / sampling_freq as f64,
                frequency_hz,
                amplitude_dbfs,
                signal_index,
            }
        })
        .collect()
}

/// Shape of an accepted call using its measured start and end.
pub fn shape_for_metrics(
    analyzer: &SpectrumAnalyzer,
    signal: &[f32],
    onset: usize,
    metrics: &ChirpMetrics,
    jump_factor: u32,
    max_size: usize,
) -> Vec<ShapeRow> {
    extract_chirp_shape(
        analyzer,
        signal,
        onset,
        Some(metrics.start_signal_index),
        Some(metrics.end_signal_index),
        jump_factor,
        max_size,
    )
}
