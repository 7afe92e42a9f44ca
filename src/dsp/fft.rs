use crate::dsp::window::WindowFunction;
use crate::error::{Error, Result};
use realfft::{RealFftPlanner, RealToComplex};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Floor for dBFS values. Also the fill value for empty matrix rows.
pub const DBFS_FLOOR: f64 = -120.0;

/// Fixed-size windowed FFT producing dBFS magnitude spectra.
///
/// Everything held here is read-only after construction, so one analyzer can
/// be shared between threads. Scratch buffers are allocated per call.
pub struct SpectrumAnalyzer {
    window_size: usize,
    sampling_freq: u32,
    window_function: WindowFunction,
    window: Vec<f64>,
    /// Full-scale reference: half the window coefficient sum.
    dbfs_max: f64,
    fft: Arc<dyn RealToComplex<f64>>,
    bin_frequencies: OnceLock<Vec<f64>>,
}

impl fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("window_size", &self.window_size)
            .field("sampling_freq", &self.sampling_freq)
            .field("window_function", &self.window_function)
            .field("dbfs_max", &self.dbfs_max)
            .finish()
    }
}

impl SpectrumAnalyzer {
    pub fn new(
        window_size: usize,
        window_function: WindowFunction,
        sampling_freq: u32,
    ) -> Result<Self> {
        if window_size < 4 || window_size % 2 != 0 {
            return Err(Error::InvalidParameter(format!(
                "window_size must be an even number >= 4, got {window_size}"
            )));
        }
        if sampling_freq == 0 {
            return Err(Error::InvalidParameter("sampling_freq must be positive".into()));
        }

        let window = window_function.coefficients(window_size);
        let dbfs_max = window.iter().sum::<f64>() / 2.0;
        let fft = RealFftPlanner::<f64>::new().plan_fft_forward(window_size);

        Ok(Self {
            window_size,
            sampling_freq,
            window_function,
            window,
            dbfs_max,
            fft,
            bin_frequencies: OnceLock::new(),
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn sampling_freq(&self) -> u32 {
        self.sampling_freq
    }

    pub fn window_function(&self) -> WindowFunction {
        self.window_function
    }

    pub fn dbfs_max(&self) -> f64 {
        self.dbfs_max
    }

    /// Number of bins in a spectrum (Nyquist bin excluded).
    pub fn bin_count(&self) -> usize {
        self.window_size / 2
    }

    pub fn bin_width_hz(&self) -> f64 {
        self.sampling_freq as f64 / self.window_size as f64
    }

    /// Centre frequency of every spectrum bin, from 0 up to (not including) Nyquist.
    pub fn bin_frequencies(&self) -> &[f64] {
        self.bin_frequencies.get_or_init(|| {
            let width = self.bin_width_hz();
            (0..self.bin_count()).map(|k| k as f64 * width).collect()
        })
    }

    /// dBFS spectrum of the first `window_size` samples of `frame`.
    ///
    /// Returns `None` when the frame is shorter than the window, which happens
    /// routinely at buffer edges.
    pub fn spectrum(&self, frame: &[f32]) -> Option<Vec<f64>> {
        if frame.len() < self.window_size {
            return None;
        }

        let mut input = self.fft.make_input_vec();
        let mut output = self.fft.make_output_vec();
        for (inp, (&s, &w)) in input
            .iter_mut()
            .zip(frame[..self.window_size].iter().zip(self.window.iter()))
        {
            *inp = s as f64 * w;
        }
        // Only fails on buffer length mismatch, which make_*_vec rules out.
        self.fft.process(&mut input, &mut output).ok()?;

        let bins = self.bin_count();
        Some(
            output[..bins]
                .iter()
                .map(|c| (20.0 * (c.norm() / self.dbfs_max).log10()).max(DBFS_FLOOR))
                .collect(),
        )
    }

    /// Quadratic interpolation of the spectral peak.
    ///
    /// Returns `(frequency_hz, dbfs)`. A peak in the first or last bin has no
    /// neighbour on one side and is returned without sub-bin correction.
    pub fn peak_interpolation(&self, spectrum: &[f64]) -> (f64, f64) {
        let Some(peak_bin) = argmax(spectrum) else {
            return (0.0, DBFS_FLOOR);
        };
        let y0 = spectrum[peak_bin];
        if peak_bin == 0 || peak_bin + 1 >= spectrum.len() {
            return (peak_bin as f64 * self.bin_width_hz(), y0);
        }

        let ym1 = spectrum[peak_bin - 1];
        let yp1 = spectrum[peak_bin + 1];
        let denom = ym1 - 2.0 * y0 + yp1;
        let offset = if denom != 0.0 {
            (ym1 - yp1) / (2.0 * denom)
        } else {
            0.0
        };

        let frequency = (peak_bin as f64 + offset) * self.bin_width_hz();
        let amplitude = y0 - (ym1 - yp1) * offset / 4.0;
        (frequency, amplitude)
    }

    /// Build a time x frequency dBFS matrix of `matrix_size` rows.
    ///
    /// Row `r` holds the spectrum of the window starting at
    /// `anchor_offset + r * jump`. Rows with no full window left in `signal`
    /// keep [`DBFS_FLOOR`].
    pub fn build_matrix(
        &self,
        signal: &[f32],
        anchor_offset: usize,
        matrix_size: usize,
        jump: usize,
    ) -> SpectralMatrix {
        let mut matrix = SpectralMatrix::new(matrix_size, self.bin_count(), jump, anchor_offset);
        let jump = jump.max(1);

        let mut cursor = anchor_offset;
        for row in 0..matrix_size {
            if cursor + self.window_size > signal.len() {
                break;
            }
            if let Some(spectrum) = self.spectrum(&signal[cursor..]) {
                matrix.row_mut(row).copy_from_slice(&spectrum);
            }
            cursor += jump;
        }
        matrix
    }
}

fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Row-major dBFS matrix, one row per analysis frame.
#[derive(Clone, Debug)]
pub struct SpectralMatrix {
    data: Vec<f64>,
    rows: usize,
    bins: usize,
    /// Samples between consecutive rows.
    pub jump: usize,
    /// Signal index of the first row's window start.
    pub anchor_offset: usize,
}

impl SpectralMatrix {
    fn new(rows: usize, bins: usize, jump: usize, anchor_offset: usize) -> Self {
        Self {
            data: vec![DBFS_FLOOR; rows * bins],
            rows,
            bins,
            jump,
            anchor_offset,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.bins..(row + 1) * self.bins]
    }

    fn row_mut(&mut self, row: usize) -> &mut [f64] {
        &mut self.data[row * self.bins..(row + 1) * self.bins]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.bins.max(1)).take(self.rows)
    }

    /// Signal index of the window start for `row`.
    pub fn row_signal_index(&self, row: usize) -> usize {
        self.anchor_offset + row * self.jump
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, sample_rate: u32, len: usize, amplitude: f64) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                (amplitude * (2.0 * PI * freq * t).sin()) as f32
            })
            .collect()
    }

    fn kaiser_analyzer(window_size: usize, sample_rate: u32) -> SpectrumAnalyzer {
        SpectrumAnalyzer::new(window_size, WindowFunction::Kaiser { beta: 14.0 }, sample_rate)
            .unwrap()
    }

    #[test]
    fn test_spectrum_length_excludes_nyquist() {
        let analyzer = kaiser_analyzer(128, 384_000);
        let spectrum = analyzer.spectrum(&vec![0.1f32; 200]).unwrap();
        assert_eq!(spectrum.len(), 64);
        assert_eq!(analyzer.bin_frequencies().len(), 64);
        assert_eq!(analyzer.bin_frequencies()[1], 3000.0);
    }

    #[test]
    fn test_short_frame_has_no_spectrum() {
        let analyzer = kaiser_analyzer(128, 384_000);
        assert!(analyzer.spectrum(&vec![0.5f32; 127]).is_none());
        assert!(analyzer.spectrum(&[]).is_none());
    }

    #[test]
    fn test_silence_is_floored_not_nan() {
        let analyzer = kaiser_analyzer(256, 384_000);
        let spectrum = analyzer.spectrum(&vec![0.0f32; 256]).unwrap();
        assert!(spectrum.iter().all(|&v| v == DBFS_FLOOR));
        let (freq, dbfs) = analyzer.peak_interpolation(&spectrum);
        assert!(freq.is_finite() && dbfs.is_finite());
        assert_eq!(dbfs, DBFS_FLOOR);
    }

    #[test]
    fn test_full_scale_sine_is_near_zero_dbfs() {
        let sample_rate = 384_000;
        let analyzer =
            SpectrumAnalyzer::new(512, WindowFunction::Hann, sample_rate).unwrap();
        // Exactly on a bin centre.
        let freq = 60.0 * analyzer.bin_width_hz();
        let signal = sine(freq, sample_rate, 512, 1.0);
        let spectrum = analyzer.spectrum(&signal).unwrap();
        let (_, dbfs) = analyzer.peak_interpolation(&spectrum);
        assert!(dbfs.abs() < 0.5, "full-scale sine at {dbfs} dBFS");
    }

    #[test]
    fn test_peak_interpolation_recovers_sine_frequency() {
        let sample_rate = 384_000;
        for window in [
            WindowFunction::Hann,
            WindowFunction::BlackmanHarris,
            WindowFunction::Kaiser { beta: 14.0 },
        ] {
            let analyzer = SpectrumAnalyzer::new(1024, window, sample_rate).unwrap();
            let bin_width = analyzer.bin_width_hz();
            for freq in [25_123.0, 47_700.0, 81_450.0] {
                let signal = sine(freq, sample_rate, 1024, 0.5);
                let spectrum = analyzer.spectrum(&signal).unwrap();
                let (estimate, _) = analyzer.peak_interpolation(&spectrum);
                assert!(
                    (estimate - freq).abs() < bin_width / 10.0,
                    "{window}: estimated {estimate} Hz for {freq} Hz"
                );
            }
        }
    }

    #[test]
    fn test_peak_at_edge_bin_has_no_offset() {
        let analyzer = kaiser_analyzer(16, 16_000);
        let spectrum = [40.0, 30.0, 11.0, 0.0, -10.0, -10.0, 5.0, 1.0];
        assert_eq!(analyzer.peak_interpolation(&spectrum), (0.0, 40.0));

        let spectrum = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        assert_eq!(analyzer.peak_interpolation(&spectrum), (7000.0, 7.0));
    }

    #[test]
    fn test_peak_interpolation_parabola() {
        let analyzer = kaiser_analyzer(16, 16_000);
        // Samples of y = 10 - (x - 3.25)^2 around bin 3.
        let f = |x: f64| 10.0 - (x - 3.25) * (x - 3.25);
        let spectrum: Vec<f64> = (0..8).map(|x| f(x as f64)).collect();
        let (freq, amp) = analyzer.peak_interpolation(&spectrum);
        assert!((freq - 3250.0).abs() < 1e-9, "freq = {freq}");
        assert!((amp - 10.0).abs() < 1e-9, "amp = {amp}");
    }

    #[test]
    fn test_matrix_rows_past_signal_keep_floor() {
        let sample_rate = 384_000;
        let analyzer = kaiser_analyzer(128, sample_rate);
        let signal = sine(50_000.0, sample_rate, 1000, 0.5);
        let matrix = analyzer.build_matrix(&signal, 100, 20, 96);

        assert_eq!(matrix.rows(), 20);
        // Windows start at 100, 196, ..., 100 + 8*96 = 868 (868 + 128 > 1000).
        for row in 0..8 {
            assert!(matrix.row(row).iter().any(|&v| v > -30.0), "row {row} empty");
        }
        for row in 8..20 {
            assert!(
                matrix.row(row).iter().all(|&v| v == DBFS_FLOOR),
                "row {row} should keep the floor"
            );
        }
        assert_eq!(matrix.row_signal_index(3), 100 + 3 * 96);
        assert_eq!(matrix.iter_rows().count(), 20);
    }

    #[test]
    fn test_matrix_anchor_past_end_is_all_floor() {
        let analyzer = kaiser_analyzer(128, 384_000);
        let matrix = analyzer.build_matrix(&vec![0.3f32; 100], 500, 4, 10);
        assert!(matrix.iter_rows().all(|row| row.iter().all(|&v| v == DBFS_FLOOR)));
    }

    #[test]
    fn test_invalid_window_size() {
        assert!(SpectrumAnalyzer::new(127, WindowFunction::Hann, 384_000).is_err());
        assert!(SpectrumAnalyzer::new(0, WindowFunction::Hann, 384_000).is_err());
        assert!(SpectrumAnalyzer::new(128, WindowFunction::Hann, 0).is_err());
    }

    #[test]
    fn test_analyzer_reports_its_setup() {
        let analyzer = SpectrumAnalyzer::new(256, WindowFunction::BlackmanHarris, 250_000).unwrap();
        assert_eq!(analyzer.window_function(), WindowFunction::BlackmanHarris);
        assert_eq!(analyzer.window_size(), 256);
        assert_eq!(analyzer.bin_count(), 128);
        assert_eq!(analyzer.bin_frequencies()[2], 2.0 * 250_000.0 / 256.0);
    }
}
