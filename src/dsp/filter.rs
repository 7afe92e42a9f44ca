use std::f64::consts::PI;

/// RMS level of a block, used as its noise estimate.
pub fn noise_level(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = signal.iter().map(|&s| s as f64 * s as f64).sum();
    (sum_sq / signal.len() as f64).sqrt() as f32
}

/// Noise level in dB relative to full scale (1.0).
pub fn noise_level_db(signal: &[f32]) -> f32 {
    20.0 * noise_level(signal).log10()
}

/// Second-order sections in the high-pass cascade (8th-order Butterworth).
pub const BUTTERWORTH_SECTIONS: usize = 4;

/// Odd-extension length at each end before zero-phase filtering.
const PAD_LEN: usize = 3 * (2 * BUTTERWORTH_SECTIONS + 1);

/// Biquad coefficients, normalised by a0.
#[derive(Clone, Copy, Debug)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Biquad {
    fn highpass(cutoff_hz: f64, sample_rate: f64, q: f64) -> Self {
        let omega = 2.0 * PI * cutoff_hz / sample_rate;
        let cos_w = omega.cos();
        let alpha = omega.sin() / (2.0 * q);
        let a0 = 1.0 + alpha;
        Self {
            b0: ((1.0 + cos_w) / 2.0) / a0,
            b1: (-(1.0 + cos_w)) / a0,
            b2: ((1.0 + cos_w) / 2.0) / a0,
            a1: (-2.0 * cos_w) / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    /// Filter in place. The state starts settled on the first sample, which for
    /// a high-pass section means zero output for a constant input.
    fn run(&self, x: &mut [f64]) {
        let Some(&first) = x.first() else {
            return;
        };
        let (mut x1, mut x2) = (first, first);
        let (mut y1, mut y2) = (0.0, 0.0);
        for s in x.iter_mut() {
            let y = self.b0 * *s + self.b1 * x1 + self.b2 * x2 - self.a1 * y1 - self.a2 * y2;
            x2 = x1;
            x1 = *s;
            y2 = y1;
            y1 = y;
            *s = y;
        }
    }
}

/// Butterworth sections for an order `2 * sections` high-pass.
fn butterworth_highpass(cutoff_hz: f64, sample_rate: f64, sections: usize) -> Vec<Biquad> {
    let order = 2 * sections;
    (1..=sections)
        .map(|k| {
            let theta = (2 * k - 1) as f64 * PI / (2 * order) as f64;
            Biquad::highpass(cutoff_hz, sample_rate, 1.0 / (2.0 * theta.cos()))
        })
        .collect()
}

/// `x` with `pad` samples of odd (point-symmetric) extension at each end.
fn odd_extend(x: &[f64], pad: usize) -> Vec<f64> {
    let n = x.len();
    let (first, last) = (x[0], x[n - 1]);
    let mut out = Vec::with_capacity(n + 2 * pad);
    out.extend((1..=pad).rev().map(|i| 2.0 * first - x[i]));
    out.extend_from_slice(x);
    out.extend((1..=pad).map(|i| 2.0 * last - x[n - 1 - i]));
    out
}

/// Zero-phase 8th-order Butterworth high-pass at `cutoff_hz`.
///
/// The cascade runs forward then backward over an odd-extended copy of the
/// block, so the magnitude response is squared and there is no phase shift.
/// Cutoffs at or above Nyquist, or not positive, return the input unchanged.
pub fn highpass(samples: &[f32], cutoff_hz: f64, sample_rate: u32) -> Vec<f32> {
    let nyquist = sample_rate as f64 / 2.0;
    if samples.is_empty() || cutoff_hz <= 0.0 || cutoff_hz >= nyquist {
        return samples.to_vec();
    }
    let sections = butterworth_highpass(cutoff_hz, sample_rate as f64, BUTTERWORTH_SECTIONS);

    let x: Vec<f64> = samples.iter().map(|&s| s as f64).collect();
    let pad = PAD_LEN.min(x.len() - 1);
    let mut y = odd_extend(&x, pad);
    for section in &sections {
        section.run(&mut y);
    }
    y.reverse();
    for section in &sections {
        section.run(&mut y);
    }
    y.reverse();

    y[pad..pad + samples.len()].iter().map(|&v| v as f32).collect()
}
