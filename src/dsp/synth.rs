//! Synthetic bat-call generator for tests and demo recordings.

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sweep {
    /// Constant sweep rate (FM call).
    Linear,
    /// Fast start, flattening towards the end frequency, between FM and QCF.
    Quadratic,
}

/// A train of identical calls separated by silence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChirpTrain {
    pub start_freq_hz: f64,
    pub end_freq_hz: f64,
    pub duration_s: f64,
    pub interval_s: f64,
    pub amplitude: f64,
    /// RMS of the white noise added to the whole train.
    pub noise_level: f64,
    pub count: usize,
    pub sweep: Sweep,
    /// Taper each call with a Hann envelope.
    pub hann_envelope: bool,
}

impl Default for ChirpTrain {
    fn default() -> Self {
        Self {
            start_freq_hz: 100_000.0,
            end_freq_hz: 20_000.0,
            duration_s: 0.008,
            interval_s: 0.1,
            amplitude: 0.3,
            noise_level: 0.002,
            count: 10,
            sweep: Sweep::Quadratic,
            hann_envelope: true,
        }
    }
}

/// Unit-amplitude frequency sweep from `start_hz` to `end_hz` over `duration_s`.
pub fn chirp(
    sampling_freq: u32,
    start_hz: f64,
    end_hz: f64,
    duration_s: f64,
    sweep: Sweep,
) -> Vec<f32> {
    let fs = sampling_freq as f64;
    let len = (fs * duration_s) as usize;
    let t1 = duration_s;
    (0..len)
        .map(|i| {
            let t = i as f64 / fs;
            let phase = match sweep {
                Sweep::Linear => start_hz * t + (end_hz - start_hz) * t * t / (2.0 * t1),
                // f(t) = f1 - (f1 - f0) (t1 - t)^2 / t1^2
                Sweep::Quadratic => {
                    let k = (end_hz - start_hz) / (t1 * t1);
                    end_hz * t + k * ((t1 - t).powi(3) - t1.powi(3)) / 3.0
                }
            };
            (2.0 * PI * phase).cos() as f32
        })
        .collect()
}

/// Add Gaussian white noise with standard deviation `rms`.
pub fn add_noise<R: Rng>(signal: &mut [f32], rms: f64, rng: &mut R) {
    if rms <= 0.0 {
        return;
    }
    for s in signal.iter_mut() {
        let n: f64 = rng.sample(StandardNormal);
        *s += (n * rms) as f32;
    }
}

impl ChirpTrain {
    /// Render the train. Each call sits in the middle of its own interval.
    pub fn render<R: Rng>(&self, sampling_freq: u32, rng: &mut R) -> Vec<f32> {
        let fs = sampling_freq as f64;
        let mut call = chirp(
            sampling_freq,
            self.start_freq_hz,
            self.end_freq_hz,
            self.duration_s,
            self.sweep,
        );
        let len = call.len();
        for (i, s) in call.iter_mut().enumerate() {
            let envelope = if self.hann_envelope && len > 1 {
                0.5 * (1.0 - (2.0 * PI * i as f64 / (len - 1) as f64).cos())
            } else {
                1.0
            };
            *s = (*s as f64 * envelope * self.amplitude) as f32;
        }

        let silent_half = ((fs * (self.interval_s - self.duration_s).max(0.0)) / 2.0) as usize;
        let mut signal = Vec::with_capacity(self.count * (len + 2 * silent_half));
        for _ in 0..self.count {
            signal.extend(std::iter::repeat(0.0f32).take(silent_half));
            signal.extend_from_slice(&call);
            signal.extend(std::iter::repeat(0.0f32).take(silent_half));
        }
        add_noise(&mut signal, self.noise_level, rng);
        signal
    }

    /// Index of the first sample of call `n` in the rendered train.
    pub fn call_start(&self, sampling_freq: u32, n: usize) -> usize {
        let fs = sampling_freq as f64;
        let len = (fs * self.duration_s) as usize;
        let silent_half = ((fs * (self.interval_s - self.duration_s).max(0.0)) / 2.0) as usize;
        n * (len + 2 * silent_half) + silent_half
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::filter::noise_level;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Instantaneous frequency from the zero-crossing spacing around sample `i`.
    fn crossing_freq(signal: &[f32], i: usize, sampling_freq: u32) -> f64 {
        let window = &signal[i.saturating_sub(40)..(i + 40).min(signal.len())];
        let crossings = window
            .windows(2)
            .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
            .count();
        crossings as f64 / 2.0 / (window.len() as f64 / sampling_freq as f64)
    }

    #[test]
    fn test_linear_chirp_sweeps_between_endpoints() {
        let fs = 384_000;
        let c = chirp(fs, 80_000.0, 40_000.0, 0.005, Sweep::Linear);
        assert_eq!(c.len(), 1920);
        let early = crossing_freq(&c, 40, fs);
        let late = crossing_freq(&c, 1880, fs);
        assert!((early - 80_000.0).abs() < 10_000.0, "early {early}");
        assert!((late - 40_000.0).abs() < 10_000.0, "late {late}");
    }

    #[test]
    fn test_quadratic_chirp_flattens_at_end() {
        let fs = 384_000;
        let c = chirp(fs, 100_000.0, 20_000.0, 0.008, Sweep::Quadratic);
        let mid = crossing_freq(&c, c.len() / 2, fs);
        // f(t1/2) = f1 + (f0 - f1) / 4
        assert!((mid - 40_000.0).abs() < 10_000.0, "mid {mid}");
    }

    #[test]
    fn test_train_layout_and_noise() {
        let fs = 384_000;
        let train = ChirpTrain {
            count: 3,
            noise_level: 0.0,
            ..ChirpTrain::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        let signal = train.render(fs, &mut rng);
        let period = train.call_start(fs, 1) - train.call_start(fs, 0);
        assert_eq!(signal.len(), 3 * period);
        assert!(signal[period..train.call_start(fs, 1)].iter().all(|&s| s == 0.0));
        assert!(signal.iter().all(|s| s.abs() <= 0.3 + 1e-6));

        let mut quiet = vec![0.0f32; 100_000];
        add_noise(&mut quiet, 0.01, &mut rng);
        let level = noise_level(&quiet);
        assert!((level - 0.01).abs() < 0.0005, "noise rms {level}");
        // Gaussian tails: about 4.6% of samples lie beyond two standard deviations.
        let tails = quiet.iter().filter(|s| s.abs() > 0.02).count();
        assert!(tails > 3_000 && tails < 6_500, "{tails} samples beyond 2 sigma");
    }
}
