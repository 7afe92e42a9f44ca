use crate::error::{Error, Result};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_KAISER_BETA: f64 = 14.0;

/// Tapering window applied to each frame before the FFT.
///
/// All variants are the symmetric form (denominator `N - 1`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WindowFunction {
    Hann,
    Hamming,
    Blackman,
    BlackmanHarris,
    Kaiser { beta: f64 },
}

impl WindowFunction {
    /// Parse a window name, using `kaiser_beta` as the shape for `kaiser`.
    pub fn from_name(name: &str, kaiser_beta: f64) -> Result<Self> {
        match name.parse()? {
            WindowFunction::Kaiser { .. } => {
                if !kaiser_beta.is_finite() || kaiser_beta < 0.0 {
                    return Err(Error::InvalidParameter(format!(
                        "kaiser_beta must be a non-negative number, got {kaiser_beta}"
                    )));
                }
                Ok(WindowFunction::Kaiser { beta: kaiser_beta })
            }
            other => Ok(other),
        }
    }

    pub fn coefficients(&self, len: usize) -> Vec<f64> {
        match len {
            0 => return Vec::new(),
            1 => return vec![1.0],
            _ => {}
        }
        let span = (len - 1) as f64;
        match *self {
            WindowFunction::Hann => cosine_sum(len, &[0.5, 0.5]),
            WindowFunction::Hamming => cosine_sum(len, &[0.54, 0.46]),
            WindowFunction::Blackman => cosine_sum(len, &[0.42, 0.5, 0.08]),
            WindowFunction::BlackmanHarris => {
                cosine_sum(len, &[0.35875, 0.48829, 0.14128, 0.01168])
            }
            WindowFunction::Kaiser { beta } => {
                let denom = bessel_i0(beta);
                (0..len)
                    .map(|n| {
                        let ratio = 2.0 * n as f64 / span - 1.0;
                        let inside = (1.0 - ratio * ratio).max(0.0).sqrt();
                        bessel_i0(beta * inside) / denom
                    })
                    .collect()
            }
        }
    }
}

/// Generalized cosine window `sum_k (-1)^k a_k cos(2πkn/(N-1))`.
fn cosine_sum(len: usize, terms: &[f64]) -> Vec<f64> {
    let span = (len - 1) as f64;
    (0..len)
        .map(|n| {
            let phase = 2.0 * PI * n as f64 / span;
            terms
                .iter()
                .enumerate()
                .map(|(k, a)| {
                    let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                    sign * a * (k as f64 * phase).cos()
                })
                .sum()
        })
        .collect()
}

/// Zeroth-order modified Bessel function of the first kind, power series.
fn bessel_i0(x: f64) -> f64 {
    let half_sq = (x / 2.0) * (x / 2.0);
    let mut term = 1.0;
    let mut sum = 1.0;
    let mut k = 1.0;
    while term > sum * 1e-16 {
        term *= half_sq / (k * k);
        sum += term;
        k += 1.0;
    }
    sum
}

impl FromStr for WindowFunction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hann" | "hanning" => Ok(WindowFunction::Hann),
            "hamming" | "ham" => Ok(WindowFunction::Hamming),
            "blackman" | "black" => Ok(WindowFunction::Blackman),
            "blackman-harris" | "blackmanharris" => Ok(WindowFunction::BlackmanHarris),
            "kaiser" => Ok(WindowFunction::Kaiser { beta: DEFAULT_KAISER_BETA }),
            _ => Err(Error::UnknownWindow(s.to_string())),
        }
    }
}

impl fmt::Display for WindowFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowFunction::Hann => write!(f, "hann"),
            WindowFunction::Hamming => write!(f, "hamming"),
            WindowFunction::Blackman => write!(f, "blackman"),
            WindowFunction::BlackmanHarris => write!(f, "blackman-harris"),
            WindowFunction::Kaiser { beta } => write!(f, "kaiser(beta={beta})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("Hanning".parse::<WindowFunction>().unwrap(), WindowFunction::Hann);
        assert_eq!("ham".parse::<WindowFunction>().unwrap(), WindowFunction::Hamming);
        assert_eq!(
            "blackmanharris".parse::<WindowFunction>().unwrap(),
            WindowFunction::BlackmanHarris
        );
        assert_eq!(
            WindowFunction::from_name("kaiser", 8.6).unwrap(),
            WindowFunction::Kaiser { beta: 8.6 }
        );
    }

    #[test]
    fn test_unknown_name_is_config_error() {
        let err = "triangle".parse::<WindowFunction>().unwrap_err();
        assert!(matches!(err, Error::UnknownWindow(name) if name == "triangle"));
    }

    #[test]
    fn test_hann_endpoints_and_symmetry() {
        let w = WindowFunction::Hann.coefficients(9);
        assert!(w[0].abs() < 1e-12);
        assert!(w[8].abs() < 1e-12);
        assert!((w[4] - 1.0).abs() < 1e-12);
        for i in 0..9 {
            assert!((w[i] - w[8 - i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_blackman_harris_edges() {
        // a0 - a1 + a2 - a3
        let w = WindowFunction::BlackmanHarris.coefficients(16);
        assert!((w[0] - 6.0e-5).abs() < 1e-9, "edge = {}", w[0]);
    }

    #[test]
    fn test_kaiser_peak_is_one() {
        let w = WindowFunction::Kaiser { beta: 14.0 }.coefficients(129);
        assert!((w[64] - 1.0).abs() < 1e-12);
        // I0(0) / I0(14)
        assert!(w[0] < 1e-4 && w[0] > 0.0);
    }

    #[test]
    fn test_bessel_i0_known_values() {
        assert!((bessel_i0(0.0) - 1.0).abs() < 1e-15);
        assert!((bessel_i0(1.0) - 1.266_065_877_752_008_4).abs() < 1e-12);
        assert!((bessel_i0(5.0) - 27.239_871_823_604_45).abs() < 1e-9);
    }
}
