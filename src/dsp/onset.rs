/// Find candidate call onsets in one block of audio.
///
/// Samples quieter than `noise_threshold` are zeroed (skipped when the
/// threshold is not positive), a centred short-time RMS envelope is computed
/// with `frame_length`-sample frames every `jump` samples, and every local
/// maximum of that envelope is reported as a sample index.
///
/// This finds loud regions, not verified calls. The returned indices are
/// ascending.
pub fn find_onsets(
    signal: &[f32],
    noise_threshold: f32,
    jump: usize,
    frame_length: usize,
) -> Vec<usize> {
    if signal.is_empty() || jump == 0 || frame_length == 0 {
        return Vec::new();
    }

    let gated: Vec<f32> = if noise_threshold > 0.0 {
        signal
            .iter()
            .map(|&s| if s.abs() < noise_threshold { 0.0 } else { s })
            .collect()
    } else {
        signal.to_vec()
    };

    let envelope = rms_envelope(&gated, frame_length, jump);
    local_maxima(&envelope)
        .into_iter()
        .map(|frame| frame * jump)
        .collect()
}

/// Centred short-time RMS energy.
///
/// The signal is padded by `frame_length / 2` on both sides by mirroring
/// around the edge samples, so frame `t` is centred on sample `t * hop`.
pub fn rms_envelope(signal: &[f32], frame_length: usize, hop: usize) -> Vec<f64> {
    let n = signal.len();
    if n == 0 || frame_length == 0 || hop == 0 {
        return Vec::new();
    }
    let pad = frame_length / 2;
    // Frame centres stay inside the signal.
    let frame_count = n.div_ceil(hop);

    (0..frame_count)
        .map(|t| {
            let first = (t * hop) as isize - pad as isize;
            let sum_sq: f64 = (0..frame_length as isize)
                .map(|j| {
                    let s = signal[reflect_index(first + j, n)] as f64;
                    s * s
                })
                .sum();
            (sum_sq / frame_length as f64).sqrt()
        })
        .collect()
}

/// Mirror an out-of-range index back into `0..n` without repeating the edge sample.
fn reflect_index(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n as isize - 1);
    let m = i.rem_euclid(period);
    if m < n as isize {
        m as usize
    } else {
        (period - m) as usize
    }
}

/// Indices where `x[i] > x[i-1]` and `x[i] >= x[i+1]`.
///
/// Missing neighbours are replaced by the edge value itself, so the first
/// element never qualifies and the last one only needs to rise above its left.
pub fn local_maxima(values: &[f64]) -> Vec<usize> {
    let len = values.len();
    (0..len)
        .filter(|&i| {
            let left = if i == 0 { values[0] } else { values[i - 1] };
            let right = if i + 1 == len { values[i] } else { values[i + 1] };
            values[i] > left && values[i] >= right
        })
        .collect()
}
