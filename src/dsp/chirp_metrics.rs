use crate::dsp::fft::SpectrumAnalyzer;
use crate::types::ChirpMetrics;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Thresholds and limits for the frame walk around an onset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChirpSearchParams {
    /// Frame step is `sampling_freq / jump_factor` samples (4000 → 0.25 ms).
    pub jump_factor: u32,
    /// Calls whose peak is below this frequency are rejected.
    #[serde(alias = "high_pass_filter_freq_hz")]
    pub high_pass_freq_hz: f64,
    /// Absolute acceptance level for a frame.
    pub dbfs_threshold: f64,
    /// Frames must also be within this many dB of the running peak.
    pub dbfs_below_peak_threshold: f64,
    pub max_frames_to_check: usize,
    /// Consecutive rejected frames tolerated on one side before it stops.
    pub max_silent_slots: usize,
}

impl Default for ChirpSearchParams {
    fn default() -> Self {
        Self {
            jump_factor: 4000,
            high_pass_freq_hz: 15_000.0,
            dbfs_threshold: -50.0,
            dbfs_below_peak_threshold: 40.0,
            max_frames_to_check: 200,
            max_silent_slots: 8,
        }
    }
}

impl ChirpSearchParams {
    /// Frame step in samples for the given sampling frequency.
    pub fn jump(&self, sampling_freq: u32) -> usize {
        (sampling_freq / self.jump_factor.max(1)).max(1) as usize
    }
}

/// Why an onset did not yield a call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("no frame passed the acceptance thresholds")]
    NoCall,
    #[error("peak at {peak_freq_hz:.0} Hz is below the {high_pass_freq_hz:.0} Hz high-pass limit")]
    BelowHighPass {
        peak_freq_hz: f64,
        high_pass_freq_hz: f64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WalkState {
    Scanning,
    LeftExhausted,
    RightExhausted,
    Done,
}

impl WalkState {
    fn is_finished(self, side: Side) -> bool {
        match (self, side) {
            (WalkState::Done, _) => true,
            (WalkState::LeftExhausted, Side::Left) => true,
            (WalkState::RightExhausted, Side::Right) => true,
            _ => false,
        }
    }

    fn finish(self, side: Side) -> Self {
        match (self, side) {
            (WalkState::Scanning, Side::Left) => WalkState::LeftExhausted,
            (WalkState::Scanning, Side::Right) => WalkState::RightExhausted,
            (WalkState::LeftExhausted, Side::Right) => WalkState::Done,
            (WalkState::RightExhausted, Side::Left) => WalkState::Done,
            (state, _) => state,
        }
    }
}

/// One direction of the walk: the next relative frame index and its
/// consecutive-rejection count.
struct Cursor {
    next: i64,
    step: i64,
    silent: usize,
}

impl Cursor {
    fn advance(&mut self) -> i64 {
        let index = self.next;
        self.next += self.step;
        index
    }
}

#[derive(Clone, Copy)]
struct Peak {
    index: i64,
    freq: f64,
    dbfs: f64,
}

#[derive(Clone, Copy)]
struct Span {
    start_index: i64,
    start_freq: f64,
    end_index: i64,
    end_freq: f64,
    min_freq: f64,
    max_freq: f64,
}

#[derive(Default)]
struct Tracker {
    peak: Option<Peak>,
    span: Option<Span>,
}

impl Tracker {
    /// Record one frame, returning whether it was accepted.
    fn observe(&mut self, index: i64, freq: f64, dbfs: f64, params: &ChirpSearchParams) -> bool {
        let peak_dbfs = self.peak.map_or(f64::NEG_INFINITY, |p| p.dbfs);
        if dbfs > peak_dbfs {
            self.peak = Some(Peak { index, freq, dbfs });
        }
        let peak_dbfs = peak_dbfs.max(dbfs);

        let accepted = dbfs > peak_dbfs - params.dbfs_below_peak_threshold
            && dbfs > params.dbfs_threshold;
        if !accepted {
            return false;
        }

        match self.span.as_mut() {
            None => {
                self.span = Some(Span {
                    start_index: index,
                    start_freq: freq,
                    end_index: index,
                    end_freq: freq,
                    min_freq: freq,
                    max_freq: freq,
                })
            }
            Some(span) => {
                if index < span.start_index {
                    span.start_index = index;
                    span.start_freq = freq;
                }
                if index > span.end_index {
                    span.end_index = index;
                    span.end_freq = freq;
                }
                span.min_freq = span.min_freq.min(freq);
                span.max_freq = span.max_freq.max(freq);
            }
        }
        true
    }
}

/// Measure the call around `onset` by walking frames outward in both directions.
///
/// Frames are visited at relative indices 0, +1, -1, +2, -2, ... (each a
/// `jump`-sample step) for at most `max_frames_to_check` steps. A side stops
/// when its frames leave the signal or after more than `max_silent_slots`
/// consecutive rejected frames; the walk ends when both sides have stopped.
pub fn extract_chirp_metrics(
    analyzer: &SpectrumAnalyzer,
    signal: &[f32],
    onset: usize,
    params: &ChirpSearchParams,
) -> Result<ChirpMetrics, Rejection> {
    let sampling_freq = analyzer.sampling_freq();
    let jump = params.jump(sampling_freq) as i64;
    let window_size = analyzer.window_size() as i64;
    let signal_len = signal.len() as i64;
    let onset = onset as i64;

    let mut state = WalkState::Scanning;
    let mut right = Cursor { next: 0, step: 1, silent: 0 };
    let mut left = Cursor { next: -1, step: -1, silent: 0 };
    let mut tracker = Tracker::default();

    for step in 0..params.max_frames_to_check {
        let side = if step % 2 == 1 || step == 0 {
            Side::Right
        } else {
            Side::Left
        };
        let cursor = match side {
            Side::Right => &mut right,
            Side::Left => &mut left,
        };
        let index = cursor.advance();
        if state.is_finished(side) {
            continue;
        }

        let start = onset + jump * index;
        if start < 0 || start + window_size > signal_len {
            state = state.finish(side);
            if state == WalkState::Done {
                break;
            }
            continue;
        }
        let Some(spectrum) = analyzer.spectrum(&signal[start as usize..]) else {
            state = state.finish(side);
            continue;
        };
        let (freq, dbfs) = analyzer.peak_interpolation(&spectrum);

        if tracker.observe(index, freq, dbfs, params) {
            cursor.silent = 0;
        } else {
            cursor.silent += 1;
            if cursor.silent > params.max_silent_slots {
                state = state.finish(side);
            }
        }
        if state == WalkState::Done {
            break;
        }
    }

    let (Some(span), Some(peak)) = (tracker.span, tracker.peak) else {
        return Err(Rejection::NoCall);
    };
    if peak.freq < params.high_pass_freq_hz {
        return Err(Rejection::BelowHighPass {
            peak_freq_hz: peak.freq,
            high_pass_freq_hz: params.high_pass_freq_hz,
        });
    }

    let frames = (span.end_index - span.start_index + 1) as f64;
    let absolute = |index: i64| (onset + jump * index) as usize;
    Ok(ChirpMetrics {
        peak_freq_hz: peak.freq,
        peak_dbfs: peak.dbfs,
        start_freq_hz: span.start_freq,
        end_freq_hz: span.end_freq,
        max_freq_hz: span.max_freq,
        min_freq_hz: span.min_freq,
        duration_ms: frames * jump as f64 / sampling_freq as f64 * 1000.0,
        peak_signal_index: absolute(peak.index),
        start_signal_index: absolute(span.start_index),
        end_signal_index: absolute(span.end_index),
    })
}
