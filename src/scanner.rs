//! Batch scanning of WAV recordings.
//!
//! Each file is read in one-second blocks. Every block is high-pass filtered,
//! its noise level sets the onset gate, and every onset is measured with
//! [`extract_chirp_metrics`]. Accepted calls go to `<stem>_Metrics.txt` in
//! the output directory, created when the first call is found.

use crate::audio::wav::WavBlockReader;
use crate::config::ScanConfig;
use crate::dsp::chirp_metrics::extract_chirp_metrics;
use crate::dsp::chirp_shape::shape_for_metrics;
use crate::dsp::fft::SpectrumAnalyzer;
use crate::dsp::filter::{highpass, noise_level, noise_level_db};
use crate::dsp::onset::find_onsets;
use crate::error::Result;
use crate::output::{table_path, TsvWriter};
use crate::types::{AudioBlock, ChirpMetrics, ScanSummary, ShapeRow};
use rayon::prelude::*;
use std::borrow::Cow;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const METRICS_SUFFIX: &str = "_Metrics.txt";
pub const SHAPE_SUFFIX: &str = "_Shape.txt";

/// Calls found in one block, indices already relative to the file.
#[derive(Clone, Debug, Default)]
pub struct BlockScan {
    pub checked_onsets: usize,
    pub calls: Vec<ChirpMetrics>,
    /// Shape rows of all calls in this block, empty unless shapes are enabled.
    pub shapes: Vec<ShapeRow>,
}

pub struct Scanner {
    config: ScanConfig,
    output_dir: PathBuf,
    cancel: Arc<AtomicBool>,
}

impl Scanner {
    pub fn new(config: ScanConfig, output_dir: impl Into<PathBuf>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            output_dir: output_dir.into(),
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Setting the returned flag stops a batch after the files in progress.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn analyzer(&self, sampling_freq: u32) -> Result<SpectrumAnalyzer> {
        SpectrumAnalyzer::new(self.config.freq.window_size, self.config.freq.window()?, sampling_freq)
    }

    /// Detect and measure all calls in one block.
    pub fn scan_block(&self, analyzer: &SpectrumAnalyzer, block: &AudioBlock) -> BlockScan {
        let fs = block.sampling_freq;
        let time = &self.config.time;

        let signal: Cow<[f32]> = match time.filter_low_hz {
            Some(low) => Cow::Owned(highpass(&block.samples, low, fs)),
            None => Cow::Borrowed(block.samples.as_slice()),
        };
        let noise = noise_level(&signal);
        log::debug!(
            "Block {} ({:.3}s): noise level {:.5} ({:.2} dB), unfiltered {:.5}",
            block.block_number,
            block.duration_secs(),
            noise,
            noise_level_db(&signal),
            noise_level(&block.samples)
        );

        let onsets = find_onsets(
            &signal,
            noise * time.noise_threshold_factor,
            time.onset_jump(fs),
            time.effective_frame_length(fs),
        );

        let mut scan = BlockScan {
            checked_onsets: onsets.len(),
            ..Default::default()
        };
        for onset in onsets {
            let mut metrics = match extract_chirp_metrics(analyzer, &signal, onset, &self.config.freq.search) {
                Ok(m) => m,
                Err(rejection) => {
                    log::debug!("Onset at {}: {}", block.offset + onset, rejection);
                    continue;
                }
            };

            if self.config.shape.enabled {
                let rows = shape_for_metrics(
                    analyzer,
                    &signal,
                    onset,
                    &metrics,
                    self.config.shape.jump_factor,
                    self.config.shape.max_size,
                );
                scan.shapes.extend(rows.into_iter().map(|mut row| {
                    row.signal_index += block.offset;
                    row.time_s = row.signal_index as f64 / fs as f64;
                    row
                }));
            }

            metrics.offset_indices(block.offset);
            log::debug!(
                "Call at {}: peak {:.0} Hz, {:.0} Hz bandwidth, {:.2} ms",
                metrics.start_signal_index,
                metrics.peak_freq_hz,
                metrics.bandwidth_hz(),
                metrics.duration_ms
            );
            scan.calls.push(metrics);
        }

        log::debug!(
            "Block {}: {} calls of {} checked onsets",
            block.block_number,
            scan.calls.len(),
            scan.checked_onsets
        );
        scan
    }

    /// Scan one recording and write its tables.
    pub fn scan_file(&self, path: &Path) -> Result<ScanSummary> {
        let mut reader = WavBlockReader::open(path, self.config.time_expansion)?;
        let sampling_freq = reader.sampling_freq();
        let mut summary = ScanSummary {
            file: path.display().to_string(),
            sampling_freq,
            ..Default::default()
        };

        if let Some(expected) = self.config.expected_sampling_freq {
            if expected != sampling_freq {
                log::warn!(
                    "Skipping {}: sampling frequency {} Hz, expected {} Hz",
                    path.display(),
                    sampling_freq,
                    expected
                );
                summary.skipped = true;
                return Ok(summary);
            }
        }

        let analyzer = self.analyzer(sampling_freq)?;
        log::debug!(
            "{}: {} Hz, {}-point {} window",
            path.display(),
            sampling_freq,
            analyzer.window_size(),
            analyzer.window_function()
        );
        let metrics_path = table_path(&self.output_dir, path, METRICS_SUFFIX);
        let shape_path = table_path(&self.output_dir, path, SHAPE_SUFFIX);
        let mut metrics_out: Option<TsvWriter<BufWriter<File>>> = None;
        let mut shape_out: Option<TsvWriter<BufWriter<File>>> = None;

        while let Some(block) = reader.read_block()? {
            let scan = self.scan_block(&analyzer, &block);
            summary.blocks += 1;
            summary.checked_onsets += scan.checked_onsets;
            summary.accepted_calls += scan.calls.len();

            if !scan.calls.is_empty() && metrics_out.is_none() {
                metrics_out = Some(TsvWriter::create(&metrics_path, &ChirpMetrics::HEADER)?);
            }
            if let Some(out) = metrics_out.as_mut() {
                for m in &scan.calls {
                    out.write_metrics(m)?;
                }
            }

            if !scan.shapes.is_empty() && shape_out.is_none() {
                shape_out = Some(TsvWriter::create(&shape_path, &ShapeRow::HEADER)?);
            }
            if let Some(out) = shape_out.as_mut() {
                out.write_shape(&scan.shapes)?;
            }
        }

        if let Some(mut out) = shape_out {
            out.flush()?;
        }
        match metrics_out {
            Some(mut out) => {
                out.flush()?;
                summary.metrics_path = Some(metrics_path.display().to_string());
                log::info!(
                    "{}: {} calls of {} checked onsets in {} blocks",
                    path.display(),
                    summary.accepted_calls,
                    summary.checked_onsets,
                    summary.blocks
                );
            }
            None => log::warn!("{}: no calls detected, no metrics written", path.display()),
        }
        Ok(summary)
    }

    /// Scan several files in parallel. `jobs == 0` uses rayon's global pool.
    ///
    /// Results keep the order of `paths`. Files not started before
    /// cancellation are left out.
    pub fn scan_files(&self, paths: &[PathBuf], jobs: usize) -> Vec<(PathBuf, Result<ScanSummary>)> {
        let run = || -> Vec<(PathBuf, Result<ScanSummary>)> {
            paths
                .par_iter()
                .filter_map(|path| {
                    if self.cancel.load(Ordering::Relaxed) {
                        return None;
                    }
                    Some((path.clone(), self.scan_file(path)))
                })
                .collect()
        };

        if jobs == 0 {
            return run();
        }
        match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => pool.install(run),
            Err(err) => {
                log::warn!("Failed to build thread pool ({err}), scanning sequentially");
                paths
                    .iter()
                    .take_while(|_| !self.cancel.load(Ordering::Relaxed))
                    .map(|path| (path.clone(), self.scan_file(path)))
                    .collect()
            }
        }
    }
}

/// `.wav` files directly inside `dir`, sorted by name.
pub fn find_wav_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_wav = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("wav"))
            .unwrap_or(false);
        if is_wav && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
