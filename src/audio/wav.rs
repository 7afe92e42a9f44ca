use crate::error::{Error, Result};
use crate::types::AudioBlock;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// File rates below this are assumed to be time-expanded recordings.
pub const TIME_EXPANSION_RATE_LIMIT: u32 = 192_000;
pub const DEFAULT_TIME_EXPANSION: u32 = 10;

/// Time-expansion factor for a file stored at `file_rate`.
///
/// An explicit factor wins; otherwise rates below 192 kHz are taken as x10.
pub fn time_expansion_factor(file_rate: u32, explicit: Option<u32>) -> u32 {
    match explicit {
        Some(factor) => factor.max(1),
        None if file_rate < TIME_EXPANSION_RATE_LIMIT => DEFAULT_TIME_EXPANSION,
        None => 1,
    }
}

/// Reads a mono WAV file in blocks of one real-time second.
pub struct WavBlockReader {
    reader: WavReader<BufReader<File>>,
    spec: WavSpec,
    sampling_freq: u32,
    block_length: usize,
    block_number: usize,
}

impl WavBlockReader {
    pub fn open(path: impl AsRef<Path>, time_expansion: Option<u32>) -> Result<Self> {
        let reader = WavReader::open(path)?;
        let spec = reader.spec();
        if spec.channels != 1 {
            return Err(Error::NotMono(spec.channels));
        }
        match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Int, 8..=32) | (SampleFormat::Float, 32) => {}
            (format, bits) => {
                return Err(Error::UnsupportedFormat(format!("{bits}-bit {format:?} samples")))
            }
        }

        let sampling_freq = spec.sample_rate * time_expansion_factor(spec.sample_rate, time_expansion);
        log::debug!(
            "Opened WAV: {} Hz file rate, {} Hz sampling frequency, {}-bit {:?}",
            spec.sample_rate,
            sampling_freq,
            spec.bits_per_sample,
            spec.sample_format
        );

        Ok(Self {
            reader,
            spec,
            sampling_freq,
            block_length: sampling_freq as usize,
            block_number: 0,
        })
    }

    /// True sampling frequency after time-expansion correction.
    pub fn sampling_freq(&self) -> u32 {
        self.sampling_freq
    }

    pub fn file_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    pub fn block_length(&self) -> usize {
        self.block_length
    }

    /// Total number of samples in the file.
    pub fn len(&self) -> usize {
        self.reader.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Next block of samples scaled to [-1.0, 1.0], `None` at end of file.
    pub fn read_block(&mut self) -> Result<Option<AudioBlock>> {
        let n = self.block_length;
        let samples: Vec<f32> = match self.spec.sample_format {
            SampleFormat::Float => self
                .reader
                .samples::<f32>()
                .take(n)
                .collect::<std::result::Result<_, _>>()?,
            SampleFormat::Int => {
                let scale = 1.0 / (1u64 << (self.spec.bits_per_sample - 1)) as f32;
                self.reader
                    .samples::<i32>()
                    .take(n)
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<std::result::Result<_, _>>()?
            }
        };
        if samples.is_empty() {
            return Ok(None);
        }

        let block = AudioBlock {
            samples,
            sampling_freq: self.sampling_freq,
            block_number: self.block_number,
            offset: self.block_number * self.block_length,
        };
        self.block_number += 1;
        Ok(Some(block))
    }
}

/// Write mono 16-bit PCM. With `time_expansion > 1` the header rate is
/// `sampling_freq / time_expansion`, as time-expansion detectors store it.
pub fn write_wav(
    path: impl AsRef<Path>,
    samples: &[f32],
    sampling_freq: u32,
    time_expansion: u32,
) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: sampling_freq / time_expansion.max(1),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &s in samples {
        writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}
