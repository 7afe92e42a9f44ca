use crate::error::Result;
use crate::types::{ChirpMetrics, ShapeRow};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Tab-separated table writer with a fixed header line.
pub struct TsvWriter<W: Write> {
    out: W,
    rows: usize,
}

impl TsvWriter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>, header: &[&str]) -> Result<Self> {
        Self::new(BufWriter::new(File::create(path)?), header)
    }
}

impl<W: Write> TsvWriter<W> {
    pub fn new(mut out: W, header: &[&str]) -> Result<Self> {
        writeln!(out, "{}", header.join("\t"))?;
        Ok(Self { out, rows: 0 })
    }

    /// Data rows written so far, header excluded.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn write_metrics(&mut self, m: &ChirpMetrics) -> Result<()> {
        writeln!(
            self.out,
            "{:.1}\t{:.2}\t{:.1}\t{:.1}\t{:.1}\t{:.1}\t{:.3}\t{}\t{}\t{}",
            m.peak_freq_hz,
            m.peak_dbfs,
            m.start_freq_hz,
            m.end_freq_hz,
            m.max_freq_hz,
            m.min_freq_hz,
            m.duration_ms,
            m.peak_signal_index,
            m.start_signal_index,
            m.end_signal_index,
        )?;
        self.rows += 1;
        Ok(())
    }

    pub fn write_shape(&mut self, rows: &[ShapeRow]) -> Result<()> {
        for r in rows {
            writeln!(
                self.out,
                "{:.6}\t{:.1}\t{:.2}\t{}",
                r.time_s, r.frequency_hz, r.amplitude_dbfs, r.signal_index
            )?;
        }
        self.rows += rows.len();
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// `<dir>/<stem><suffix>`, e.g. `out/rec01_Metrics.txt`.
pub fn table_path(dir: &Path, audio_path: &Path, suffix: &str) -> PathBuf {
    let stem = audio_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "recording".into());
    dir.join(format!("{stem}{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> ChirpMetrics {
        ChirpMetrics {
            peak_freq_hz: 52_341.27,
            peak_dbfs: -12.5,
            start_freq_hz: 80_000.0,
            end_freq_hz: 40_012.5,
            max_freq_hz: 80_400.0,
            min_freq_hz: 39_900.0,
            duration_ms: 5.0,
            peak_signal_index: 7_000,
            start_signal_index: 6_000,
            end_signal_index: 7_920,
        }
    }

    #[test]
    fn test_metrics_table_layout() {
        let mut writer = TsvWriter::new(Vec::new(), &ChirpMetrics::HEADER).unwrap();
        writer.write_metrics(&metrics()).unwrap();
        assert_eq!(writer.rows(), 1);

        let text = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("peak_freq_hz\tpeak_dbfs\t"));
        assert_eq!(
            lines[1],
            "52341.3\t-12.50\t80000.0\t40012.5\t80400.0\t39900.0\t5.000\t7000\t6000\t7920"
        );
    }

    #[test]
    fn test_shape_rows() {
        let mut writer = TsvWriter::new(Vec::new(), &ShapeRow::HEADER).unwrap();
        let rows = [
            ShapeRow { time_s: 0.0125, frequency_hz: 61_000.04, amplitude_dbfs: -20.0, signal_index: 4_800 },
            ShapeRow { time_s: 0.012625, frequency_hz: 60_500.0, amplitude_dbfs: -21.5, signal_index: 4_848 },
        ];
        writer.write_shape(&rows).unwrap();
        assert_eq!(writer.rows(), 2);

        let text = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "time_s\tfrequency_hz\tamplitude_dbfs\tsignal_index");
        assert_eq!(lines[1], "0.012500\t61000.0\t-20.00\t4800");
    }

    #[test]
    fn test_table_path_uses_stem() {
        let path = table_path(Path::new("/out"), Path::new("/data/rec01.wav"), "_Metrics.txt");
        assert_eq!(path, PathBuf::from("/out/rec01_Metrics.txt"));
    }
}
