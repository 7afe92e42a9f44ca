use anyhow::{bail, Context, Result};
use chirpscan::audio::wav::write_wav;
use chirpscan::dsp::synth::{ChirpTrain, Sweep};
use chirpscan::scanner::find_wav_files;
use chirpscan::{ScanConfig, Scanner};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chirpscan", about = "Detect and measure bat echolocation calls in WAV recordings")]
struct Cli {
    /// Log debug output (per block noise levels and rejected onsets)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan WAV files (or directories of them) and write call metrics
    Scan {
        /// WAV files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Directory for the _Metrics.txt and _Shape.txt tables
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
        /// JSON configuration file; flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        window_size: Option<usize>,
        /// hann, hamming, blackman, blackman-harris or kaiser
        #[arg(long)]
        window: Option<String>,
        /// Reject calls with a peak below this frequency
        #[arg(long)]
        high_pass: Option<f64>,
        /// Time-expansion factor (default: x10 for files below 192 kHz)
        #[arg(long)]
        time_expansion: Option<u32>,
        /// Skip files with a different sampling frequency
        #[arg(long)]
        expected_fs: Option<u32>,
        /// Also write the time-frequency shape of each call
        #[arg(long)]
        shape: bool,
        /// Parallel files, 0 for one per core
        #[arg(short, long, default_value = "0")]
        jobs: usize,
        /// Print per-file summaries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a synthetic train of chirps to a WAV file
    Generate {
        output: PathBuf,
        #[arg(long, default_value = "384000")]
        sampling_freq: u32,
        /// Store time-expanded with this factor
        #[arg(long, default_value = "1")]
        time_expansion: u32,
        #[arg(long, default_value = "100000")]
        start_freq: f64,
        #[arg(long, default_value = "20000")]
        end_freq: f64,
        #[arg(long, default_value = "8")]
        duration_ms: f64,
        #[arg(long, default_value = "100")]
        interval_ms: f64,
        #[arg(long, default_value = "10")]
        count: usize,
        #[arg(long, default_value = "0.3")]
        amplitude: f64,
        /// RMS of the added white noise
        #[arg(long, default_value = "0.002")]
        noise: f64,
        #[arg(long, default_value = "quadratic", value_parser = ["linear", "quadratic"])]
        sweep: String,
        #[arg(long, default_value = "0")]
        seed: u64,
    },
    /// Print a configuration as JSON (defaults unless a file is given)
    Config {
        #[arg(long)]
        from: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Scan {
            inputs,
            output,
            config,
            window_size,
            window,
            high_pass,
            time_expansion,
            expected_fs,
            shape,
            jobs,
            json,
        } => {
            let mut scan_config = match config {
                Some(path) => ScanConfig::from_file(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => ScanConfig::default(),
            };
            if let Some(size) = window_size {
                scan_config.freq.window_size = size;
            }
            if let Some(name) = window {
                scan_config.freq.window_function = name;
            }
            if let Some(hz) = high_pass {
                scan_config.freq.search.high_pass_freq_hz = hz;
            }
            if time_expansion.is_some() {
                scan_config.time_expansion = time_expansion;
            }
            if expected_fs.is_some() {
                scan_config.expected_sampling_freq = expected_fs;
            }
            scan_config.shape.enabled |= shape;

            std::fs::create_dir_all(&output)
                .with_context(|| format!("Failed to create {}", output.display()))?;
            let scanner = Scanner::new(scan_config, &output).context("Invalid scan configuration")?;

            let mut files = Vec::new();
            for input in inputs {
                if input.is_dir() {
                    let found = find_wav_files(&input)
                        .with_context(|| format!("Failed to list {}", input.display()))?;
                    log::info!("{}: {} WAV files", input.display(), found.len());
                    files.extend(found);
                } else {
                    files.push(input);
                }
            }
            if files.is_empty() {
                bail!("No WAV files to scan");
            }

            let mut failed = 0;
            let mut summaries = Vec::new();
            for (path, result) in scanner.scan_files(&files, jobs) {
                match result {
                    Ok(summary) => summaries.push(summary),
                    Err(err) => {
                        log::error!("{}: {}", path.display(), err);
                        failed += 1;
                    }
                }
            }

            let calls: usize = summaries.iter().map(|s| s.accepted_calls).sum();
            log::info!("Scanned {} files, {} calls", summaries.len(), calls);
            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            }
            if failed > 0 {
                bail!("{failed} of {} files failed", files.len());
            }
        }
        Commands::Generate {
            output,
            sampling_freq,
            time_expansion,
            start_freq,
            end_freq,
            duration_ms,
            interval_ms,
            count,
            amplitude,
            noise,
            sweep,
            seed,
        } => {
            let train = ChirpTrain {
                start_freq_hz: start_freq,
                end_freq_hz: end_freq,
                duration_s: duration_ms / 1000.0,
                interval_s: interval_ms / 1000.0,
                amplitude,
                noise_level: noise,
                count,
                sweep: if sweep == "linear" { Sweep::Linear } else { Sweep::Quadratic },
                ..Default::default()
            };
            let mut rng = StdRng::seed_from_u64(seed);
            let samples = train.render(sampling_freq, &mut rng);
            write_wav(&output, &samples, sampling_freq, time_expansion)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            log::info!(
                "Wrote {} calls ({:.2}s at {} Hz) to {}",
                count,
                samples.len() as f64 / sampling_freq as f64,
                sampling_freq,
                output.display()
            );
        }
        Commands::Config { from } => {
            let config = match from {
                Some(path) => ScanConfig::from_file(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => ScanConfig::default(),
            };
            println!("{}", config.to_json()?);
        }
    }

    Ok(())
}
