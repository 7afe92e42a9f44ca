use chirpscan::audio::wav::write_wav;
use chirpscan::dsp::synth::{ChirpTrain, Sweep};
use chirpscan::{ChirpMetrics, ScanConfig, Scanner, ShapeRow};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::tempdir;

const FS: u32 = 384_000;

fn two_second_train() -> ChirpTrain {
    ChirpTrain {
        count: 20,
        ..Default::default()
    }
}

fn read_table(path: &std::path::Path) -> Vec<Vec<String>> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| line.split('\t').map(str::to_owned).collect())
        .collect()
}

#[test]
fn test_time_expanded_file_is_scanned_block_by_block() {
    let dir = tempdir().unwrap();
    let wav = dir.path().join("te_train.wav");
    let train = two_second_train();
    let samples = train.render(FS, &mut StdRng::seed_from_u64(42));
    // Stored at 38.4 kHz, read back as x10.
    write_wav(&wav, &samples, FS, 10).unwrap();

    let scanner = Scanner::new(ScanConfig::default(), dir.path()).unwrap();
    let summary = scanner.scan_file(&wav).unwrap();

    assert_eq!(summary.sampling_freq, FS);
    assert_eq!(summary.blocks, 2);
    assert!(!summary.skipped);
    assert!(
        summary.accepted_calls >= train.count,
        "{} calls accepted",
        summary.accepted_calls
    );
    assert!(summary.checked_onsets >= summary.accepted_calls);

    let metrics_path = dir.path().join("te_train_Metrics.txt");
    assert_eq!(summary.metrics_path.as_deref(), Some(metrics_path.to_str().unwrap()));
    let table = read_table(&metrics_path);
    assert_eq!(table[0], ChirpMetrics::HEADER.to_vec());
    assert_eq!(table.len() - 1, summary.accepted_calls);

    let starts: Vec<usize> = table[1..].iter().map(|row| row[8].parse().unwrap()).collect();
    assert!(starts.iter().any(|&s| s < FS as usize));
    assert!(starts.iter().any(|&s| s >= FS as usize), "no call offset into the second block");
    for row in &table[1..] {
        let peak: f64 = row[0].parse().unwrap();
        assert!(peak > 15_000.0 && peak < 105_000.0, "peak {peak} Hz");
    }

    // Shapes are off by default.
    assert!(!dir.path().join("te_train_Shape.txt").exists());
}

#[test]
fn test_batch_scan_with_shapes() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("results");
    std::fs::create_dir(&out).unwrap();

    let fm = ChirpTrain {
        start_freq_hz: 80_000.0,
        end_freq_hz: 40_000.0,
        duration_s: 0.005,
        count: 5,
        sweep: Sweep::Linear,
        ..Default::default()
    };
    let quiet = ChirpTrain {
        amplitude: 0.0,
        count: 5,
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(3);
    let fm_path = dir.path().join("fm.wav");
    let quiet_path = dir.path().join("quiet.wav");
    write_wav(&fm_path, &fm.render(FS, &mut rng), FS, 1).unwrap();
    write_wav(&quiet_path, &quiet.render(FS, &mut rng), FS, 1).unwrap();

    let mut config = ScanConfig::default();
    config.shape.enabled = true;
    let scanner = Scanner::new(config, &out).unwrap();
    let files = chirpscan::scanner::find_wav_files(dir.path()).unwrap();
    assert_eq!(files, vec![fm_path.clone(), quiet_path.clone()]);

    let results = scanner.scan_files(&files, 2);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, fm_path);
    let fm_summary = results[0].1.as_ref().unwrap();
    let quiet_summary = results[1].1.as_ref().unwrap();

    assert!(fm_summary.accepted_calls >= fm.count);
    assert_eq!(quiet_summary.accepted_calls, 0);
    assert!(!out.join("quiet_Metrics.txt").exists());

    let metrics = read_table(&out.join("fm_Metrics.txt"));
    for row in &metrics[1..] {
        let start: f64 = row[2].parse().unwrap();
        let end: f64 = row[3].parse().unwrap();
        assert!(start > end, "start {start} Hz should be above end {end} Hz");
        assert!(start > 60_000.0 && end < 55_000.0, "start {start} Hz, end {end} Hz");
    }

    let shape = read_table(&out.join("fm_Shape.txt"));
    assert_eq!(shape[0], ShapeRow::HEADER.to_vec());
    assert!(shape.len() > fm.count * 10);
}
