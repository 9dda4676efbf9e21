use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use pcmvault_core::audio::wav;
use pcmvault_core::hashing::{hash_bytes, hash_file};
use pcmvault_core::snr::NOISE_FLOOR;
use pcmvault_core::{
    AudioEngine, EngineConfig, NoiseStrategy, SampleBuffer, SilenceParams, SnrParams,
    TrailingScan,
};
use tempfile::tempdir;

fn write_fixture(dir: &Path, name: &str, buffer: &SampleBuffer) -> PathBuf {
    let path = dir.join(name);
    wav::write_wav(&path, buffer).expect("write fixture");
    path
}

/// 1000 silent frames, 2000 frames at 20000, 1000 silent frames, 1 kHz mono.
fn boundary_fixture() -> SampleBuffer {
    let mut samples = vec![0; 1_000];
    samples.extend(vec![20_000; 2_000]);
    samples.extend(vec![0; 1_000]);
    SampleBuffer::pcm16(samples, 1_000, 1)
}

fn sine(len: usize, amplitude: f64, min_magnitude: i32) -> Vec<i32> {
    (0..len)
        .map(|i| {
            let v = (i as f64 * 0.031).sin() * amplitude;
            let mag = v.abs().round() as i32 + min_magnitude;
            if v < 0.0 {
                -mag
            } else {
                mag
            }
        })
        .collect()
}

#[test]
fn unpadded_audio_is_an_idempotent_no_op() {
    let dir = tempdir().expect("temp dir");
    let path = write_fixture(dir.path(), "tone.wav", &SampleBuffer::pcm16(sine(8_000, 9_000.0, 2_000), 8_000, 1));
    let original = hash_bytes(&fs::read(&path).expect("read fixture"));

    let engine = AudioEngine::default();
    for _ in 0..2 {
        let result = engine.trim_silence(&path).expect("trim");
        assert!(!result.was_trimmed);
        assert!(result.no_op);
        assert_eq!(result.content_hash, original);
        assert!(result.output_path.is_none());
        assert!(result.new_asset_id.is_none());
    }
    assert_eq!(fs::read_dir(dir.path()).expect("read dir").count(), 1);
}

#[test]
fn padded_tone_is_trimmed_to_exact_boundaries() {
    let dir = tempdir().expect("temp dir");
    let path = write_fixture(dir.path(), "padded.wav", &boundary_fixture());
    let original = hash_file(&path).expect("hash source");

    let engine = AudioEngine::new(EngineConfig {
        silence: SilenceParams::new(0.01, 0.1),
        ..EngineConfig::default()
    });
    let result = engine.trim_silence(&path).expect("trim");

    assert!(result.was_trimmed);
    assert!(!result.no_op);
    assert_ne!(result.content_hash, original);
    let out = result.output_path.expect("output path");
    let trimmed = wav::read_wav(&out).expect("decode trimmed");
    assert_eq!(trimmed.frame_count(), 2_000);
    assert_eq!(trimmed.sample_rate, 1_000);
    assert_eq!(trimmed.channels, 1);
    assert_eq!(trimmed.bits_per_sample, 16);

    // Trimming the trimmed file changes nothing.
    let again = engine.trim_silence(&out).expect("re-trim");
    assert!(again.no_op);
    assert_eq!(again.content_hash, result.content_hash);
}

#[test]
fn early_exit_scan_keeps_most_of_a_long_tail() {
    let dir = tempdir().expect("temp dir");
    let path = write_fixture(dir.path(), "padded.wav", &boundary_fixture());

    let params = SilenceParams::new(0.01, 0.1).with_trailing_scan(TrailingScan::EarlyExit);
    let result = AudioEngine::default()
        .trim_silence_with(&path, &params)
        .expect("trim");
    let trimmed = wav::read_wav(&result.output_path.expect("output")).expect("decode");
    // Frames 1000..3901 survive.
    assert_eq!(trimmed.frame_count(), 2_901);
}

#[test]
fn stereo_trim_keeps_frames_intact() {
    let dir = tempdir().expect("temp dir");
    let mut samples = vec![0; 2 * 500];
    for i in 0..1_000 {
        samples.push(if i % 2 == 0 { 0 } else { 15_000 });
        samples.push(-15_000);
    }
    samples.extend(vec![0; 2 * 500]);
    let path = write_fixture(dir.path(), "stereo.wav", &SampleBuffer::pcm16(samples, 2_000, 2));

    let result = AudioEngine::default().trim_silence(&path).expect("trim");
    let trimmed = wav::read_wav(&result.output_path.expect("output")).expect("decode");
    assert_eq!(trimmed.channels, 2);
    assert_eq!(trimmed.frame_count(), 1_000);
    assert_eq!(&trimmed.samples[..2], &[0, -15_000]);
}

#[test]
fn snr_of_loud_sine_uses_noise_floor_and_is_reproducible() {
    let dir = tempdir().expect("temp dir");
    let path = write_fixture(dir.path(), "sine.wav", &SampleBuffer::pcm16(sine(16_000, 10_000.0, 1_000), 16_000, 1));

    let engine = AudioEngine::default();
    let first = engine.compute_snr(&path).expect("snr");
    let second = engine.compute_snr(&path).expect("snr again");

    assert_eq!(first.noise_power, NOISE_FLOOR);
    assert_eq!(first.noise_rms, NOISE_FLOOR);
    assert!(first.snr.is_finite() && first.snr > 60.0, "snr={}", first.snr);
    assert_eq!(first, second);
}

#[test]
fn snr_strategies_run_over_the_full_buffer() {
    let dir = tempdir().expect("temp dir");
    let path = write_fixture(dir.path(), "padded.wav", &boundary_fixture());
    let engine = AudioEngine::default();

    let samples = engine
        .compute_snr_with(&path, &SnrParams::new(0.01, NoiseStrategy::Samples))
        .expect("samples snr");
    let segments = engine
        .compute_snr_with(&path, &SnrParams::new(0.01, NoiseStrategy::SilentSegments))
        .expect("segments snr");

    // Mono: both strategies pick the same 2000 zero samples, so the ratio hits the cap.
    assert_eq!(samples, segments);
    assert_eq!(samples.noise_power, 0.0);
    assert_eq!(samples.snr, pcmvault_core::snr::SNR_CEILING_DB);
    assert!((samples.signal_power - 20_000.0f64.powi(2) / 2.0).abs() < 1e-6);
}

#[test]
fn concurrent_trims_of_different_sources_do_not_collide() {
    let src = tempdir().expect("src dir");
    let out = tempdir().expect("out dir");

    let paths: Vec<PathBuf> = (0..4)
        .map(|i| {
            let mut samples = vec![0; 200];
            samples.extend(vec![5_000 + i * 1_000; 400]);
            samples.extend(vec![0; 200]);
            write_fixture(src.path(), &format!("src{i}.wav"), &SampleBuffer::pcm16(samples, 1_000, 1))
        })
        .collect();

    let engine = AudioEngine::new(EngineConfig {
        output_dir: Some(out.path().to_path_buf()),
        ..EngineConfig::default()
    });

    let handles: Vec<_> = paths
        .into_iter()
        .map(|path| {
            let engine = engine.clone();
            thread::spawn(move || engine.trim_silence(&path).expect("trim"))
        })
        .collect();

    let mut outputs: Vec<PathBuf> = handles
        .into_iter()
        .map(|h| h.join().expect("trim thread panicked").output_path.expect("output"))
        .collect();
    outputs.sort();
    outputs.dedup();
    assert_eq!(outputs.len(), 4);
    assert_eq!(fs::read_dir(out.path()).expect("read dir").count(), 4);
}
