use std::{
    fs::File,
    sync::atomic::Ordering,
    time::{Duration, Instant},
};

use approx::assert_relative_eq;
use speedo_core::{read_all_samples, GaugeFrame, SpeedSample, TraceReader, TraceWriter};
use speedo_meter::{
    create_provider, create_sink, MeterConfig, MeterPipeline, OutputFormat, SourceKind,
};
use tempfile::TempDir;

fn read_frames(path: &std::path::Path) -> Vec<GaugeFrame> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[test]
fn test_trace_replay_to_json_frames() {
    let dir = TempDir::new().unwrap();
    let trace_path = dir.path().join("drive.jsonl");
    let frames_path = dir.path().join("frames.jsonl");

    {
        let mut writer = TraceWriter::new(File::create(&trace_path).unwrap());
        for (i, speed) in [10.0, 20.0, 25.0].into_iter().enumerate() {
            writer
                .write_sample(&SpeedSample::new(i as u64 * 500, speed))
                .unwrap();
        }
        writer.finish().unwrap();
    }

    let config = MeterConfig {
        source: SourceKind::Trace,
        trace_path: Some(trace_path),
        replay_speed: 10.0,
        frame_interval_ms: 20,
        output_format: OutputFormat::Json,
        output_path: Some(frames_path.clone()),
        ..MeterConfig::default()
    };
    config.validate().unwrap();

    let provider = create_provider(&config).unwrap();
    let sink = create_sink(&config).unwrap();
    let (pipeline, metrics) = MeterPipeline::new(config);
    pipeline.run(provider, sink).unwrap();

    assert_eq!(metrics.fixes_received.load(Ordering::Relaxed), 3);
    assert_eq!(metrics.invalid_fixes.load(Ordering::Relaxed), 0);

    let frames = read_frames(&frames_path);
    assert!(frames.len() >= 2);
    assert!(frames.windows(2).all(|w| w[0].t_ms <= w[1].t_ms));

    // 25 м/с = 90 км/ч, верхняя дуга ещё на 10° за порогом
    let last = frames.last().unwrap();
    assert_eq!(last.readout_kmph, 90);
    assert_relative_eq!(last.needle_deg, 90.0);
    assert_relative_eq!(last.top_arc_deg, -10.0);
    assert_eq!(last.right_arc_deg, 0.0);
}

#[test]
fn test_trace_with_bad_records_is_replayed() {
    let dir = TempDir::new().unwrap();
    let trace_path = dir.path().join("broken.jsonl");
    let frames_path = dir.path().join("frames.jsonl");

    std::fs::write(
        &trace_path,
        "{\"timestamp_ms\":0,\"speed_mps\":5.0}\n\
         not json\n\
         {\"timestamp_ms\":100,\"speed_mps\":-3.0}\n\
         {\"timestamp_ms\":200,\"speed_mps\":100.0}\n",
    )
    .unwrap();

    let config = MeterConfig {
        source: SourceKind::Trace,
        trace_path: Some(trace_path),
        replay_speed: 4.0,
        frame_interval_ms: 20,
        output_format: OutputFormat::Json,
        output_path: Some(frames_path.clone()),
        ..MeterConfig::default()
    };

    let provider = create_provider(&config).unwrap();
    let sink = create_sink(&config).unwrap();
    let (pipeline, metrics) = MeterPipeline::new(config);
    pipeline.run(provider, sink).unwrap();

    assert_eq!(metrics.fixes_received.load(Ordering::Relaxed), 2);
    assert_eq!(metrics.invalid_fixes.load(Ordering::Relaxed), 2);
    assert_eq!(metrics.clamped_fixes.load(Ordering::Relaxed), 1);

    // 100 м/с = 360 км/ч, шкала упирается в 240
    let last = read_frames(&frames_path).pop().unwrap();
    assert_eq!(last.readout_kmph, 240);
    assert_relative_eq!(last.needle_deg, 240.0);
    assert_relative_eq!(last.top_arc_deg, 140.0);
    assert_relative_eq!(last.right_arc_deg, 70.0);
}

#[test]
fn test_simulated_session_records_replayable_trace() {
    let dir = TempDir::new().unwrap();
    let record_path = dir.path().join("recorded.jsonl");
    let frames_path = dir.path().join("frames.txt");

    let config = MeterConfig {
        source: SourceKind::Simulated,
        poll_interval_ms: 100,
        frame_interval_ms: 50,
        duration_secs: Some(1),
        jitter_mps: 0.5,
        seed: Some(7),
        output_path: Some(frames_path.clone()),
        record_path: Some(record_path.clone()),
        ..MeterConfig::default()
    };

    let provider = create_provider(&config).unwrap();
    let sink = create_sink(&config).unwrap();
    let (pipeline, metrics) = MeterPipeline::new(config);
    pipeline.run(provider, sink).unwrap();

    let mut reader = TraceReader::new(File::open(&record_path).unwrap());
    let samples = read_all_samples(&mut reader).unwrap();
    assert!(!samples.is_empty());
    assert_eq!(
        samples.len() as u64,
        metrics.fixes_received.load(Ordering::Relaxed)
    );
    assert!(samples.iter().all(|s| s.speed_mps >= 0.0));
    assert!(samples
        .windows(2)
        .all(|w| w[0].timestamp_ms <= w[1].timestamp_ms));

    let text = std::fs::read_to_string(&frames_path).unwrap();
    assert!(text.lines().count() > 0);
    assert!(text.lines().all(|l| l.contains("km/h")));
}

#[test]
fn test_missing_trace_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = MeterConfig {
        source: SourceKind::Trace,
        trace_path: Some(dir.path().join("nope.jsonl")),
        ..MeterConfig::default()
    };

    assert!(create_provider(&config).is_err());
}

#[test]
fn test_trace_pause_does_not_outlive_duration_limit() {
    let dir = TempDir::new().unwrap();
    let trace_path = dir.path().join("pause.jsonl");

    {
        let mut writer = TraceWriter::new(File::create(&trace_path).unwrap());
        writer.write_sample(&SpeedSample::new(0, 15.0)).unwrap();
        // стоянка 6 с без фиксов
        writer.write_sample(&SpeedSample::new(6_000, 30.0)).unwrap();
        writer.finish().unwrap();
    }

    let config = MeterConfig {
        source: SourceKind::Trace,
        trace_path: Some(trace_path),
        duration_secs: Some(1),
        frame_interval_ms: 20,
        output_format: OutputFormat::Json,
        output_path: Some(dir.path().join("frames.jsonl")),
        ..MeterConfig::default()
    };

    let provider = create_provider(&config).unwrap();
    let sink = create_sink(&config).unwrap();
    let (pipeline, metrics) = MeterPipeline::new(config);

    let started = Instant::now();
    pipeline.run(provider, sink).unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_secs(2), "session took {elapsed:?}");
    assert_eq!(metrics.fixes_received.load(Ordering::Relaxed), 1);
}
