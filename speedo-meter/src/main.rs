use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use clap::Parser;
use log::{error, info, warn};
use speedo_core::Calibration;
use speedo_meter::{
    create_provider, create_sink, parse_interval_ms, MeterConfig, MeterPipeline, OutputFormat,
    SourceKind,
};

#[derive(Parser, Debug)]
#[command(
    name = "speedo-meter",
    version = env!("CARGO_PKG_VERSION"),
    about = "GPS speedometer: converts speed fixes to an animated needle gauge",
    long_about = None,
)]
struct Cli {
    /// Источник скорости: sim, trace
    #[arg(short, long, default_value = "sim")]
    source: String,
    /// Трасса для воспроизведения (JSON Lines)
    #[arg(short, long)]
    trace: Option<PathBuf>,
    /// Множитель скорости воспроизведения трассы
    #[arg(long, default_value = "1.0")]
    replay_speed: f64,
    /// Зациклить трассу
    #[arg(long = "loop")]
    loop_trace: bool,
    /// Интервал опроса местоположения (500ms, 0.5s, 500)
    #[arg(long, default_value = "500ms")]
    poll_interval: String,
    /// Интервал вывода кадров
    #[arg(long, default_value = "50ms")]
    frame_interval: String,
    /// Длительность анимации шкалы
    #[arg(long, default_value = "300ms")]
    animation: String,
    /// Ограничение сессии (секунды). По умолчанию: до Ctrl+C
    #[arg(short, long)]
    duration: Option<u64>,
    /// JSON файл калибровки шкалы
    #[arg(long)]
    calibration: Option<PathBuf>,
    /// Формат кадров: text, json
    #[arg(long, default_value = "text")]
    format: String,
    /// Файл для кадров (по умолчанию stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Записать входящие выборки в трассу
    #[arg(long)]
    record: Option<PathBuf>,
    /// Ёмкость канала провайдер → шкала (пакеты)
    #[arg(long, default_value = "16")]
    channel_capacity: usize,
    /// Интервал вывода статистики (секунды)
    #[arg(long, default_value = "5")]
    stats_interval: u64,
    /// Зерно шума симулятора
    #[arg(long)]
    seed: Option<u64>,
    /// Амплитуда шума симулятора, м/с
    #[arg(long, default_value = "0.0")]
    jitter: f64,
    /// Тихий режим (только ошибки)
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
    /// Подробный вывод (debug)
    #[arg(short, long)]
    verbose: bool,
}

fn exit_with(
    context: &str,
    e: impl std::fmt::Display,
) -> ! {
    error!("{context}: {e}");
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.quiet {
        log::LevelFilter::Error
    } else if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(level)
        .format_target(false)
        .format_timestamp_secs()
        .init();

    let source: SourceKind = cli
        .source
        .parse()
        .unwrap_or_else(|e| exit_with("--source", e));

    let output_format: OutputFormat = cli
        .format
        .parse()
        .unwrap_or_else(|e| exit_with("--format", e));

    let poll_interval_ms =
        parse_interval_ms(&cli.poll_interval).unwrap_or_else(|e| exit_with("--poll-interval", e));
    let frame_interval_ms = parse_interval_ms(&cli.frame_interval)
        .unwrap_or_else(|e| exit_with("--frame-interval", e));
    let animation_ms =
        parse_interval_ms(&cli.animation).unwrap_or_else(|e| exit_with("--animation", e));

    let calibration = match &cli.calibration {
        Some(path) => {
            Calibration::load(path).unwrap_or_else(|e| exit_with("--calibration", e))
        }
        None => Calibration::default(),
    };

    let config = MeterConfig {
        source,
        trace_path: cli.trace.clone(),
        replay_speed: cli.replay_speed,
        loop_trace: cli.loop_trace,
        poll_interval_ms,
        frame_interval_ms,
        animation_ms,
        duration_secs: cli.duration,
        calibration,
        output_format,
        output_path: cli.output.clone(),
        record_path: cli.record.clone(),
        channel_capacity: cli.channel_capacity,
        stats_interval_secs: cli.stats_interval,
        seed: cli.seed,
        jitter_mps: cli.jitter,
    };

    if let Err(e) = config.validate() {
        exit_with("Invalid configuration", e);
    }

    let provider = create_provider(&config).unwrap_or_else(|e| exit_with("Failed to open source", e));
    let sink = create_sink(&config).unwrap_or_else(|e| exit_with("Failed to open output", e));

    // Выводим конфигурацию до запуска
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Source        : {}", config.source);
    if let Some(path) = &config.trace_path {
        info!("  Trace         : {path:?} (x{:.2})", config.replay_speed);
    }
    info!("  Poll interval : {} ms", config.poll_interval_ms);
    info!("  Frame interval: {} ms", config.frame_interval_ms);
    info!("  Animation     : {} ms", config.animation_ms);
    info!(
        "  Scale         : 0-{:.0} km/h over {:.0}°",
        calibration.max_speed_kmph, calibration.max_rotation_deg
    );
    info!(
        "  Zones         : top > {:.0} km/h, right > {:.0} km/h",
        calibration.top_zone_threshold_kmph, calibration.right_zone_threshold_kmph
    );
    match &config.output_path {
        Some(path) => info!("  Output        : {path:?} ({:?})", config.output_format),
        None => info!("  Output        : stdout ({:?})", config.output_format),
    }
    if let Some(path) = &config.record_path {
        info!("  Recording     : {path:?}");
    }
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let (pipeline, metrics) = MeterPipeline::new(config.clone());
    let stop_flag: Arc<AtomicBool> = pipeline.stop_flag();

    let stop_ctrlc = stop_flag.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        if stop_ctrlc.swap(true, Ordering::SeqCst) {
            // Второй Ctrl+C: принудительный выход
            warn!("Force exit");
            std::process::exit(130);
        }
        warn!("Ctrl+C received, stopping...");
    }) {
        warn!("Failed to set Ctrl+C handler: {e}");
    }

    let session_start = Instant::now();

    if let Err(e) = pipeline.run(provider, sink) {
        exit_with("Speedometer failed", e);
    }

    // --- Итоговая статистика ---
    let summary = metrics.summary(&session_start);
    info!("\n{summary}");

    if summary.dropped_fixes > 0 {
        warn!(
            "⚠ {} fixes dropped ({:.2}% loss). Consider a larger --channel-capacity",
            summary.dropped_fixes, summary.drop_rate_pct
        );
    }

    if summary.invalid_fixes > 0 {
        warn!(
            "⚠ {} invalid trace records skipped",
            summary.invalid_fixes
        );
    }

    let mut failed = false;

    if summary.sink_errors > 0 {
        warn!(
            "⚠ {} frames failed to write. Check the output destination.",
            summary.sink_errors
        );
        failed = true;
    }

    if let Some(path) = &config.record_path {
        if summary.record_errors > 0 {
            warn!("⚠ Trace recording to {path:?} failed, the file is incomplete.");
            failed = true;
        } else {
            info!("✓ Trace recorded: {path:?}");
        }
    }

    if failed {
        std::process::exit(1);
    }
}
