use std::{
    fs::File,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, info, warn};
use speedo_core::{Gauge, SpeedToAngleConverter, TraceWriter};

use crate::{
    metrics::MeterMetrics,
    provider::{FixBatch, LocationProvider},
    sink::FrameSink,
    MeterConfig, MeterError, MeterResult,
};

/// Оркестрирует сессию спидометра: провайдер → канал → шкала → кадры.
pub struct MeterPipeline {
    config: MeterConfig,
    metrics: Arc<MeterMetrics>,
    stop_flag: Arc<AtomicBool>,
}

/// Почему завершился цикл отрисовки.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Duration,
    Signal,
    SourceClosed,
}

impl MeterPipeline {
    /// Создаёт пайплайн. Возвращает также shared-ссылку на метрики.
    pub fn new(config: MeterConfig) -> (Self, Arc<MeterMetrics>) {
        let metrics = MeterMetrics::new();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let p = Self {
            config,
            metrics: metrics.clone(),
            stop_flag,
        };

        (p, metrics)
    }

    /// Флаг остановки. Устанавливает в `true` для graceful shutdown.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    /// Запускает сессию. Блокируется до завершения.
    pub fn run(
        self,
        mut provider: Box<dyn LocationProvider>,
        mut sink: Box<dyn FrameSink>,
    ) -> MeterResult<()> {
        let info = provider.info();

        info!(
            "Starting speedometer: {} (poll {} ms), {}",
            info.name, info.poll_interval_ms, info.description
        );

        let (tx, rx) = crossbeam_channel::bounded::<FixBatch>(self.config.channel_capacity);
        let stop_flag = self.stop_flag.clone();
        let stop_flag_provider = stop_flag.clone();
        let metrics_provider = self.metrics.clone();

        // Поток провайдера
        let provider_handle = std::thread::spawn(move || {
            let result = provider.run(tx, metrics_provider, stop_flag_provider);

            if let Err(ref e) = result {
                warn!("Provider thread error: {e}");
            }

            result
        });

        // Цикл отрисовки (текущий поток)
        let render_result = self.render_loop(rx, sink.as_mut());

        // Сигнализируем провайдеру остановиться
        stop_flag.store(true, Ordering::Relaxed);

        let provider_result = match provider_handle.join() {
            Ok(r) => r,
            Err(_) => Err(MeterError::Pipeline(
                "provider thread panicked".to_string(),
            )),
        };

        render_result?;
        provider_result
    }

    fn render_loop(
        &self,
        rx: Receiver<FixBatch>,
        sink: &mut dyn FrameSink,
    ) -> MeterResult<()> {
        let cfg = &self.config;

        let converter = SpeedToAngleConverter::new(cfg.calibration);
        let frame_interval = Duration::from_millis(cfg.frame_interval_ms);
        let stats_interval = Duration::from_secs(cfg.stats_interval_secs);

        let mut recorder = match &cfg.record_path {
            Some(path) => Some(TraceWriter::new(File::create(path)?)),
            None => None,
        };

        let session_start = Instant::now();
        let mut gauge = Gauge::new(Duration::from_millis(cfg.animation_ms), session_start);
        let mut next_frame = session_start;
        let mut last_stats = session_start;

        let reason = loop {
            //  Проверяем ограничение по времени
            if let Some(dur) = cfg.duration_secs {
                if session_start.elapsed().as_secs() >= dur {
                    info!("Duration limit reached ({dur}s). Finishing...");
                    break StopReason::Duration;
                }
            }

            //  Проверяем внешний stop_flag (Ctrl+C)
            if self.stop_flag.load(Ordering::Relaxed) {
                info!("Stop signal received. Finishing...");
                break StopReason::Signal;
            }

            //  Ждём пакет не дольше, чем до следующего кадра
            let timeout = next_frame.saturating_duration_since(Instant::now());

            match rx.recv_timeout(timeout) {
                Ok(batch) => {
                    self.handle_batch(batch, &converter, &mut gauge, &mut recorder);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    info!("Location source closed. Settling gauge...");
                    break StopReason::SourceClosed;
                }
            }

            let now = Instant::now();
            if now >= next_frame {
                self.emit_frame(&gauge, now, session_start, sink);

                next_frame += frame_interval;
                if next_frame < now {
                    // отстали больше чем на кадр: не догоняем пачкой
                    next_frame = now + frame_interval;
                }
            }

            // Периодически выводим статистику
            if last_stats.elapsed() >= stats_interval {
                self.log_progress(&session_start);
                last_stats = Instant::now();
            }
        };

        // Источник закончился: доигрываем анимацию до конца
        if reason == StopReason::SourceClosed {
            loop {
                let now = Instant::now();
                if gauge.is_settled(now) || self.stop_flag.load(Ordering::Relaxed) {
                    break;
                }

                std::thread::sleep(next_frame.saturating_duration_since(now));
                self.emit_frame(&gauge, Instant::now(), session_start, sink);
                next_frame = Instant::now() + frame_interval;
            }
        }

        // Финальный кадр
        self.emit_frame(&gauge, Instant::now(), session_start, sink);
        sink.flush()?;

        if let Some(rec) = recorder {
            let n = rec.records();
            match rec.finish() {
                Ok(_) => info!("Trace recorded: {n} samples"),
                Err(e) => {
                    self.metrics.record_errors.fetch_add(1, Ordering::Relaxed);
                    warn!("Trace record error on finish: {e}");
                }
            }
        }

        debug!("Render loop finished: {reason:?}");
        Ok(())
    }

    fn handle_batch(
        &self,
        batch: FixBatch,
        converter: &SpeedToAngleConverter,
        gauge: &mut Gauge,
        recorder: &mut Option<TraceWriter<File>>,
    ) {
        let metrics = &self.metrics;

        if batch.samples.is_empty() {
            metrics.empty_batches.fetch_add(1, Ordering::Relaxed);
            return;
        }

        metrics.batches_received.fetch_add(1, Ordering::Relaxed);

        for sample in &batch.samples {
            metrics.fixes_received.fetch_add(1, Ordering::Relaxed);

            let record_result = match recorder.as_mut() {
                Some(rec) => rec.write_sample(sample),
                None => Ok(()),
            };

            if let Err(e) = record_result {
                // запись трассы прекращается после первой ошибки
                metrics.record_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Trace record error, recording stopped: {e}");
                *recorder = None;
            }

            let reading = converter.reading_for(sample);

            if reading.is_clamped() {
                metrics.clamped_fixes.fetch_add(1, Ordering::Relaxed);
            }
            metrics.observe_speed(reading.raw_kmph);

            debug!("Speed: {:.1} km/h", reading.raw_kmph);

            gauge.apply(&reading, Instant::now());
        }
    }

    fn emit_frame(
        &self,
        gauge: &Gauge,
        now: Instant,
        session_start: Instant,
        sink: &mut dyn FrameSink,
    ) {
        let t_ms = now.saturating_duration_since(session_start).as_millis() as u64;
        let frame = gauge.frame(now, t_ms);

        match sink.write_frame(&frame) {
            Ok(()) => {
                self.metrics.frames_rendered.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.metrics.sink_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Frame write error: {e}");
                // Не прерываем: пробуем продолжить
            }
        }
    }

    fn log_progress(
        &self,
        start: &Instant,
    ) {
        let m = &self.metrics;

        info!(
            "[ {:.0}s ] fixes={} batches={} dropped={} ({:.2}%) frames={} max={:.1}km/h",
            start.elapsed().as_secs_f64(),
            m.fixes_received.load(Ordering::Relaxed),
            m.batches_received.load(Ordering::Relaxed),
            m.dropped_fixes.load(Ordering::Relaxed),
            m.drop_rate_pct(),
            m.frames_rendered.load(Ordering::Relaxed),
            m.max_speed_kmph(),
        );
    }
}
