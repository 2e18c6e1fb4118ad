// Провайдеры скорости работают в отдельном потоке и раз в интервал опроса
// отдают пакет фиксов, как callback системного сервиса местоположения.
// Симулятор проигрывает синтетическую поездку (разгон за предел шкалы,
// крейсер, торможение, стоянка), трасса воспроизводит записанные выборки
// в исходном темпе. stop_flag: Arc<AtomicBool> останавливает поток.

use std::{
    fs::File,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Sender, TrySendError};
use log::{debug, info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use speedo_core::{Pace, ReplayClock, SpeedSample, TraceReader, STOP_POLL_SLICE};

use crate::{metrics::MeterMetrics, MeterConfig, MeterError, MeterResult, SourceKind};

/// Абстракция источника скорости.
pub trait LocationProvider: Send {
    /// Информация об источнике
    fn info(&self) -> ProviderInfo;

    /// Запускает выдачу фиксов. Блокируется до установки `stop_flag` или
    /// исчерпания источника.
    fn run(
        &mut self,
        tx: Sender<FixBatch>,
        metrics: Arc<MeterMetrics>,
        stop_flag: Arc<AtomicBool>,
    ) -> MeterResult<()>;
}

/// Пакет фиксов, полученный за один опрос.
#[derive(Debug, Clone)]
pub struct FixBatch {
    /// Время получения пакета от начала сессии (мс)
    pub received_ms: u64,
    /// Выборки в порядке поступления (может быть пустым)
    pub samples: Vec<SpeedSample>,
}

/// Информация об источнике (для логирования).
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    pub name: String,
    pub poll_interval_ms: u64,
    pub description: String,
}

/// Профиль синтетической поездки, повторяется по кругу.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveProfile {
    /// Разгон от 0 до `peak_mps`, с
    pub accel_secs: f64,
    /// Максимальная скорость, м/с
    pub peak_mps: f64,
    /// Удержание максимума, с
    pub cruise_secs: f64,
    /// Торможение до 0, с
    pub brake_secs: f64,
    /// Стоянка, с
    pub idle_secs: f64,
}

/// Синтетический источник скорости для тестов и демонстрации.
pub struct SimulatedProvider {
    pub poll_interval: Duration,
    pub profile: DriveProfile,
    pub fixes_per_batch: u32,
    pub jitter_mps: f64,
    rng: Option<StdRng>,
}

/// Воспроизведение трассы JSON Lines в исходном темпе.
pub struct TraceProvider {
    pub path: PathBuf,
    pub speed: f64,
    pub loop_playback: bool,
}

////////////////////////////////////////////////////////////////////////////////
// DriveProfile
////////////////////////////////////////////////////////////////////////////////

impl DriveProfile {
    pub fn cycle_secs(&self) -> f64 {
        self.accel_secs + self.cruise_secs + self.brake_secs + self.idle_secs
    }

    /// Скорость (м/с) в момент `t_secs` от начала поездки.
    pub fn speed_at(
        &self,
        t_secs: f64,
    ) -> f64 {
        let cycle = self.cycle_secs();
        if cycle <= 0.0 {
            return 0.0;
        }

        let t = t_secs.rem_euclid(cycle);

        if t < self.accel_secs {
            return self.peak_mps * t / self.accel_secs;
        }

        let t = t - self.accel_secs;
        if t < self.cruise_secs {
            return self.peak_mps;
        }

        let t = t - self.cruise_secs;
        if t < self.brake_secs {
            return self.peak_mps * (1.0 - t / self.brake_secs);
        }

        0.0
    }
}

impl Default for DriveProfile {
    fn default() -> Self {
        // 75 м/с = 270 км/ч, выше предела шкалы
        Self {
            accel_secs: 20.0,
            peak_mps: 75.0,
            cruise_secs: 10.0,
            brake_secs: 15.0,
            idle_secs: 5.0,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// SimulatedProvider
////////////////////////////////////////////////////////////////////////////////

impl SimulatedProvider {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            profile: DriveProfile::default(),
            fixes_per_batch: 1,
            jitter_mps: 0.0,
            rng: None,
        }
    }

    /// Добавляет равномерный шум ±`jitter_mps` с фиксированным зерном.
    pub fn with_jitter(
        mut self,
        jitter_mps: f64,
        seed: u64,
    ) -> Self {
        self.jitter_mps = jitter_mps;
        self.rng = Some(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_profile(
        mut self,
        profile: DriveProfile,
    ) -> Self {
        self.profile = profile;
        self
    }

    fn sample_at(
        &mut self,
        t_ms: u64,
    ) -> SpeedSample {
        let mut speed = self.profile.speed_at(t_ms as f64 / 1_000.0);

        if let Some(rng) = self.rng.as_mut() {
            if self.jitter_mps > 0.0 {
                speed += rng.gen_range(-self.jitter_mps..=self.jitter_mps);
            }
        }

        // приёмник не сообщает отрицательную скорость
        SpeedSample::new(t_ms, speed.max(0.0))
    }
}

impl LocationProvider for SimulatedProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "Simulated GPS".to_string(),
            poll_interval_ms: self.poll_interval.as_millis() as u64,
            description: format!(
                "peak {:.0} km/h, cycle {:.0}s, jitter ±{:.2} m/s",
                self.profile.peak_mps * 3.6,
                self.profile.cycle_secs(),
                self.jitter_mps
            ),
        }
    }

    fn run(
        &mut self,
        tx: Sender<FixBatch>,
        metrics: Arc<MeterMetrics>,
        stop_flag: Arc<AtomicBool>,
    ) -> MeterResult<()> {
        let start = Instant::now();
        let interval_ms = self.poll_interval.as_millis() as u64;
        let per_batch = self.fixes_per_batch.max(1) as u64;
        let mut polls: u64 = 0;

        while !stop_flag.load(Ordering::Relaxed) {
            let received_ms = polls * interval_ms;

            // фиксы внутри пакета равномерно распределены по интервалу
            let samples: Vec<SpeedSample> = (0..per_batch)
                .map(|i| {
                    let back = interval_ms * (per_batch - 1 - i) / per_batch;
                    self.sample_at(received_ms.saturating_sub(back))
                })
                .collect();

            let batch = FixBatch {
                received_ms,
                samples,
            };

            match tx.try_send(batch) {
                Ok(()) => {}
                Err(TrySendError::Full(b)) => {
                    metrics.dropped_batches.fetch_add(1, Ordering::Relaxed);
                    metrics
                        .dropped_fixes
                        .fetch_add(b.samples.len() as u64, Ordering::Relaxed);
                }
                Err(TrySendError::Disconnected(_)) => break,
            }

            polls += 1;

            // pacing: синхронизация по реальному времени
            let expected = self.poll_interval * polls as u32;

            loop {
                let elapsed = start.elapsed();
                if expected <= elapsed || stop_flag.load(Ordering::Relaxed) {
                    break;
                }
                thread::sleep((expected - elapsed).min(STOP_POLL_SLICE));
            }
        }

        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// TraceProvider
////////////////////////////////////////////////////////////////////////////////

impl TraceProvider {
    pub fn new(
        path: PathBuf,
        speed: f64,
        loop_playback: bool,
    ) -> Self {
        Self {
            path,
            speed,
            loop_playback,
        }
    }
}

impl LocationProvider for TraceProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: format!("Trace {:?}", self.path),
            poll_interval_ms: 0,
            description: format!("speed {}x, loop {}", self.speed, self.loop_playback),
        }
    }

    fn run(
        &mut self,
        tx: Sender<FixBatch>,
        metrics: Arc<MeterMetrics>,
        stop_flag: Arc<AtomicBool>,
    ) -> MeterResult<()> {
        let session_start = Instant::now();
        let mut clock = ReplayClock::new(self.speed);
        let mut pass: u64 = 0;

        'outer: loop {
            pass += 1;
            if pass > 1 {
                info!("Trace loop #{pass}");
                clock.reset();
            }

            let file = File::open(&self.path).map_err(|e| {
                MeterError::SourceUnavailable(format!("{:?}: {e}", self.path))
            })?;
            let mut reader = TraceReader::new(file);
            let mut sent: u64 = 0;

            while let Some(result) = reader.next_sample() {
                if stop_flag.load(Ordering::Relaxed) {
                    break 'outer;
                }

                let sample = match result {
                    Ok(s) => s,
                    Err(e) => {
                        warn!("Skipping trace record: {e}");
                        metrics.invalid_fixes.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                };

                match clock.wait_for(sample.timestamp_ms, &stop_flag) {
                    Pace::OnTime => {}
                    Pace::Late(_) => {
                        metrics.late_fixes.fetch_add(1, Ordering::Relaxed);
                    }
                    Pace::Stopped => break 'outer,
                }

                let batch = FixBatch {
                    received_ms: session_start.elapsed().as_millis() as u64,
                    samples: vec![sample],
                };

                // трасса не теряет данные: ждём места в канале
                if tx.send(batch).is_err() {
                    break 'outer;
                }
                sent += 1;
            }

            debug!(
                "Trace pass #{pass} done: {sent} samples, {} invalid",
                reader.stats().records_invalid
            );

            if sent == 0 {
                warn!("Trace {:?} has no valid samples", self.path);
                break;
            }

            if !self.loop_playback {
                break;
            }
        }

        Ok(())
    }
}

/// Создаёт нужный источник по конфигурации.
pub fn create_provider(config: &MeterConfig) -> MeterResult<Box<dyn LocationProvider>> {
    match &config.source {
        SourceKind::Simulated => {
            let mut sim = SimulatedProvider::new(Duration::from_millis(config.poll_interval_ms));
            if config.jitter_mps > 0.0 {
                let seed = config.seed.unwrap_or_else(rand::random);
                sim = sim.with_jitter(config.jitter_mps, seed);
            }
            Ok(Box::new(sim))
        }
        SourceKind::Trace => {
            let path = config.trace_path.clone().ok_or_else(|| {
                MeterError::Config("trace source requires --trace <path>".to_string())
            })?;

            if !path.is_file() {
                return Err(MeterError::SourceUnavailable(format!(
                    "trace file not found: {path:?}"
                )));
            }

            Ok(Box::new(TraceProvider::new(
                path,
                config.replay_speed,
                config.loop_trace,
            )))
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
