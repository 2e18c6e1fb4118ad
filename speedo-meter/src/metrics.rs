use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

/// Метрики, обновляемые lock-free из нескольких потоков.
#[derive(Debug, Default)]
pub struct MeterMetrics {
    pub batches_received: AtomicU64,
    pub fixes_received: AtomicU64,
    pub empty_batches: AtomicU64,
    pub dropped_batches: AtomicU64,
    pub dropped_fixes: AtomicU64,
    pub invalid_fixes: AtomicU64,
    pub late_fixes: AtomicU64,
    pub clamped_fixes: AtomicU64,
    pub frames_rendered: AtomicU64,
    pub sink_errors: AtomicU64,
    pub record_errors: AtomicU64,
    /// Максимальная скорость (км/ч), биты f64
    max_speed_bits: AtomicU64,
}

/// Snapshot метрик для отображения / тестирования.
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub duration_secs: f64,
    pub batches_received: u64,
    pub fixes_received: u64,
    pub empty_batches: u64,
    pub dropped_batches: u64,
    pub dropped_fixes: u64,
    pub invalid_fixes: u64,
    pub late_fixes: u64,
    pub clamped_fixes: u64,
    pub frames_rendered: u64,
    pub sink_errors: u64,
    pub record_errors: u64,
    pub max_speed_kmph: f64,
    pub fix_rate_hz: f64,
    pub drop_rate_pct: f64,
}

impl MeterMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Обновляет максимум скорости. Нулевые, отрицательные и NaN игнорируются.
    pub fn observe_speed(
        &self,
        speed_kmph: f64,
    ) {
        if speed_kmph.is_nan() || speed_kmph <= 0.0 {
            return;
        }

        // для неотрицательных f64 порядок битов совпадает с порядком чисел
        self.max_speed_bits
            .fetch_max(speed_kmph.to_bits(), Ordering::Relaxed);
    }

    pub fn max_speed_kmph(&self) -> f64 {
        f64::from_bits(self.max_speed_bits.load(Ordering::Relaxed))
    }

    /// Частота поступления фиксов, Гц.
    pub fn fix_rate_hz(
        &self,
        elapsed: &Instant,
    ) -> f64 {
        let secs = elapsed.elapsed().as_secs_f64();

        if secs < 1e-9 {
            return 0.0;
        }

        self.fixes_received.load(Ordering::Relaxed) as f64 / secs
    }

    /// Процент потерянных фиксов (0.0-100.0).
    pub fn drop_rate_pct(&self) -> f64 {
        let received = self.fixes_received.load(Ordering::Relaxed);
        let dropped = self.dropped_fixes.load(Ordering::Relaxed);
        let total = received + dropped;

        if total == 0 {
            0.0
        } else {
            dropped as f64 / total as f64 * 100.0
        }
    }

    /// Итоговая сводка для вывода в конце сессии.
    pub fn summary(
        &self,
        elapsed: &Instant,
    ) -> MetricsSummary {
        MetricsSummary {
            duration_secs: elapsed.elapsed().as_secs_f64(),
            batches_received: self.batches_received.load(Ordering::Relaxed),
            fixes_received: self.fixes_received.load(Ordering::Relaxed),
            empty_batches: self.empty_batches.load(Ordering::Relaxed),
            dropped_batches: self.dropped_batches.load(Ordering::Relaxed),
            dropped_fixes: self.dropped_fixes.load(Ordering::Relaxed),
            invalid_fixes: self.invalid_fixes.load(Ordering::Relaxed),
            late_fixes: self.late_fixes.load(Ordering::Relaxed),
            clamped_fixes: self.clamped_fixes.load(Ordering::Relaxed),
            frames_rendered: self.frames_rendered.load(Ordering::Relaxed),
            sink_errors: self.sink_errors.load(Ordering::Relaxed),
            record_errors: self.record_errors.load(Ordering::Relaxed),
            max_speed_kmph: self.max_speed_kmph(),
            fix_rate_hz: self.fix_rate_hz(elapsed),
            drop_rate_pct: self.drop_rate_pct(),
        }
    }
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(f, "  Duration      : {:.1}s", self.duration_secs)?;
        writeln!(
            f,
            "  Fixes         : {} in {} batches",
            self.fixes_received, self.batches_received
        )?;
        writeln!(f, "  Empty batches : {}", self.empty_batches)?;
        writeln!(
            f,
            "  Dropped       : {} fixes ({:.2}%)",
            self.dropped_fixes, self.drop_rate_pct
        )?;
        writeln!(f, "  Invalid       : {}", self.invalid_fixes)?;
        writeln!(f, "  Late          : {}", self.late_fixes)?;
        writeln!(f, "  Clamped       : {}", self.clamped_fixes)?;
        writeln!(f, "  Max speed     : {:.1} km/h", self.max_speed_kmph)?;
        writeln!(f, "  Fix rate      : {:.2} Hz", self.fix_rate_hz)?;
        writeln!(f, "  Frames        : {}", self.frames_rendered)?;
        writeln!(f, "  Sink errors   : {}", self.sink_errors)?;
        writeln!(f, "  Record errors : {}", self.record_errors)?;
        write!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")
    }
}
