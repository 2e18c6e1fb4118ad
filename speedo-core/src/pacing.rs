use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use log::debug;

/// Отставание, начиная с которого выборка считается опоздавшей.
pub const UNDERRUN_THRESHOLD: Duration = Duration::from_millis(5);

/// Максимальный отрезок сна между проверками флага остановки.
pub const STOP_POLL_SLICE: Duration = Duration::from_millis(50);

/// Привязывает время трассы к реальному времени с учётом `speed`.
///
/// Первая выборка задаёт начало отсчёта. Для каждой следующей вычисляем,
/// когда она должна быть выдана относительно старта: если опережаем - спим,
/// если отстаём - возвращаем величину отставания и не ждём.
#[derive(Debug)]
pub struct ReplayClock {
    speed: f64,
    session_start: Instant,
    trace_start_ms: Option<u64>,
}

/// Итог ожидания одной выборки.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// Выборка выдана вовремя (после сна или без него)
    OnTime,
    /// Выборка опоздала на указанное время
    Late(Duration),
    /// Ожидание прервано флагом остановки
    Stopped,
}

impl ReplayClock {
    pub fn new(speed: f64) -> Self {
        Self {
            speed: speed.max(0.01),
            session_start: Instant::now(),
            trace_start_ms: None,
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Сбрасывает привязку (новый проход трассы).
    pub fn reset(&mut self) {
        self.session_start = Instant::now();
        self.trace_start_ms = None;
    }

    /// Реальное смещение от старта, на котором должна выйти выборка.
    pub fn due_offset(
        &mut self,
        timestamp_ms: u64,
    ) -> Duration {
        let start = *self.trace_start_ms.get_or_insert(timestamp_ms);
        let trace_offset_ms = timestamp_ms.saturating_sub(start);

        Duration::from_secs_f64(trace_offset_ms as f64 / 1_000.0 / self.speed)
    }

    /// Ждёт момента выдачи выборки с `timestamp_ms`.
    ///
    /// Спит отрезками не длиннее [`STOP_POLL_SLICE`], между ними проверяет
    /// `stop_flag`.
    pub fn wait_for(
        &mut self,
        timestamp_ms: u64,
        stop_flag: &AtomicBool,
    ) -> Pace {
        let due = self.due_offset(timestamp_ms);
        let mut slept = false;

        loop {
            if stop_flag.load(Ordering::Relaxed) {
                return Pace::Stopped;
            }

            let elapsed = self.session_start.elapsed();
            if due <= elapsed {
                break;
            }

            std::thread::sleep((due - elapsed).min(STOP_POLL_SLICE));
            slept = true;
        }

        if slept {
            return Pace::OnTime;
        }

        let lag = self.session_start.elapsed().saturating_sub(due);
        if lag > UNDERRUN_THRESHOLD {
            debug!("Sample at {timestamp_ms} ms is late by {lag:?}");
            Pace::Late(lag)
        } else {
            Pace::OnTime
        }
    }
}
