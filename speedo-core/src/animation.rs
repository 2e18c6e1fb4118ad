use std::time::{Duration, Instant};

/// Длительность анимации элементов шкалы по умолчанию.
pub const DEFAULT_ANIMATION_MS: u64 = 300;

/// Линейная анимация значения `from → to` за `duration`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearAnimation {
    pub from: f64,
    pub to: f64,
    start: Instant,
    duration: Duration,
}

/// Линейная анимация целого значения (цифровое табло).
///
/// Промежуточное значение усекается к нулю, как у целочисленного
/// интерполятора.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntAnimation {
    pub from: i64,
    pub to: i64,
    start: Instant,
    duration: Duration,
}

/// Доля пройденного времени в диапазоне [0, 1].
fn fraction(
    start: Instant,
    duration: Duration,
    now: Instant,
) -> f64 {
    if duration.is_zero() {
        return 1.0;
    }

    let elapsed = now.saturating_duration_since(start);

    (elapsed.as_nanos() as f64 / duration.as_nanos() as f64).clamp(0.0, 1.0)
}

////////////////////////////////////////////////////////////////////////////////
// LinearAnimation
////////////////////////////////////////////////////////////////////////////////

impl LinearAnimation {
    pub fn new(
        from: f64,
        to: f64,
        start: Instant,
        duration: Duration,
    ) -> Self {
        Self {
            from,
            to,
            start,
            duration,
        }
    }

    /// Неподвижное значение (анимация уже завершена).
    pub fn settled(
        value: f64,
        now: Instant,
    ) -> Self {
        Self::new(value, value, now, Duration::ZERO)
    }

    /// Значение в момент `now`.
    pub fn value_at(
        &self,
        now: Instant,
    ) -> f64 {
        let t = fraction(self.start, self.duration, now);

        if t >= 1.0 {
            return self.to;
        }

        self.from + (self.to - self.from) * t
    }

    /// Новая анимация к `to`, начинающаяся с текущего значения.
    pub fn retarget(
        &self,
        to: f64,
        now: Instant,
        duration: Duration,
    ) -> Self {
        Self::new(self.value_at(now), to, now, duration)
    }

    pub fn is_finished(
        &self,
        now: Instant,
    ) -> bool {
        fraction(self.start, self.duration, now) >= 1.0
    }
}

////////////////////////////////////////////////////////////////////////////////
// IntAnimation
////////////////////////////////////////////////////////////////////////////////

impl IntAnimation {
    pub fn new(
        from: i64,
        to: i64,
        start: Instant,
        duration: Duration,
    ) -> Self {
        Self {
            from,
            to,
            start,
            duration,
        }
    }

    pub fn settled(
        value: i64,
        now: Instant,
    ) -> Self {
        Self::new(value, value, now, Duration::ZERO)
    }

    pub fn value_at(
        &self,
        now: Instant,
    ) -> i64 {
        let t = fraction(self.start, self.duration, now);

        if t >= 1.0 {
            return self.to;
        }

        // разность в f64: при крайних значениях i64 не переполняется
        (self.from as f64 + t * (self.to as f64 - self.from as f64)) as i64
    }

    pub fn retarget(
        &self,
        to: i64,
        now: Instant,
        duration: Duration,
    ) -> Self {
        Self::new(self.value_at(now), to, now, duration)
    }

    pub fn is_finished(
        &self,
        now: Instant,
    ) -> bool {
        fraction(self.start, self.duration, now) >= 1.0
    }
}
