use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::{
    animation::{IntAnimation, LinearAnimation, DEFAULT_ANIMATION_MS},
    converter::GaugeReading,
};

/// Анимированное состояние спидометра: стрелка, две дуги и цифровое табло.
///
/// Каждое новое показание запускает анимацию каждого элемента от его
/// текущего значения к новой цели.
#[derive(Debug, Clone)]
pub struct Gauge {
    needle: LinearAnimation,
    top_arc: LinearAnimation,
    right_arc: LinearAnimation,
    readout: IntAnimation,
    duration: Duration,
    readings_applied: u64,
}

/// Снимок состояния шкалы в один момент времени.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaugeFrame {
    /// Время от начала сессии, мс
    pub t_ms: u64,
    pub needle_deg: f64,
    pub top_arc_deg: f64,
    pub right_arc_deg: f64,
    /// Значение на табло, км/ч
    pub readout_kmph: i64,
}

impl Gauge {
    /// Новая шкала в нуле.
    pub fn new(
        duration: Duration,
        now: Instant,
    ) -> Self {
        Self {
            needle: LinearAnimation::settled(0.0, now),
            top_arc: LinearAnimation::settled(0.0, now),
            right_arc: LinearAnimation::settled(0.0, now),
            readout: IntAnimation::settled(0, now),
            duration,
            readings_applied: 0,
        }
    }

    pub fn with_default_duration(now: Instant) -> Self {
        Self::new(Duration::from_millis(DEFAULT_ANIMATION_MS), now)
    }

    /// Запускает анимацию всех элементов к новому показанию.
    pub fn apply(
        &mut self,
        reading: &GaugeReading,
        now: Instant,
    ) {
        let d = self.duration;

        self.needle = self.needle.retarget(reading.needle_angle_deg, now, d);
        self.top_arc = self.top_arc.retarget(reading.top_arc_deg, now, d);
        self.right_arc = self.right_arc.retarget(reading.right_arc_deg, now, d);
        self.readout = self.readout.retarget(reading.readout(), now, d);
        self.readings_applied += 1;
    }

    /// Снимок всех элементов в момент `now`.
    pub fn frame(
        &self,
        now: Instant,
        t_ms: u64,
    ) -> GaugeFrame {
        GaugeFrame {
            t_ms,
            needle_deg: self.needle.value_at(now),
            top_arc_deg: self.top_arc.value_at(now),
            right_arc_deg: self.right_arc.value_at(now),
            readout_kmph: self.readout.value_at(now),
        }
    }

    /// Все анимации завершены.
    pub fn is_settled(
        &self,
        now: Instant,
    ) -> bool {
        self.needle.is_finished(now)
            && self.top_arc.is_finished(now)
            && self.right_arc.is_finished(now)
            && self.readout.is_finished(now)
    }

    pub fn readings_applied(&self) -> u64 {
        self.readings_applied
    }

    pub fn animation_duration(&self) -> Duration {
        self.duration
    }
}

impl std::fmt::Display for GaugeFrame {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(
            f,
            "[{:>7.1}s] {:>3} km/h  needle={:>6.1}°  top={:>6.1}°  right={:>6.1}°",
            self.t_ms as f64 / 1_000.0,
            self.readout_kmph,
            self.needle_deg,
            self.top_arc_deg,
            self.right_arc_deg,
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::converter::SpeedToAngleConverter;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_new_gauge_is_at_rest() {
        let t0 = Instant::now();
        let g = Gauge::with_default_duration(t0);
        let f = g.frame(t0, 0);

        assert_eq!(f.needle_deg, 0.0);
        assert_eq!(f.readout_kmph, 0);
        assert!(g.is_settled(t0));
        assert_eq!(g.animation_duration(), ms(300));
    }

    #[test]
    fn test_apply_animates_to_target() {
        let t0 = Instant::now();
        let conv = SpeedToAngleConverter::default();
        let mut g = Gauge::new(ms(300), t0);

        // 50 м/с = 180 км/ч
        g.apply(&conv.reading(50.0), t0);
        assert!(!g.is_settled(t0 + ms(100)));

        let half = g.frame(t0 + ms(150), 150);
        assert_relative_eq!(half.needle_deg, 90.0, epsilon = 1e-9);
        assert_eq!(half.readout_kmph, 90);

        let done = g.frame(t0 + ms(300), 300);
        assert_relative_eq!(done.needle_deg, 180.0);
        assert_relative_eq!(done.top_arc_deg, 80.0);
        assert_relative_eq!(done.right_arc_deg, 10.0);
        assert_eq!(done.readout_kmph, 180);
        assert!(g.is_settled(t0 + ms(300)));
        assert_eq!(g.readings_applied(), 1);
    }

    #[test]
    fn test_arcs_return_to_zero_below_threshold() {
        let t0 = Instant::now();
        let conv = SpeedToAngleConverter::default();
        let mut g = Gauge::new(ms(300), t0);

        g.apply(&conv.reading(100.0), t0);
        g.apply(&conv.reading(10.0), t0 + ms(300));

        let f = g.frame(t0 + ms(600), 600);
        assert_relative_eq!(f.needle_deg, 36.0);
        assert_eq!(f.top_arc_deg, 0.0);
        assert_eq!(f.right_arc_deg, 0.0);
        assert_eq!(f.readout_kmph, 36);
    }

    #[test]
    fn test_interrupted_animation_continues_from_current() {
        let t0 = Instant::now();
        let conv = SpeedToAngleConverter::default();
        let mut g = Gauge::new(ms(300), t0);

        g.apply(&conv.reading(100.0), t0); // → 240°
        // через 150 мс стрелка на 120°, новая цель 0
        g.apply(&conv.reading(0.0), t0 + ms(150));

        let f = g.frame(t0 + ms(150), 150);
        assert_relative_eq!(f.needle_deg, 120.0, epsilon = 1e-9);

        let f = g.frame(t0 + ms(300), 300);
        assert_relative_eq!(f.needle_deg, 60.0, epsilon = 1e-9);
    }

    #[test]
    fn test_extreme_negative_speed_does_not_panic() {
        let t0 = Instant::now();
        let conv = SpeedToAngleConverter::default();
        let mut g = Gauge::new(ms(300), t0);

        let reading = conv.reading(-f64::MAX);
        assert_eq!(reading.readout(), i64::MIN);

        g.apply(&reading, t0);
        let f = g.frame(t0 + ms(150), 150);
        assert!(f.readout_kmph < 0);

        // обратно к нормальной скорости
        g.apply(&conv.reading(10.0), t0 + ms(150));
        let f = g.frame(t0 + ms(450), 450);
        assert_eq!(f.readout_kmph, 36);
    }

    #[test]
    fn test_frame_display() {
        let f = GaugeFrame {
            t_ms: 1_500,
            needle_deg: 90.0,
            top_arc_deg: 0.0,
            right_arc_deg: 0.0,
            readout_kmph: 90,
        };
        let s = f.to_string();
        assert!(s.contains("90 km/h"));
        assert!(s.contains("1.5s"));
    }
}
