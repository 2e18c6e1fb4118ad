//! Перевод скорости GPS в показания спидометра.
//!
//! Скорость в м/с → км/ч → ограничение пределом шкалы → угол стрелки.
//! Две декоративные дуги (верхняя и правая) поворачиваются вместе со
//! стрелкой со смещением, как только скорость переходит свой порог; ниже
//! порога дуга стоит в нуле.

use speedo_types::{mps_to_kmph, Calibration, SpeedSample};

/// Результат одного преобразования.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeReading {
    /// Скорость в км/ч без ограничения
    pub raw_kmph: f64,
    /// Скорость для отображения (ограничена пределом шкалы)
    pub display_kmph: f64,
    /// Угол поворота стрелки, градусы
    pub needle_angle_deg: f64,
    /// Угол верхней дуги (0 ниже порога)
    pub top_arc_deg: f64,
    /// Угол правой дуги (0 ниже порога)
    pub right_arc_deg: f64,
}

/// Преобразователь скорости в угол стрелки. Без состояния, кроме калибровки.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpeedToAngleConverter {
    calibration: Calibration,
}

impl SpeedToAngleConverter {
    pub fn new(calibration: Calibration) -> Self {
        Self { calibration }
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Возвращает `(display_kmph, needle_angle_deg)`.
    ///
    /// Отрицательная скорость не проверяется: угол получится отрицательным.
    pub fn convert(
        &self,
        speed_mps: f64,
    ) -> (f64, f64) {
        let r = self.reading(speed_mps);
        (r.display_kmph, r.needle_angle_deg)
    }

    /// Полное показание, включая декоративные дуги.
    pub fn reading(
        &self,
        speed_mps: f64,
    ) -> GaugeReading {
        let cal = &self.calibration;

        let raw_kmph = mps_to_kmph(speed_mps);
        let clamped = raw_kmph.min(cal.max_speed_kmph);

        // clamped / max_speed * max_rotation; при равных пределах множитель
        // ровно 1.0 и угол совпадает со скоростью бит в бит
        let needle_angle_deg = clamped * cal.degrees_per_kmph();

        let top_arc_deg = if clamped > cal.top_zone_threshold_kmph {
            needle_angle_deg - cal.top_zone_offset_deg
        } else {
            0.0
        };

        let right_arc_deg = if clamped > cal.right_zone_threshold_kmph {
            needle_angle_deg - cal.right_zone_offset_deg
        } else {
            0.0
        };

        GaugeReading {
            raw_kmph,
            display_kmph: clamped,
            needle_angle_deg,
            top_arc_deg,
            right_arc_deg,
        }
    }

    pub fn reading_for(
        &self,
        sample: &SpeedSample,
    ) -> GaugeReading {
        self.reading(sample.speed_mps)
    }
}

impl GaugeReading {
    /// Целое значение для цифрового табло (округление от нуля).
    pub fn readout(&self) -> i64 {
        self.display_kmph.round() as i64
    }

    /// Скорость упёрлась в предел шкалы.
    pub fn is_clamped(&self) -> bool {
        self.raw_kmph > self.display_kmph
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
