use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{SpeedoError, SpeedoResult};

/// Верхний предел шкалы спидометра, км/ч.
pub const DEFAULT_MAX_SPEED_KMPH: f64 = 240.0;

/// Поворот стрелки на верхнем пределе шкалы, градусы.
pub const DEFAULT_MAX_ROTATION_DEG: f64 = 240.0;

/// Порог включения верхней декоративной дуги, км/ч.
pub const DEFAULT_TOP_ZONE_THRESHOLD_KMPH: f64 = 80.0;

/// Смещение верхней дуги относительно стрелки, градусы.
pub const DEFAULT_TOP_ZONE_OFFSET_DEG: f64 = 100.0;

/// Порог включения правой декоративной дуги, км/ч.
pub const DEFAULT_RIGHT_ZONE_THRESHOLD_KMPH: f64 = 145.0;

/// Смещение правой дуги относительно стрелки, градусы.
pub const DEFAULT_RIGHT_ZONE_OFFSET_DEG: f64 = 170.0;

/// Калибровка шкалы: предел скорости, угол поворота и пороги зон.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Предел шкалы, км/ч (выше: стрелка упирается)
    pub max_speed_kmph: f64,
    /// Угол стрелки на пределе шкалы, градусы
    pub max_rotation_deg: f64,
    /// Верхняя дуга активна при скорости строго выше порога
    pub top_zone_threshold_kmph: f64,
    pub top_zone_offset_deg: f64,
    /// Правая дуга активна при скорости строго выше порога
    pub right_zone_threshold_kmph: f64,
    pub right_zone_offset_deg: f64,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Calibration {
    /// Градусов поворота на 1 км/ч.
    pub fn degrees_per_kmph(&self) -> f64 {
        self.max_rotation_deg / self.max_speed_kmph
    }

    /// Проверяет согласованность констант.
    pub fn validate(&self) -> SpeedoResult<()> {
        let fields = [
            ("max_speed_kmph", self.max_speed_kmph),
            ("max_rotation_deg", self.max_rotation_deg),
            ("top_zone_threshold_kmph", self.top_zone_threshold_kmph),
            ("top_zone_offset_deg", self.top_zone_offset_deg),
            ("right_zone_threshold_kmph", self.right_zone_threshold_kmph),
            ("right_zone_offset_deg", self.right_zone_offset_deg),
        ];

        for (name, v) in fields {
            if !v.is_finite() {
                return Err(SpeedoError::invalid_calibration(format!(
                    "{name} must be finite, got {v}"
                )));
            }
        }

        if self.max_speed_kmph <= 0.0 {
            return Err(SpeedoError::invalid_calibration(format!(
                "max_speed_kmph must be > 0, got {}",
                self.max_speed_kmph
            )));
        }

        if self.max_rotation_deg <= 0.0 {
            return Err(SpeedoError::invalid_calibration(format!(
                "max_rotation_deg must be > 0, got {}",
                self.max_rotation_deg
            )));
        }

        for (name, t) in [
            ("top_zone_threshold_kmph", self.top_zone_threshold_kmph),
            ("right_zone_threshold_kmph", self.right_zone_threshold_kmph),
        ] {
            if t < 0.0 || t > self.max_speed_kmph {
                return Err(SpeedoError::invalid_calibration(format!(
                    "{name} {t} is outside the scale [0, {}]",
                    self.max_speed_kmph
                )));
            }
        }

        Ok(())
    }

    /// Разбирает калибровку из JSON. Отсутствующие поля берутся по умолчанию.
    pub fn from_json_str(s: &str) -> SpeedoResult<Self> {
        let cal: Calibration = serde_json::from_str(s)?;
        cal.validate()?;
        Ok(cal)
    }

    /// Загружает калибровку из JSON файла.
    pub fn load<P: AsRef<Path>>(path: P) -> SpeedoResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            max_speed_kmph: DEFAULT_MAX_SPEED_KMPH,
            max_rotation_deg: DEFAULT_MAX_ROTATION_DEG,
            top_zone_threshold_kmph: DEFAULT_TOP_ZONE_THRESHOLD_KMPH,
            top_zone_offset_deg: DEFAULT_TOP_ZONE_OFFSET_DEG,
            right_zone_threshold_kmph: DEFAULT_RIGHT_ZONE_THRESHOLD_KMPH,
            right_zone_offset_deg: DEFAULT_RIGHT_ZONE_OFFSET_DEG,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::io::Write;

    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_default_is_valid() {
        let cal = Calibration::default();
        cal.validate().unwrap();
        assert_relative_eq!(cal.degrees_per_kmph(), 1.0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cal = Calibration::from_json_str(r#"{"max_speed_kmph": 200.0}"#).unwrap();
        assert_eq!(cal.max_speed_kmph, 200.0);
        assert_eq!(cal.max_rotation_deg, DEFAULT_MAX_ROTATION_DEG);
        assert_eq!(cal.right_zone_offset_deg, DEFAULT_RIGHT_ZONE_OFFSET_DEG);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Calibration::from_json_str(r#"{"max_speed_kmph": 0.0}"#).is_err());
        assert!(Calibration::from_json_str(r#"{"max_rotation_deg": -10.0}"#).is_err());
        // порог зоны за пределами шкалы
        assert!(Calibration::from_json_str(
            r#"{"max_speed_kmph": 100.0, "right_zone_threshold_kmph": 145.0}"#
        )
        .is_err());
        assert!(Calibration::from_json_str("not json").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, r#"{{"max_speed_kmph": 180.0, "max_rotation_deg": 270.0}}"#).unwrap();

        let cal = Calibration::load(tmp.path()).unwrap();
        assert_relative_eq!(cal.degrees_per_kmph(), 1.5);
    }
}
