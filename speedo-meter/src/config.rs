use std::path::PathBuf;

use speedo_core::{Calibration, DEFAULT_ANIMATION_MS};

use crate::{MeterError, MeterResult};

/// Источник скорости (выбор при старте).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// Встроенный симулятор поездки (не требует GPS).
    Simulated,
    /// Воспроизведение записанной трассы (JSON Lines).
    Trace,
}

/// Формат вывода кадров шкалы.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Строка на кадр, для человека.
    Text,
    /// JSON объект на кадр.
    Json,
}

/// Полная конфигурация сессии спидометра.
#[derive(Debug, Clone)]
pub struct MeterConfig {
    /// Источник скорости
    pub source: SourceKind,
    /// Путь к трассе (для `SourceKind::Trace`)
    pub trace_path: Option<PathBuf>,
    /// Множитель скорости воспроизведения трассы
    pub replay_speed: f64,
    /// Зациклить трассу
    pub loop_trace: bool,
    /// Интервал опроса местоположения (мс)
    pub poll_interval_ms: u64,
    /// Интервал вывода кадров (мс)
    pub frame_interval_ms: u64,
    /// Длительность анимации элементов шкалы (мс)
    pub animation_ms: u64,
    /// Ограничение по времени (None = до Ctrl+C или конца трассы)
    pub duration_secs: Option<u64>,
    /// Калибровка шкалы
    pub calibration: Calibration,
    /// Формат кадров
    pub output_format: OutputFormat,
    /// Файл для кадров (None = stdout)
    pub output_path: Option<PathBuf>,
    /// Записывать входящие выборки в трассу
    pub record_path: Option<PathBuf>,
    /// Ёмкость канала между провайдером и отрисовкой (пакеты)
    pub channel_capacity: usize,
    /// Интервал вывода статистики (секунды)
    pub stats_interval_secs: u64,
    /// Зерно генератора шума симулятора (None = случайное)
    pub seed: Option<u64>,
    /// Амплитуда шума симулятора, м/с
    pub jitter_mps: f64,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl MeterConfig {
    /// Проверяет согласованность параметров.
    pub fn validate(&self) -> MeterResult<()> {
        if self.source == SourceKind::Trace && self.trace_path.is_none() {
            return Err(MeterError::Config(
                "trace source requires --trace <path>".to_string(),
            ));
        }

        if !self.replay_speed.is_finite() || self.replay_speed <= 0.0 {
            return Err(MeterError::Config(format!(
                "replay speed must be > 0, got {}",
                self.replay_speed
            )));
        }

        if self.poll_interval_ms == 0 {
            return Err(MeterError::Config("poll interval must be > 0".to_string()));
        }

        if self.frame_interval_ms == 0 {
            return Err(MeterError::Config("frame interval must be > 0".to_string()));
        }

        if self.channel_capacity == 0 {
            return Err(MeterError::Config("channel capacity must be > 0".to_string()));
        }

        if !self.jitter_mps.is_finite() || self.jitter_mps < 0.0 {
            return Err(MeterError::Config(format!(
                "jitter must be >= 0, got {}",
                self.jitter_mps
            )));
        }

        self.calibration.validate()?;

        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для SourceKind, OutputFormat, MeterConfig
////////////////////////////////////////////////////////////////////////////////

impl std::fmt::Display for SourceKind {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            SourceKind::Simulated => write!(f, "sim"),
            SourceKind::Trace => write!(f, "trace"),
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sim" | "simulated" => Ok(SourceKind::Simulated),
            "trace" | "replay" | "file" => Ok(SourceKind::Trace),
            _ => Err(format!("Unknown source: '{s}'. Use: sim, trace")),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" | "jsonl" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: '{s}'. Use: text, json")),
        }
    }
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Simulated,
            trace_path: None,
            replay_speed: 1.0,
            loop_trace: false,
            poll_interval_ms: 500,
            frame_interval_ms: 50,
            animation_ms: DEFAULT_ANIMATION_MS,
            duration_secs: None,
            calibration: Calibration::default(),
            output_format: OutputFormat::Text,
            output_path: None,
            record_path: None,
            channel_capacity: 16,
            stats_interval_secs: 5,
            seed: None,
            jitter_mps: 0.0,
        }
    }
}

/// Парсит строку интервала в миллисекунды.
///
/// Поддерживает суффиксы: `ms`, `s` (регистронезависимо). Без суффикса
/// значение в миллисекундах.
///
/// # Примеры
/// ```
/// use speedo_meter::config::parse_interval_ms;
/// assert_eq!(parse_interval_ms("500ms").unwrap(), 500);
/// assert_eq!(parse_interval_ms("0.5s").unwrap(), 500);
/// assert_eq!(parse_interval_ms("250").unwrap(), 250);
/// ```
pub fn parse_interval_ms(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let lower = s.to_lowercase();

    let (num_str, mult) = if let Some(v) = lower.strip_suffix("ms") {
        (v.trim(), 1_f64)
    } else if let Some(v) = lower.strip_suffix('s') {
        (v.trim(), 1_000_f64)
    } else {
        // Без суффикса: миллисекунды
        return s
            .parse::<u64>()
            .map_err(|e| format!("Invalid interval '{s}': {e}"));
    };

    let n: f64 = num_str
        .parse()
        .map_err(|e| format!("Invalid interval value '{num_str}': {e}"))?;

    if !n.is_finite() || n < 0.0 {
        return Err(format!("Interval must be a non-negative number: '{s}'"));
    }

    Ok((n * mult).round() as u64)
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval_ms() {
        assert_eq!(parse_interval_ms("500ms").unwrap(), 500);
        assert_eq!(parse_interval_ms("0.5s").unwrap(), 500);
        assert_eq!(parse_interval_ms("2S").unwrap(), 2_000);
        assert_eq!(parse_interval_ms(" 300 ").unwrap(), 300);
        assert!(parse_interval_ms("abc").is_err());
        assert!(parse_interval_ms("-1s").is_err());
    }

    #[test]
    fn test_source_kind_fromstr() {
        assert_eq!("sim".parse::<SourceKind>().unwrap(), SourceKind::Simulated);
        assert_eq!("trace".parse::<SourceKind>().unwrap(), SourceKind::Trace);
        assert!("gps".parse::<SourceKind>().is_err());
        assert_eq!(SourceKind::Trace.to_string(), "trace");
    }

    #[test]
    fn test_output_format_fromstr() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        let cfg = MeterConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.poll_interval_ms, 500);
        assert_eq!(cfg.animation_ms, 300);
    }

    #[test]
    fn test_validate_rejects_inconsistent_config() {
        let cfg = MeterConfig {
            source: SourceKind::Trace,
            ..MeterConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = MeterConfig {
            replay_speed: 0.0,
            ..MeterConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = MeterConfig {
            frame_interval_ms: 0,
            ..MeterConfig::default()
        };
        assert!(cfg.validate().is_err());

        let mut cfg = MeterConfig::default();
        cfg.calibration.max_speed_kmph = -1.0;
        assert!(matches!(cfg.validate(), Err(MeterError::Speedo(_))));
    }
}
