use serde::{Deserialize, Serialize};

use crate::{mps_to_kmph, SpeedoError, SpeedoResult};

/// Одно измерение скорости от провайдера местоположения.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedSample {
    /// Метка времени измерения (мс от начала сессии или Unix, как у источника)
    #[serde(default)]
    pub timestamp_ms: u64,
    /// Мгновенная скорость, м/с
    pub speed_mps: f64,
}

impl SpeedSample {
    pub fn new(
        timestamp_ms: u64,
        speed_mps: f64,
    ) -> Self {
        Self {
            timestamp_ms,
            speed_mps,
        }
    }

    /// Скорость в км/ч без ограничения шкалой.
    pub fn speed_kmph(&self) -> f64 {
        mps_to_kmph(self.speed_mps)
    }

    /// Проверяет, что скорость конечна и неотрицательна.
    ///
    /// `line` попадает в текст ошибки (номер строки трассы).
    pub fn validate(
        &self,
        line: u64,
    ) -> SpeedoResult<()> {
        if !self.speed_mps.is_finite() {
            return Err(SpeedoError::invalid_sample(
                line,
                format!("speed is not finite: {}", self.speed_mps),
            ));
        }

        if self.speed_mps < 0.0 {
            return Err(SpeedoError::invalid_sample(
                line,
                format!("speed is negative: {}", self.speed_mps),
            ));
        }

        Ok(())
    }
}
