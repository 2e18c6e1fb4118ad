use thiserror::Error;

/// Результат для операций speedo.
pub type SpeedoResult<T> = std::result::Result<T, SpeedoError>;

/// Ошибки калибровки и формата трассы.
#[derive(Debug, Error)]
pub enum SpeedoError {
    /// Некорректная калибровка шкалы
    #[error("Invalid calibration: {0}")]
    InvalidCalibration(String),

    /// Некорректная выборка скорости (NaN, бесконечность, отрицательная)
    #[error("Invalid sample at line {line}: {reason}")]
    InvalidSample { line: u64, reason: String },

    /// Строка трассы не разбирается
    #[error("Malformed trace at line {line}: {source}")]
    MalformedTrace {
        line: u64,
        #[source]
        source: serde_json::Error,
    },

    /// Ошибки ввода/вывода (автоконвертируются из std::io::Error)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибки JSON вне построчного чтения (калибровка, кадры)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SpeedoError {
    /// Удобные конструкторы
    pub fn invalid_calibration<S: Into<String>>(s: S) -> Self {
        Self::InvalidCalibration(s.into())
    }

    pub fn invalid_sample<S: Into<String>>(
        line: u64,
        reason: S,
    ) -> Self {
        Self::InvalidSample {
            line,
            reason: reason.into(),
        }
    }
}
