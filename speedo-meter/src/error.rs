use thiserror::Error;

pub type MeterResult<T> = std::result::Result<T, MeterError>;

#[derive(Debug, Error)]
pub enum MeterError {
    /// Источник скорости недоступен
    #[error("Location source unavailable: {0}")]
    SourceUnavailable(String),

    /// Некорректная конфигурация
    #[error("Config error: {0}")]
    Config(String),

    /// Ошибка записи кадров или трассы
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка калибровки или формата трассы
    #[error("Speedo error: {0}")]
    Speedo(#[from] speedo_core::SpeedoError),

    /// Ошибка сериализации кадра
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Ошибка пайплайна (inter-thread)
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}
