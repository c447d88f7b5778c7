/// Ошибки конвейера

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChurnError>;

#[derive(Debug, Error)]
pub enum ChurnError {
    /// Входной файл не найден, запуск прерывается до первого шага
    #[error("dataset not found: {} (place the raw csv there or pass --input)", path.display())]
    DatasetNotFound { path: PathBuf },

    /// Во входных данных нет обязательной колонки
    #[error("required column missing from input: {column}")]
    Schema { column: String },

    /// Значение не разбирается в тип своей колонки
    #[error("row {row}: cannot parse {column} value {value:?}")]
    Parse {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
