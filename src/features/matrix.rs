//! Экспорт признаков в матрицу для шага обучения модели

use ndarray::{Array1, Array2};

use crate::types::CustomerFeatureRecord;

/// Колонки матрицы признаков, в порядке заполнения.
/// Monetary входит в лог-форме, сырая колонка опускается.
pub const MATRIX_COLUMNS: [&str; 5] = [
    "Recency",
    "Frequency",
    "LogMonetary",
    "AvgOrderValue",
    "ActiveMonths",
];

/// Матрица признаков X и вектор меток y для внешнего шага обучения
pub fn feature_matrix(features: &[CustomerFeatureRecord]) -> (Array2<f64>, Array1<f64>) {
    let n_samples = features.len();
    let mut matrix = Array2::zeros((n_samples, MATRIX_COLUMNS.len()));
    let mut targets = Array1::zeros(n_samples);

    for (i, f) in features.iter().enumerate() {
        matrix[[i, 0]] = f.recency as f64;
        matrix[[i, 1]] = f.frequency as f64;
        matrix[[i, 2]] = f.log_monetary;
        matrix[[i, 3]] = f.avg_order_value;
        matrix[[i, 4]] = f.active_months as f64;
        targets[i] = f.churn as f64;
    }

    (matrix, targets)
}
