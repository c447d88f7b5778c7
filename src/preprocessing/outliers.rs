//! Фильтр выбросов по межквартильному размаху (IQR)

use serde::{Deserialize, Serialize};

use crate::types::{RawTransactionRecord, StageReport};

/// Множитель IQR для границ выбросов
pub const IQR_THRESHOLD: f64 = 1.5;

/// Границы допустимых значений одной числовой колонки
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    /// Границы включительные с обеих сторон
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Квантиль с линейной интерполяцией между соседними значениями
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    interpolate(&sorted, q)
}

fn interpolate(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Границы выбросов колонки: [Q1 - 1.5*IQR, Q3 + 1.5*IQR]
pub fn iqr_bounds(values: &[f64]) -> Option<IqrBounds> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let q1 = interpolate(&sorted, 0.25)?;
    let q3 = interpolate(&sorted, 0.75)?;
    let iqr = q3 - q1;

    Some(IqrBounds {
        q1,
        q3,
        lower: q1 - IQR_THRESHOLD * iqr,
        upper: q3 + IQR_THRESHOLD * iqr,
    })
}

/// Последовательный фильтр выбросов: сначала Quantity, затем UnitPrice.
/// Границы UnitPrice считаются по уже суженному набору, поэтому порядок
/// колонок значим и зафиксирован.
pub fn remove_outliers(rows: Vec<RawTransactionRecord>) -> (Vec<RawTransactionRecord>, StageReport) {
    let initial_rows = rows.len();

    // 1. Quantity
    let quantity_values: Vec<f64> = rows.iter().map(|r| r.quantity as f64).collect();
    let quantity_bounds = iqr_bounds(&quantity_values);
    let rows: Vec<RawTransactionRecord> = match quantity_bounds {
        Some(bounds) => rows
            .into_iter()
            .filter(|r| bounds.contains(r.quantity as f64))
            .collect(),
        None => rows,
    };

    // 2. UnitPrice, по набору после фильтра Quantity
    let price_values: Vec<f64> = rows.iter().map(|r| r.unit_price).collect();
    let price_bounds = iqr_bounds(&price_values);
    let rows: Vec<RawTransactionRecord> = match price_bounds {
        Some(bounds) => rows
            .into_iter()
            .filter(|r| bounds.contains(r.unit_price))
            .collect(),
        None => rows,
    };

    let report = StageReport::new("remove_outliers", initial_rows - rows.len())
        .with_parameter("method", serde_json::json!("IQR"))
        .with_parameter("threshold", serde_json::json!(IQR_THRESHOLD))
        .with_parameter(
            "quantity_bounds",
            serde_json::to_value(quantity_bounds).unwrap_or(serde_json::Value::Null),
        )
        .with_parameter(
            "unit_price_bounds",
            serde_json::to_value(price_bounds).unwrap_or(serde_json::Value::Null),
        );

    (rows, report)
}
