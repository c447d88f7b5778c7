/// Типы данных конвейера очистки и признаков

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::preprocessing::CategoricalVocab;

/// Сырая строка журнала транзакций (одна строка входного CSV)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTransactionRecord {
    pub invoice_no: String,
    pub stock_code: String,
    pub description: Option<String>,
    pub quantity: i64,
    pub invoice_date: NaiveDateTime,
    pub unit_price: f64,
    pub customer_id: Option<i64>,
    pub country: String,
}

/// Строка после добавления производных колонок (типы ещё сырые)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedTransactionRecord {
    pub invoice_no: String,
    pub stock_code: String,
    pub description: Option<String>,
    pub quantity: i64,
    pub invoice_date: NaiveDateTime,
    pub unit_price: f64,
    pub customer_id: Option<i64>,
    pub country: String,
    pub total_price: f64,
    pub year: i32,
    pub month: u32,
    pub day_of_week: u32,
    pub hour: u32,
}

/// Очищенная транзакция: CustomerID не null, категории закодированы
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanedTransactionRecord {
    pub invoice_no: String,
    /// Код в словаре stock_codes набора данных
    pub stock_code: u32,
    pub description: String,
    pub quantity: i64,
    pub invoice_date: NaiveDateTime,
    pub unit_price: f64,
    pub customer_id: i64,
    /// Код в словаре countries набора данных
    pub country: u32,
    pub total_price: f64,
    pub year: i32,
    pub month: u32,
    pub day_of_week: u32,
    pub hour: u32,
}

/// Результат очистки: записи + словари категориальных колонок
#[derive(Debug, Clone, Default)]
pub struct CleanedDataset {
    pub records: Vec<CleanedTransactionRecord>,
    pub stock_codes: CategoricalVocab,
    pub countries: CategoricalVocab,
}

impl CleanedDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Признаки одного клиента (одна строка customer_features.csv)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerFeatureRecord {
    pub customer_id: i64,
    pub recency: i64,
    pub frequency: usize,
    pub monetary: f64,
    pub avg_order_value: f64,
    pub active_months: usize,
    pub churn: u8,
    pub log_monetary: f64,
}

/// Запись аудита одного шага очистки
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub step: String,
    pub rows_removed: usize,
    /// Параметры шага (границы выбросов, добавленные колонки и т.п.)
    #[serde(flatten)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

impl StageReport {
    pub fn new(step: &str, rows_removed: usize) -> Self {
        Self {
            step: step.to_string(),
            rows_removed,
            parameters: serde_json::Map::new(),
        }
    }

    pub fn with_parameter(mut self, key: &str, value: serde_json::Value) -> Self {
        self.parameters.insert(key.to_string(), value);
        self
    }
}

/// Итоговая статистика очистки (cleaning_statistics.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningStats {
    pub original_rows: usize,
    pub rows_after_cleaning: usize,
    pub rows_removed: usize,
    /// Доля сохранённых строк в процентах, 2 знака
    pub retention_rate: f64,
    pub missing_values_before: BTreeMap<String, usize>,
    pub missing_values_after: BTreeMap<String, usize>,
    pub steps_applied: Vec<StageReport>,
}

/// Метаданные признаков (feature_metadata.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureMetadata {
    pub total_customers: usize,
    /// None (null в JSON), если клиентов нет
    pub churn_rate_percentage: Option<f64>,
    pub features: BTreeMap<String, String>,
    pub churn_definition: String,
    /// Дата последней транзакции очищенного набора (ISO), None если записей нет
    pub reference_date: Option<String>,
}
