//! Метаданные признаков для внешних потребителей (дашборд, обучение)

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::types::{CustomerFeatureRecord, FeatureMetadata};

/// Описания колонок customer_features.csv
fn feature_descriptions() -> BTreeMap<String, String> {
    [
        ("Recency", "Days since last purchase"),
        ("Frequency", "Number of unique invoices"),
        ("Monetary", "Total spending"),
        ("LogMonetary", "Log-transformed total spending"),
        ("AvgOrderValue", "Average order value per invoice"),
        ("ActiveMonths", "Number of active months"),
        ("Churn", "Target variable (1 = churned, 0 = active)"),
    ]
    .iter()
    .map(|(name, description)| (name.to_string(), description.to_string()))
    .collect()
}

/// Финализирует метаданные один раз после успешной агрегации.
/// При пустом наборе churn rate и дата отсчёта — null, потребители обязаны
/// проверять total_customers.
pub fn build_feature_metadata(
    features: &[CustomerFeatureRecord],
    churn_threshold_days: i64,
    reference_date: Option<NaiveDateTime>,
) -> FeatureMetadata {
    let churn_rate_percentage = if features.is_empty() {
        None
    } else {
        let churned = features.iter().filter(|f| f.churn == 1).count();
        Some(round2(churned as f64 / features.len() as f64 * 100.0))
    };

    FeatureMetadata {
        total_customers: features.len(),
        churn_rate_percentage,
        features: feature_descriptions(),
        churn_definition: format!(
            "Customer inactive for more than {} days",
            churn_threshold_days
        ),
        reference_date: reference_date.map(|d| d.date().to_string()),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
