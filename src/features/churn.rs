//! Бинарная метка оттока

/// Порог неактивности по умолчанию, дней
pub const DEFAULT_CHURN_THRESHOLD_DAYS: i64 = 90;

/// Churn = 1, если с последней покупки прошло строго больше порога.
/// Зависит только от Recency и порога.
pub fn label(recency_days: i64, threshold_days: i64) -> u8 {
    if recency_days > threshold_days {
        1
    } else {
        0
    }
}
