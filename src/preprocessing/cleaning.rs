//! Конвейер очистки транзакций
//!
//! Фиксированная последовательность шагов, каждый шаг — чистая функция
//! (рабочий набор) -> (новый набор, запись аудита). Драйвер прогоняет шаги
//! по порядку и накапливает steps_applied; порядок шагов значим и не
//! меняется. Ни один артефакт не пишется до успешного завершения всех шагов.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, Timelike};

use crate::ingest::REQUIRED_COLUMNS;
use crate::preprocessing::outliers;
use crate::preprocessing::CategoricalVocab;
use crate::types::{
    CleanedDataset, CleanedTransactionRecord, CleaningStats, EnrichedTransactionRecord,
    RawTransactionRecord, StageReport,
};

/// Колонки, добавляемые шагом add_derived_columns
pub const DERIVED_COLUMNS: [&str; 5] = ["TotalPrice", "Year", "Month", "DayOfWeek", "Hour"];

/// Прогоняет весь конвейер очистки и финализирует статистику.
/// Сумма rows_removed по шагам плюс итоговое число строк всегда равна
/// исходному числу строк.
pub fn run_cleaning(raw: Vec<RawTransactionRecord>) -> (CleanedDataset, CleaningStats) {
    let original_rows = raw.len();
    let missing_values_before = count_missing_raw(&raw);
    let mut steps_applied: Vec<StageReport> = Vec::new();

    let filter_stages: [fn(
        Vec<RawTransactionRecord>,
    ) -> (Vec<RawTransactionRecord>, StageReport); 7] = [
        remove_missing_customer_ids,
        handle_cancelled_invoices,
        handle_negative_quantities,
        handle_zero_prices,
        handle_missing_descriptions,
        outliers::remove_outliers,
        remove_duplicates,
    ];

    let mut working = raw;
    for stage in filter_stages {
        let (rows, report) = stage(working);
        tracing::info!(
            "Stage {}: removed {} rows, {} left",
            report.step,
            report.rows_removed,
            rows.len()
        );
        steps_applied.push(report);
        working = rows;
    }

    let (enriched, report) = add_derived_columns(working);
    steps_applied.push(report);

    let (dataset, report) = convert_data_types(enriched);
    tracing::info!(
        "Cleaning finished: {} of {} rows kept",
        dataset.len(),
        original_rows
    );
    steps_applied.push(report);

    let stats = finalize_stats(original_rows, missing_values_before, steps_applied, &dataset);
    (dataset, stats)
}

fn remove_missing_customer_ids(
    rows: Vec<RawTransactionRecord>,
) -> (Vec<RawTransactionRecord>, StageReport) {
    let initial_rows = rows.len();
    let rows: Vec<RawTransactionRecord> =
        rows.into_iter().filter(|r| r.customer_id.is_some()).collect();
    let report = StageReport::new("remove_missing_customer_ids", initial_rows - rows.len());
    (rows, report)
}

fn handle_cancelled_invoices(
    rows: Vec<RawTransactionRecord>,
) -> (Vec<RawTransactionRecord>, StageReport) {
    let initial_rows = rows.len();
    let rows: Vec<RawTransactionRecord> = rows
        .into_iter()
        .filter(|r| !r.invoice_no.starts_with('C'))
        .collect();
    let report = StageReport::new("handle_cancelled_invoices", initial_rows - rows.len());
    (rows, report)
}

fn handle_negative_quantities(
    rows: Vec<RawTransactionRecord>,
) -> (Vec<RawTransactionRecord>, StageReport) {
    let initial_rows = rows.len();
    let rows: Vec<RawTransactionRecord> = rows.into_iter().filter(|r| r.quantity > 0).collect();
    let report = StageReport::new("handle_negative_quantities", initial_rows - rows.len());
    (rows, report)
}

fn handle_zero_prices(
    rows: Vec<RawTransactionRecord>,
) -> (Vec<RawTransactionRecord>, StageReport) {
    let initial_rows = rows.len();
    let rows: Vec<RawTransactionRecord> =
        rows.into_iter().filter(|r| r.unit_price > 0.0).collect();
    let report = StageReport::new("handle_zero_prices", initial_rows - rows.len());
    (rows, report)
}

fn handle_missing_descriptions(
    rows: Vec<RawTransactionRecord>,
) -> (Vec<RawTransactionRecord>, StageReport) {
    let initial_rows = rows.len();
    let rows: Vec<RawTransactionRecord> =
        rows.into_iter().filter(|r| r.description.is_some()).collect();
    let report = StageReport::new("handle_missing_descriptions", initial_rows - rows.len());
    (rows, report)
}

/// Точные дубликаты: совпадение всех восьми исходных полей, остаётся первое
/// вхождение. UnitPrice сравнивается по битам.
fn remove_duplicates(rows: Vec<RawTransactionRecord>) -> (Vec<RawTransactionRecord>, StageReport) {
    let initial_rows = rows.len();
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(rows.len());

    for r in rows {
        let key = (
            r.invoice_no.clone(),
            r.stock_code.clone(),
            r.description.clone(),
            r.quantity,
            r.invoice_date,
            r.unit_price.to_bits(),
            r.customer_id,
            r.country.clone(),
        );
        if seen.insert(key) {
            kept.push(r);
        }
    }

    let report = StageReport::new("remove_duplicates", initial_rows - kept.len());
    (kept, report)
}

fn add_derived_columns(
    rows: Vec<RawTransactionRecord>,
) -> (Vec<EnrichedTransactionRecord>, StageReport) {
    let enriched: Vec<EnrichedTransactionRecord> = rows
        .into_iter()
        .map(|r| EnrichedTransactionRecord {
            total_price: r.quantity as f64 * r.unit_price,
            year: r.invoice_date.year(),
            month: r.invoice_date.month(),
            day_of_week: r.invoice_date.weekday().num_days_from_monday(),
            hour: r.invoice_date.hour(),
            invoice_no: r.invoice_no,
            stock_code: r.stock_code,
            description: r.description,
            quantity: r.quantity,
            invoice_date: r.invoice_date,
            unit_price: r.unit_price,
            customer_id: r.customer_id,
            country: r.country,
        })
        .collect();

    let report = StageReport::new("add_derived_columns", 0)
        .with_parameter("columns_added", serde_json::json!(DERIVED_COLUMNS));
    (enriched, report)
}

/// CustomerID становится обязательным i64, StockCode/Country кодируются в
/// словари. Записи с null, просочившиеся мимо ранних шагов, учитываются в
/// rows_removed, так что баланс аудита сохраняется в любом случае.
fn convert_data_types(rows: Vec<EnrichedTransactionRecord>) -> (CleanedDataset, StageReport) {
    let initial_rows = rows.len();
    let mut stock_codes = CategoricalVocab::new();
    let mut countries = CategoricalVocab::new();
    let mut records = Vec::with_capacity(rows.len());

    for r in rows {
        let (customer_id, description) = match (r.customer_id, r.description) {
            (Some(id), Some(text)) => (id, text),
            _ => continue,
        };
        records.push(CleanedTransactionRecord {
            stock_code: stock_codes.intern(&r.stock_code),
            country: countries.intern(&r.country),
            invoice_no: r.invoice_no,
            description,
            quantity: r.quantity,
            invoice_date: r.invoice_date,
            unit_price: r.unit_price,
            customer_id,
            total_price: r.total_price,
            year: r.year,
            month: r.month,
            day_of_week: r.day_of_week,
            hour: r.hour,
        });
    }

    let report = StageReport::new("convert_data_types", initial_rows - records.len())
        .with_parameter("stock_code_categories", serde_json::json!(stock_codes.len()))
        .with_parameter("country_categories", serde_json::json!(countries.len()));

    let dataset = CleanedDataset {
        records,
        stock_codes,
        countries,
    };
    (dataset, report)
}

fn count_missing_raw(rows: &[RawTransactionRecord]) -> BTreeMap<String, usize> {
    let mut missing: BTreeMap<String, usize> = REQUIRED_COLUMNS
        .iter()
        .map(|c| (c.to_string(), 0))
        .collect();
    for r in rows {
        if r.description.is_none() {
            *missing.entry("Description".to_string()).or_default() += 1;
        }
        if r.customer_id.is_none() {
            *missing.entry("CustomerID".to_string()).or_default() += 1;
        }
    }
    missing
}

/// После очистки пропусков нет по построению типов
fn cleaned_missing_map() -> BTreeMap<String, usize> {
    REQUIRED_COLUMNS
        .iter()
        .chain(DERIVED_COLUMNS.iter())
        .map(|c| (c.to_string(), 0))
        .collect()
}

fn finalize_stats(
    original_rows: usize,
    missing_values_before: BTreeMap<String, usize>,
    steps_applied: Vec<StageReport>,
    dataset: &CleanedDataset,
) -> CleaningStats {
    let rows_after_cleaning = dataset.len();
    let retention_rate = if original_rows > 0 {
        round2(rows_after_cleaning as f64 / original_rows as f64 * 100.0)
    } else {
        0.0
    };

    CleaningStats {
        original_rows,
        rows_after_cleaning,
        rows_removed: original_rows - rows_after_cleaning,
        retention_rate,
        missing_values_before,
        missing_values_after: cleaned_missing_map(),
        steps_applied,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn date(y: i32, m: u32, d: u32, hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn raw(invoice_no: &str, customer_id: Option<i64>) -> RawTransactionRecord {
        RawTransactionRecord {
            invoice_no: invoice_no.to_string(),
            stock_code: "85123A".to_string(),
            description: Some("WHITE HANGING HEART T-LIGHT HOLDER".to_string()),
            quantity: 6,
            invoice_date: date(2011, 1, 10, 10, 30),
            unit_price: 2.55,
            customer_id,
            country: "United Kingdom".to_string(),
        }
    }

    fn to_raw(dataset: &CleanedDataset) -> Vec<RawTransactionRecord> {
        dataset
            .records
            .iter()
            .map(|r| RawTransactionRecord {
                invoice_no: r.invoice_no.clone(),
                stock_code: dataset.stock_codes.value(r.stock_code).unwrap().to_string(),
                description: Some(r.description.clone()),
                quantity: r.quantity,
                invoice_date: r.invoice_date,
                unit_price: r.unit_price,
                customer_id: Some(r.customer_id),
                country: dataset.countries.value(r.country).unwrap().to_string(),
            })
            .collect()
    }

    #[test]
    fn test_removes_rows_with_missing_customer_id() {
        // Пять строк, одна без CustomerID
        let mut rows: Vec<RawTransactionRecord> =
            (1..=4).map(|i| raw(&format!("53636{}", i), Some(17850))).collect();
        rows.push(raw("536365", None));

        let (kept, report) = remove_missing_customer_ids(rows);
        assert_eq!(kept.len(), 4);
        assert_eq!(report.rows_removed, 1);
        assert_eq!(report.step, "remove_missing_customer_ids");
    }

    #[test]
    fn test_removes_cancelled_invoices() {
        let rows = vec![raw("C100", Some(17850)), raw("100", Some(17850))];
        let (kept, report) = handle_cancelled_invoices(rows);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].invoice_no, "100");
        assert_eq!(report.rows_removed, 1);
    }

    #[test]
    fn test_removes_non_positive_quantities_and_prices() {
        let mut negative_qty = raw("1", Some(1));
        negative_qty.quantity = -2;
        let mut zero_qty = raw("2", Some(1));
        zero_qty.quantity = 0;
        let ok = raw("3", Some(1));

        let (kept, report) = handle_negative_quantities(vec![negative_qty, zero_qty, ok]);
        assert_eq!(kept.len(), 1);
        assert_eq!(report.rows_removed, 2);

        let mut zero_price = raw("4", Some(1));
        zero_price.unit_price = 0.0;
        let (kept, report) = handle_zero_prices(vec![zero_price, raw("5", Some(1))]);
        assert_eq!(kept.len(), 1);
        assert_eq!(report.rows_removed, 1);
    }

    #[test]
    fn test_removes_missing_descriptions() {
        let mut no_description = raw("1", Some(1));
        no_description.description = None;
        let (kept, report) = handle_missing_descriptions(vec![no_description, raw("2", Some(1))]);
        assert_eq!(kept.len(), 1);
        assert_eq!(report.rows_removed, 1);
    }

    #[test]
    fn test_remove_duplicates_keeps_first_occurrence() {
        let duplicate = raw("1", Some(1));
        let mut other = raw("1", Some(1));
        other.quantity = 7;
        let (kept, report) = remove_duplicates(vec![duplicate.clone(), duplicate, other]);
        assert_eq!(kept.len(), 2);
        assert_eq!(report.rows_removed, 1);
        assert_eq!(kept[0].quantity, 6);
    }

    #[test]
    fn test_derived_columns_values() {
        // 2011-01-10 — понедельник
        let rows = vec![raw("1", Some(1))];
        let (enriched, report) = add_derived_columns(rows);
        let r = &enriched[0];
        assert!((r.total_price - 6.0 * 2.55).abs() < 1e-10);
        assert_eq!(r.year, 2011);
        assert_eq!(r.month, 1);
        assert_eq!(r.day_of_week, 0);
        assert_eq!(r.hour, 10);
        assert_eq!(report.rows_removed, 0);
        assert_eq!(report.parameters["columns_added"][0], "TotalPrice");
    }

    #[test]
    fn test_convert_data_types_builds_vocabularies() {
        let mut rows = vec![raw("1", Some(17850)), raw("2", Some(13047))];
        rows[1].stock_code = "71053".to_string();
        rows[1].country = "France".to_string();

        let (enriched, _) = add_derived_columns(rows);
        let (dataset, report) = convert_data_types(enriched);

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.stock_codes.len(), 2);
        assert_eq!(dataset.countries.len(), 2);
        assert_eq!(dataset.records[0].customer_id, 17850);
        assert_eq!(dataset.stock_codes.value(dataset.records[1].stock_code), Some("71053"));
        assert_eq!(report.parameters["country_categories"], 2);
    }

    #[test]
    fn test_audit_accounting_balances() {
        let mut rows: Vec<RawTransactionRecord> = Vec::new();
        for i in 0..10 {
            let mut r = raw(&format!("{}", 100 + i), Some(17850));
            r.quantity = 1 + i;
            r.unit_price = 2.0 + 0.1 * i as f64;
            rows.push(r);
        }
        rows.push(raw("C200", Some(17850)));
        rows.push(raw("201", None));
        let mut no_description = raw("202", Some(17850));
        no_description.description = None;
        rows.push(no_description);
        rows.push(rows[0].clone());

        let (dataset, stats) = run_cleaning(rows);

        let removed_by_stages: usize = stats.steps_applied.iter().map(|s| s.rows_removed).sum();
        assert_eq!(removed_by_stages + dataset.len(), stats.original_rows);
        assert_eq!(stats.rows_removed, stats.original_rows - stats.rows_after_cleaning);
        assert_eq!(stats.steps_applied.len(), 9);
        assert_eq!(stats.steps_applied[0].step, "remove_missing_customer_ids");
        assert_eq!(stats.steps_applied[0].rows_removed, 1);
        assert_eq!(stats.steps_applied[1].rows_removed, 1);
    }

    #[test]
    fn test_missing_value_counts() {
        let mut rows = vec![raw("1", Some(1)), raw("2", None), raw("3", None)];
        rows[0].description = None;

        let missing = count_missing_raw(&rows);
        assert_eq!(missing["CustomerID"], 2);
        assert_eq!(missing["Description"], 1);
        assert_eq!(missing["InvoiceNo"], 0);
        assert_eq!(missing.len(), REQUIRED_COLUMNS.len());
    }

    #[test]
    fn test_recleaning_cleaned_data_removes_nothing() {
        // Повторный прогон по уже очищенному набору — неподвижная точка
        let mut rows: Vec<RawTransactionRecord> = Vec::new();
        for i in 0..8 {
            let mut r = raw(&format!("{}", 300 + i), Some(17850 + i as i64));
            r.quantity = 1 + i;
            r.unit_price = 2.0 + 0.25 * i as f64;
            rows.push(r);
        }
        rows.push(raw("C999", Some(17850)));
        rows.push(raw("310", None));

        let (first, _) = run_cleaning(rows);
        let (second, stats) = run_cleaning(to_raw(&first));

        assert_eq!(second.len(), first.len());
        assert_eq!(stats.rows_removed, 0);
        assert!(stats.steps_applied.iter().all(|s| s.rows_removed == 0));
    }

    #[test]
    fn test_retention_rate_rounding() {
        assert_eq!(round2(1.0 / 3.0 * 100.0), 33.33);
        assert_eq!(round2(100.0), 100.0);
    }

    #[test]
    fn test_cleaning_empty_input() {
        let (dataset, stats) = run_cleaning(Vec::new());
        assert!(dataset.is_empty());
        assert_eq!(stats.original_rows, 0);
        assert_eq!(stats.retention_rate, 0.0);
        assert_eq!(stats.steps_applied.len(), 9);
    }
}
