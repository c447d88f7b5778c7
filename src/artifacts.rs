//! Запись артефактов запуска
//!
//! Четыре артефакта — очищенные транзакции, признаки клиентов и два
//! JSON-сайдкара — пишутся только после успешного завершения всех шагов.
//! Каждый файл сначала пишется во временный файл рядом с целевым и затем
//! переименовывается, так что упавшая запись не оставляет частичного файла.

use std::fs;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;
use crate::ingest::REQUIRED_COLUMNS;
use crate::preprocessing::cleaning::DERIVED_COLUMNS;
use crate::types::{
    CleanedDataset, CleaningStats, CustomerFeatureRecord, FeatureMetadata, RawTransactionRecord,
};

pub const CLEANED_TRANSACTIONS_FILE: &str = "cleaned_transactions.csv";
pub const CUSTOMER_FEATURES_FILE: &str = "customer_features.csv";
pub const CLEANING_STATS_FILE: &str = "cleaning_statistics.json";
pub const FEATURE_METADATA_FILE: &str = "feature_metadata.json";
pub const DATA_PROFILE_FILE: &str = "data_profile.txt";

/// Колонки customer_features.csv — контракт с шагом обучения
pub const FEATURE_COLUMNS: [&str; 8] = [
    "CustomerID",
    "Recency",
    "Frequency",
    "Monetary",
    "AvgOrderValue",
    "ActiveMonths",
    "Churn",
    "LogMonetary",
];

/// Пишет все артефакты запуска в каталог out_dir
pub fn write_run_outputs(
    out_dir: &Path,
    dataset: &CleanedDataset,
    stats: &CleaningStats,
    features: &[CustomerFeatureRecord],
    metadata: &FeatureMetadata,
) -> Result<()> {
    fs::create_dir_all(out_dir)?;

    write_cleaned_transactions(&out_dir.join(CLEANED_TRANSACTIONS_FILE), dataset)?;
    write_customer_features(&out_dir.join(CUSTOMER_FEATURES_FILE), features)?;
    write_json(&out_dir.join(CLEANING_STATS_FILE), stats)?;
    write_json(&out_dir.join(FEATURE_METADATA_FILE), metadata)?;

    tracing::info!("Artifacts written to {}", out_dir.display());
    Ok(())
}

fn write_cleaned_transactions(path: &Path, dataset: &CleanedDataset) -> Result<()> {
    let tmp = tmp_path(path);
    let mut writer = csv::Writer::from_path(&tmp)?;

    let header: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .chain(DERIVED_COLUMNS.iter())
        .copied()
        .collect();
    writer.write_record(&header)?;

    for r in &dataset.records {
        writer.write_record(&[
            r.invoice_no.clone(),
            dataset.stock_codes.value(r.stock_code).unwrap_or("").to_string(),
            r.description.clone(),
            r.quantity.to_string(),
            r.invoice_date.format("%Y-%m-%d %H:%M:%S").to_string(),
            r.unit_price.to_string(),
            r.customer_id.to_string(),
            dataset.countries.value(r.country).unwrap_or("").to_string(),
            r.total_price.to_string(),
            r.year.to_string(),
            r.month.to_string(),
            r.day_of_week.to_string(),
            r.hour.to_string(),
        ])?;
    }
    writer.flush()?;
    drop(writer);

    fs::rename(&tmp, path)?;
    Ok(())
}

fn write_customer_features(path: &Path, features: &[CustomerFeatureRecord]) -> Result<()> {
    let tmp = tmp_path(path);
    let mut writer = csv::Writer::from_path(&tmp)?;

    writer.write_record(&FEATURE_COLUMNS)?;
    for f in features {
        writer.write_record(&[
            f.customer_id.to_string(),
            f.recency.to_string(),
            f.frequency.to_string(),
            f.monetary.to_string(),
            f.avg_order_value.to_string(),
            f.active_months.to_string(),
            f.churn.to_string(),
            f.log_monetary.to_string(),
        ])?;
    }
    writer.flush()?;
    drop(writer);

    fs::rename(&tmp, path)?;
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    atomic_write(path, &bytes)
}

/// Короткий профиль сырого файла: размеры, типы колонок, первые строки
pub fn write_data_profile(path: &Path, records: &[RawTransactionRecord]) -> Result<()> {
    let mut text = String::new();
    let _ = writeln!(text, "Generated on: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(text);
    let _ = writeln!(text, "Rows: {}", records.len());
    let _ = writeln!(text, "Columns: {}", REQUIRED_COLUMNS.len());
    let _ = writeln!(text);
    let _ = writeln!(text, "Column Types:");
    let _ = writeln!(text, "InvoiceNo: string");
    let _ = writeln!(text, "StockCode: string");
    let _ = writeln!(text, "Description: string (nullable)");
    let _ = writeln!(text, "Quantity: integer");
    let _ = writeln!(text, "InvoiceDate: datetime");
    let _ = writeln!(text, "UnitPrice: float");
    let _ = writeln!(text, "CustomerID: integer (nullable)");
    let _ = writeln!(text, "Country: string");
    let _ = writeln!(text);
    let _ = writeln!(text, "Preview:");
    for r in records.iter().take(5) {
        let _ = writeln!(
            text,
            "{} | {} | {} | {} | {} | {} | {} | {}",
            r.invoice_no,
            r.stock_code,
            r.description.as_deref().unwrap_or(""),
            r.quantity,
            r.invoice_date.format("%Y-%m-%d %H:%M:%S"),
            r.unit_price,
            r.customer_id.map(|id| id.to_string()).unwrap_or_default(),
            r.country,
        );
    }

    atomic_write(path, text.as_bytes())
}

fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = tmp_path(path);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
