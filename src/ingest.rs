//! Загрузка и типизация сырого журнала транзакций
//!
//! Файл читается целиком, порядок строк сохраняется — результат запуска
//! детерминирован. InvoiceDate разбирается в настоящий timestamp, остальные
//! колонки остаются в сыром типе.

use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;

use crate::error::{ChurnError, Result};
use crate::types::RawTransactionRecord;

/// Обязательные колонки входного файла, в порядке исходной выгрузки
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "InvoiceNo",
    "StockCode",
    "Description",
    "Quantity",
    "InvoiceDate",
    "UnitPrice",
    "CustomerID",
    "Country",
];

/// Поддерживаемые форматы InvoiceDate (первый — формат исходной выгрузки)
const DATE_FORMATS: [&str; 3] = ["%m/%d/%Y %H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Читает сырой CSV в упорядоченный набор записей
pub fn load_transactions<P: AsRef<Path>>(path: P) -> Result<Vec<RawTransactionRecord>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ChurnError::DatasetNotFound {
            path: path.to_path_buf(),
        });
    }

    let bytes = fs::read(path)?;
    let text = decode_latin1_or_utf8(bytes);

    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();
    let columns = resolve_columns(&headers)?;

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row?;
        // строка 1 — заголовок, данные нумеруются со второй
        records.push(parse_record(&row, &columns, i + 2)?);
    }

    tracing::info!("Loaded {} rows from {}", records.len(), path.display());
    Ok(records)
}

/// Индексы обязательных колонок в заголовке файла
struct ColumnIndex {
    invoice_no: usize,
    stock_code: usize,
    description: usize,
    quantity: usize,
    invoice_date: usize,
    unit_price: usize,
    customer_id: usize,
    country: usize,
}

fn resolve_columns(headers: &csv::StringRecord) -> Result<ColumnIndex> {
    let find = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| ChurnError::Schema {
                column: name.to_string(),
            })
    };

    Ok(ColumnIndex {
        invoice_no: find("InvoiceNo")?,
        stock_code: find("StockCode")?,
        description: find("Description")?,
        quantity: find("Quantity")?,
        invoice_date: find("InvoiceDate")?,
        unit_price: find("UnitPrice")?,
        customer_id: find("CustomerID")?,
        country: find("Country")?,
    })
}

fn parse_record(
    row: &csv::StringRecord,
    columns: &ColumnIndex,
    line: usize,
) -> Result<RawTransactionRecord> {
    let field = |idx: usize| row.get(idx).unwrap_or("").trim();

    let quantity: i64 = field(columns.quantity).parse().map_err(|_| ChurnError::Parse {
        row: line,
        column: "Quantity",
        value: field(columns.quantity).to_string(),
    })?;

    let unit_price: f64 = field(columns.unit_price).parse().map_err(|_| ChurnError::Parse {
        row: line,
        column: "UnitPrice",
        value: field(columns.unit_price).to_string(),
    })?;

    let invoice_date =
        parse_invoice_date(field(columns.invoice_date)).ok_or_else(|| ChurnError::Parse {
            row: line,
            column: "InvoiceDate",
            value: field(columns.invoice_date).to_string(),
        })?;

    let customer_id = match field(columns.customer_id) {
        "" => None,
        value => Some(parse_customer_id(value).ok_or_else(|| ChurnError::Parse {
            row: line,
            column: "CustomerID",
            value: value.to_string(),
        })?),
    };

    let description = match field(columns.description) {
        "" => None,
        value => Some(value.to_string()),
    };

    Ok(RawTransactionRecord {
        invoice_no: field(columns.invoice_no).to_string(),
        stock_code: field(columns.stock_code).to_string(),
        description,
        quantity,
        invoice_date,
        unit_price,
        customer_id,
        country: field(columns.country).to_string(),
    })
}

fn parse_invoice_date(value: &str) -> Option<NaiveDateTime> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Выгрузки с float-типом колонки пишут CustomerID как "17850.0"
fn parse_customer_id(value: &str) -> Option<i64> {
    if let Ok(id) = value.parse::<i64>() {
        return Some(id);
    }
    value.parse::<f64>().ok().map(|f| f as i64)
}

/// Файл исторически в Latin-1; валидный UTF-8 проходит как есть
fn decode_latin1_or_utf8(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => err.into_bytes().iter().map(|&b| b as char).collect(),
    }
}
