//! Агрегация признаков Recency/Frequency/Monetary по клиентам
//!
//! Дата среза одна на весь запуск: максимум InvoiceDate очищенного набора
//! плюс один день, поэтому Recency неотрицательна по построению. Клиенты,
//! чьи транзакции целиком отфильтрованы очисткой, записей не получают.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Duration, NaiveDateTime};

use crate::features::churn;
use crate::types::{CleanedTransactionRecord, CustomerFeatureRecord};

/// Результат агрегации: признаки и дата отсчёта (максимум InvoiceDate)
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub features: Vec<CustomerFeatureRecord>,
    pub reference_date: Option<NaiveDateTime>,
}

/// Строит по одной записи признаков на клиента очищенного набора
pub fn build_customer_features(
    records: &[CleanedTransactionRecord],
    churn_threshold_days: i64,
) -> FeatureSet {
    let reference_date = match records.iter().map(|r| r.invoice_date).max() {
        Some(date) => date,
        None => {
            return FeatureSet {
                features: Vec::new(),
                reference_date: None,
            }
        }
    };
    let snapshot_date = reference_date + Duration::days(1);

    // Группировка по клиенту; BTreeMap даёт детерминированный порядок
    let mut groups: BTreeMap<i64, Vec<&CleanedTransactionRecord>> = BTreeMap::new();
    for r in records {
        groups.entry(r.customer_id).or_default().push(r);
    }

    let mut features = Vec::with_capacity(groups.len());
    for (customer_id, rows) in groups {
        let last_purchase = rows
            .iter()
            .map(|r| r.invoice_date)
            .max()
            .unwrap_or(reference_date);
        let recency = (snapshot_date - last_purchase).num_days();

        let mut invoice_totals: HashMap<&str, f64> = HashMap::new();
        let mut active_months: BTreeSet<(i32, u32)> = BTreeSet::new();
        let mut monetary = 0.0;
        for r in &rows {
            *invoice_totals.entry(r.invoice_no.as_str()).or_default() += r.total_price;
            active_months.insert((r.year, r.month));
            monetary += r.total_price;
        }

        // Средний чек: сумма по каждому инвойсу, затем среднее по инвойсам
        let frequency = invoice_totals.len();
        let avg_order_value = invoice_totals.values().sum::<f64>() / frequency as f64;

        features.push(CustomerFeatureRecord {
            customer_id,
            recency,
            frequency,
            monetary,
            avg_order_value,
            active_months: active_months.len(),
            churn: churn::label(recency, churn_threshold_days),
            log_monetary: monetary.ln_1p(),
        });
    }

    tracing::info!("Built features for {} customers", features.len());
    FeatureSet {
        features,
        reference_date: Some(reference_date),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tx(
        customer_id: i64,
        invoice_no: &str,
        date: (i32, u32, u32),
        total_price: f64,
    ) -> CleanedTransactionRecord {
        let invoice_date = NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        CleanedTransactionRecord {
            invoice_no: invoice_no.to_string(),
            stock_code: 0,
            description: "HOLDER".to_string(),
            quantity: 1,
            invoice_date,
            unit_price: total_price,
            customer_id,
            country: 0,
            total_price,
            year: date.0,
            month: date.1,
            day_of_week: 0,
            hour: 10,
        }
    }

    #[test]
    fn test_recency_active_months_and_churn() {
        // Максимум даты по набору 2011-05-31, срез 2011-06-01
        let records = vec![
            tx(1, "100", (2011, 1, 15), 10.0),
            tx(1, "101", (2011, 3, 2), 10.0),
            tx(2, "102", (2011, 5, 31), 10.0),
        ];
        let set = build_customer_features(&records, 90);

        let c1 = &set.features[0];
        assert_eq!(c1.customer_id, 1);
        assert_eq!(c1.recency, 91);
        assert_eq!(c1.active_months, 2);
        assert_eq!(c1.churn, 1);

        let c2 = &set.features[1];
        assert_eq!(c2.recency, 1);
        assert_eq!(c2.churn, 0);

        assert_eq!(
            set.reference_date.unwrap().date(),
            NaiveDate::from_ymd_opt(2011, 5, 31).unwrap()
        );
    }

    #[test]
    fn test_monetary_and_average_order_value() {
        // Два инвойса с суммами 50 и 150
        let records = vec![
            tx(7, "200", (2011, 4, 1), 20.0),
            tx(7, "200", (2011, 4, 1), 30.0),
            tx(7, "201", (2011, 4, 20), 150.0),
        ];
        let set = build_customer_features(&records, 90);

        let c = &set.features[0];
        assert_eq!(c.frequency, 2);
        assert!((c.monetary - 200.0).abs() < 1e-10);
        assert!((c.avg_order_value - 100.0).abs() < 1e-10);
        assert!((c.log_monetary - 201.0_f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn test_frequency_counts_distinct_invoices() {
        let records = vec![
            tx(3, "300", (2011, 2, 1), 5.0),
            tx(3, "300", (2011, 2, 1), 5.0),
            tx(3, "301", (2011, 2, 2), 5.0),
        ];
        let set = build_customer_features(&records, 90);
        assert_eq!(set.features[0].frequency, 2);
    }

    #[test]
    fn test_recency_is_non_negative_and_order_deterministic() {
        let records = vec![
            tx(30, "402", (2011, 5, 1), 1.0),
            tx(10, "400", (2011, 1, 1), 1.0),
            tx(20, "401", (2011, 3, 1), 1.0),
        ];
        let set = build_customer_features(&records, 90);

        let ids: Vec<i64> = set.features.iter().map(|f| f.customer_id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
        assert!(set.features.iter().all(|f| f.recency >= 0));
    }

    #[test]
    fn test_empty_input_has_no_features() {
        let set = build_customer_features(&[], 90);
        assert!(set.features.is_empty());
        assert_eq!(set.reference_date, None);
    }
}
