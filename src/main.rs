/// Запуск конвейера очистки и построения признаков

use clap::Parser;
use std::path::PathBuf;

use churn_ml::features::{
    build_customer_features, build_feature_metadata, DEFAULT_CHURN_THRESHOLD_DAYS,
};
use churn_ml::types::{CleaningStats, FeatureMetadata};
use churn_ml::{artifacts, ingest, preprocessing};

/// Конвейер признаков оттока по журналу транзакций Online Retail
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Путь к сырому CSV журнала транзакций
    #[arg(short, long, default_value = "data/raw/online_retail.csv")]
    input: PathBuf,

    /// Каталог для артефактов запуска
    #[arg(short, long, default_value = "data/processed")]
    out_dir: PathBuf,

    /// Порог неактивности для метки оттока, дней
    #[arg(long, default_value_t = DEFAULT_CHURN_THRESHOLD_DAYS)]
    churn_threshold_days: i64,

    /// Записать профиль сырых данных рядом с входным файлом
    #[arg(long)]
    profile: bool,
}

fn main() -> anyhow::Result<()> {
    // Инициализация логирования
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    println!("Starting data cleaning pipeline...");
    let raw = ingest::load_transactions(&args.input)?;

    if args.profile {
        let profile_path = args.input.with_file_name(artifacts::DATA_PROFILE_FILE);
        artifacts::write_data_profile(&profile_path, &raw)?;
        println!("Data profile saved to {}", profile_path.display());
    }

    let (dataset, stats) = preprocessing::run_cleaning(raw);

    let feature_set = build_customer_features(&dataset.records, args.churn_threshold_days);
    let metadata = build_feature_metadata(
        &feature_set.features,
        args.churn_threshold_days,
        feature_set.reference_date,
    );

    // Артефакты пишутся одним блоком после успеха всех шагов
    artifacts::write_run_outputs(
        &args.out_dir,
        &dataset,
        &stats,
        &feature_set.features,
        &metadata,
    )?;

    print_cleaning_summary(&stats);
    print_feature_summary(&metadata);
    println!("\nPipeline completed successfully!");

    Ok(())
}

fn print_cleaning_summary(stats: &CleaningStats) {
    println!("\nDATA CLEANING SUMMARY");
    println!("{}", "=".repeat(50));
    println!("Original rows: {}", stats.original_rows);
    println!("Cleaned rows: {}", stats.rows_after_cleaning);
    println!("Rows removed: {}", stats.rows_removed);
    println!("Retention rate: {}%", stats.retention_rate);
    println!("{}", "=".repeat(50));
}

fn print_feature_summary(metadata: &FeatureMetadata) {
    println!("\nFEATURE ENGINEERING SUMMARY");
    println!("{}", "=".repeat(50));
    println!("Total customers: {}", metadata.total_customers);
    match metadata.churn_rate_percentage {
        Some(rate) => println!("Churn rate: {}%", rate),
        None => println!("Churn rate: undefined (no customers)"),
    }
    println!("{}", "=".repeat(50));
}
