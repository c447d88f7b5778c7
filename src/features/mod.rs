/// Модуль построения признаков

pub mod churn;
pub mod matrix;
pub mod metadata;
pub mod rfm;

pub use churn::{label, DEFAULT_CHURN_THRESHOLD_DAYS};
pub use matrix::{feature_matrix, MATRIX_COLUMNS};
pub use metadata::build_feature_metadata;
pub use rfm::{build_customer_features, FeatureSet};
