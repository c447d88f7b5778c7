/// Модуль предобработки данных

pub mod categorical;
pub mod cleaning;
pub mod outliers;

pub use categorical::CategoricalVocab;
pub use cleaning::run_cleaning;
pub use outliers::{iqr_bounds, quantile, IqrBounds};
