//! Survival records for the employee turnover analysis.
//!
//! - [`record`]: the record, covariate and schema types
//! - [`dataset`]: CSV loading with validation and deduplication
//! - [`encoding`]: one-hot feature encoding for model fitting
//! - [`split`]: stratified train/test partitioning
//!
//! # Example
//!
//! ```no_run
//! use attrition_data::{dataset::Dataset, encoding::FeatureEncoder, split::stratified_split};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let dataset = Dataset::from_csv_path("turnover.csv")?;
//! let split = stratified_split(&dataset.records, 0.2, 42)?;
//! let encoder = FeatureEncoder::fit(&split.train)?;
//! println!("{} features: {:?}", encoder.n_features(), encoder.feature_names());
//! # Ok(())
//! # }
//! ```

pub mod dataset;
pub mod encoding;
pub mod record;
pub mod split;
