//! Exploratory analysis of employee turnover data.
//!
//! Before any model is fitted, the report looks at the raw data in two ways:
//!
//! 1. **Dataset summary** ([`summary::DatasetSummary`]): record counts, event
//!    rate, tenure and personality score distributions, categorical level
//!    counts
//! 2. **Grouped survival** ([`survival::SurvivalStatsMap`]): Kaplan-Meier
//!    curves and medians per level of a covariate, with numeric covariates
//!    grouped into quartile bands
//!
//! Tenure is right-censored: employees still working at the end of follow-up
//! are known to have stayed at least that long. Naive means over all records
//! underestimate tenure, so every group also carries the Kaplan-Meier median.

pub mod summary;
pub mod survival;
