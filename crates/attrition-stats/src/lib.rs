//! Statistical utilities for the attrition workspace.
//!
//! This crate provides the numerical building blocks shared by the data,
//! model and scoring crates:
//!
//! - **Descriptive statistics**: mean, median, variance, standard deviation
//! - **Percentiles**: interpolated percentiles and quartiles
//! - **Survival analysis**: Kaplan-Meier estimator for right-censored data,
//!   including the censoring distribution used for IPCW weighting
//! - **Integration**: composite trapezoidal rule over sampled curves
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`percentiles`]: Percentiles of sorted samples
//! - [`survival`]: Kaplan-Meier survival curves for time-to-event data
//! - [`integrate`]: Trapezoidal integration and time-normalized averages
//!
//! # Examples
//!
//! ## Analyzing survival data
//!
//! ```
//! use attrition_stats::survival::KaplanMeierCurve;
//!
//! // Data: (time, event)
//! let data = vec![
//!     (10.0, true),  // Event occurred at time 10
//!     (20.0, false), // Censored at time 20
//!     (30.0, true),  // Event occurred at time 30
//! ];
//! let curve = KaplanMeierCurve::from_data(data);
//! assert_eq!(curve.survival_at(30.0), 0.0);
//! ```
//!
//! ## Averaging a curve over time
//!
//! ```
//! use attrition_stats::integrate::time_normalized_trapezoid;
//!
//! let brier = [(1.0, 0.05), (2.0, 0.10), (4.0, 0.15)];
//! let ibs = time_normalized_trapezoid(&brier).unwrap();
//! assert!((ibs - 0.08125).abs() < 1e-12);
//! ```

pub mod descriptive;
pub mod integrate;
pub mod percentiles;
pub mod survival;
