//! Cox proportional-hazards regression.
//!
//! The hazard of subject `i` is `h0(t) * exp(beta . (x_i - mean))`. The
//! coefficients maximize the Breslow partial log-likelihood (with an optional
//! ridge penalty `penalizer / 2 * |beta|^2`) by Newton-Raphson with step
//! halving. The baseline cumulative hazard `H0` is the Breslow estimator at
//! the fitted coefficients, so the predicted survival is
//! `S(t | x) = exp(-H0(t) * exp(beta . (x - mean)))`.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::{FitError, cholesky::CholeskyFactor};

const MAX_STEP_HALVINGS: usize = 30;

/// Optimizer settings for [`CoxModel::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoxParams {
    /// Ridge penalty strength. Zero fits the plain partial likelihood.
    pub penalizer: f64,
    pub max_iterations: usize,
    /// Convergence threshold on the change of the penalized log-likelihood.
    pub tolerance: f64,
}

impl Default for CoxParams {
    fn default() -> Self {
        Self {
            penalizer: 0.01,
            max_iterations: 50,
            tolerance: 1e-9,
        }
    }
}

/// Breslow estimate of the baseline cumulative hazard, a right-continuous
/// step function over the distinct event times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineHazard {
    pub times: Vec<f64>,
    pub cumulative_hazard: Vec<f64>,
}

impl BaselineHazard {
    #[must_use]
    pub fn at(&self, time: f64) -> f64 {
        let idx = self.times.partition_point(|&t| t <= time);
        if idx == 0 {
            0.0
        } else {
            self.cumulative_hazard[idx - 1]
        }
    }
}

/// A fitted Cox proportional-hazards model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoxModel {
    pub coefficients: Array1<f64>,
    pub standard_errors: Array1<f64>,
    /// Training feature means; features are centred before use.
    pub means: Array1<f64>,
    pub baseline: BaselineHazard,
    /// Penalized partial log-likelihood at the fitted coefficients.
    pub log_likelihood: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Sufficient statistics of one pass over the risk sets.
struct RiskSetPass {
    log_likelihood: f64,
    gradient: Array1<f64>,
    /// Negative Hessian of the penalized log-likelihood.
    information: Array2<f64>,
    /// `(event time, events / S0)` pairs in descending time order.
    hazard_increments: Vec<(f64, f64)>,
}

impl CoxModel {
    /// Fits the model to encoded features and `(time, event)` observations.
    pub fn fit(
        features: &[Vec<f64>],
        observations: &[(f64, bool)],
        params: &CoxParams,
    ) -> Result<Self, FitError> {
        let n_features = crate::check_training_data(features, observations)?;

        let design = Array2::from_shape_fn((features.len(), n_features), |(i, j)| features[i][j]);
        let means = design.mean_axis(Axis(0)).ok_or(FitError::NoSamples)?;
        let centred = &design - &means;

        let mut order = (0..observations.len()).collect::<Vec<_>>();
        order.sort_by(|&a, &b| observations[b].0.total_cmp(&observations[a].0));

        let evaluate = |beta: &Array1<f64>| {
            risk_set_pass(&centred, observations, &order, beta, params.penalizer)
        };

        let mut beta = Array1::zeros(n_features);
        let mut pass = evaluate(&beta);
        let mut iterations = 0;
        let mut converged = false;

        while iterations < params.max_iterations {
            iterations += 1;

            let step = CholeskyFactor::new(&pass.information)
                .ok_or(FitError::SingularInformation { iteration: iterations })?
                .solve_vec(&pass.gradient);

            let mut scale = 1.0;
            let mut accepted = None;
            for _ in 0..MAX_STEP_HALVINGS {
                let mut candidate = beta.clone();
                candidate.scaled_add(scale, &step);
                let candidate_pass = evaluate(&candidate);
                if candidate_pass.log_likelihood.is_finite()
                    && candidate_pass.log_likelihood >= pass.log_likelihood - params.tolerance
                {
                    accepted = Some((candidate, candidate_pass));
                    break;
                }
                scale /= 2.0;
            }

            let Some((next_beta, next_pass)) = accepted else {
                log::warn!("Cox fit: no improving step found at iteration {iterations}");
                break;
            };

            let change = next_pass.log_likelihood - pass.log_likelihood;
            log::debug!(
                "Cox iteration {iterations}: log-likelihood {:.6} (change {change:.3e}, step scale {scale})",
                next_pass.log_likelihood
            );
            beta = next_beta;
            pass = next_pass;

            if change.abs() < params.tolerance {
                converged = true;
                break;
            }
        }

        if !converged {
            log::warn!("Cox fit did not converge after {iterations} iterations");
        }

        let standard_errors = CholeskyFactor::new(&pass.information)
            .ok_or(FitError::SingularInformation { iteration: iterations })?
            .inverse_diagonal()
            .mapv(f64::sqrt);

        let mut cumulative = 0.0;
        let (times, cumulative_hazard) = pass
            .hazard_increments
            .iter()
            .rev()
            .map(|&(t, increment)| {
                cumulative += increment;
                (t, cumulative)
            })
            .unzip();

        log::info!(
            "Fitted Cox model on {} subjects, {n_features} features (log-likelihood {:.4}, {iterations} iterations)",
            observations.len(),
            pass.log_likelihood
        );

        Ok(Self {
            coefficients: beta,
            standard_errors,
            means,
            baseline: BaselineHazard {
                times,
                cumulative_hazard,
            },
            log_likelihood: pass.log_likelihood,
            iterations,
            converged,
        })
    }

    /// Returns `beta . (x - mean)`.
    #[must_use]
    pub fn linear_predictor(&self, features: &[f64]) -> f64 {
        features
            .iter()
            .zip(&self.means)
            .zip(&self.coefficients)
            .map(|((x, m), b)| (x - m) * b)
            .sum()
    }

    /// Hazard ratio `exp(beta_j)` for each feature.
    #[must_use]
    pub fn hazard_ratios(&self) -> Array1<f64> {
        self.coefficients.mapv(f64::exp)
    }

    /// Predicted survival probability at each of `times`.
    #[must_use]
    pub fn survival_function(&self, features: &[f64], times: &[f64]) -> Vec<f64> {
        let relative_risk = self.linear_predictor(features).exp();
        times
            .iter()
            .map(|&t| (-self.baseline.at(t) * relative_risk).exp())
            .collect()
    }
}

fn outer(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> Array2<f64> {
    a.insert_axis(Axis(1)).dot(&b.insert_axis(Axis(0)))
}

/// Accumulates the partial likelihood, its gradient and information matrix
/// over risk sets, walking subjects from the latest time to the earliest.
#[expect(clippy::cast_precision_loss)]
fn risk_set_pass(
    features: &Array2<f64>,
    observations: &[(f64, bool)],
    descending_order: &[usize],
    beta: &Array1<f64>,
    penalizer: f64,
) -> RiskSetPass {
    let p = beta.len();
    let eta = features.dot(beta);

    let mut s0 = 0.0;
    let mut s1 = Array1::<f64>::zeros(p);
    let mut s2 = Array2::<f64>::zeros((p, p));

    let mut log_likelihood = 0.0;
    let mut gradient = Array1::<f64>::zeros(p);
    let mut information = Array2::<f64>::zeros((p, p));
    let mut hazard_increments = vec![];

    let mut i = 0;
    while i < descending_order.len() {
        let time = observations[descending_order[i]].0;
        let mut j = i;
        let mut events = 0usize;
        while j < descending_order.len() && observations[descending_order[j]].0 == time {
            let idx = descending_order[j];
            let x = features.row(idx);
            let w = eta[idx].exp();
            s0 += w;
            s1.scaled_add(w, &x);
            s2.scaled_add(w, &outer(x, x));
            if observations[idx].1 {
                events += 1;
                log_likelihood += eta[idx];
                gradient += &x;
            }
            j += 1;
        }

        if events > 0 {
            let d = events as f64;
            log_likelihood -= d * s0.ln();
            let mean = &s1 / s0;
            gradient.scaled_add(-d, &mean);
            let covariance = &s2 / s0 - outer(mean.view(), mean.view());
            information.scaled_add(d, &covariance);
            hazard_increments.push((time, d / s0));
        }

        i = j;
    }

    log_likelihood -= 0.5 * penalizer * beta.dot(beta);
    gradient.scaled_add(-penalizer, beta);
    information.diag_mut().map_inplace(|v| *v += penalizer);

    RiskSetPass {
        log_likelihood,
        gradient,
        information,
        hazard_increments,
    }
}
