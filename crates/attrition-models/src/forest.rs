//! Random survival forest.
//!
//! Each tree is grown on a bootstrap sample of the training subjects. At every
//! node a random subset of features is examined, and for each feature a
//! handful of random thresholds; the split that maximizes the standardized
//! log-rank statistic between the two children wins. Growth stops at
//! `max_depth`, when a node is smaller than `min_samples_split`, when a node
//! has no events, or when no split leaves `min_samples_leaf` subjects on both
//! sides. Each leaf keeps the Kaplan-Meier curve of its subjects and the
//! forest predicts the mean of the leaf curves reached by a subject.

use attrition_stats::survival::KaplanMeierCurve;
use rand::{Rng as _, SeedableRng as _, seq::index};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::FitError;

/// Number of features examined at each split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// `sqrt(n_features)`, at least one.
    Sqrt,
    /// Every feature.
    All,
    /// A fixed count, clamped to the number of features.
    Count(usize),
}

impl MaxFeatures {
    #[expect(
        clippy::cast_sign_loss,
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss
    )]
    fn resolve(self, n_features: usize) -> usize {
        let count = match self {
            Self::Sqrt => (n_features as f64).sqrt().round() as usize,
            Self::All => n_features,
            Self::Count(count) => count,
        };
        count.clamp(1, n_features.max(1))
    }
}

/// Growth settings for [`SurvivalForest::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    /// Maximum depth of a tree; `None` grows until the other limits apply.
    pub max_depth: Option<usize>,
    /// Nodes with fewer subjects are not split.
    pub min_samples_split: usize,
    /// Every child of a split must keep at least this many subjects.
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    /// Random thresholds tried per feature; 0 tries every distinct value.
    pub split_candidates: usize,
    /// Draw a bootstrap sample for each tree instead of using all subjects.
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 10,
            min_samples_leaf: 5,
            max_features: MaxFeatures::Sqrt,
            split_candidates: 10,
            bootstrap: true,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        curve: KaplanMeierCurve,
    },
}

/// A single survival tree. Subjects go left when `x[feature] <= threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivalTree {
    nodes: Vec<Node>,
    root: usize,
}

impl SurvivalTree {
    fn leaf(&self, features: &[f64]) -> &KaplanMeierCurve {
        let mut node = self.root;
        loop {
            match &self.nodes[node] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                Node::Leaf { curve } => return curve,
            }
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }
}

/// An ensemble of survival trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivalForest {
    pub trees: Vec<SurvivalTree>,
    pub n_features: usize,
}

impl SurvivalForest {
    /// Grows the forest on encoded features and `(time, event)` observations.
    pub fn fit(
        features: &[Vec<f64>],
        observations: &[(f64, bool)],
        params: &ForestParams,
    ) -> Result<Self, FitError> {
        let n_features = crate::check_training_data(features, observations)?;
        if params.n_trees == 0 {
            return Err(FitError::InvalidParameter {
                name: "n_trees",
                reason: "must be at least 1",
            });
        }
        if params.min_samples_leaf == 0 {
            return Err(FitError::InvalidParameter {
                name: "min_samples_leaf",
                reason: "must be at least 1",
            });
        }

        let mtry = params.max_features.resolve(n_features);
        log::info!(
            "Growing {} survival trees on {} subjects ({n_features} features, {mtry} per split)",
            params.n_trees,
            observations.len()
        );

        let mut master = Pcg32::seed_from_u64(params.seed);
        let tree_seeds = (0..params.n_trees)
            .map(|_| master.random::<u64>())
            .collect::<Vec<_>>();

        let trees = tree_seeds
            .into_iter()
            .enumerate()
            .map(|(i, seed)| {
                let mut grower = TreeGrower {
                    features,
                    observations,
                    params,
                    mtry,
                    rng: Pcg32::seed_from_u64(seed),
                    nodes: vec![],
                };
                let n = observations.len();
                let samples = if params.bootstrap {
                    (0..n)
                        .map(|_| grower.rng.random_range(0..n))
                        .collect::<Vec<_>>()
                } else {
                    (0..n).collect()
                };
                let root = grower.grow(samples, 0);
                let tree = SurvivalTree {
                    nodes: grower.nodes,
                    root,
                };
                log::debug!(
                    "Tree {i}: {} nodes, {} leaves",
                    tree.node_count(),
                    tree.leaf_count()
                );
                tree
            })
            .collect();

        Ok(Self { trees, n_features })
    }

    /// Ensemble survival probability at each of `times`.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn survival_function(&self, features: &[f64], times: &[f64]) -> Vec<f64> {
        let mut survival = vec![0.0; times.len()];
        for tree in &self.trees {
            let curve = tree.leaf(features);
            for (s, &t) in survival.iter_mut().zip(times) {
                *s += curve.survival_at(t);
            }
        }
        let n_trees = self.trees.len() as f64;
        survival.iter_mut().for_each(|s| *s /= n_trees);
        survival
    }
}

struct TreeGrower<'a> {
    features: &'a [Vec<f64>],
    observations: &'a [(f64, bool)],
    params: &'a ForestParams,
    mtry: usize,
    rng: Pcg32,
    nodes: Vec<Node>,
}

struct CandidateSplit {
    feature: usize,
    threshold: f64,
    statistic: f64,
}

impl TreeGrower<'_> {
    /// Grows the subtree for `samples` and returns the index of its root node.
    fn grow(&mut self, mut samples: Vec<usize>, depth: usize) -> usize {
        samples.sort_by(|&a, &b| self.observations[a].0.total_cmp(&self.observations[b].0));

        let can_split = samples.len() >= self.params.min_samples_split
            && samples.len() >= 2 * self.params.min_samples_leaf
            && self.params.max_depth.is_none_or(|max| depth < max)
            && samples.iter().any(|&i| self.observations[i].1);

        let best = if can_split {
            self.best_split(&samples)
        } else {
            None
        };

        let Some(split) = best else {
            let curve =
                KaplanMeierCurve::from_data(samples.iter().map(|&i| self.observations[i]).collect());
            self.nodes.push(Node::Leaf { curve });
            return self.nodes.len() - 1;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .iter()
            .partition(|&&i| self.features[i][split.feature] <= split.threshold);
        let left = self.grow(left, depth + 1);
        let right = self.grow(right, depth + 1);
        self.nodes.push(Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        });
        self.nodes.len() - 1
    }

    /// `samples` must be sorted by observation time.
    fn best_split(&mut self, samples: &[usize]) -> Option<CandidateSplit> {
        let n_features = self.features[0].len();
        let feature_subset = index::sample(&mut self.rng, n_features, self.mtry).into_vec();

        let mut best: Option<CandidateSplit> = None;
        for feature in feature_subset {
            let mut values = samples
                .iter()
                .map(|&i| self.features[i][feature])
                .collect::<Vec<_>>();
            values.sort_by(f64::total_cmp);
            values.dedup();
            if values.len() < 2 {
                continue;
            }

            let midpoints = values
                .windows(2)
                .map(|w| (w[0] + w[1]) / 2.0)
                .collect::<Vec<_>>();
            let thresholds = if self.params.split_candidates == 0
                || midpoints.len() <= self.params.split_candidates
            {
                midpoints
            } else {
                index::sample(&mut self.rng, midpoints.len(), self.params.split_candidates)
                    .into_iter()
                    .map(|i| midpoints[i])
                    .collect()
            };

            for threshold in thresholds {
                let goes_left = samples
                    .iter()
                    .map(|&i| self.features[i][feature] <= threshold)
                    .collect::<Vec<_>>();
                let n_left = goes_left.iter().filter(|&&l| l).count();
                let n_right = samples.len() - n_left;
                if n_left < self.params.min_samples_leaf || n_right < self.params.min_samples_leaf
                {
                    continue;
                }

                let statistic = log_rank_statistic(samples, &goes_left, self.observations);
                if statistic.is_finite()
                    && statistic > 0.0
                    && best.as_ref().is_none_or(|b| statistic > b.statistic)
                {
                    best = Some(CandidateSplit {
                        feature,
                        threshold,
                        statistic,
                    });
                }
            }
        }
        best
    }
}

/// Standardized two-sample log-rank statistic `|O - E| / sqrt(V)` for the left
/// group. `samples` must be sorted by observation time; `goes_left` is parallel
/// to `samples`.
#[expect(clippy::cast_precision_loss)]
fn log_rank_statistic(samples: &[usize], goes_left: &[bool], observations: &[(f64, bool)]) -> f64 {
    let mut at_risk = samples.len() as f64;
    let mut at_risk_left = goes_left.iter().filter(|&&l| l).count() as f64;
    let mut observed_minus_expected = 0.0;
    let mut variance = 0.0;

    let mut i = 0;
    while i < samples.len() {
        let time = observations[samples[i]].0;
        let mut j = i;
        let (mut deaths, mut deaths_left, mut leaving, mut leaving_left) = (0.0, 0.0, 0.0, 0.0);
        while j < samples.len() && observations[samples[j]].0 == time {
            let event = observations[samples[j]].1;
            leaving += 1.0;
            if goes_left[j] {
                leaving_left += 1.0;
            }
            if event {
                deaths += 1.0;
                if goes_left[j] {
                    deaths_left += 1.0;
                }
            }
            j += 1;
        }

        if deaths > 0.0 {
            let share = at_risk_left / at_risk;
            observed_minus_expected += deaths_left - deaths * share;
            if at_risk > 1.0 {
                variance += share * (1.0 - share) * (at_risk - deaths) / (at_risk - 1.0) * deaths;
            }
        }

        at_risk -= leaving;
        at_risk_left -= leaving_left;
        i = j;
    }

    if variance > 0.0 {
        observed_minus_expected.abs() / variance.sqrt()
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    /// Feature 0 drives the hazard, feature 1 is noise.
    fn training_data() -> (Vec<Vec<f64>>, Vec<(f64, bool)>) {
        let mut features = vec![];
        let mut observations = vec![];
        for i in 0..80 {
            let risky = i % 2 == 0;
            let noise = f64::from((i * 7) % 11);
            let time = if risky {
                1.0 + f64::from(i % 10) * 0.2
            } else {
                6.0 + f64::from(i % 10) * 0.5
            };
            features.push(vec![if risky { 1.0 } else { 0.0 }, noise]);
            observations.push((time, i % 7 != 0));
        }
        (features, observations)
    }

    fn params() -> ForestParams {
        ForestParams {
            n_trees: 20,
            max_features: MaxFeatures::All,
            ..ForestParams::default()
        }
    }

    #[test]
    fn test_predictions_are_valid_survival_curves() {
        let (features, observations) = training_data();
        let forest = SurvivalForest::fit(&features, &observations, &params()).unwrap();
        assert_eq!(forest.trees.len(), 20);

        let times = [0.0, 1.0, 2.0, 4.0, 8.0, 12.0];
        for x in [[1.0, 3.0], [0.0, 3.0]] {
            let survival = forest.survival_function(&x, &times);
            assert!(survival.iter().all(|s| (0.0..=1.0).contains(s)));
            assert!(survival.windows(2).all(|w| w[1] <= w[0] + 1e-12));
            assert_abs_diff_eq!(survival[0], 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_risk_factor_lowers_survival() {
        let (features, observations) = training_data();
        let forest = SurvivalForest::fit(&features, &observations, &params()).unwrap();

        let risky = forest.survival_function(&[1.0, 5.0], &[4.0]);
        let safe = forest.survival_function(&[0.0, 5.0], &[4.0]);
        assert!(risky[0] < safe[0]);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (features, observations) = training_data();
        let a = SurvivalForest::fit(&features, &observations, &params()).unwrap();
        let b = SurvivalForest::fit(&features, &observations, &params()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_stump_is_single_leaf() {
        let (features, observations) = training_data();
        let params = ForestParams {
            n_trees: 1,
            max_depth: Some(0),
            bootstrap: false,
            ..ForestParams::default()
        };
        let forest = SurvivalForest::fit(&features, &observations, &params).unwrap();
        assert_eq!(forest.trees[0].node_count(), 1);

        let km = KaplanMeierCurve::from_data(observations.clone());
        let survival = forest.survival_function(&[1.0, 0.0], &[3.0, 7.0]);
        assert_abs_diff_eq!(survival[0], km.survival_at(3.0), epsilon = 1e-12);
        assert_abs_diff_eq!(survival[1], km.survival_at(7.0), epsilon = 1e-12);
    }

    #[test]
    fn test_log_rank_separates_groups() {
        let observations = [(1.0, true), (2.0, true), (3.0, true), (4.0, true)];
        let samples = [0, 1, 2, 3];
        let separated = log_rank_statistic(&samples, &[true, true, false, false], &observations);
        let mixed = log_rank_statistic(&samples, &[true, false, true, false], &observations);
        assert!(separated > mixed);
    }

    #[test]
    fn test_invalid_params() {
        let (features, observations) = training_data();
        let params = ForestParams {
            n_trees: 0,
            ..ForestParams::default()
        };
        assert!(matches!(
            SurvivalForest::fit(&features, &observations, &params),
            Err(FitError::InvalidParameter { name: "n_trees", .. })
        ));
    }

    #[test]
    fn test_max_features_resolution() {
        assert_eq!(MaxFeatures::Sqrt.resolve(40), 6);
        assert_eq!(MaxFeatures::All.resolve(40), 40);
        assert_eq!(MaxFeatures::Count(100).resolve(40), 40);
        assert_eq!(MaxFeatures::Count(0).resolve(40), 1);
    }
}
