use std::path::Path;

use attrition_models::ModelParams;
use attrition_scoring::{brier::ScoreOptions, compare::DEFAULT_TIE_TOLERANCE};
use serde::{Deserialize, Serialize};

use crate::util;

/// Pipeline and model parameters, read from an optional JSON file.
///
/// Every field has a default, so a file only needs the values it changes:
///
/// ```json
/// { "seed": 7, "forest": { "n_trees": 300 } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AnalysisConfig {
    pub seed: u64,
    pub test_fraction: f64,
    pub bootstrap_samples: usize,
    pub confidence_level: f64,
    pub tie_tolerance: f64,
    #[serde(flatten)]
    pub models: ModelParams,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_fraction: 0.2,
            bootstrap_samples: 200,
            confidence_level: 0.95,
            tie_tolerance: DEFAULT_TIE_TOLERANCE,
            models: ModelParams::default(),
        }
    }
}

impl AnalysisConfig {
    /// Loads the configuration file if given, then applies a seed override.
    ///
    /// The seed drives the train/test split, the bootstrap and the forest.
    pub fn load(path: Option<&Path>, seed: Option<u64>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => util::read_json_file("configuration", path)?,
            None => Self::default(),
        };
        if let Some(seed) = seed {
            config.seed = seed;
            config.models.forest.seed = seed;
        }
        log::debug!("Configuration: {config:?}");
        Ok(config)
    }

    pub fn score_options(&self) -> ScoreOptions {
        ScoreOptions {
            bootstrap_samples: self.bootstrap_samples,
            confidence_level: self.confidence_level,
            seed: self.seed,
        }
    }
}
