//! Stratified train/test partitioning.

use rand::{SeedableRng as _, seq::SliceRandom as _};
use rand_pcg::Pcg32;

use crate::record::{SurvivalRecord, event_rate};

/// Error returned when a dataset cannot be partitioned.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum SplitError {
    #[display("test fraction must be strictly between 0 and 1, got {fraction}")]
    InvalidFraction { fraction: f64 },
    #[display("split leaves an empty partition (train: {train}, test: {test})")]
    EmptyPartition { train: usize, test: usize },
}

/// Two disjoint, exhaustive subsets of a dataset.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: Vec<SurvivalRecord>,
    pub test: Vec<SurvivalRecord>,
}

/// Splits records into train and test sets, stratified by event status.
///
/// Events and censored records are shuffled separately and
/// `round(group_size * test_fraction)` of each group goes to the test set, so
/// both partitions keep the event rate of the whole dataset. Records keep
/// their original relative order inside each partition. The same seed always
/// produces the same partition.
pub fn stratified_split(
    records: &[SurvivalRecord],
    test_fraction: f64,
    seed: u64,
) -> Result<TrainTestSplit, SplitError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(SplitError::InvalidFraction {
            fraction: test_fraction,
        });
    }

    let mut rng = Pcg32::seed_from_u64(seed);
    let mut in_test = vec![false; records.len()];
    for stratum in [true, false] {
        let mut indices = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.event == stratum)
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        indices.shuffle(&mut rng);
        for &i in indices.iter().take(test_count(indices.len(), test_fraction)) {
            in_test[i] = true;
        }
    }

    let (test, train): (Vec<_>, Vec<_>) = records
        .iter()
        .zip(&in_test)
        .partition(|(_, in_test)| **in_test);
    let train = train.into_iter().map(|(r, _)| r.clone()).collect::<Vec<_>>();
    let test = test.into_iter().map(|(r, _)| r.clone()).collect::<Vec<_>>();

    if train.is_empty() || test.is_empty() {
        return Err(SplitError::EmptyPartition {
            train: train.len(),
            test: test.len(),
        });
    }

    log::info!(
        "Split {} records into {} train / {} test (event rate {:.3} / {:.3})",
        records.len(),
        train.len(),
        test.len(),
        event_rate(&train),
        event_rate(&test)
    );
    Ok(TrainTestSplit { train, test })
}

#[expect(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
fn test_count(group_size: usize, test_fraction: f64) -> usize {
    (group_size as f64 * test_fraction).round() as usize
}
