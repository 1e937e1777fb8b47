use serde::{Deserialize, Serialize};

/// Kaplan-Meier survival curve for right-censored time-to-event data.
///
/// The Kaplan-Meier estimator is a non-parametric estimate of the survival
/// function. Subjects whose event was not observed before the end of follow-up
/// (censored subjects) stay in the risk set until their censoring time and then
/// leave it without contributing an event.
///
/// # Fields
///
/// The curve stores parallel vectors describing the step function at the
/// distinct times where at least one event occurred:
/// - Event times (ascending)
/// - Survival probability just after each event time
/// - Number of subjects at risk at each event time
/// - Number of events at each event time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KaplanMeierCurve {
    /// Distinct times at which at least one event occurred, ascending.
    pub times: Vec<f64>,
    /// Survival probability at each corresponding time point.
    /// Values range from 0.0 (no survival) to 1.0 (complete survival).
    pub survival_prob: Vec<f64>,
    /// Number of subjects still under observation at each time point.
    pub at_risk: Vec<usize>,
    /// Number of events observed at each time point.
    pub events: Vec<usize>,
}

/// How subjects that share a time with a counted transition, without being
/// counted themselves, enter the risk set at that time.
#[derive(Debug, Clone, Copy)]
enum TiedRemovals {
    /// Still at risk: a censoring at `t` is at risk of an event at `t`.
    AtRisk,
    /// Already gone: an event at `t` precedes a censoring at `t`.
    Removed,
}

impl KaplanMeierCurve {
    /// Computes the Kaplan-Meier survival curve from observations.
    ///
    /// # Arguments
    ///
    /// * `data` - A vector of `(time, event)` tuples where `event` is `true`
    ///   when the event was observed at `time` and `false` when the subject was
    ///   censored at `time`
    ///
    /// # Returns
    ///
    /// A `KaplanMeierCurve` with survival probabilities at each event time.
    /// An empty input, or an input without any event, yields an empty curve
    /// (survival stays at 1.0 everywhere).
    ///
    /// # Examples
    ///
    /// ```
    /// # use attrition_stats::survival::KaplanMeierCurve;
    /// // Data: (time, event)
    /// let data = vec![
    ///     (10.0, true),  // Event at time 10
    ///     (20.0, false), // Censored at time 20
    ///     (30.0, true),  // Event at time 30
    /// ];
    /// let curve = KaplanMeierCurve::from_data(data);
    /// assert_eq!(curve.times, vec![10.0, 30.0]);
    /// ```
    #[must_use]
    pub fn from_data(data: Vec<(f64, bool)>) -> Self {
        Self::product_limit(data, TiedRemovals::AtRisk)
    }

    /// Computes the Kaplan-Meier estimate of the censoring distribution.
    ///
    /// The roles of events and censorings are swapped: a censored observation
    /// is an "event" of the censoring process. The resulting curve gives the
    /// probability of remaining uncensored, which is the weight denominator
    /// used for inverse probability of censoring weighting.
    ///
    /// Subjects whose event happens at the same time as a censoring are taken
    /// out of the risk set before that censoring.
    ///
    /// # Examples
    ///
    /// ```
    /// # use attrition_stats::survival::KaplanMeierCurve;
    /// let data = vec![(1.0, true), (2.0, false), (3.0, true), (4.0, false)];
    /// let censoring = KaplanMeierCurve::censoring_distribution(&data);
    /// assert_eq!(censoring.times, vec![2.0, 4.0]);
    /// assert!((censoring.survival_at(2.0) - 2.0 / 3.0).abs() < 1e-12);
    ///
    /// // The event at time 1 leaves first, so one of the two remaining
    /// // subjects is censored there.
    /// let tied = [(1.0, true), (1.0, false), (2.0, true)];
    /// let censoring = KaplanMeierCurve::censoring_distribution(&tied);
    /// assert!((censoring.survival_at(1.0) - 0.5).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn censoring_distribution(data: &[(f64, bool)]) -> Self {
        Self::product_limit(
            data.iter().map(|&(time, event)| (time, !event)).collect(),
            TiedRemovals::Removed,
        )
    }

    /// Product-limit estimate over `(time, counted)` pairs, stepping down at
    /// the counted transitions.
    #[expect(clippy::cast_precision_loss)]
    fn product_limit(mut data: Vec<(f64, bool)>, tied: TiedRemovals) -> Self {
        data.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut times = vec![];
        let mut survival_prob = vec![];
        let mut at_risk_vec = vec![];
        let mut events_vec = vec![];

        let mut current_survival = 1.0;
        let total = data.len();

        let mut i = 0;
        while i < data.len() {
            let current_time = data[i].0;

            let mut event_count = 0;
            let mut j = i;
            while j < data.len() && data[j].0 == current_time {
                if data[j].1 {
                    event_count += 1;
                }
                j += 1;
            }

            let at_risk = match tied {
                TiedRemovals::AtRisk => total - i,
                TiedRemovals::Removed => total - i - (j - i - event_count),
            };

            if event_count > 0 {
                current_survival *= 1.0 - (event_count as f64 / at_risk as f64);

                times.push(current_time);
                survival_prob.push(current_survival);
                at_risk_vec.push(at_risk);
                events_vec.push(event_count);
            }

            i = j;
        }

        Self {
            times,
            survival_prob,
            at_risk: at_risk_vec,
            events: events_vec,
        }
    }

    /// Returns the median survival time.
    ///
    /// The median survival time is the time at which the survival probability
    /// drops to or below 50%. Linear interpolation is used between the two
    /// surrounding event times.
    ///
    /// # Returns
    ///
    /// * `Some(time)` - The median survival time if the survival probability reaches 50%
    /// * `None` - If the survival probability never drops to 50% or if the curve is empty
    ///
    /// # Examples
    ///
    /// ```
    /// # use attrition_stats::survival::KaplanMeierCurve;
    /// let data = vec![(10.0, true), (20.0, true), (30.0, true)];
    /// let curve = KaplanMeierCurve::from_data(data);
    /// let median = curve.median_survival().unwrap();
    /// assert!((median - 15.0).abs() < 1e-9);
    /// ```
    #[must_use]
    pub fn median_survival(&self) -> Option<f64> {
        let i = self.survival_prob.iter().position(|&s| s <= 0.5)?;
        if i == 0 {
            return Some(self.times[0]);
        }
        let t0 = self.times[i - 1];
        let t1 = self.times[i];
        let s0 = self.survival_prob[i - 1];
        let s1 = self.survival_prob[i];
        Some(t0 + (0.5 - s0) / (s1 - s0) * (t1 - t0))
    }

    /// Returns the survival probability at a specific time.
    ///
    /// The survival function is a right-continuous step function: it stays
    /// constant between event times and drops at each event time, so the
    /// value at an event time already includes that time's events.
    ///
    /// Returns `1.0` before the first event and the last known probability
    /// after the last event.
    ///
    /// # Examples
    ///
    /// ```
    /// # use attrition_stats::survival::KaplanMeierCurve;
    /// let data = vec![(10.0, true), (20.0, true)];
    /// let curve = KaplanMeierCurve::from_data(data);
    ///
    /// assert_eq!(curve.survival_at(5.0), 1.0);   // Before first event
    /// assert_eq!(curve.survival_at(10.0), 0.5);  // At first event
    /// assert_eq!(curve.survival_at(99.0), 0.0);  // After last event
    /// ```
    #[must_use]
    pub fn survival_at(&self, time: f64) -> f64 {
        let idx = self.times.partition_point(|&t| t <= time);
        if idx == 0 {
            1.0
        } else {
            self.survival_prob[idx - 1]
        }
    }

    /// Returns the left limit of the survival function at `time`.
    ///
    /// Events happening exactly at `time` are not yet subtracted.
    ///
    /// # Examples
    ///
    /// ```
    /// # use attrition_stats::survival::KaplanMeierCurve;
    /// let data = vec![(10.0, true), (20.0, true)];
    /// let curve = KaplanMeierCurve::from_data(data);
    ///
    /// assert_eq!(curve.survival_before(10.0), 1.0);
    /// assert_eq!(curve.survival_before(20.0), 0.5);
    /// ```
    #[must_use]
    pub fn survival_before(&self, time: f64) -> f64 {
        let idx = self.times.partition_point(|&t| t < time);
        if idx == 0 {
            1.0
        } else {
            self.survival_prob[idx - 1]
        }
    }

    /// Returns `true` if no event was observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}
