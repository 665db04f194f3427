use serde::{Deserialize, Serialize};

use crate::model::PatientState;

/// Lower edge of the target glycemic range [mmol/L]
pub const RANGE_LOW: f64 = 3.9;
/// Upper edge of the target glycemic range [mmol/L]
pub const RANGE_HIGH: f64 = 10.0;

/// Histories recorded by one run, one entry per simulated minute.
///
/// Entry `k` describes minute `minutes[k]`: the dose and disturbance applied
/// during that minute and the state and glycemia at its end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub minutes: Vec<usize>,
    /// Measured glycemia [mmol/L]
    pub glucose: Vec<f64>,
    /// Total applied insulin [U/min]
    pub insulin: Vec<f64>,
    /// Applied carbohydrate disturbance [g/min]
    pub disturbance: Vec<f64>,
    pub states: Vec<PatientState>,
    /// Equilibrium infusion added to every dose [U/min]
    pub equilibrium_rate: f64,
}

impl SimulationOutput {
    pub(crate) fn with_capacity(capacity: usize, equilibrium_rate: f64) -> Self {
        SimulationOutput {
            minutes: Vec::with_capacity(capacity),
            glucose: Vec::with_capacity(capacity),
            insulin: Vec::with_capacity(capacity),
            disturbance: Vec::with_capacity(capacity),
            states: Vec::with_capacity(capacity),
            equilibrium_rate,
        }
    }

    pub(crate) fn push(
        &mut self,
        minute: usize,
        dose: f64,
        disturbance: f64,
        state: PatientState,
        glucose: f64,
    ) {
        self.minutes.push(minute);
        self.insulin.push(dose);
        self.disturbance.push(disturbance);
        self.states.push(state);
        self.glucose.push(glucose);
    }

    pub fn len(&self) -> usize {
        self.glucose.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glucose.is_empty()
    }

    /// The three sequences handed to callers: glycemia, insulin dose and state
    pub fn into_histories(self) -> (Vec<f64>, Vec<f64>, Vec<PatientState>) {
        (self.glucose, self.insulin, self.states)
    }

    /// Glycemic summary of the run, `None` when nothing was simulated
    pub fn summary(&self) -> Option<Summary> {
        if self.is_empty() {
            return None;
        }
        let n = self.len() as f64;
        let fraction = |pred: &dyn Fn(f64) -> bool| {
            self.glucose.iter().filter(|g| pred(**g)).count() as f64 / n
        };

        Some(Summary {
            mean: self.glucose.iter().sum::<f64>() / n,
            min: self.glucose.iter().copied().fold(f64::INFINITY, f64::min),
            max: self.glucose.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            time_in_range: fraction(&|g| (RANGE_LOW..=RANGE_HIGH).contains(&g)),
            time_below_range: fraction(&|g| g < RANGE_LOW),
            time_above_range: fraction(&|g| g > RANGE_HIGH),
            total_insulin: self.insulin.iter().sum(),
            total_carbs: self.disturbance.iter().sum(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Mean glycemia [mmol/L]
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Fraction of minutes within [RANGE_LOW, RANGE_HIGH]
    pub time_in_range: f64,
    pub time_below_range: f64,
    pub time_above_range: f64,
    /// Insulin delivered over the run [U]
    pub total_insulin: f64,
    /// Carbohydrate ingested over the run [g]
    pub total_carbs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn empty_output_has_no_summary() {
        assert!(SimulationOutput::default().summary().is_none());
    }

    #[test]
    fn summary_splits_time_by_range() {
        let mut output = SimulationOutput::with_capacity(4, 0.0);
        for (minute, g) in [3.0, 5.0, 9.0, 12.0].into_iter().enumerate() {
            output.push(minute, 0.5, 10.0, PatientState::default(), g);
        }

        let summary = output.summary().unwrap();

        assert_relative_eq!(summary.mean, 7.25);
        assert_eq!(summary.min, 3.0);
        assert_eq!(summary.max, 12.0);
        assert_eq!(summary.time_in_range, 0.5);
        assert_eq!(summary.time_below_range, 0.25);
        assert_eq!(summary.time_above_range, 0.25);
        assert_eq!(summary.total_insulin, 2.0);
        assert_eq!(summary.total_carbs, 40.0);
    }

    #[test]
    fn histories_keep_order() {
        let mut output = SimulationOutput::with_capacity(2, 0.0);
        output.push(0, 0.1, 0.0, PatientState::default(), 5.0);
        output.push(1, 0.2, 0.0, PatientState::default(), 6.0);

        let (glucose, insulin, states) = output.into_histories();
        assert_eq!(glucose, vec![5.0, 6.0]);
        assert_eq!(insulin, vec![0.1, 0.2]);
        assert_eq!(states.len(), 2);
    }
}
