use serde::{Deserialize, Serialize};

/// Per-minute exogenous input, indexed by absolute simulation minute.
///
/// Minutes past the end of the stored values read as 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schedule {
    values: Vec<f64>,
}

impl Schedule {
    pub fn new(values: Vec<f64>) -> Self {
        Schedule { values }
    }

    pub fn zeros(len: usize) -> Self {
        Schedule {
            values: vec![0.0; len],
        }
    }

    /// Value at `minute`, 0 if none was given
    pub fn at(&self, minute: usize) -> f64 {
        self.values.get(minute).copied().unwrap_or(0.0)
    }

    /// Overwrite the value at `minute`, growing the schedule with zeros if needed
    pub fn set(&mut self, minute: usize, value: f64) {
        if minute >= self.values.len() {
            self.values.resize(minute + 1, 0.0);
        }
        self.values[minute] = value;
    }

    /// Add `grams` of carbohydrate at `minute`, on top of anything already there
    pub fn with_meal(mut self, minute: usize, grams: f64) -> Self {
        let total = self.at(minute) + grams;
        self.set(minute, total);
        self
    }

    /// Set every minute in `from..to` to `value`
    pub fn with_constant(mut self, from: usize, to: usize, value: f64) -> Self {
        for minute in from..to {
            self.set(minute, value);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Sum over `from..to`
    pub fn total(&self, from: usize, to: usize) -> f64 {
        (from..to).map(|minute| self.at(minute)).sum()
    }
}

impl From<Vec<f64>> for Schedule {
    fn from(values: Vec<f64>) -> Self {
        Schedule::new(values)
    }
}
