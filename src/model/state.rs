use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::vector::NamedVector;

/// Number of compartments in the Hovorka model
pub const NSTATES: usize = 10;

/// Compartments of the Hovorka model, in storage order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compartment {
    /// Glucose mass in the accessible compartment [mmol]
    Q1,
    /// Glucose mass in the non-accessible compartment [mmol]
    Q2,
    /// Subcutaneous insulin, first absorption stage [mU]
    S1,
    /// Subcutaneous insulin, second absorption stage [mU]
    S2,
    /// Plasma insulin concentration [mU/L]
    I,
    /// Insulin action on glucose transport [1/min]
    #[serde(rename = "x1")]
    X1,
    /// Insulin action on glucose disposal [1/min]
    #[serde(rename = "x2")]
    X2,
    /// Insulin action on endogenous production [unitless]
    #[serde(rename = "x3")]
    X3,
    /// Gut glucose, first absorption stage [mmol]
    D1,
    /// Gut glucose, second absorption stage [mmol]
    D2,
}

impl Compartment {
    pub const ALL: [Compartment; NSTATES] = [
        Compartment::Q1,
        Compartment::Q2,
        Compartment::S1,
        Compartment::S2,
        Compartment::I,
        Compartment::X1,
        Compartment::X2,
        Compartment::X3,
        Compartment::D1,
        Compartment::D2,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Compartment::Q1 => "Q1",
            Compartment::Q2 => "Q2",
            Compartment::S1 => "S1",
            Compartment::S2 => "S2",
            Compartment::I => "I",
            Compartment::X1 => "x1",
            Compartment::X2 => "x2",
            Compartment::X3 => "x3",
            Compartment::D1 => "D1",
            Compartment::D2 => "D2",
        }
    }

    /// Position of the compartment in [PatientState::to_array]
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Compartment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// State of the Hovorka model.
///
/// The same type carries a state and its time derivative. Values are replaced,
/// never updated in place, as the simulation moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PatientState {
    #[serde(rename = "Q1")]
    pub q1: f64,
    #[serde(rename = "Q2")]
    pub q2: f64,
    #[serde(rename = "S1")]
    pub s1: f64,
    #[serde(rename = "S2")]
    pub s2: f64,
    #[serde(rename = "I")]
    pub i: f64,
    pub x1: f64,
    pub x2: f64,
    pub x3: f64,
    #[serde(rename = "D1")]
    pub d1: f64,
    #[serde(rename = "D2")]
    pub d2: f64,
}

impl PatientState {
    /// Returns the names of all compartments, in storage order
    pub fn field_names() -> [&'static str; NSTATES] {
        Compartment::ALL.map(|c| c.name())
    }

    pub fn from_array(values: [f64; NSTATES]) -> Self {
        let [q1, q2, s1, s2, i, x1, x2, x3, d1, d2] = values;
        PatientState {
            q1,
            q2,
            s1,
            s2,
            i,
            x1,
            x2,
            x3,
            d1,
            d2,
        }
    }

    pub fn to_array(&self) -> [f64; NSTATES] {
        [
            self.q1, self.q2, self.s1, self.s2, self.i, self.x1, self.x2, self.x3, self.d1,
            self.d2,
        ]
    }

    /// Iterate over `(compartment, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (Compartment, f64)> {
        Compartment::ALL.into_iter().zip(self.to_array())
    }

    /// Apply `f` to every component
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self::from_array(self.to_array().map(f))
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// Largest absolute component
    pub fn max_abs(&self) -> f64 {
        self.to_array().iter().fold(0.0, |acc, v| acc.max(v.abs()))
    }
}

impl Index<Compartment> for PatientState {
    type Output = f64;

    fn index(&self, compartment: Compartment) -> &f64 {
        match compartment {
            Compartment::Q1 => &self.q1,
            Compartment::Q2 => &self.q2,
            Compartment::S1 => &self.s1,
            Compartment::S2 => &self.s2,
            Compartment::I => &self.i,
            Compartment::X1 => &self.x1,
            Compartment::X2 => &self.x2,
            Compartment::X3 => &self.x3,
            Compartment::D1 => &self.d1,
            Compartment::D2 => &self.d2,
        }
    }
}

impl IndexMut<Compartment> for PatientState {
    fn index_mut(&mut self, compartment: Compartment) -> &mut f64 {
        match compartment {
            Compartment::Q1 => &mut self.q1,
            Compartment::Q2 => &mut self.q2,
            Compartment::S1 => &mut self.s1,
            Compartment::S2 => &mut self.s2,
            Compartment::I => &mut self.i,
            Compartment::X1 => &mut self.x1,
            Compartment::X2 => &mut self.x2,
            Compartment::X3 => &mut self.x3,
            Compartment::D1 => &mut self.d1,
            Compartment::D2 => &mut self.d2,
        }
    }
}

impl NamedVector for PatientState {
    fn sum_with(&self, other: &Self) -> Self {
        let (a, b) = (self.to_array(), other.to_array());
        Self::from_array(std::array::from_fn(|k| a[k] + b[k]))
    }

    fn scaled(&self, a: f64) -> Self {
        self.map(|v| v * a)
    }
}

impl fmt::Display for PatientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(c, v)| format!("{}={:.4}", c, v))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{scale, sum};

    #[test]
    fn array_layout_follows_compartment_order() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let state = PatientState::from_array(values);

        for compartment in Compartment::ALL {
            assert_eq!(state[compartment], values[compartment.index()]);
        }
        assert_eq!(state.to_array(), values);
    }

    #[test]
    fn index_mut_writes_the_named_field() {
        let mut state = PatientState::default();
        state[Compartment::X3] = 0.5;
        assert_eq!(state.x3, 0.5);
    }

    #[test]
    fn arithmetic_is_componentwise() {
        let a = PatientState::from_array([1.0; NSTATES]);
        let b = PatientState::from_array([0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);

        let total = sum([&a, &scale(&b, 2.0)]);

        assert_eq!(total.q1, 1.0);
        assert_eq!(total.d2, 19.0);
        assert_eq!(sum([&b, &scale(&b, -1.0)]), PatientState::default());
    }

    #[test]
    fn serializes_with_model_names() {
        let state = PatientState {
            q1: 61.6,
            ..Default::default()
        };
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(json["Q1"], 61.6);
        assert_eq!(json["x1"], 0.0);
        assert_eq!(PatientState::field_names()[4], "I");
    }

    #[test]
    fn compartment_serde_names_match_display() {
        let state = serde_json::to_value(PatientState::default()).unwrap();
        for compartment in Compartment::ALL {
            let json = serde_json::to_string(&compartment).unwrap();
            assert_eq!(json, format!("\"{}\"", compartment));
            assert!(state.get(compartment.name()).is_some());

            let parsed: Compartment = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, compartment);
        }
    }
}
