//! Feedback law mapping the glycemia history to a control action.
//!
//! The action is in glucose units (mmol/L, or mmol/L·min for the integral
//! part once multiplied by its gain); turning it into an insulin rate is left to
//! the simulation driver.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SimulationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ControllerKind {
    P,
    PD,
    PI,
    PID,
}

impl ControllerKind {
    pub fn name(&self) -> &'static str {
        match self {
            ControllerKind::P => "P",
            ControllerKind::PD => "PD",
            ControllerKind::PI => "PI",
            ControllerKind::PID => "PID",
        }
    }

    pub fn has_integral(&self) -> bool {
        matches!(self, ControllerKind::PI | ControllerKind::PID)
    }

    pub fn has_derivative(&self) -> bool {
        matches!(self, ControllerKind::PD | ControllerKind::PID)
    }
}

impl FromStr for ControllerKind {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "P" => Ok(ControllerKind::P),
            "PD" => Ok(ControllerKind::PD),
            "PI" => Ok(ControllerKind::PI),
            "PID" => Ok(ControllerKind::PID),
            _ => Err(SimulationError::UnsupportedController(s.to_string())),
        }
    }
}

impl TryFrom<String> for ControllerKind {
    type Error = SimulationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ControllerKind> for String {
    fn from(kind: ControllerKind) -> Self {
        kind.name().to_string()
    }
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Gains {
    #[serde(rename = "Kp", default)]
    pub kp: f64,
    #[serde(rename = "Ki", default)]
    pub ki: f64,
    #[serde(rename = "Kd", default)]
    pub kd: f64,
}

/// The three contributions to a control action, before summation.
/// Terms the controller kind does not use are zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Terms {
    pub proportional: f64,
    pub integral: f64,
    pub derivative: f64,
}

impl Terms {
    pub fn total(&self) -> f64 {
        self.proportional + self.integral + self.derivative
    }
}

/// Split the control action into its P, I and D terms.
///
/// With `y[n-1]` the latest output:
/// - error `e = y[n-1] − desired`, previous error `y[n-2] − desired`; both are 0
///   when the history is too short
/// - integral `step · Σ (y[i] − desired)` over the whole history
/// - derivative `(e − e_prev) / step`
pub fn terms(
    kind: ControllerKind,
    gains: &Gains,
    step: f64,
    desired: f64,
    history: &[f64],
) -> Terms {
    let n = history.len();
    let error = if n > 0 { history[n - 1] - desired } else { 0.0 };
    let previous = if n > 1 { history[n - 2] - desired } else { 0.0 };

    let integral = if kind.has_integral() {
        let accumulated: f64 = history.iter().map(|y| y - desired).sum();
        gains.ki * step * accumulated
    } else {
        0.0
    };
    let derivative = if kind.has_derivative() {
        gains.kd * (error - previous) / step
    } else {
        0.0
    };

    Terms {
        proportional: gains.kp * error,
        integral,
        derivative,
    }
}

/// Control action for `kind` given the output history.
pub fn compute(
    kind: ControllerKind,
    gains: &Gains,
    step: f64,
    desired: f64,
    history: &[f64],
) -> f64 {
    terms(kind, gains, step, desired, history).total()
}

/// [compute] with the controller kind given by name; unknown kinds are an error.
pub fn compute_by_name(
    name: &str,
    gains: &Gains,
    step: f64,
    desired: f64,
    history: &[f64],
) -> Result<f64, SimulationError> {
    let kind: ControllerKind = name.parse()?;
    Ok(compute(kind, gains, step, desired, history))
}
