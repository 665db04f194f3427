use serde::{Deserialize, Serialize};

use crate::controller::{ControllerKind, Gains};
use crate::model::{PatientParameters, PatientState, SteadyStateMethod};
use crate::simulator::Schedule;
use crate::SimulationError;

/// Closed interval used to clamp doses and disturbances
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn new(min: f64, max: f64) -> Self {
        Bounds { min, max }
    }

    /// Clamp into `[min, max]`; NaN passes through unchanged
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return value;
        }
        value.max(self.min).min(self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    fn validate(&self, name: &str) -> Result<(), SimulationError> {
        if self.min.is_nan() || self.max.is_nan() || self.min > self.max {
            return Err(SimulationError::InvalidParameter {
                param: name.to_string(),
                value: format!("[{}, {}]", self.min, self.max),
            });
        }
        Ok(())
    }
}

/// Simulated minutes `t_start..t_end` and the integrator's nominal step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub t_start: usize,
    pub t_end: usize,
    /// RK4 sub-step [min]. The controller acts once per minute whatever this
    /// is, so its integral and derivative terms do not scale with it.
    pub step: f64,
}

impl Default for Timing {
    /// One day at one-minute resolution
    fn default() -> Self {
        Timing {
            t_start: 0,
            t_end: 24 * 60,
            step: 1.0,
        }
    }
}

impl Timing {
    pub fn minutes(&self) -> usize {
        self.t_end.saturating_sub(self.t_start)
    }

    fn validate(&self) -> Result<(), SimulationError> {
        if self.t_end < self.t_start {
            return Err(SimulationError::InvalidTiming(format!(
                "end minute {} is before start minute {}",
                self.t_end, self.t_start
            )));
        }
        if !self.step.is_finite() || self.step <= 0.0 {
            return Err(SimulationError::InvalidTiming(format!(
                "step must be positive, got {}",
                self.step
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub kind: ControllerKind,
    #[serde(default)]
    pub gains: Gains,
    /// Clamp on the total dose [U/min]
    #[serde(default = "default_dose_bounds")]
    pub bounds: Bounds,
    /// Desired glycemia [mmol/L]; the patient's `Geq` when absent
    #[serde(default)]
    pub setpoint: Option<f64>,
}

fn default_dose_bounds() -> Bounds {
    Bounds::new(0.0, 15.0)
}

fn default_disturbance_bounds() -> Bounds {
    Bounds::new(0.0, 150.0)
}

impl Default for ControllerConfig {
    /// A proportional controller with zero gain, i.e. open loop
    fn default() -> Self {
        ControllerConfig {
            kind: ControllerKind::P,
            gains: Gains::default(),
            bounds: default_dose_bounds(),
            setpoint: None,
        }
    }
}

/// Where the first state of a run comes from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InitialCondition {
    /// Equilibrium at `Geq`; its infusion rate is added to every dose
    SteadyState(SteadyStateMethod),
    Provided(PatientState),
}

impl Default for InitialCondition {
    fn default() -> Self {
        InitialCondition::SteadyState(SteadyStateMethod::default())
    }
}

/// Everything a run needs, built once before the run and never modified by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub patient: PatientParameters,
    pub timing: Timing,
    pub controller: ControllerConfig,
    /// Carbohydrate intake [g per minute]
    pub carbs: Schedule,
    /// Basal insulin on top of the equilibrium rate [U per minute]
    pub basal: Schedule,
    /// Clamp on the carbohydrate disturbance [g per minute]
    #[serde(default = "default_disturbance_bounds")]
    pub disturbance: Bounds,
    pub initial: InitialCondition,
}

impl Default for Scenario {
    fn default() -> Self {
        Scenario {
            patient: PatientParameters::default(),
            timing: Timing::default(),
            controller: ControllerConfig::default(),
            carbs: Schedule::default(),
            basal: Schedule::default(),
            disturbance: default_disturbance_bounds(),
            initial: InitialCondition::default(),
        }
    }
}

impl Scenario {
    pub fn builder() -> ScenarioBuilder {
        ScenarioBuilder {
            scenario: Scenario::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SimulationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Desired glycemia passed to the controller [mmol/L]
    pub fn setpoint(&self) -> f64 {
        self.controller.setpoint.unwrap_or(self.patient.geq)
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        self.patient.validate()?;
        self.timing.validate()?;
        self.controller.bounds.validate("dose bounds")?;
        self.disturbance.validate("disturbance bounds")?;
        let gains = &self.controller.gains;
        for (name, value) in [("Kp", gains.kp), ("Ki", gains.ki), ("Kd", gains.kd)] {
            if !value.is_finite() {
                return Err(SimulationError::InvalidParameter {
                    param: name.to_string(),
                    value: value.to_string(),
                });
            }
        }
        if !self.setpoint().is_finite() {
            return Err(SimulationError::InvalidParameter {
                param: "setpoint".to_string(),
                value: self.setpoint().to_string(),
            });
        }
        Ok(())
    }
}

pub struct ScenarioBuilder {
    scenario: Scenario,
}

impl ScenarioBuilder {
    pub fn patient(mut self, patient: PatientParameters) -> Self {
        self.scenario.patient = patient;
        self
    }

    /// Simulate minutes `t_start..t_end`
    pub fn minutes(mut self, t_start: usize, t_end: usize) -> Self {
        self.scenario.timing.t_start = t_start;
        self.scenario.timing.t_end = t_end;
        self
    }

    pub fn days(self, days: usize) -> Self {
        self.minutes(0, days * 24 * 60)
    }

    pub fn step(mut self, step: f64) -> Self {
        self.scenario.timing.step = step;
        self
    }

    pub fn controller(mut self, kind: ControllerKind, gains: Gains) -> Self {
        self.scenario.controller.kind = kind;
        self.scenario.controller.gains = gains;
        self
    }

    pub fn dose_bounds(mut self, min: f64, max: f64) -> Self {
        self.scenario.controller.bounds = Bounds::new(min, max);
        self
    }

    pub fn setpoint(mut self, setpoint: f64) -> Self {
        self.scenario.controller.setpoint = Some(setpoint);
        self
    }

    pub fn meal(mut self, minute: usize, grams: f64) -> Self {
        self.scenario.carbs = std::mem::take(&mut self.scenario.carbs).with_meal(minute, grams);
        self
    }

    pub fn carbs(mut self, carbs: Schedule) -> Self {
        self.scenario.carbs = carbs;
        self
    }

    /// Basal rate `rate` [U/min] over minutes `from..to`
    pub fn basal(mut self, from: usize, to: usize, rate: f64) -> Self {
        self.scenario.basal =
            std::mem::take(&mut self.scenario.basal).with_constant(from, to, rate);
        self
    }

    pub fn basal_schedule(mut self, basal: Schedule) -> Self {
        self.scenario.basal = basal;
        self
    }

    pub fn disturbance_bounds(mut self, min: f64, max: f64) -> Self {
        self.scenario.disturbance = Bounds::new(min, max);
        self
    }

    pub fn initial(mut self, initial: InitialCondition) -> Self {
        self.scenario.initial = initial;
        self
    }

    pub fn build(self) -> Scenario {
        self.scenario
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_inputs() {
        let scenario = Scenario::builder()
            .minutes(60, 180)
            .step(0.5)
            .controller(
                ControllerKind::PI,
                Gains {
                    kp: 0.01,
                    ki: 0.0001,
                    kd: 0.0,
                },
            )
            .meal(90, 60.0)
            .basal(60, 180, 0.01)
            .build();

        assert_eq!(scenario.timing.minutes(), 120);
        assert_eq!(scenario.carbs.at(90), 60.0);
        assert_eq!(scenario.basal.at(179), 0.01);
        assert_eq!(scenario.basal.at(180), 0.0);
        assert_eq!(scenario.controller.kind, ControllerKind::PI);
        assert_eq!(scenario.setpoint(), scenario.patient.geq);
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let scenario = Scenario::from_json(
            r#"{
                "timing": { "t_start": 0, "t_end": 120, "step": 1.0 },
                "controller": { "kind": "PID", "gains": { "Kp": 0.02, "Kd": 0.5 } },
                "carbs": [0.0, 0.0, 45.0]
            }"#,
        )
        .unwrap();

        assert_eq!(scenario.controller.kind, ControllerKind::PID);
        assert_eq!(scenario.controller.gains.ki, 0.0);
        assert_eq!(scenario.controller.bounds, Bounds::new(0.0, 15.0));
        assert_eq!(scenario.disturbance, Bounds::new(0.0, 150.0));
        assert_eq!(scenario.carbs.at(2), 45.0);
        assert_eq!(scenario.patient, PatientParameters::default());
        assert_eq!(
            scenario.initial,
            InitialCondition::SteadyState(SteadyStateMethod::Quadratic)
        );
    }

    #[test]
    fn unknown_controller_fails_to_parse() {
        let err = Scenario::from_json(r#"{ "controller": { "kind": "MPC" } }"#).unwrap_err();
        assert!(err.to_string().contains("MPC"));
    }

    #[test]
    fn json_round_trip() {
        let scenario = Scenario::builder()
            .days(1)
            .meal(480, 50.0)
            .initial(InitialCondition::SteadyState(SteadyStateMethod::Bisection))
            .build();
        let parsed = Scenario::from_json(&scenario.to_json().unwrap()).unwrap();

        assert_eq!(parsed.timing, scenario.timing);
        assert_eq!(parsed.carbs, scenario.carbs);
        assert_eq!(parsed.initial, scenario.initial);
        assert_eq!(parsed.controller.kind, ControllerKind::P);
    }

    #[test]
    fn inverted_timing_is_rejected() {
        let scenario = Scenario::builder().minutes(10, 5).build();
        assert!(matches!(
            scenario.validate(),
            Err(SimulationError::InvalidTiming(_))
        ));

        let scenario = Scenario::builder().step(0.0).build();
        assert!(matches!(
            scenario.validate(),
            Err(SimulationError::InvalidTiming(_))
        ));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let scenario = Scenario::builder().dose_bounds(1.0, 0.0).build();
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn clamp_respects_bounds() {
        let bounds = Bounds::new(0.0, 15.0);
        assert_eq!(bounds.clamp(-1.0), 0.0);
        assert_eq!(bounds.clamp(20.0), 15.0);
        assert_eq!(bounds.clamp(3.0), 3.0);
        assert!(bounds.contains(15.0));
        assert!(bounds.clamp(f64::NAN).is_nan());
    }

    #[test]
    fn non_finite_gains_are_rejected() {
        for gains in [
            Gains {
                kp: f64::NAN,
                ..Default::default()
            },
            Gains {
                kd: f64::INFINITY,
                ..Default::default()
            },
        ] {
            let scenario = Scenario::builder()
                .controller(ControllerKind::PD, gains)
                .build();
            assert!(matches!(
                scenario.validate(),
                Err(SimulationError::InvalidParameter { .. })
            ));
        }
    }
}
