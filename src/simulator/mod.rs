//! Closed-loop simulation of a patient under feedback insulin control.
//!
//! A run is set up once from a [Scenario] and then advanced minute by minute:
//! the controller turns the glycemia history into an action, the action is
//! converted to an insulin rate and clamped, and the model is integrated over
//! that minute with the dose and the carbohydrate disturbance held constant.
mod output;
mod scenario;
mod schedule;

pub use output::{SimulationOutput, Summary, RANGE_HIGH, RANGE_LOW};
pub use scenario::{
    Bounds, ControllerConfig, InitialCondition, Scenario, ScenarioBuilder, Timing,
};
pub use schedule::Schedule;

use rayon::prelude::*;

use crate::controller;
use crate::model::{hovorka, Equilibrium, PatientParameters, PatientState};
use crate::solver::{Rk4, Solver};
use crate::SimulationError;

/// Interval between two controller decisions [min], independent of the
/// integrator step in [Timing]
pub const CONTROL_PERIOD: f64 = 1.0;

/// A single run, ready to be stepped through its minutes.
#[derive(Debug, Clone)]
pub struct Simulation<'a> {
    scenario: &'a Scenario,
    solver: Rk4,
    initial: PatientState,
    equilibrium_rate: f64,
}

impl<'a> Simulation<'a> {
    /// Validate the scenario and derive the initial state.
    ///
    /// When the run starts from the steady state and none exists, the neutral
    /// state is used and no equilibrium infusion is added.
    pub fn new(scenario: &'a Scenario) -> Result<Self, SimulationError> {
        scenario.validate()?;
        let p = &scenario.patient;

        let (initial, equilibrium_rate) = match &scenario.initial {
            InitialCondition::SteadyState(method) => {
                let Equilibrium {
                    state,
                    insulin_rate,
                } = method.solve_or_neutral(p);
                (state, insulin_rate)
            }
            InitialCondition::Provided(state) => (*state, 0.0),
        };

        let mut solver = Rk4::default();
        solver.reset(scenario.timing.step);

        tracing::debug!(
            "Simulating minutes {}..{} with {} controller, step {} min, equilibrium rate {:.6} U/min",
            scenario.timing.t_start,
            scenario.timing.t_end,
            scenario.controller.kind,
            scenario.timing.step,
            equilibrium_rate
        );

        Ok(Simulation {
            scenario,
            solver,
            initial,
            equilibrium_rate,
        })
    }

    pub fn initial_state(&self) -> &PatientState {
        &self.initial
    }

    /// Insulin rate added to every dose to hold the initial steady state [U/min]
    pub fn equilibrium_rate(&self) -> f64 {
        self.equilibrium_rate
    }

    /// Integrator used by the run, with its step counters
    pub fn solver(&self) -> &Rk4 {
        &self.solver
    }

    pub fn run(&mut self) -> SimulationOutput {
        let scenario = self.scenario;
        let p = &scenario.patient;
        let timing = &scenario.timing;
        let config = &scenario.controller;
        let setpoint = scenario.setpoint();

        let mut output =
            SimulationOutput::with_capacity(timing.minutes(), self.equilibrium_rate);
        let mut x = self.initial;
        let mut dose_clamped = false;
        let mut carbs_clamped = false;

        for minute in timing.t_start..timing.t_end {
            let action = controller::compute(
                config.kind,
                &config.gains,
                CONTROL_PERIOD,
                setpoint,
                &output.glucose,
            );
            let requested = action / p.insulin_sensitivity_factor
                + self.equilibrium_rate
                + scenario.basal.at(minute);
            let dose = config.bounds.clamp(requested);
            if dose != requested && !requested.is_nan() && !dose_clamped {
                tracing::warn!(
                    "Dose {:.4} U/min at minute {} clamped to {:.4}",
                    requested,
                    minute,
                    dose
                );
                dose_clamped = true;
            }

            let intake = scenario.carbs.at(minute);
            let carbs = scenario.disturbance.clamp(intake);
            if carbs != intake && !intake.is_nan() && !carbs_clamped {
                tracing::warn!(
                    "Carbohydrate intake {} g at minute {} clamped to {}",
                    intake,
                    minute,
                    carbs
                );
                carbs_clamped = true;
            }

            let t = minute as f64;
            x = self.solver.advance(
                |time, state: &PatientState| hovorka::derivative(time, state, dose, carbs, p),
                t,
                &x,
                t + CONTROL_PERIOD,
            );
            let glucose = hovorka::output(&x, p);

            tracing::trace!(
                "minute {}: G = {:.3} mmol/L, dose = {:.5} U/min, carbs = {} g",
                minute,
                glucose,
                dose,
                carbs
            );
            output.push(minute, dose, carbs, x, glucose);
        }

        output
    }
}

/// Set up and run `scenario` in one go.
pub fn simulate(scenario: &Scenario) -> Result<SimulationOutput, SimulationError> {
    Ok(Simulation::new(scenario)?.run())
}

/// Run `scenario` once per patient, in parallel.
///
/// Runs are independent: each gets its own copy of the scenario with the
/// patient swapped in. Results keep the order of `patients`.
pub fn simulate_population(
    scenario: &Scenario,
    patients: &[PatientParameters],
) -> Vec<Result<SimulationOutput, SimulationError>> {
    patients
        .par_iter()
        .map(|patient| {
            let scenario = Scenario {
                patient: *patient,
                ..scenario.clone()
            };
            simulate(&scenario)
        })
        .collect()
}
