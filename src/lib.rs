//! Closed-loop simulation of glucose-insulin dynamics in type 1 diabetes.
//!
//! The patient is the Hovorka compartmental model ([model]), integrated with a
//! fixed-step fourth-order Runge-Kutta scheme ([solver]) and driven minute by
//! minute by a P/PD/PI/PID feedback law ([controller]) inside the
//! [simulator].
//!
//! ```ignore
//! use glucosim::prelude::*;
//!
//! let scenario = Scenario::builder()
//!     .days(1)
//!     .meal(8 * 60, 50.0)
//!     .controller(ControllerKind::PID, Gains { kp: 0.05, ki: 0.0001, kd: 0.5 })
//!     .build();
//! let output = simulate(&scenario)?;
//! println!("{:?}", output.summary());
//! ```
pub mod controller;
pub mod error;
pub mod model;
pub mod simulator;
pub mod solver;
pub mod vector;

pub use crate::controller::{ControllerKind, Gains, Terms};
pub use crate::model::{
    basal_infusion_for_target, basal_infusion_or_zero, derivative, output, Compartment,
    Equilibrium, Fluxes, PatientParameters, PatientState, PopulationPrior, SteadyStateMethod,
    NSTATES,
};
pub use crate::simulator::{
    simulate, simulate_population, Bounds, ControllerConfig, InitialCondition, Scenario,
    ScenarioBuilder, Schedule, Simulation, SimulationOutput, Summary, Timing,
};
pub use crate::solver::{Rk4, Solver};
pub use crate::vector::{scale, sum, NamedVector};
pub use error::SimulationError;

pub mod prelude {
    pub mod model {
        pub use crate::model::equilibrium::{
            equilibrium_insulin, glucose_balance, state_for_infusion,
        };
        pub use crate::model::hovorka::{
            carbs_to_internal, glucose_concentration, insulin_to_internal, non_insulin_uptake,
            renal_clearance,
        };
    }

    pub use crate::controller::{compute, compute_by_name, ControllerKind, Gains};
    pub use crate::model::{
        Compartment, Equilibrium, PatientParameters, PatientState, PopulationPrior,
        SteadyStateMethod,
    };
    pub use crate::simulator::{
        simulate, simulate_population, InitialCondition, Scenario, Schedule, Simulation,
        SimulationOutput,
    };
    pub use crate::solver::{Rk4, Solver};
    pub use crate::vector::{scale, sum, NamedVector};
    pub use crate::SimulationError;
}
